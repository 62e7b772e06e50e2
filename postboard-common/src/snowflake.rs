//! Module for working with snowflake IDs.
//!
//! A snowflake stores the milliseconds since [`Epoch::EPOCH_TIME`] in its upper
//! [`TIMESTAMP_LENGTH`] bits and a sequence number in the lower
//! [`SEQUENCE_LENGTH`] bits. Posts only ever have one writer, so unlike
//! <https://discord.com/developers/docs/reference#snowflakes> no bits are spent
//! on worker or process ids.

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Unexpected, Visitor},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

pub const TIMESTAMP_OFFSET: u32 = 22;
pub const TIMESTAMP_LENGTH: u32 = 42;

pub const SEQUENCE_LENGTH: u32 = TIMESTAMP_OFFSET;
pub const SEQUENCE_BITMASK: u64 = (1 << SEQUENCE_LENGTH) - 1;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimestampError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

pub trait Epoch {
    const EPOCH_TIME: OffsetDateTime;
}

/// Milliseconds between the epoch and `time`, checked to fit the timestamp bits.
pub fn millis_since_epoch<SnowflakeEpoch: Epoch>(
    time: OffsetDateTime,
) -> Result<u64, SnowflakeTimestampError> {
    let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
    if millis < 0 {
        return Err(SnowflakeTimestampError::TimeBeforeEpoch);
    }

    let millis = u64::try_from(millis).map_err(|_| SnowflakeTimestampError::TimestampTooLarge)?;
    if millis >= 1 << TIMESTAMP_LENGTH {
        return Err(SnowflakeTimestampError::TimestampTooLarge);
    }

    Ok(millis)
}

#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Snowflake<SnowflakeEpoch>(u64, PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    #[must_use]
    pub fn from_parts(timestamp_millis: u64, sequence: u64) -> Option<Self> {
        if timestamp_millis >= 1 << TIMESTAMP_LENGTH || sequence > SEQUENCE_BITMASK {
            return None;
        }

        Some(Self::new(timestamp_millis << TIMESTAMP_OFFSET | sequence))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp_millis(self) -> u64 {
        self.0 >> TIMESTAMP_OFFSET
    }

    #[must_use]
    pub fn sequence(self) -> u64 {
        self.0 & SEQUENCE_BITMASK
    }

    #[must_use]
    pub fn created_at(self) -> OffsetDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        // 42 bits always fit an i64.
        #[allow(clippy::cast_possible_wrap)]
        let millis = self.timestamp_millis() as i64;
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(millis)
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

// Snowflakes exceed the 53 bits a JSON number can carry losslessly in most
// clients, so they are written as strings. Numbers are still accepted.
impl<SnowflakeEpoch> Serialize for Snowflake<SnowflakeEpoch> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

struct SnowflakeVisitor;

impl Visitor<'_> for SnowflakeVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("a snowflake as a decimal string or unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
        u64::try_from(value).map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
        value
            .parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
    }
}

impl<'de, SnowflakeEpoch> Deserialize<'de> for Snowflake<SnowflakeEpoch> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SnowflakeVisitor).map(Self::new)
    }
}

/// Hands out strictly increasing snowflakes, even when the clock stalls or
/// goes backwards.
///
/// When more than [`SEQUENCE_BITMASK`] ids are generated within one
/// millisecond the sequence carries into the timestamp bits. Ids stay unique
/// and ordered; their timestamp just runs slightly ahead.
#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    last: Option<Snowflake<SnowflakeEpoch>>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new() -> Self {
        Self { last: None }
    }

    #[must_use]
    pub fn last(self) -> Option<Snowflake<SnowflakeEpoch>> {
        self.last
    }

    /// Makes sure every later snowflake is greater than `snowflake`.
    pub fn observe(&mut self, snowflake: Snowflake<SnowflakeEpoch>) {
        if self.last.is_none_or(|last| last < snowflake) {
            self.last = Some(snowflake);
        }
    }

    pub fn generate_at(
        &mut self,
        time: OffsetDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimestampError>
    where
        SnowflakeEpoch: Epoch,
    {
        let candidate = millis_since_epoch::<SnowflakeEpoch>(time)? << TIMESTAMP_OFFSET;

        let next = match self.last {
            Some(last) if last.get() >= candidate => last
                .get()
                .checked_add(1)
                .ok_or(SnowflakeTimestampError::TimestampTooLarge)?,
            _ => candidate,
        };

        let snowflake = Snowflake::new(next);
        self.last = Some(snowflake);
        Ok(snowflake)
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimestampError>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(OffsetDateTime::now_utc())
    }
}
