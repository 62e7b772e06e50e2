pub mod image;
pub mod post;
pub mod user;

use crate::{
    model::{image::InvalidImageError, post::InvalidDraftError},
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{OffsetDateTime, macros::datetime};

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Draft(#[from] InvalidDraftError),
    #[error(transparent)]
    Image(#[from] InvalidImageError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostboardEpoch;
impl Epoch for PostboardEpoch {
    const EPOCH_TIME: OffsetDateTime = datetime!(2025-01-01 00:00 UTC);
}

pub type PostboardSnowflake = Snowflake<PostboardEpoch>;
pub type PostboardSnowflakeGenerator = SnowflakeGenerator<PostboardEpoch>;

#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<Marker>(
    PostboardSnowflake,
    #[serde(skip)] PhantomData<Marker>,
);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: PostboardSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> PostboardSnowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<PostboardSnowflake> for Id<Marker> {
    fn from(value: PostboardSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for PostboardSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(PostboardSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
