//! Images attached to posts.
//!
//! Uploaded images are stored inline as `data:image/<type>;base64,<payload>`
//! URIs. Remote `http(s)` URLs are accepted as well, since the example posts
//! that seed a fresh timeline point at one.

use base64::{Engine, prelude::BASE64_STANDARD};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error as _, Unexpected},
};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum InvalidImageError {
    #[error("Image is neither a data URI nor an http(s) URL")]
    UnsupportedScheme,
    #[error("Data URI is missing the ';base64,' marker")]
    NotBase64,
    #[error("Data URI media type {0:?} is not an image type")]
    NotAnImage(String),
    #[error("Data URI carries no payload")]
    EmptyPayload,
    #[error("Data URI payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct PostImage(String);

/// Decoded form of an inline image.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct InlineImage {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl PostImage {
    pub fn new(image: String) -> Result<Self, InvalidImageError> {
        if image.starts_with("data:") {
            parse_data_uri(&image)?;
        } else if !(image.starts_with("https://") || image.starts_with("http://")) {
            return Err(InvalidImageError::UnsupportedScheme);
        }

        Ok(Self(image))
    }

    /// Encodes raw image bytes as an inline data URI.
    #[must_use]
    pub fn inline(media_type: &str, bytes: &[u8]) -> Self {
        Self(format!(
            "data:{media_type};base64,{}",
            BASE64_STANDARD.encode(bytes)
        ))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Decodes an inline image. Returns `None` for remote URLs.
    #[must_use]
    pub fn decode(&self) -> Option<InlineImage> {
        // Validated on construction.
        parse_data_uri(&self.0).ok()
    }
}

fn parse_data_uri(uri: &str) -> Result<InlineImage, InvalidImageError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or(InvalidImageError::UnsupportedScheme)?;
    let (media_type, payload) = rest
        .split_once(";base64,")
        .ok_or(InvalidImageError::NotBase64)?;

    if !media_type.starts_with("image/") {
        return Err(InvalidImageError::NotAnImage(media_type.to_owned()));
    }
    if payload.is_empty() {
        return Err(InvalidImageError::EmptyPayload);
    }

    Ok(InlineImage {
        media_type: media_type.to_owned(),
        bytes: BASE64_STANDARD.decode(payload)?,
    })
}

impl<'de> Deserialize<'de> for PostImage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostImage::new(inner.clone())
            .map_err(|_| D::Error::invalid_value(Unexpected::Str(&inner), &"PostImage"))
    }
}
