use postboard_common::model::{
    image::PostImage,
    post::{Post, PostId},
    user::Author,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::warn;

/// One entry of the persisted timeline.
///
/// Snapshots written before posts had ids lack the `id` field; those records
/// are given one when the repository hydrates them.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostRecord {
    #[serde(default)]
    pub id: Option<PostId>,
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub likes: u64,
}

impl PostRecord {
    /// Adopts the record as stored. Only an image that no longer parses is
    /// left behind, since it could not be shown anyway.
    #[must_use]
    pub fn into_post(self, id: PostId) -> Post {
        let image = self.image.and_then(|image| match PostImage::new(image) {
            Ok(image) => Some(image),
            Err(err) => {
                warn!(%id, error = %err, "Dropping unreadable image of stored post");
                None
            }
        });

        Post {
            id,
            title: self.title,
            content: self.content,
            author: Author::new(self.author),
            image,
            timestamp: self.timestamp,
            likes: self.likes,
        }
    }
}

impl From<&Post> for PostRecord {
    fn from(post: &Post) -> Self {
        Self {
            id: Some(post.id),
            title: post.title.clone(),
            content: post.content.clone(),
            author: post.author.get().to_owned(),
            image: post.image.as_ref().map(|image| image.get().to_owned()),
            timestamp: post.timestamp,
            likes: post.likes,
        }
    }
}

pub(crate) fn encode_snapshot(posts: &[Post]) -> serde_json::Result<String> {
    let records: Vec<PostRecord> = posts.iter().map(PostRecord::from).collect();
    serde_json::to_string(&records)
}

/// Parses a stored snapshot. Anything that is not a JSON array yields an
/// empty timeline; array entries that are not valid records are skipped.
pub(crate) fn decode_snapshot(raw: &str) -> Vec<PostRecord> {
    let entries = match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(error = %err, "Stored timeline is unreadable, treating it as empty");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(
            |(position, entry)| match serde_json::from_value::<PostRecord>(entry) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(position, error = %err, "Skipping malformed stored post");
                    None
                }
            },
        )
        .collect()
}
