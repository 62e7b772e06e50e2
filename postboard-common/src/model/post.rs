use crate::model::{Id, image::PostImage, user::Author};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

pub type PostId = Id<PostMarker>;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author: Author,
    pub image: Option<PostImage>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub likes: u64,
}

impl Post {
    #[must_use]
    pub fn from_draft(
        id: PostId,
        draft: ValidDraft,
        author: Author,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            title: draft.title,
            content: draft.content,
            author,
            image: draft.image,
            timestamp,
            likes: 0,
        }
    }

    pub fn like(&mut self) {
        self.likes = self.likes.saturating_add(1);
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidDraftError {
    #[error("The post title is empty")]
    EmptyTitle,
    #[error("The post content is empty")]
    EmptyContent,
}

/// A post as composed by the user, before it is accepted into the timeline.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<PostImage>,
}

/// A draft whose title and content are trimmed and non-empty.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ValidDraft {
    title: String,
    content: String,
    image: Option<PostImage>,
}

impl PostDraft {
    pub fn validate(self) -> Result<ValidDraft, InvalidDraftError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(InvalidDraftError::EmptyTitle);
        }

        let content = self.content.trim();
        if content.is_empty() {
            return Err(InvalidDraftError::EmptyContent);
        }

        Ok(ValidDraft {
            title: title.to_owned(),
            content: content.to_owned(),
            image: self.image,
        })
    }
}

impl ValidDraft {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn image(&self) -> Option<&PostImage> {
        self.image.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        image::PostImage,
        post::{InvalidDraftError, Post, PostDraft},
        user::Author,
    };
    use time::macros::datetime;

    fn draft(title: &str, content: &str) -> PostDraft {
        PostDraft {
            title: title.to_owned(),
            content: content.to_owned(),
            image: None,
        }
    }

    #[test]
    fn drafts_are_trimmed() {
        let valid = draft("  Hi ", "\tWorld\n").validate().unwrap();
        assert_eq!(valid.title(), "Hi");
        assert_eq!(valid.content(), "World");
        assert_eq!(valid.image(), None);
    }

    #[test]
    fn blank_drafts_are_rejected() {
        assert_eq!(
            draft("  ", "text").validate(),
            Err(InvalidDraftError::EmptyTitle)
        );
        assert_eq!(
            draft("title", " \n ").validate(),
            Err(InvalidDraftError::EmptyContent)
        );
        assert_eq!(draft("", "").validate(), Err(InvalidDraftError::EmptyTitle));
    }

    #[test]
    fn post_from_draft() {
        let image = PostImage::inline("image/gif", b"GIF89a");
        let valid = PostDraft {
            image: Some(image.clone()),
            ..draft("Hi", "World")
        }
        .validate()
        .unwrap();
        let timestamp = datetime!(2025-06-01 12:00 UTC);

        let mut post = Post::from_draft(42.into(), valid, Author::anonymous(), timestamp);
        assert_eq!(post.title, "Hi");
        assert_eq!(post.content, "World");
        assert_eq!(post.author.get(), "Anonymous");
        assert_eq!(post.image, Some(image));
        assert_eq!(post.timestamp, timestamp);
        assert_eq!(post.likes, 0);

        post.like();
        post.like();
        assert_eq!(post.likes, 2);
    }

    #[test]
    fn serialized_layout() {
        let valid = draft("Hi", "World").validate().unwrap();
        let post = Post::from_draft(
            7.into(),
            valid,
            Author::new("Admin".to_owned()),
            datetime!(2025-06-01 12:00 UTC),
        );

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "7",
                "title": "Hi",
                "content": "World",
                "author": "Admin",
                "image": null,
                "timestamp": "2025-06-01T12:00:00Z",
                "likes": 0,
            })
        );
        assert_eq!(serde_json::from_value::<Post>(json).unwrap(), post);
    }
}
