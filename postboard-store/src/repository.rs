//! The in-memory timeline and its write-through to a [`PostStore`].
//!
//! Every mutation builds the new timeline, saves it, and only then replaces
//! the in-memory list. A failed save leaves both untouched.

use crate::store::{PostStore, StoreError};
use postboard_common::{
    model::{
        ModelValidationError, PostboardSnowflakeGenerator,
        image::PostImage,
        post::{InvalidDraftError, Post, PostDraft, PostId},
        user::{ActiveUser, Author, active_users},
    },
    snowflake::SnowflakeTimestampError,
};
use std::collections::HashSet;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("The post was rejected: {0}")]
    InvalidDraft(#[from] InvalidDraftError),
    #[error("Could not persist the timeline: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Model(#[from] ModelValidationError),
    #[error("Could not assign a post id: {0}")]
    Id(#[from] SnowflakeTimestampError),
    #[error("Editing post {0} is not implemented")]
    EditUnimplemented(PostId),
}

/// The example posts a fresh timeline starts with.
fn seed_posts(
    generator: &mut PostboardSnowflakeGenerator,
    now: OffsetDateTime,
) -> Result<Vec<Post>> {
    let seeds = [
        (
            "Welcome to the Community!",
            "Feel free to contribute!",
            "Admin",
            None,
        ),
        (
            "React is Awesome!",
            "React makes UI development fun!",
            "Jane Doe",
            Some("https://via.placeholder.com/150"),
        ),
    ];

    seeds
        .into_iter()
        .map(|(title, content, author, image)| -> Result<Post> {
            Ok(Post {
                id: generator.generate_at(now)?.into(),
                title: title.to_owned(),
                content: content.to_owned(),
                author: Author::new(author.to_owned()),
                image: image
                    .map(|url| PostImage::new(url.to_owned()))
                    .transpose()
                    .map_err(ModelValidationError::from)?,
                timestamp: now,
                likes: 0,
            })
        })
        .collect()
}

pub struct PostRepository<S> {
    store: S,
    posts: Vec<Post>,
    id_generator: PostboardSnowflakeGenerator,
}

impl<S: PostStore> PostRepository<S> {
    /// Adopts the stored timeline, or seeds and persists the example posts
    /// when the slot holds no posts at all.
    pub fn initialize(store: S) -> Result<Self> {
        let records = store.load();

        let mut id_generator = PostboardSnowflakeGenerator::new();
        for id in records.iter().filter_map(|record| record.id) {
            id_generator.observe(id.snowflake());
        }

        let mut posts = Vec::with_capacity(records.len());
        let mut seen_ids = HashSet::with_capacity(records.len());
        let mut ids_assigned = false;
        let mut images_dropped = false;

        for record in records {
            let id = match record.id {
                Some(id) if seen_ids.insert(id) => id,
                _ => {
                    let id: PostId = id_generator.generate()?.into();
                    seen_ids.insert(id);
                    ids_assigned = true;
                    id
                }
            };

            let had_image = record.image.is_some();
            let post = record.into_post(id);
            images_dropped |= had_image && post.image.is_none();
            posts.push(post);
        }

        let mut repository = Self {
            store,
            posts: Vec::new(),
            id_generator,
        };

        if posts.is_empty() {
            let seed = seed_posts(&mut repository.id_generator, OffsetDateTime::now_utc())?;
            repository.commit(seed)?;
            info!("Seeded an empty timeline with example posts");
        } else if ids_assigned || images_dropped {
            repository.commit(posts)?;
            info!(
                posts = repository.posts.len(),
                ids_assigned, images_dropped, "Rewrote stored timeline"
            );
        } else {
            debug!(posts = posts.len(), "Loaded stored timeline");
            repository.posts = posts;
        }

        Ok(repository)
    }

    /// Newest first.
    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn get(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Accepts a draft as the newest post. Blank drafts are rejected without
    /// touching the timeline or the store.
    pub fn add(&mut self, draft: PostDraft, author: Author) -> Result<&[Post]> {
        let draft = draft.validate()?;

        let now = OffsetDateTime::now_utc();
        let id = self.id_generator.generate_at(now)?.into();
        let post = Post::from_draft(id, draft, author, now);
        debug!(%id, author = post.author.get(), "Adding post");

        let mut updated = Vec::with_capacity(self.posts.len() + 1);
        updated.push(post);
        updated.extend_from_slice(&self.posts);

        self.commit(updated)?;
        Ok(&self.posts)
    }

    /// Removes a post. Unknown ids are ignored.
    pub fn delete(&mut self, id: PostId) -> Result<&[Post]> {
        let Some(position) = self.position(id) else {
            debug!(%id, "Ignoring delete of unknown post");
            return Ok(&self.posts);
        };

        let mut updated = self.posts.clone();
        updated.remove(position);

        self.commit(updated)?;
        Ok(&self.posts)
    }

    /// Adds one like to a post. Unknown ids are ignored.
    pub fn like(&mut self, id: PostId) -> Result<&[Post]> {
        let Some(position) = self.position(id) else {
            debug!(%id, "Ignoring like of unknown post");
            return Ok(&self.posts);
        };

        let mut updated = self.posts.clone();
        updated[position].like();

        self.commit(updated)?;
        Ok(&self.posts)
    }

    /// Posts cannot be edited after they are published.
    #[allow(clippy::unused_self)]
    pub fn edit(&self, id: PostId) -> Result<&Post> {
        Err(RepositoryError::EditUnimplemented(id))
    }

    #[must_use]
    pub fn active_users(&self) -> Vec<ActiveUser> {
        active_users(&self.posts)
    }

    fn position(&self, id: PostId) -> Option<usize> {
        self.posts.iter().position(|post| post.id == id)
    }

    fn commit(&mut self, updated: Vec<Post>) -> Result<()> {
        self.store.save(&updated)?;
        self.posts = updated;
        Ok(())
    }
}
