use crate::{model::post::Post, wallet::WalletAddress};
use serde::{Deserialize, Serialize};

pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// The display name a post is attributed to.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Author(String);

impl Author {
    #[must_use]
    pub fn new(author: String) -> Self {
        Self(author)
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_AUTHOR.to_owned())
    }

    /// Picks the wallet's display name, then its address, then falls back to
    /// [`ANONYMOUS_AUTHOR`]. Blank display names count as absent.
    #[must_use]
    pub fn resolve(display_name: Option<&str>, address: Option<&WalletAddress>) -> Self {
        if let Some(name) = display_name.filter(|name| !name.trim().is_empty()) {
            return Self(name.to_owned());
        }

        address.map_or_else(Self::anonymous, |address| Self(address.get().to_owned()))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for Author {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ActiveUser {
    pub author: Author,
    pub post_count: usize,
}

/// Counts posts per author, in the order each author first shows up in the
/// timeline.
#[must_use]
pub fn active_users(posts: &[Post]) -> Vec<ActiveUser> {
    let mut users: Vec<ActiveUser> = Vec::new();

    for post in posts {
        match users.iter_mut().find(|user| user.author == post.author) {
            Some(user) => user.post_count += 1,
            None => users.push(ActiveUser {
                author: post.author.clone(),
                post_count: 1,
            }),
        }
    }

    users
}

/// The connected wallet as shown next to the active users.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ConnectedWalletBadge {
    pub label: String,
    pub initial: char,
}

impl ConnectedWalletBadge {
    #[must_use]
    pub fn new(address: &WalletAddress, display_name: Option<&str>) -> Self {
        match display_name.filter(|name| !name.trim().is_empty()) {
            Some(name) => Self {
                label: name.to_owned(),
                initial: name
                    .chars()
                    .next()
                    .and_then(|initial| initial.to_uppercase().next())
                    .unwrap_or('W'),
            },
            None => Self {
                label: address.shortened(),
                initial: 'W',
            },
        }
    }
}
