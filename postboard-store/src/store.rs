use crate::record::{PostRecord, decode_snapshot, encode_snapshot};
use postboard_common::model::post::Post;
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_SLOT: &str = "posts";

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Slot name {0:?} is not a plain file name")]
    InvalidSlot(String),
    #[error("Timeline could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The durable slot a timeline is kept in.
///
/// `load` never fails: a missing or unreadable slot is an empty timeline.
/// `save` replaces the whole slot at once.
pub trait PostStore {
    fn load(&self) -> Vec<PostRecord>;

    fn save(&self, posts: &[Post]) -> Result<()>;
}

impl<S: PostStore + ?Sized> PostStore for Box<S> {
    fn load(&self) -> Vec<PostRecord> {
        (**self).load()
    }

    fn save(&self, posts: &[Post]) -> Result<()> {
        (**self).save(posts)
    }
}

impl<S: PostStore + ?Sized> PostStore for Arc<S> {
    fn load(&self) -> Vec<PostRecord> {
        (**self).load()
    }

    fn save(&self, posts: &[Post]) -> Result<()> {
        (**self).save(posts)
    }
}

/// Keeps the timeline in `<data_dir>/<slot>.json`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn open(data_dir: impl Into<PathBuf>, slot: &str) -> Result<Self> {
        let is_plain_name = !slot.is_empty()
            && slot != "."
            && slot != ".."
            && !slot.contains(['/', '\\']);
        if !is_plain_name {
            return Err(StoreError::InvalidSlot(slot.to_owned()));
        }

        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        Ok(Self {
            path: data_dir.join(format!("{slot}.json")),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PostStore for JsonFileStore {
    fn load(&self) -> Vec<PostRecord> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => decode_snapshot(&raw),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored timeline yet");
                Vec::new()
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Stored timeline could not be read"
                );
                Vec::new()
            }
        }
    }

    fn save(&self, posts: &[Post]) -> Result<()> {
        let raw = encode_snapshot(posts)?;

        // Written next to the slot and renamed over it, so readers see either
        // the old snapshot or the new one.
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(raw.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;

        debug!(path = %self.path.display(), posts = posts.len(), "Saved timeline");
        Ok(())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
struct MemorySlot {
    raw: Option<String>,
    writes: usize,
}

/// Keeps the serialized timeline in memory. Exposes the raw slot and the
/// number of writes so callers can check exactly what was persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<MemorySlot>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose slot already holds `raw`, valid or not.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(MemorySlot {
                raw: Some(raw.into()),
                writes: 0,
            }),
        }
    }

    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.slot().raw.clone()
    }

    #[must_use]
    pub fn writes(&self) -> usize {
        self.slot().writes
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, MemorySlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PostStore for MemoryStore {
    fn load(&self) -> Vec<PostRecord> {
        self.slot()
            .raw
            .as_deref()
            .map(decode_snapshot)
            .unwrap_or_default()
    }

    fn save(&self, posts: &[Post]) -> Result<()> {
        let raw = encode_snapshot(posts)?;

        let mut slot = self.slot();
        slot.raw = Some(raw);
        slot.writes += 1;
        Ok(())
    }
}
