//! On-disk cache artifacts holding raw upstream payloads.
//!
//! A [`CacheStore`] is a directory; every artifact is a file whose name is a
//! key derived from the fetch time. The store has no notion of freshness,
//! that decision belongs to [`crate::sense_box::SenseBox`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};

// ---

const KEY_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Reference to the artifact currently backing a box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
}

impl CacheEntry {
    pub fn for_time(fetched_at: DateTime<Utc>) -> Self {
        Self {
            key: key_for(fetched_at),
        }
    }
}

/// Second-granularity artifact key, e.g. `2024_06_01_14_30_05`.
pub fn key_for(timestamp: DateTime<Utc>) -> String {
    timestamp.format(KEY_FORMAT).to_string()
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A store nested under this one, private to a single box.
    ///
    /// ASCII letters, digits and `-` are kept; every other byte, `_` included,
    /// becomes `_xx` (lowercase hex). The mapping is injective, so distinct ids
    /// never share a directory, and an id can never escape the cache directory.
    pub fn scoped(&self, box_id: &str) -> CacheStore {
        // ---
        let mut dir = String::with_capacity(box_id.len());
        for b in box_id.bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' {
                dir.push(b as char);
            } else {
                dir.push_str(&format!("_{b:02x}"));
            }
        }
        CacheStore::new(self.root.join(dir))
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Persist `content` under `key`, replacing any existing artifact.
    pub async fn write(&self, key: &str, content: &str) -> Result<()> {
        // ---
        fs::create_dir_all(&self.root).await?;
        let path = self.path(key);
        fs::write(&path, content).await?;
        debug!(path = %path.display(), bytes = content.len(), "cache: artifact written");
        Ok(())
    }

    pub async fn read(&self, key: &str) -> Result<String> {
        // ---
        match fs::read_to_string(self.path(key)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::ArtifactNotFound(key.to_string())),
            Err(e) => Err(Error::Storage(e)),
        }
    }

    /// Remove the artifact under `key`. Absence is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        // ---
        match fs::remove_file(self.path(key)).await {
            Ok(()) => {
                debug!(key = %key, "cache: artifact deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(e)),
        }
    }

    /// Remove the store's directory if it is empty; anything else is left alone.
    pub async fn remove_scope(&self) {
        if let Err(e) = fs::remove_dir(&self.root).await {
            debug!(path = %self.root.display(), error = %e, "cache: directory kept");
        }
    }
}
