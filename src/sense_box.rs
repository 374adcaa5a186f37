//! A registered sensor box and its fetch history.
//!
//! Every read either fetches the box from upstream (when the last successful
//! fetch is older than [`FRESHNESS_WINDOW_SECS`]) or replays the cached payload.
//! Both paths append one [`Snapshot`] to the history.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStore};
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use crate::upstream::{OutputFormat, Upstream};

// ---

/// Reads within this many seconds of the last successful fetch use the cache.
pub const FRESHNESS_WINDOW_SECS: i64 = 5 * 60;

/// Result of a successful [`SenseBox::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    pub appended: bool,
    pub from_cache: bool,
    pub last_fetch_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SenseBox {
    // ---
    id: String,
    format: OutputFormat,
    /// Time of the last successful upstream fetch; `None` until the first.
    last_fetch_at: Option<DateTime<Utc>>,
    cache: Option<CacheEntry>,
    store: CacheStore,
    history: VecDeque<Snapshot>,
    /// Maximum number of snapshots kept; `0` keeps everything.
    history_limit: usize,
    retired: bool,
}

impl SenseBox {
    pub fn new(id: &str, format: OutputFormat, store: CacheStore, history_limit: usize) -> Self {
        Self {
            id: id.to_string(),
            format,
            last_fetch_at: None,
            cache: None,
            store,
            history: VecDeque::new(),
            history_limit,
            retired: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn last_fetch_at(&self) -> Option<DateTime<Utc>> {
        self.last_fetch_at
    }

    pub fn cache_entry(&self) -> Option<&CacheEntry> {
        self.cache.as_ref()
    }

    pub fn history(&self) -> impl Iterator<Item = &Snapshot> {
        self.history.iter()
    }

    /// Rendered measurement lines across the whole history, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.history.iter().flat_map(Snapshot::lines).collect()
    }

    /// Whether a read at `now` would go to upstream.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.last_fetch_at {
            None => true,
            Some(last) => now - last > Duration::seconds(FRESHNESS_WINDOW_SECS),
        }
    }

    pub async fn read<U: Upstream>(&mut self, upstream: &U) -> Result<ReadOutcome> {
        self.read_at(upstream, Utc::now()).await
    }

    /// Read the box as of `now`, fetching or replaying the cache.
    ///
    /// On any error the box is left exactly as it was.
    pub async fn read_at<U: Upstream>(&mut self, upstream: &U, now: DateTime<Utc>) -> Result<ReadOutcome> {
        // ---
        if self.retired {
            return Err(Error::BoxNotFound(self.id.clone()));
        }

        if self.is_stale(now) {
            self.fetch(upstream, now).await
        } else {
            self.replay_cache().await
        }
    }

    async fn fetch<U: Upstream>(&mut self, upstream: &U, now: DateTime<Utc>) -> Result<ReadOutcome> {
        // ---
        info!(box_id = %self.id, "Fetching box from upstream");
        let body = upstream.fetch_box(&self.id, self.format).await?;

        // Parse and persist before touching any state.
        let snapshot = Snapshot::parse(&body)?;
        let entry = CacheEntry::for_time(now);
        self.store.write(&entry.key, &body).await?;

        if let Some(previous) = self.cache.take() {
            if previous.key != entry.key {
                if let Err(e) = self.store.delete(&previous.key).await {
                    warn!(box_id = %self.id, key = %previous.key, error = %e, "Failed to delete superseded cache artifact");
                }
            }
        }

        self.cache = Some(entry);
        self.last_fetch_at = Some(now);
        self.push_snapshot(snapshot);

        Ok(ReadOutcome {
            appended: true,
            from_cache: false,
            last_fetch_at: now,
        })
    }

    async fn replay_cache(&mut self) -> Result<ReadOutcome> {
        // ---
        let (Some(entry), Some(last_fetch_at)) = (&self.cache, self.last_fetch_at) else {
            return Err(Error::NoCacheAvailable(self.id.clone()));
        };

        debug!(box_id = %self.id, key = %entry.key, "Serving box from cache");
        let body = self.store.read(&entry.key).await?;
        let snapshot = Snapshot::parse(&body)?;
        self.push_snapshot(snapshot);

        Ok(ReadOutcome {
            appended: true,
            from_cache: true,
            last_fetch_at,
        })
    }

    fn push_snapshot(&mut self, snapshot: Snapshot) {
        self.history.push_back(snapshot);
        if self.history_limit > 0 {
            while self.history.len() > self.history_limit {
                self.history.pop_front();
            }
        }
    }

    /// Delete the live cache artifact and refuse further reads.
    pub async fn retire(&mut self) {
        // ---
        self.retired = true;
        if let Some(entry) = self.cache.take() {
            if let Err(e) = self.store.delete(&entry.key).await {
                warn!(box_id = %self.id, key = %entry.key, error = %e, "Failed to delete cache artifact");
            }
        }
        self.store.remove_scope().await;
        info!(box_id = %self.id, "Box retired");
    }
}
