//! Process-wide mapping from box id to [`SenseBox`].
//!
//! The map itself sits behind an `RwLock` that is only held for lookups and
//! inserts. Each box has its own `Mutex`, so reads of unrelated boxes run
//! independently while reads of the same box are serialized, which keeps at
//! most one upstream fetch in flight per box.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::cache::CacheStore;
use crate::error::{Error, Result};
use crate::sense_box::SenseBox;
use crate::upstream::OutputFormat;

// ---

pub type SharedBox = Arc<Mutex<SenseBox>>;

/// Cheaply cloneable handle; clones share the same boxes.
#[derive(Clone)]
pub struct Registry {
    boxes: Arc<RwLock<HashMap<String, SharedBox>>>,
    store: CacheStore,
    history_limit: usize,
}

impl Registry {
    pub fn new(store: CacheStore, history_limit: usize) -> Self {
        Self {
            boxes: Arc::default(),
            store,
            history_limit,
        }
    }

    /// Create a box for `id`. Registering an existing id changes nothing.
    pub async fn register(&self, id: &str, format: OutputFormat) -> Result<()> {
        // ---
        match self.boxes.write().await.entry(id.to_string()) {
            Entry::Occupied(_) => Err(Error::AlreadyExists(id.to_string())),
            Entry::Vacant(slot) => {
                let bx = SenseBox::new(id, format, self.store.scoped(id), self.history_limit);
                slot.insert(Arc::new(Mutex::new(bx)));
                info!(box_id = %id, format = %format, "Box registered");
                Ok(())
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<SharedBox> {
        self.boxes
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::BoxNotFound(id.to_string()))
    }

    /// Unregister `id` and delete its cache artifact.
    ///
    /// The box is retired under its own lock before the map entry goes away,
    /// so a re-registration of the same id can never have its fresh artifact
    /// deleted by the old box.
    pub async fn remove(&self, id: &str) -> Result<()> {
        // ---
        let bx = self.get(id).await?;
        bx.lock().await.retire().await;

        let mut boxes = self.boxes.write().await;
        if boxes.get(id).is_some_and(|current| Arc::ptr_eq(current, &bx)) {
            boxes.remove(id);
        }
        Ok(())
    }

    /// Retire every box. Used once the server has stopped accepting requests.
    pub async fn shutdown(&self) {
        // ---
        let drained: Vec<SharedBox> = self.boxes.write().await.drain().map(|(_, bx)| bx).collect();
        info!("Tearing down {} boxes", drained.len());
        for bx in drained {
            bx.lock().await.retire().await;
        }
        self.store.remove_scope().await;
    }

    pub async fn len(&self) -> usize {
        self.boxes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.boxes.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::cache::tests::scratch_store;
    use crate::snapshot::tests::sample_payload;
    use crate::upstream::testing::FakeUpstream;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_register_twice_keeps_first_box() {
        // ---
        let registry = Registry::new(scratch_store(), 0);
        let upstream = FakeUpstream::default();
        upstream.push_ok(sample_payload("20"));

        assert_ok!(registry.register("box-a", OutputFormat::Json).await);
        registry.get("box-a").await.unwrap().lock().await.read(&upstream).await.unwrap();

        let err = assert_err!(registry.register("box-a", OutputFormat::Geojson).await);
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(registry.len().await, 1);

        let bx = registry.get("box-a").await.unwrap();
        let bx = bx.lock().await;
        assert_eq!(bx.format(), OutputFormat::Json);
        assert_eq!(bx.history().count(), 1);
        assert!(bx.cache_entry().is_some());
        drop(bx);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_get_unknown_box() {
        // ---
        let registry = Registry::new(scratch_store(), 0);
        assert!(registry.is_empty().await);
        let err = assert_err!(registry.get("ghost").await);
        assert!(matches!(err, Error::BoxNotFound(ref id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_clones_share_boxes() {
        // ---
        let registry = Registry::new(scratch_store(), 0);
        let handle = registry.clone();
        registry.register("box-a", OutputFormat::Json).await.unwrap();
        assert_ok!(handle.get("box-a").await);
    }

    #[tokio::test]
    async fn test_remove_deletes_artifact() {
        // ---
        let store = scratch_store();
        let registry = Registry::new(store.clone(), 0);
        let upstream = FakeUpstream::default();
        upstream.push_ok(sample_payload("20"));

        registry.register("box-a", OutputFormat::Json).await.unwrap();
        let bx = registry.get("box-a").await.unwrap();
        bx.lock().await.read(&upstream).await.unwrap();
        assert!(store.scoped("box-a").root().exists());

        assert_ok!(registry.remove("box-a").await);
        assert!(!store.scoped("box-a").root().exists());
        assert!(matches!(registry.get("box-a").await, Err(Error::BoxNotFound(_))));
        assert!(matches!(registry.remove("box-a").await, Err(Error::BoxNotFound(_))));

        // A handle obtained before removal can no longer read.
        assert!(matches!(
            bx.lock().await.read(&upstream).await,
            Err(Error::BoxNotFound(_))
        ));
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_reregister_after_remove_keeps_new_artifact() {
        // ---
        let store = scratch_store();
        let registry = Registry::new(store.clone(), 0);
        let upstream = FakeUpstream::default();
        upstream.push_ok(sample_payload("20"));
        upstream.push_ok(sample_payload("25"));
        let t0 = chrono::Utc::now();

        registry.register("box-a", OutputFormat::Json).await.unwrap();
        let old = registry.get("box-a").await.unwrap();
        old.lock().await.read_at(&upstream, t0).await.unwrap();

        registry.remove("box-a").await.unwrap();
        registry.register("box-a", OutputFormat::Json).await.unwrap();
        let new = registry.get("box-a").await.unwrap();
        assert!(!Arc::ptr_eq(&old, &new));

        // Same second, same key: the old box must not touch the new artifact.
        new.lock().await.read_at(&upstream, t0).await.unwrap();
        old.lock().await.retire().await;

        let outcome = assert_ok!(new.lock().await.read_at(&upstream, t0).await);
        assert!(outcome.from_cache);
        let lines = new.lock().await.lines();
        assert!(lines[0].starts_with("Temperature: 77.0°F"));
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_reads_fetch_once() {
        // ---
        let registry = Registry::new(scratch_store(), 0);
        let upstream = FakeUpstream::default();
        upstream.push_ok(sample_payload("20"));
        registry.register("box-a", OutputFormat::Json).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let upstream = upstream.clone();
            tasks.push(tokio::spawn(async move {
                let bx = registry.get("box-a").await.unwrap();
                let mut bx = bx.lock().await;
                bx.read(&upstream).await.unwrap()
            }));
        }

        let mut fetched = 0;
        for task in tasks {
            if !task.await.unwrap().from_cache {
                fetched += 1;
            }
        }
        assert_eq!(fetched, 1);
        assert_eq!(upstream.calls(), 1);
        registry.shutdown().await;
    }
}
