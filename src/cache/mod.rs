//! Loaded-model cache
//!
//! Hosts that serve many requests keep one [`ModelCache`] and share the
//! detectors it hands out. Loading is single-flight per path: concurrent
//! callers asking for the same bundle wait on one load, while different
//! paths load independently. Failed loads are not cached, so a later call
//! retries.

use crate::detector::Detector;
use crate::error::HdvaResult;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type Slot = Arc<Mutex<Option<Arc<Detector>>>>;

/// Thread-safe cache of loaded detectors keyed by bundle path
#[derive(Default)]
pub struct ModelCache {
    slots: DashMap<PathBuf, Slot>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the detector for `path`, loading it on first use
    pub fn get_or_load(&self, path: &Path) -> HdvaResult<Arc<Detector>> {
        self.get_or_load_with(path, Detector::load)
    }

    /// Like [`get_or_load`](Self::get_or_load) with a custom loader
    pub fn get_or_load_with<F>(&self, path: &Path, load: F) -> HdvaResult<Arc<Detector>>
    where
        F: FnOnce(&Path) -> HdvaResult<Detector>,
    {
        let key = cache_key(path);
        // clone the slot out so the map shard lock is not held during the load
        let slot: Slot = self.slots.entry(key.clone()).or_default().clone();

        let mut guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(detector) = guard.as_ref() {
            return Ok(Arc::clone(detector));
        }

        tracing::info!("Loading model bundle {}", key.display());
        let detector = match load(&key) {
            Ok(detector) => Arc::new(detector),
            Err(e) => {
                // the key may not be canonical yet; leave no empty slot behind
                self.slots.remove_if(&key, |_, current| Arc::ptr_eq(current, &slot));
                return Err(e);
            }
        };
        *guard = Some(Arc::clone(&detector));
        Ok(detector)
    }

    /// Already-loaded detector, without loading
    pub fn get(&self, path: &Path) -> Option<Arc<Detector>> {
        let slot = self.slots.get(&cache_key(path))?.clone();
        let guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.clone()
    }

    /// Drop the cached detector for `path`; outstanding `Arc`s stay valid
    pub fn invalidate(&self, path: &Path) {
        self.slots.remove(&cache_key(path));
    }

    /// Number of loaded detectors
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .lock()
                    .map(|guard| guard.is_some())
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cache_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
