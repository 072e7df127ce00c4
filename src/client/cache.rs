//! Snapshot cache for fetched flag configs.
//!
//! Each successful fetch builds a new immutable [`Snapshot`] and swaps it in whole. Readers
//! clone the current `Arc` and never see a partially replaced map.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::models::FlagConfig;

#[derive(Debug)]
pub struct Snapshot {
    flags: HashMap<String, FlagConfig>,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(flags: Vec<FlagConfig>) -> Self {
        Self {
            flags: flags.into_iter().map(|f| (f.key.clone(), f)).collect(),
            fetched_at: Utc::now(),
        }
    }

    pub fn get(&self, flag_key: &str) -> Option<&FlagConfig> {
        self.flags.get(flag_key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Shared handle to the current snapshot. Clones point at the same cache.
#[derive(Debug, Clone)]
pub struct FlagCache {
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl FlagCache {
    pub fn new(flags: Vec<FlagConfig>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(Snapshot::new(flags)))),
        }
    }

    /// The current snapshot. Holds the lock only long enough to clone the `Arc`.
    pub fn load(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the whole cache with a freshly fetched config list.
    pub fn replace(&self, flags: Vec<FlagConfig>) {
        let next = Arc::new(Snapshot::new(flags));
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }
}
