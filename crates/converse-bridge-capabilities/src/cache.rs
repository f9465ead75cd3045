//! TTL cache replaced wholesale on refresh
//!
//! The cache is valid while it holds at least one entry and its single expiry
//! has not passed. Entries keep insertion order so scans are deterministic.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default time-to-live: 24 hours
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct CacheState<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
    expires_at: Option<Instant>,
}

impl<V> Default for CacheState<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            expires_at: None,
        }
    }
}

impl<V> CacheState<V> {
    fn is_valid(&self) -> bool {
        !self.entries.is_empty() && self.expires_at.is_some_and(|at| Instant::now() < at)
    }
}

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    state: RwLock<CacheState<V>>,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// True iff the cache is non-empty and not expired
    pub fn is_valid(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_valid()
    }

    /// Value for `key` while the cache is valid
    pub fn get(&self, key: &str) -> Option<V> {
        let state = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !state.is_valid() {
            return None;
        }
        state
            .index
            .get(key)
            .map(|&slot| state.entries[slot].1.clone())
    }

    /// First entry, in insertion order, accepted by `predicate` while the cache is valid
    pub fn find<F>(&self, mut predicate: F) -> Option<(String, V)>
    where
        F: FnMut(&str, &V) -> bool,
    {
        let state = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !state.is_valid() {
            return None;
        }
        state
            .entries
            .iter()
            .find(|(key, value)| predicate(key, value))
            .cloned()
    }

    /// Replace every entry and restart the expiry clock.
    ///
    /// A key given twice keeps its first position and its last value.
    pub fn set_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, V)>,
    {
        let mut next = CacheState::default();
        for (key, value) in entries {
            match next.index.get(&key) {
                Some(&slot) => next.entries[slot].1 = value,
                None => {
                    next.index.insert(key.clone(), next.entries.len());
                    next.entries.push((key, value));
                }
            }
        }
        next.expires_at = Some(Instant::now() + self.ttl);

        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = CacheState::default();
    }
}
