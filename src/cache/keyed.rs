// src/cache/keyed.rs

//! Per-key memoization of shared handles.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

type Factory<K, V> = Box<dyn Fn(&K) -> V + Send + Sync>;

/// Memoizes one value per key.
///
/// The factory runs at most once per key. The map lock is held across the
/// factory call, so factories must be cheap and must not touch the cache.
/// Entries are never evicted.
pub struct KeyedCache<K, V> {
    entries: Mutex<HashMap<K, V>>,
    factory: Factory<K, V>,
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(factory: impl Fn(&K) -> V + Send + Sync + 'static) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            factory: Box::new(factory),
        }
    }

    /// Return the handle for `key`, creating it on first request.
    pub fn get(&self, key: &K) -> V {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = entries.get(key) {
            return value.clone();
        }
        log::debug!("Cache miss for {:?}", key);
        let value = (self.factory)(key);
        entries.insert(key.clone(), value.clone());
        value
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
