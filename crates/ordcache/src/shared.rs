//! Thread-safe handle around a [`Cache`]

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::stats::CacheStats;

/// Cloneable handle that serializes every call on one [`Cache`]
///
/// The cache itself is single-writer, and even lookups reorder entries, so
/// every operation takes the same exclusive lock. Statistics are read
/// without locking.
pub struct SharedCache<K, V> {
    /// Cache guarded by one lock
    cache: Arc<Mutex<Cache<K, V>>>,

    /// Statistics shared with the cache
    stats: Arc<CacheStats>,
}

impl<K, V> SharedCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Wrap an existing cache
    pub fn new(cache: Cache<K, V>) -> Self {
        let stats = cache.stats_handle();
        Self {
            cache: Arc::new(Mutex::new(cache)),
            stats,
        }
    }

    /// Build a cache from settings and wrap it
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Cache::from_config(config))
    }

    /// Look up a value, marking it most recently used
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cache.lock().get(key).cloned()
    }

    /// Look up a value without affecting recency
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cache.lock().peek(key).cloned()
    }

    /// Store a value
    pub fn set(&self, key: K, value: V) {
        self.cache.lock().set(key, value);
    }

    /// Remove an entry, returning whether it was present
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cache.lock().delete(key)
    }

    /// Drop every entry and reset the statistics
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Run `f` with the lock held, for compound operations
    pub fn with<R>(&self, f: impl FnOnce(&mut Cache<K, V>) -> R) -> R {
        let mut cache = self.cache.lock();
        f(&mut cache)
    }
}

impl<K, V> SharedCache<K, V> {
    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<K, V> Clone for SharedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            stats: Arc::clone(&self.stats),
        }
    }
}
