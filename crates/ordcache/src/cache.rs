//! Size-bounded cache over an [`OrderedMap`]

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use ordmap::{Iter, Keys, OrderedMap, Result, Touch, Values};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::CacheConfig;
use crate::policy::EvictionPolicy;
use crate::stats::CacheStats;

/// Cache that trims itself whenever it grows past `limit`
///
/// A trim keeps `round(limit * ratio)` entries, dropping them from the end
/// chosen by the [`EvictionPolicy`].
///
/// # Example
///
/// ```
/// use ordcache::Cache;
///
/// let mut cache = Cache::lru(3, 1.0);
/// cache.set("a", 1).set("b", 2).set("c", 3).set("d", 4);
///
/// assert_eq!(cache.peek("a"), None);
/// assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec!["b", "c", "d"]);
/// ```
#[derive(Debug)]
pub struct Cache<K, V> {
    map: OrderedMap<K, V>,
    policy: EvictionPolicy,
    limit: usize,
    ratio: f64,
    stats: Arc<CacheStats>,
}

fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty cache
    ///
    /// # Arguments
    /// * `policy` - Which end of the recency order trims evict from
    /// * `limit` - Maximum number of entries before a trim fires
    /// * `ratio` - Fraction of `limit` kept by a trim, clamped to [0, 1]
    ///
    /// # Returns
    /// * `Cache<K, V>` - Empty cache with fresh statistics
    pub fn new(policy: EvictionPolicy, limit: usize, ratio: f64) -> Self {
        Self {
            map: OrderedMap::new(),
            policy,
            limit,
            ratio: clamp_ratio(ratio),
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Create a cache that discards the least recently used entries
    pub fn lru(limit: usize, ratio: f64) -> Self {
        Self::new(EvictionPolicy::Lru, limit, ratio)
    }

    /// Create a cache that discards the most recently used entries
    pub fn mru(limit: usize, ratio: f64) -> Self {
        Self::new(EvictionPolicy::Mru, limit, ratio)
    }

    /// Create a cache from settings
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.policy, config.limit, config.ratio)
    }

    /// Eviction policy
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Maximum number of entries before a trim fires
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the limit, trimming right away if the cache is now over it
    pub fn set_limit(&mut self, limit: usize) {
        debug!(old = self.limit, new = limit, "cache limit changed");
        self.limit = limit;
        self.check_trim();
    }

    /// Fraction of the limit retained by a trim
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Change the ratio, clamped to [0, 1], then check the limit
    pub fn set_ratio(&mut self, ratio: f64) {
        let ratio = clamp_ratio(ratio);
        debug!(old = self.ratio, new = ratio, "cache ratio changed");
        self.ratio = ratio;
        self.check_trim();
    }

    /// Look up a value and mark it most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_with(key, Touch::MoveToBack)
    }

    /// Look up a value with an explicit touch
    pub fn get_with<Q>(&mut self, key: &Q, touch: Touch) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.map.get(key, touch) {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Look up a value without affecting recency or statistics
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.peek(key)
    }

    /// Check if `key` is cached
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Store a value as the most recently used entry, then enforce the limit.
    ///
    /// Under [`EvictionPolicy::Mru`], a new key arriving at a full cache
    /// first trims to `round(limit * ratio) - 1` entries, so the new key is
    /// inserted after the recent entries have been discarded.
    ///
    /// # Arguments
    /// * `key` - Key to insert or update
    /// * `value` - Value stored under `key`
    ///
    /// # Returns
    /// * `&mut Self` - The cache, for chaining further sets
    pub fn set(&mut self, key: K, value: V) -> &mut Self {
        let is_new = !self.map.contains_key(&key);
        if self.policy == EvictionPolicy::Mru && is_new && self.limit <= self.map.len() {
            self.trim(self.trim_target().saturating_sub(1));
        }
        if is_new {
            self.stats.record_insert();
        }
        self.map.set(key, value, Touch::MoveToBack);
        self.check_trim();
        self
    }

    /// Trim if the cache holds more than `limit` entries
    pub fn check_trim(&mut self) {
        if self.map.len() > self.limit {
            self.trim(self.trim_target());
        }
    }

    /// Shrink to at most `new_size` entries from the policy's end
    ///
    /// # Arguments
    /// * `new_size` - Number of entries to keep
    ///
    /// # Returns
    /// * `usize` - Number of evicted entries (0 if already small enough)
    pub fn trim(&mut self, new_size: usize) -> usize {
        let evicted = self.policy.trim(&mut self.map, new_size);
        if evicted > 0 {
            self.stats.record_evictions(evicted);
            debug!(policy = %self.policy, evicted, new_size, "cache trimmed");
        }
        evicted
    }

    fn trim_target(&self) -> usize {
        (self.limit as f64 * self.ratio).round() as usize
    }

    /// Remove an entry, returning whether it was present
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.delete(key)
    }

    /// Remove an entry, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.remove(key)
    }

    /// Drop every entry and reset the statistics
    pub fn clear(&mut self) {
        self.map.clear();
        self.stats.reset();
    }

    /// Encode the entries, least to most recent, as JSON `[key, value]` pairs
    pub fn to_json(&self) -> Result<String>
    where
        K: Serialize,
        V: Serialize,
    {
        self.map.to_json()
    }

    /// Copy out the entries, least to most recent
    pub fn to_pairs(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        self.map.to_pairs()
    }

    /// Clear the cache and store `pairs` in order through [`set`](Self::set)
    pub fn load_pairs<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.map.clear();
        for (key, value) in pairs {
            self.set(key, value);
        }
    }

    /// Replace the contents with the pairs decoded from `json`
    ///
    /// Pairs are replayed through [`set`](Self::set), so the limit applies.
    ///
    /// # Arguments
    /// * `json` - Array of `[key, value]` pairs, least to most recent
    ///
    /// # Returns
    /// * `Result<()>` - `Error::Json` if decoding fails, in which case the
    ///   cache is left untouched
    pub fn load_json(&mut self, json: &str) -> Result<()>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
    {
        let pairs: Vec<(K, V)> = serde_json::from_str(json)?;
        self.load_pairs(pairs);
        Ok(())
    }
}

impl<K, V> Cache<K, V> {
    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Least recently used value, without touching it
    pub fn first(&self) -> Option<&V> {
        self.map.first()
    }

    /// Most recently used value, without touching it
    pub fn last(&self) -> Option<&V> {
        self.map.last()
    }

    /// Entries from least to most recent
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.map.iter()
    }

    /// Keys from least to most recent
    pub fn keys(&self) -> Keys<'_, K, V> {
        self.map.keys()
    }

    /// Values from least to most recent
    pub fn values(&self) -> Values<'_, K, V> {
        self.map.values()
    }

    /// Call `f(value, key, map)` for every entry, least to most recent
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&V, &K, &OrderedMap<K, V>),
    {
        self.map.for_each(f)
    }

    /// Read-only view of the underlying map
    pub fn as_map(&self) -> &OrderedMap<K, V> {
        &self.map
    }

    /// Cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub(crate) fn stats_handle(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }
}
