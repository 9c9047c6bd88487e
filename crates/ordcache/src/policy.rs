//! Eviction policies

use std::fmt;
use std::hash::Hash;

use ordmap::OrderedMap;
use serde::{Deserialize, Serialize};

/// Which end of the recency order a cache evicts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Discard the least recently used entries (the head)
    #[default]
    Lru,
    /// Discard the most recently used entries (the tail).
    ///
    /// When full, a new key first evicts recent entries and is then inserted
    /// as the sole newest survivor.
    Mru,
}

impl EvictionPolicy {
    /// Shrink `map` to at most `new_size` entries from this policy's end.
    ///
    /// Returns the number of evicted entries.
    pub fn trim<K, V>(self, map: &mut OrderedMap<K, V>, new_size: usize) -> usize
    where
        K: Hash + Eq + Clone,
    {
        match self {
            EvictionPolicy::Lru => map.trim_old(new_size),
            EvictionPolicy::Mru => map.trim_new(new_size),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => write!(f, "lru"),
            EvictionPolicy::Mru => write!(f, "mru"),
        }
    }
}
