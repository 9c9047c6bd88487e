//! Cache configuration

use ordmap::Result;
use serde::{Deserialize, Serialize};

use crate::policy::EvictionPolicy;

/// Default number of entries a cache holds
pub const DEFAULT_LIMIT: usize = 100;

/// Default fraction of the limit kept when a trim fires
pub const DEFAULT_RATIO: f64 = 1.0;

/// Settings for building a [`Cache`](crate::Cache)
///
/// Missing fields fall back to their defaults:
///
/// ```
/// use ordcache::{CacheConfig, EvictionPolicy};
///
/// let config = CacheConfig::from_json(r#"{"policy": "mru", "limit": 20}"#).unwrap();
/// assert_eq!(config.policy, EvictionPolicy::Mru);
/// assert_eq!(config.limit, 20);
/// assert_eq!(config.ratio, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Eviction policy
    pub policy: EvictionPolicy,
    /// Maximum number of entries before a trim fires
    pub limit: usize,
    /// Fraction of `limit` retained by a trim, clamped to [0, 1] on use
    pub ratio: f64,
}

impl CacheConfig {
    /// LRU settings with the given limit
    pub fn lru(limit: usize) -> Self {
        Self {
            policy: EvictionPolicy::Lru,
            limit,
            ..Self::default()
        }
    }

    /// MRU settings with the given limit
    pub fn mru(limit: usize) -> Self {
        Self {
            policy: EvictionPolicy::Mru,
            limit,
            ..Self::default()
        }
    }

    /// Replace the retention ratio
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    /// Parse settings from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            policy: EvictionPolicy::default(),
            limit: DEFAULT_LIMIT,
            ratio: DEFAULT_RATIO,
        }
    }
}
