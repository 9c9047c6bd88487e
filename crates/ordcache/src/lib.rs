//! # ordcache
//!
//! Size-bounded caches built on [`ordmap::OrderedMap`].
//!
//! ## Architecture
//! - **Cache**: one concrete type, policy carried as data
//! - **EvictionPolicy**: `Lru` trims the oldest end, `Mru` the newest
//! - **Trim**: fires once `len > limit`, keeping `round(limit * ratio)`
//! - **SharedCache**: `parking_lot` mutex handle for multi-threaded hosts
//!
//! ```
//! use ordcache::Cache;
//!
//! let mut recent = Cache::mru(3, 1.0);
//! recent.set("a", 1).set("b", 2).set("c", 3);
//! recent.set("d", 4);
//!
//! // "c" was the most recent entry when "d" arrived
//! assert_eq!(recent.keys().copied().collect::<Vec<_>>(), vec!["a", "b", "d"]);
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod policy;
mod shared;
mod stats;

pub use cache::Cache;
pub use config::{CacheConfig, DEFAULT_LIMIT, DEFAULT_RATIO};
pub use ordmap::{Error, Result, Touch};
pub use policy::EvictionPolicy;
pub use shared::SharedCache;
pub use stats::{CacheStats, StatsSnapshot};
