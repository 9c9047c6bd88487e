//! # ordmap
//!
//! Hash map that keeps its entries in a doubly-linked order.
//!
//! ## Architecture
//! - **Index**: AHash map from key to arena slot (O(1) lookups)
//! - **List**: nodes linked by slot index, head = oldest, tail = newest
//! - **Touch**: O(1) move of any entry to either end on access
//! - **Trim**: bulk eviction from either end down to a target size
//! - **Stamp**: mutation counter checked by every in-flight iteration
//!
//! The map is single-writer. Hosts that share one between threads must wrap
//! it in their own lock.
//!
//! ```
//! use ordmap::{OrderedMap, Touch};
//!
//! let mut map = OrderedMap::new();
//! map.set(1, "one", Touch::None);
//! map.set(2, "two", Touch::None);
//! map.set(3, "three", Touch::None);
//!
//! map.get(&1, Touch::MoveToBack);
//! map.trim_old(2);
//!
//! assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![3, 1]);
//! assert_eq!(map.to_json().unwrap(), r#"[[3,"three"],[1,"one"]]"#);
//! ```

#![warn(missing_docs)]

mod error;
mod iter;
mod map;
mod serialize;

pub use error::{Error, Result};
pub use iter::{Cursor, Iter, Keys, Values};
pub use map::{OrderedMap, Touch};
