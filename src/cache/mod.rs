//! Cache module for storing ratings lookups across sessions
//!
//! `RatingsCache` keeps provider responses for 24 hours, keyed by lower-cased
//! title, and writes itself back to a `KeyValueStore` after every change.

mod storage;
mod store;

pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{CacheEntry, RatingsCache};
