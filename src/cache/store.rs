//! Time-bounded ratings cache
//!
//! Entries are keyed by lower-cased title and persisted as one JSON object
//! under a single storage key. The whole map is written back after every
//! change; expired entries are only removed when they are read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::storage::KeyValueStore;
use crate::config::Config;
use crate::data::RatingsRecord;

/// One cached lookup result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the entry was written, in epoch milliseconds
    pub ts: i64,
    /// Provider payload; `null` in data written by older releases
    pub data: Option<RatingsRecord>,
}

/// Ratings cache backed by a durable key-value store
pub struct RatingsCache {
    storage: Box<dyn KeyValueStore>,
    storage_key: String,
    ttl_ms: i64,
    entries: HashMap<String, CacheEntry>,
}

impl RatingsCache {
    /// Loads the cache from `storage`
    ///
    /// Missing, unreadable or corrupt data yields an empty cache.
    pub fn load(storage: impl KeyValueStore + 'static, config: &Config) -> Self {
        let entries = match storage.get_item(&config.storage_key) {
            Ok(Some(raw)) => {
                match serde_json::from_str::<Option<HashMap<String, CacheEntry>>>(&raw) {
                    Ok(entries) => entries.unwrap_or_default(),
                    Err(e) => {
                        debug!(error = %e, "discarding unreadable ratings cache");
                        HashMap::new()
                    }
                }
            }
            Ok(None) => HashMap::new(),
            Err(e) => {
                debug!(error = %e, "ratings cache storage unavailable");
                HashMap::new()
            }
        };

        Self {
            storage: Box::new(storage),
            storage_key: config.storage_key.clone(),
            ttl_ms: i64::try_from(config.cache_ttl.as_millis()).unwrap_or(i64::MAX),
            entries,
        }
    }

    /// Returns the cached record for `key` if it is still fresh
    pub fn get(&mut self, key: &str) -> Option<RatingsRecord> {
        self.get_at(key, Utc::now())
    }

    /// Same as [`get`](Self::get), evaluated at `now`
    ///
    /// An entry older than the TTL is removed and the removal persisted.
    pub fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<RatingsRecord> {
        let entry = self.entries.get(key)?;

        if now.timestamp_millis().saturating_sub(entry.ts) > self.ttl_ms {
            debug!(key, "evicting expired ratings");
            self.entries.remove(key);
            self.persist();
            return None;
        }

        entry.data.clone()
    }

    /// Stores `record` under `key` with the current time
    pub fn set(&mut self, key: &str, record: RatingsRecord) {
        self.set_at(key, record, Utc::now());
    }

    /// Same as [`set`](Self::set), timestamped at `now`
    pub fn set_at(&mut self, key: &str, record: RatingsRecord, now: DateTime<Utc>) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                ts: now.timestamp_millis(),
                data: Some(record),
            },
        );
        self.persist();
    }

    /// Whether an entry exists for `key`, fresh or not
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&mut self) {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize ratings cache");
                return;
            }
        };

        if let Err(e) = self.storage.set_item(&self.storage_key, &json) {
            warn!(error = %e, "failed to persist ratings cache");
        }
    }
}
