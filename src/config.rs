//! Embedded configuration
//!
//! There is no runtime configuration surface. The values below are compiled in
//! and grouped into `Config` so tests can construct variations.

use std::time::Duration;

/// OMDb API key. Replace with your own from https://www.omdbapi.com/apikey.aspx
pub const API_KEY: &str = "YOUR_API_KEY_HERE";

/// OMDb title endpoint
pub const OMDB_BASE_URL: &str = "https://www.omdbapi.com/";

/// Storage key holding the serialized ratings cache. Bump the suffix whenever
/// the stored record shape changes.
pub const CACHE_STORAGE_KEY: &str = "nf_ratings_cache_v4";

/// Cache entries older than this are evicted on read (24 hours)
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Quiet period after the last page mutation before re-evaluating
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(600);

/// Settings shared by the fetcher, cache and detector
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential sent with every lookup
    pub api_key: String,
    /// Provider endpoint
    pub base_url: String,
    /// Key the cache is persisted under
    pub storage_key: String,
    /// Maximum age of a cache entry
    pub cache_ttl: Duration,
    /// Debounce delay for mutation bursts
    pub debounce: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: API_KEY.to_string(),
            base_url: OMDB_BASE_URL.to_string(),
            storage_key: CACHE_STORAGE_KEY.to_string(),
            cache_ttl: CACHE_TTL,
            debounce: DEBOUNCE_DELAY,
        }
    }
}
