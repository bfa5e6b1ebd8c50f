//! Cache-aware ratings fetcher
//!
//! Resolves a page title to a `RatingsRecord`, consulting the `RatingsCache`
//! first. Concurrent lookups for the same cache key share one outbound
//! request. Failures are logged and reported as `None`; they are never cached.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

use super::{RatingsProvider, RatingsRecord};
use crate::cache::RatingsCache;

type InFlight = Shared<BoxFuture<'static, Option<RatingsRecord>>>;

struct Inner<P> {
    provider: P,
    cache: Mutex<RatingsCache>,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

impl<P> Inner<P> {
    fn cache(&self) -> MutexGuard<'_, RatingsCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fetches ratings through the cache; clones share the cache and in-flight map
pub struct RatingsFetcher<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for RatingsFetcher<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: RatingsProvider> RatingsFetcher<P> {
    pub fn new(provider: P, cache: RatingsCache) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                cache: Mutex::new(cache),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Cache key for a page title
    pub fn cache_key(title: &str) -> String {
        title.to_lowercase()
    }

    /// Resolves `title` to ratings
    ///
    /// Returns the cached record when fresh. Otherwise performs one provider
    /// lookup with the title as given, caches any parsed response (including
    /// "not found") and returns it. Returns `None` on transport or parse
    /// failure.
    pub async fn fetch(&self, title: &str) -> Option<RatingsRecord> {
        let key = Self::cache_key(title);

        let pending = {
            // Checked under the in-flight lock so a lookup finishing in between
            // cannot be missed and repeated
            let mut in_flight = self.inner.in_flight();
            if let Some(record) = self.inner.cache().get(&key) {
                debug!(title, "ratings served from cache");
                return Some(record);
            }

            match in_flight.get(&key) {
                Some(pending) => {
                    debug!(title, "joining in-flight ratings lookup");
                    pending.clone()
                }
                None => {
                    let pending = Self::start(Arc::clone(&self.inner), key.clone(), title);
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Runs `f` against the underlying cache
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut RatingsCache) -> R) -> R {
        f(&mut *self.inner.cache())
    }

    fn start(inner: Arc<Inner<P>>, key: String, title: &str) -> InFlight {
        let title = title.to_string();

        async move {
            info!(title = %title, "fetching ratings");

            let result = match inner.provider.lookup(&title).await {
                Ok(record) => {
                    if !record.is_found() {
                        info!(title = %title, "no match from ratings provider");
                    }
                    inner.cache().set(&key, record.clone());
                    Some(record)
                }
                Err(e) => {
                    error!(title = %title, error = %e, "ratings lookup failed");
                    None
                }
            };

            inner.in_flight().remove(&key);
            result
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::config::Config;
    use crate::data::FetchError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that answers from a fixed table and counts lookups
    #[derive(Default)]
    pub(crate) struct FakeProvider {
        responses: HashMap<String, String>,
        calls: Arc<AtomicUsize>,
        titles: Arc<Mutex<Vec<String>>>,
    }

    impl FakeProvider {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Registers the raw JSON body returned for `title`
        pub(crate) fn respond(mut self, title: &str, body: &str) -> Self {
            self.responses.insert(title.to_string(), body.to_string());
            self
        }

        pub(crate) fn call_counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.calls)
        }

        pub(crate) fn requested_titles(&self) -> Arc<Mutex<Vec<String>>> {
            Arc::clone(&self.titles)
        }
    }

    #[async_trait]
    impl RatingsProvider for FakeProvider {
        async fn lookup(&self, title: &str) -> Result<RatingsRecord, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.titles.lock().unwrap().push(title.to_string());
            // Stay pending for one poll so concurrent callers can overlap
            tokio::task::yield_now().await;

            let body = self.responses.get(title).cloned().unwrap_or_default();
            Ok(serde_json::from_str(&body)?)
        }
    }

    pub(crate) const INCEPTION_BODY: &str = r#"{"Response":"True","imdbRating":"8.8","Ratings":[{"Source":"Rotten Tomatoes","Value":"87%"}]}"#;

    fn fetcher(provider: FakeProvider) -> (RatingsFetcher<FakeProvider>, MemoryStore) {
        let store = MemoryStore::new();
        let cache = RatingsCache::load(store.clone(), &Config::default());
        (RatingsFetcher::new(provider, cache), store)
    }

    #[tokio::test]
    async fn test_cache_miss_fetches_and_caches() {
        let provider = FakeProvider::new().respond("Inception", INCEPTION_BODY);
        let calls = provider.call_counter();
        let (fetcher, store) = fetcher(provider);

        let record = fetcher.fetch("Inception").await.expect("record");

        assert_eq!(record.imdb(), "8.8");
        assert_eq!(record.rotten_tomatoes(), Some("87%"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(fetcher.with_cache(|c| c.contains_key("inception")));

        let raw = store.item("nf_ratings_cache_v4").expect("persisted");
        assert!(raw.contains("\"inception\""));
    }

    #[tokio::test]
    async fn test_fresh_cache_entry_issues_no_network_calls() {
        let provider = FakeProvider::new();
        let calls = provider.call_counter();
        let (fetcher, _store) = fetcher(provider);
        let record: RatingsRecord = serde_json::from_str(INCEPTION_BODY).unwrap();
        fetcher.with_cache(|c| c.set("inception", record.clone()));

        assert_eq!(fetcher.fetch("Inception").await, Some(record.clone()));
        assert_eq!(fetcher.fetch("Inception").await, Some(record));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_uses_raw_title_but_key_is_lowercased() {
        let provider = FakeProvider::new().respond("THE Matrix", INCEPTION_BODY);
        let titles = provider.requested_titles();
        let (fetcher, _store) = fetcher(provider);

        fetcher.fetch("THE Matrix").await.expect("record");

        assert_eq!(*titles.lock().unwrap(), vec!["THE Matrix".to_string()]);
        assert!(fetcher.with_cache(|c| c.contains_key("the matrix")));
    }

    #[tokio::test]
    async fn test_not_found_is_cached_and_served_from_cache() {
        let provider = FakeProvider::new().respond(
            "Unknown Movie XYZ",
            r#"{"Response":"False","Error":"Movie not found!"}"#,
        );
        let calls = provider.call_counter();
        let (fetcher, _store) = fetcher(provider);

        let first = fetcher.fetch("Unknown Movie XYZ").await.expect("negative result");
        let second = fetcher.fetch("Unknown Movie XYZ").await.expect("cached result");

        assert!(!first.is_found());
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unusual_payload_shapes_are_cached_and_returned() {
        let provider = FakeProvider::new()
            .respond("Dark", r#"{"Response":"True","imdbRating":"8.7","Ratings":null}"#)
            .respond("Heat", r#"{"Response":"True","imdbRating":8.3}"#);
        let (fetcher, _store) = fetcher(provider);

        let dark = fetcher.fetch("Dark").await.expect("null ratings list is accepted");
        let heat = fetcher.fetch("Heat").await.expect("numeric rating is accepted");

        assert_eq!(dark.imdb(), "8.7");
        assert!(dark.rotten_tomatoes().is_none());
        assert_eq!(heat.imdb(), "8.3");
        assert!(fetcher.with_cache(|c| c.contains_key("dark") && c.contains_key("heat")));
    }

    #[tokio::test]
    async fn test_cached_payload_matches_provider_body() {
        let body = r#"{"Title":"X","Ratings":[]}"#;
        let provider = FakeProvider::new().respond("X", body);
        let (fetcher, store) = fetcher(provider);

        fetcher.fetch("X").await.expect("record");

        let raw = store.item("nf_ratings_cache_v4").expect("persisted");
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let expected: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(stored["x"]["data"], expected);
    }

    #[tokio::test]
    async fn test_parse_failure_returns_none_and_is_not_cached() {
        let provider = FakeProvider::new().respond("Broken", "<html>");
        let calls = provider.call_counter();
        let (fetcher, _store) = fetcher(provider);

        assert!(fetcher.fetch("Broken").await.is_none());
        assert!(fetcher.fetch("Broken").await.is_none());
        assert!(!fetcher.with_cache(|c| c.contains_key("broken")));
        assert_eq!(calls.load(Ordering::SeqCst), 2, "failures are retried on next call");
    }

    #[tokio::test]
    async fn test_concurrent_fetches_for_same_key_share_one_lookup() {
        let provider = FakeProvider::new().respond("Inception", INCEPTION_BODY);
        let calls = provider.call_counter();
        let (fetcher, _store) = fetcher(provider);

        let (a, b) = tokio::join!(fetcher.fetch("Inception"), fetcher.fetch("INCEPTION"));

        assert_eq!(a, b);
        assert!(a.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_fetches_across_threads_issue_one_lookup() {
        let provider = FakeProvider::new().respond("Inception", INCEPTION_BODY);
        let calls = provider.call_counter();
        let (fetcher, _store) = fetcher(provider);

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let fetcher = fetcher.clone();
                tokio::spawn(async move { fetcher.fetch("Inception").await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_some());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
