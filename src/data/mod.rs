//! Ratings data model and provider access
//!
//! This module contains the record returned by the ratings provider, the HTTP
//! client that talks to it, and the cache-aware fetcher used by the detector.

pub mod fetcher;
pub mod omdb;

pub use fetcher::RatingsFetcher;
pub use omdb::{FetchError, OmdbClient, RatingsProvider};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// Placeholder the provider uses for ratings it does not have
pub const UNAVAILABLE: &str = "N/A";

/// Source name of the critics-aggregator score shown next to the IMDb rating
pub const ROTTEN_TOMATOES: &str = "Rotten Tomatoes";

/// Response payload from the ratings provider
///
/// Holds the parsed JSON exactly as received, so any well-formed body is
/// accepted and the cached copy serializes back unchanged. The accessors read
/// the OMDb fields (`Response`, `imdbRating`, `Ratings`) and treat anything
/// missing or of an unexpected shape as absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingsRecord(Value);

impl RatingsRecord {
    /// Whether the provider reported a match for the requested title
    pub fn is_found(&self) -> bool {
        self.0.get("Response").and_then(Value::as_str) == Some("True")
    }

    /// Overall rating, falling back to "N/A" when missing or empty
    ///
    /// Numeric ratings are rendered as written.
    pub fn imdb(&self) -> Cow<'_, str> {
        match self.0.get("imdbRating") {
            Some(Value::String(rating)) if !rating.is_empty() => Cow::Borrowed(rating),
            Some(Value::Number(rating)) => Cow::Owned(rating.to_string()),
            _ => Cow::Borrowed(UNAVAILABLE),
        }
    }

    /// Value reported by the named source, if present
    pub fn rating_from(&self, source: &str) -> Option<&str> {
        self.0
            .get("Ratings")
            .and_then(Value::as_array)?
            .iter()
            .find(|r| r.get("Source").and_then(Value::as_str) == Some(source))
            .and_then(|r| r.get("Value"))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Rotten Tomatoes score, if present
    pub fn rotten_tomatoes(&self) -> Option<&str> {
        self.rating_from(ROTTEN_TOMATOES)
    }
}
