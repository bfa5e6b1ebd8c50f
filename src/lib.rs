//! nfratings library
//!
//! Overlays IMDb and Rotten Tomatoes ratings onto a streaming site's title
//! view: a change detector watches the page, extracts the displayed title,
//! fetches ratings through a persisted 24-hour cache and injects a badge.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod debounce;
pub mod detector;
pub mod page;

pub use detector::{ChangeDetector, PipelineOutcome};
