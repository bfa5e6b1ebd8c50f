//! Mutation-driven title change detection
//!
//! Watches the page for mutations, waits for a quiet period, then runs the
//! extract → fetch → render pipeline when the displayed title has changed.
//! Each pipeline run is tagged with its title; a result that arrives after
//! the page moved on to another title is dropped instead of rendered.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::data::{RatingsFetcher, RatingsProvider};
use crate::debounce::Debouncer;
use crate::page::{BadgeRenderer, MutationRecord, Page, SelectorError, TitleExtractor};

/// How a pipeline run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Badge injected
    Rendered,
    /// Lookup failed; nothing shown
    NoRatings,
    /// Page moved to another title while the lookup was in flight
    Stale,
    /// Metadata container missing at render time
    NoAnchor,
}

/// Watches a page and keeps its ratings badge in sync with the shown title
pub struct ChangeDetector<P> {
    page: Page,
    extractor: TitleExtractor,
    renderer: BadgeRenderer,
    fetcher: RatingsFetcher<P>,
    last_title: Arc<Mutex<Option<String>>>,
    delay: Duration,
}

impl<P: RatingsProvider> ChangeDetector<P> {
    pub fn new(
        page: Page,
        fetcher: RatingsFetcher<P>,
        config: &Config,
    ) -> Result<Self, SelectorError> {
        Ok(Self {
            page,
            extractor: TitleExtractor::new()?,
            renderer: BadgeRenderer::new()?,
            fetcher,
            last_title: Arc::new(Mutex::new(None)),
            delay: config.debounce,
        })
    }

    /// Title of the most recent pipeline run
    pub fn last_title(&self) -> Option<String> {
        lock(&self.last_title).clone()
    }

    /// Text of the badge currently shown on the page
    pub fn badge_text(&self) -> Option<String> {
        self.page.with(|doc| self.renderer.badge_text(doc))
    }

    /// Subscribes to the page and spawns the watch loop
    pub fn watch(self) -> JoinHandle<()> {
        let mutations = self.page.with(|doc| doc.observe());
        info!("mutation observer attached");
        tokio::spawn(self.run(mutations))
    }

    /// Debounces `mutations` and re-evaluates the page after each quiet period
    ///
    /// Returns once the mutation channel closes.
    pub async fn run(self, mut mutations: mpsc::UnboundedReceiver<MutationRecord>) {
        let mut debouncer = Debouncer::new(self.delay);

        loop {
            tokio::select! {
                record = mutations.recv() => match record {
                    Some(record) => {
                        trace!(added = record.added, removed = record.removed, "page mutated");
                        debouncer.schedule();
                    }
                    None => break,
                },
                _ = debouncer.fired() => {
                    self.evaluate();
                }
            }
        }

        debug!("mutation channel closed, detector stopping");
    }

    /// Checks the page once and starts a pipeline run if the title changed
    ///
    /// Returns `None` when no title is shown or it matches the last processed
    /// title exactly.
    pub fn evaluate(&self) -> Option<JoinHandle<PipelineOutcome>> {
        let title = self
            .page
            .with(|doc| self.extractor.extract(doc))
            .filter(|title| !title.is_empty());
        let Some(title) = title else {
            warn!("title element not found, skipping ratings lookup");
            return None;
        };

        {
            let mut last = lock(&self.last_title);
            if last.as_deref() == Some(title.as_str()) {
                return None;
            }
            *last = Some(title.clone());
        }

        info!(title = %title, "new title detected");

        let fetcher = self.fetcher.clone();
        let page = self.page.clone();
        let renderer = self.renderer.clone();
        let last_title = Arc::clone(&self.last_title);

        Some(tokio::spawn(async move {
            let Some(record) = fetcher.fetch(&title).await else {
                return PipelineOutcome::NoRatings;
            };

            if lock(&last_title).as_deref() != Some(title.as_str()) {
                debug!(title = %title, "discarding ratings for a title no longer shown");
                return PipelineOutcome::Stale;
            }

            let rendered =
                page.with(|doc| renderer.render(doc, &record.imdb(), record.rotten_tomatoes()));
            if rendered {
                PipelineOutcome::Rendered
            } else {
                PipelineOutcome::NoAnchor
            }
        }))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
