//! Ratings badge injection
//!
//! The badge is a small rounded label placed as the first child of the
//! title's metadata container, above the year and episode line.

use tracing::{info, warn};

use super::{Document, Element, Selector, SelectorError};
use crate::data::UNAVAILABLE;

/// Left-hand metadata container of the title modal
pub const ANCHOR_SELECTOR: &str = ".previewModal--detailsMetadata-left";

/// Class carried by the injected badge
pub const BADGE_CLASS: &str = "nf-ratings-overlay";

/// Inline style matching the site's metadata typography
pub const BADGE_STYLE: &str = "display: inline-block; \
    background: rgba(0, 0, 0, 0.75); \
    color: #e5e5e5; \
    font-family: 'Netflix Sans', 'Helvetica Neue', Helvetica, Arial, sans-serif; \
    font-size: 15px; \
    font-weight: 500; \
    padding: 4px 10px; \
    border-radius: 12px; \
    margin-bottom: 6px; \
    line-height: 1.2;";

/// Builds and places the ratings badge
#[derive(Debug, Clone)]
pub struct BadgeRenderer {
    anchor: Selector,
    badge: Selector,
}

impl BadgeRenderer {
    pub fn new() -> Result<Self, SelectorError> {
        Ok(Self {
            anchor: Selector::parse(ANCHOR_SELECTOR)?,
            badge: Selector::parse(&format!(".{}", BADGE_CLASS))?,
        })
    }

    /// Replaces any existing badge in the anchor with a fresh one
    ///
    /// Returns `false` without touching the page when the anchor is missing.
    pub fn render(&self, document: &mut Document, imdb: &str, rt: Option<&str>) -> bool {
        let Some(anchor) = document.find(&self.anchor) else {
            warn!(
                selector = self.anchor.as_str(),
                "metadata container not found, skipping ratings badge"
            );
            return false;
        };

        while let Some(existing) = document.find_within(&anchor, &self.badge) {
            document.remove(&existing);
        }

        let badge = build_badge(imdb, rt);
        let text = badge.text_content();
        document.prepend_child(&anchor, badge.into());

        info!(badge = %text, "injected ratings badge");
        true
    }

    /// Text of the badge currently in the anchor, if any
    pub fn badge_text(&self, document: &Document) -> Option<String> {
        let anchor = document.find(&self.anchor)?;
        let badge = document.find_within(&anchor, &self.badge)?;
        document.get(&badge).map(Element::text_content)
    }
}

/// Badge element: "⭐ IMDb: **x**", plus " | 🍅 RT: **y**" when RT is known
pub fn build_badge(imdb: &str, rt: Option<&str>) -> Element {
    let mut badge = Element::new("div")
        .with_class(BADGE_CLASS)
        .with_attr("style", BADGE_STYLE)
        .with_child("⭐ IMDb: ")
        .with_child(Element::new("strong").with_child(imdb));

    if let Some(rt) = rt.filter(|rt| *rt != UNAVAILABLE) {
        badge = badge
            .with_child(" | 🍅 RT: ")
            .with_child(Element::new("strong").with_child(rt));
    }

    badge
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::page::Node;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Shared buffer the test subscriber writes formatted events into
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Runs `f` with a thread-local subscriber and returns what it logged
    pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .without_time()
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        let output = String::from_utf8_lossy(&logs.0.lock().unwrap()).into_owned();
        (result, output)
    }

    fn modal() -> Document {
        Document::new(
            Element::new("body").with_child(
                Element::new("div").with_class("previewModal--detailsMetadata").with_child(
                    Element::new("div")
                        .with_class("previewModal--detailsMetadata-left")
                        .with_child(Element::new("div").with_class("year").with_child("2010")),
                ),
            ),
        )
    }

    fn badges(doc: &Document) -> Vec<String> {
        doc.query_selector_all(&Selector::parse(".nf-ratings-overlay").unwrap())
            .into_iter()
            .map(Element::text_content)
            .collect()
    }

    #[test]
    fn test_badge_with_both_ratings() {
        let badge = build_badge("8.8", Some("87%"));
        let text = badge.text_content();

        assert!(text.contains("IMDb: 8.8"));
        assert!(text.contains("RT: 87%"));
        assert_eq!(badge.attr("style"), Some(BADGE_STYLE));
    }

    #[test]
    fn test_badge_omits_unavailable_rt() {
        assert!(!build_badge("7.1", Some("N/A")).text_content().contains("RT:"));
        assert!(!build_badge("7.1", None).text_content().contains("RT:"));
    }

    #[test]
    fn test_render_inserts_badge_as_first_child() {
        let mut doc = modal();
        let renderer = BadgeRenderer::new().unwrap();

        assert!(renderer.render(&mut doc, "8.8", Some("87%")));

        let anchor = doc
            .query_selector(&Selector::parse(ANCHOR_SELECTOR).unwrap())
            .unwrap();
        match &anchor.children[0] {
            Node::Element(first) => assert!(first.has_class(BADGE_CLASS)),
            other => panic!("expected badge element first, got {:?}", other),
        }
        assert_eq!(anchor.children.len(), 2);
    }

    #[test]
    fn test_render_twice_leaves_one_badge_with_latest_content() {
        let mut doc = modal();
        let renderer = BadgeRenderer::new().unwrap();

        renderer.render(&mut doc, "8.8", Some("87%"));
        renderer.render(&mut doc, "7.0", None);

        let badges = badges(&doc);
        assert_eq!(badges.len(), 1);
        assert!(badges[0].contains("IMDb: 7.0"));
        assert!(!badges[0].contains("RT:"));
        assert_eq!(renderer.badge_text(&doc).as_deref(), Some(badges[0].as_str()));
    }

    #[test]
    fn test_render_without_anchor_leaves_page_untouched() {
        let mut doc = Document::new(Element::new("body").with_child(Element::new("main")));
        let mut rx = doc.observe();
        let before = doc.body().clone();
        let renderer = BadgeRenderer::new().unwrap();

        let (rendered, logs) = capture_logs(|| renderer.render(&mut doc, "8.8", Some("87%")));
        assert!(!rendered);
        assert!(renderer.badge_text(&doc).is_none());

        let warning = logs
            .lines()
            .find(|line| line.contains("metadata container not found"))
            .expect("missing anchor is logged");
        assert!(warning.contains("WARN"), "logged at warn level: {}", warning);
        assert!(warning.contains(ANCHOR_SELECTOR));

        assert_eq!(doc.body(), &before);
        assert!(rx.try_recv().is_err(), "no mutation should be observed");
    }
}
