//! Title extraction from the page
//!
//! The title can sit in several places depending on which layout the site is
//! showing. Candidates are tried in order, most specific first.

use super::{Document, Selector, SelectorError};

/// Title locations, most ratings-card specific first, page heading last
pub const TITLE_SELECTORS: [&str; 4] = [
    "div.about-header strong",
    ".previewModal--player-titleTreatment-text",
    r#"[data-uia="video-title"]"#,
    "h1.title-title",
];

/// Reads the currently displayed title
#[derive(Debug, Clone)]
pub struct TitleExtractor {
    candidates: Vec<Selector>,
}

impl TitleExtractor {
    /// Extractor over the site's known title locations
    pub fn new() -> Result<Self, SelectorError> {
        Self::with_selectors(&TITLE_SELECTORS)
    }

    pub fn with_selectors(selectors: &[&str]) -> Result<Self, SelectorError> {
        let candidates = selectors
            .iter()
            .map(|s| Selector::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { candidates })
    }

    /// Normalized text of the first candidate present on the page
    ///
    /// Returns `None` when no candidate matches. The first matching candidate
    /// wins even if its text is empty.
    pub fn extract(&self, document: &Document) -> Option<String> {
        self.candidates
            .iter()
            .find_map(|selector| document.query_selector(selector))
            .map(|element| sanitize(&element.text_content()))
    }
}

/// Collapses whitespace runs to single spaces and trims both ends
pub fn sanitize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Element;

    fn page(children: Vec<Element>) -> Document {
        let mut body = Element::new("body");
        for child in children {
            body = body.with_child(child);
        }
        Document::new(body)
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        assert_eq!(sanitize("  Breaking\n\t Bad  "), "Breaking Bad");
        assert_eq!(sanitize("   "), "");
    }

    #[test]
    fn test_extract_returns_none_without_candidates() {
        let extractor = TitleExtractor::new().unwrap();
        let doc = page(vec![Element::new("div").with_child("Home")]);

        assert!(extractor.extract(&doc).is_none());
    }

    #[test]
    fn test_extract_prefers_most_specific_candidate() {
        let extractor = TitleExtractor::new().unwrap();
        let doc = page(vec![
            Element::new("h1").with_class("title-title").with_child("Page Heading"),
            Element::new("div")
                .with_class("about-header")
                .with_child(Element::new("h3").with_child(Element::new("strong").with_child(" Dark\n"))),
        ]);

        assert_eq!(extractor.extract(&doc).as_deref(), Some("Dark"));
    }

    #[test]
    fn test_extract_falls_back_to_page_heading() {
        let extractor = TitleExtractor::new().unwrap();
        let doc = page(vec![Element::new("h1")
            .with_class("title-title")
            .with_child("The   Crown")]);

        assert_eq!(extractor.extract(&doc).as_deref(), Some("The Crown"));
    }

    #[test]
    fn test_extract_reads_video_title_attribute_layout() {
        let extractor = TitleExtractor::new().unwrap();
        let doc = page(vec![Element::new("div")
            .with_attr("data-uia", "video-title")
            .with_child("Narcos")]);

        assert_eq!(extractor.extract(&doc).as_deref(), Some("Narcos"));
    }

    #[test]
    fn test_strong_outside_about_header_is_ignored() {
        let extractor = TitleExtractor::new().unwrap();
        let doc = page(vec![Element::new("strong").with_child("Not a title")]);

        assert!(extractor.extract(&doc).is_none());
    }
}
