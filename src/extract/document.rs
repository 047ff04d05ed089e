// src/extract/document.rs
// =============================================================================
// A thin, query-able wrapper around a parsed HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Is built on html5ever, which follows the browser error-recovery rules,
//   so parsing NEVER fails: broken markup just produces a smaller tree
//
// The wrapper only exposes the handful of queries the harvester needs:
// - all elements with a given tag name, in document order
// - all elements with a given tag name and class
// - every <a href> anchor with its visible text, title and class list
// =============================================================================

use super::charset::decode_body;
use scraper::{ElementRef, Html};

// A parsed HTML page
//
// Owned by the page iteration that fetched it and dropped once the images and
// the next link have been pulled out of it.
pub struct Document {
    html: Html,
}

// The parts of an <a href> element that pagination detection looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Raw href attribute, not yet resolved
    pub href: String,
    /// Visible text: every text node trimmed, empty ones dropped, concatenated
    pub text: String,
    /// The title attribute, or "" when absent
    pub title: String,
    /// Individual class names from the class attribute
    pub classes: Vec<String>,
}

impl Anchor {
    // Class names joined by single spaces, e.g. "btn next-page"
    pub fn class_list(&self) -> String {
        self.classes.join(" ")
    }
}

impl Document {
    // Parses a page body
    //
    // html5ever recovers from any malformed input, so there is no error case.
    pub fn parse(body: &str) -> Self {
        let html = Html::parse_document(body);
        if !html.errors.is_empty() {
            log::debug!("Recovered from {} HTML parse error(s)", html.errors.len());
        }
        Self { html }
    }

    // Decodes a raw page body (see charset.rs) and parses it
    pub fn from_bytes(body: &[u8], content_type: Option<&str>) -> Self {
        Self::parse(&decode_body(body, content_type))
    }

    // All elements named `tag` (lowercase), in document order
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(move |element| element.value().name() == tag)
    }

    // All elements named `tag` that carry `class` among their class names
    pub fn find_all_with_class<'a>(
        &'a self,
        tag: &'a str,
        class: &'a str,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.find_all(tag)
            .filter(move |element| element.value().classes().any(|c| c == class))
    }

    // Every <a> element that has an href attribute, in document order
    pub fn anchors(&self) -> Vec<Anchor> {
        self.find_all("a")
            .filter_map(|element| {
                let href = element.value().attr("href")?;
                Some(Anchor {
                    href: href.to_string(),
                    text: visible_text(&element),
                    title: element.value().attr("title").unwrap_or("").to_string(),
                    classes: element.value().classes().map(str::to_string).collect(),
                })
            })
            .collect()
    }
}

// Visible text of an element: each text node trimmed, empty ones dropped
//
// "<a> <span>Next</span> » </a>" -> "Next»"
fn visible_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect()
}
