// src/extract/mod.rs
// =============================================================================
// This module turns a fetched page into the things the harvester acts on.
//
// Submodules:
// - charset: Picking the text encoding of a raw page body
// - document: Lenient HTML parsing and the few queries we need
// - images: Image URLs of a page, in document order
// - next_link: Heuristic detection of the "next page" anchor
//
// This file also holds the URL resolution shared by both extractors and the
// PageResult that bundles a parsed page with its image URLs.
// =============================================================================

mod charset;
mod document;
mod images;
mod next_link;

pub use document::{Anchor, Document};
pub use images::extract_image_urls;
pub use next_link::{
    KeywordMatcher, MatchField, MatcherKind, NextLink, NextLinkResolver, DEFAULT_KEYWORDS,
};

use crate::fetch::FetchedPage;
use url::Url;

// One page of the run, parsed and with its image URLs pulled out
//
// The document is kept so the next link can be looked up after the images
// are downloaded; the whole PageResult is dropped at the end of the page.
pub struct PageResult {
    pub source_url: Url,
    pub document: Document,
    pub image_urls: Vec<String>,
}

impl PageResult {
    // Parses a fetched page and extracts its images
    //
    // Relative URLs are resolved against the URL we asked for, not the one
    // we were redirected to.
    pub fn from_fetched(page: FetchedPage) -> Self {
        let document = Document::from_bytes(&page.body, page.content_type.as_deref());
        let image_urls = extract_image_urls(&document, &page.url);
        Self {
            source_url: page.url,
            document,
            image_urls,
        }
    }
}

// Resolves a possibly-relative reference against a base URL
//
// Examples (base = "https://site.test/gallery/p2"):
//   "./img/a.png"          -> "https://site.test/gallery/img/a.png"
//   "/img/a.png"           -> "https://site.test/img/a.png"
//   "//cdn.test/a.png"     -> "https://cdn.test/a.png"
//   "https://other.test/x" -> "https://other.test/x"
//
// Returns None only when the reference cannot be parsed at all.
pub(crate) fn resolve_url(base: &Url, reference: &str) -> Option<Url> {
    base.join(reference.trim()).ok()
}
