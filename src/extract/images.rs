// src/extract/images.rs
// =============================================================================
// This module pulls image URLs out of a parsed page.
//
// For every <img> element, in document order:
// - take `src`, or `data-src` when `src` is missing or empty (lazy-loading
//   galleries keep the real URL in data-src)
// - skip the element if it has neither
// - resolve the value against the page URL, exactly like a browser would
//
// Duplicates are kept: the same picture appearing twice on a page
// is downloaded twice, matching what the page actually shows.
// =============================================================================

use super::document::Document;
use super::resolve_url;
use scraper::ElementRef;
use url::Url;

// Extracts every image URL of a page, as absolute URL strings
//
// Parameters:
//   document: the parsed page
//   page_url: the URL the page was requested from (the base for relative URLs)
//
// Example:
//   <img src="./img/a.png"> on https://site.test/gallery/p2
//   -> ["https://site.test/gallery/img/a.png"]
pub fn extract_image_urls(document: &Document, page_url: &Url) -> Vec<String> {
    document
        .find_all("img")
        .filter_map(|img| {
            let source = image_source(&img)?;
            match resolve_url(page_url, source) {
                Some(url) => Some(url.to_string()),
                None => {
                    log::debug!("Skipping unresolvable image source: {:?}", source);
                    None
                }
            }
        })
        .collect()
}

// The raw image reference of an <img>: src first, then data-src
fn image_source<'a>(img: &ElementRef<'a>) -> Option<&'a str> {
    let element = img.value();
    ["src", "data-src"]
        .into_iter()
        .filter_map(|name| element.attr(name))
        .find(|value| !value.is_empty())
}
