// src/extract/next_link.rs
// =============================================================================
// This module finds the "next page" link of a paginated listing.
//
// How it works:
// 1. Walk every <a href> of the page in document order
// 2. For each anchor, check whether ANY keyword is a substring of
//    - its visible text, or
//    - its title attribute, or
//    - its class names joined by spaces
// 3. The FIRST anchor that passes wins; its href is resolved against the page
//
// It is a heuristic. A "Next article" link in a sidebar that comes before the
// real pager will win. First-match-in-document-order is the contract and is
// not to be "improved" into some kind of scoring.
//
// Matching is case-sensitive, which is why the default list spells out
// "next", "Next" and "NEXT" separately.
// =============================================================================

use super::document::{Anchor, Document};
use super::resolve_url;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use url::Url;

// Built-in keywords, in match order: Chinese and English "next page" markers,
// then arrow-style glyphs
pub const DEFAULT_KEYWORDS: [&str; 8] = ["下一页", "下页", "next", "Next", "NEXT", "›", "»", "→"];

// Whether a keyword is a word or a glyph (reported with the match)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    Textual,
    Symbolic,
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatcherKind::Textual => "word",
            MatcherKind::Symbolic => "symbol",
        })
    }
}

// One keyword test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatcher {
    keyword: String,
    kind: MatcherKind,
}

impl KeywordMatcher {
    pub fn new(keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        let kind = if keyword.chars().any(char::is_alphanumeric) {
            MatcherKind::Textual
        } else {
            MatcherKind::Symbolic
        };
        Self { keyword, kind }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn kind(&self) -> MatcherKind {
        self.kind
    }

    // Which field of the anchor contains the keyword, checked text first
    fn matches(&self, anchor: &Anchor, class_list: &str) -> Option<MatchField> {
        let keyword = self.keyword.as_str();
        if anchor.text.contains(keyword) {
            Some(MatchField::Text)
        } else if anchor.title.contains(keyword) {
            Some(MatchField::Title)
        } else if class_list.contains(keyword) {
            Some(MatchField::Class)
        } else {
            None
        }
    }
}

// The part of the anchor a keyword was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Text,
    Title,
    Class,
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchField::Text => "text",
            MatchField::Title => "title",
            MatchField::Class => "class",
        })
    }
}

// A resolved next-page link and why it was picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextLink {
    pub url: Url,
    pub keyword: String,
    pub kind: MatcherKind,
    pub field: MatchField,
}

// Finds the next page of a listing using an ordered keyword list
//
// The list is immutable once built and shared cheaply between clones, so a
// test can inject its own keywords without touching global state.
#[derive(Debug, Clone)]
pub struct NextLinkResolver {
    matchers: Arc<[KeywordMatcher]>,
}

impl Default for NextLinkResolver {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

impl NextLinkResolver {
    // Builds a resolver from keywords, keeping their order
    //
    // Empty keywords are dropped: "" is a substring of everything and would
    // turn the first anchor of every page into the next link.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let matchers: Vec<KeywordMatcher> = keywords
            .into_iter()
            .map(Into::into)
            .filter(|keyword: &String| {
                if keyword.is_empty() {
                    log::warn!("Ignoring empty next-page keyword");
                }
                !keyword.is_empty()
            })
            .map(KeywordMatcher::new)
            .collect();

        Self {
            matchers: matchers.into(),
        }
    }

    pub fn matchers(&self) -> &[KeywordMatcher] {
        &self.matchers
    }

    // Returns the next-page link of `document`, if any anchor qualifies
    //
    // Parameters:
    //   document: the parsed page
    //   page_url: the page's URL, used to resolve the winning href
    //
    // Returns: Some(NextLink) for the first matching anchor, None otherwise.
    // None is a normal answer ("this is the last page"), not an error.
    pub fn resolve(&self, document: &Document, page_url: &Url) -> Option<NextLink> {
        for anchor in document.anchors() {
            let Some((matcher, field)) = self.match_anchor(&anchor) else {
                continue;
            };

            match resolve_url(page_url, &anchor.href) {
                Some(url) => {
                    return Some(NextLink {
                        url,
                        keyword: matcher.keyword.clone(),
                        kind: matcher.kind,
                        field,
                    });
                }
                None => {
                    log::debug!(
                        "Anchor matched '{}' but href {:?} is not a valid URL",
                        matcher.keyword,
                        anchor.href
                    );
                }
            }
        }

        None
    }

    // First keyword (in list order) that the anchor satisfies
    fn match_anchor(&self, anchor: &Anchor) -> Option<(&KeywordMatcher, MatchField)> {
        let class_list = anchor.class_list();
        self.matchers
            .iter()
            .find_map(|matcher| matcher.matches(anchor, &class_list).map(|field| (matcher, field)))
    }
}
