// src/fetch/mod.rs
// =============================================================================
// HTTP access for the harvester: page fetches and image fetches.
//
// Everything goes through HttpFetcher so that every request carries the same
// spoofed headers and timeout.
// =============================================================================

mod http;

pub use http::{FetchedPage, HttpFetcher};
