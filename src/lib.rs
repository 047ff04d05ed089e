// src/lib.rs
// =============================================================================
// page-harvester: walks a paginated gallery and saves every image on it.
//
// Module map:
// - config: Tunables (user agent, timeouts, pause ranges, keywords)
// - fetch: HTTP GETs for pages and images
// - extract: HTML parsing, image URLs, next-page link detection
// - download: Writing images to disk
// - paginate: The page-by-page state machine
// - events: The structured event stream a front end listens to
// - error: Error types
//
// Quick start:
//
//   let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//   let cancel = CancellationToken::new();
//   let summary = page_harvester::harvest("example.com/gallery", 3, "images", &cancel, tx).await?;
//   println!("{} images, {}", summary.total_downloaded, summary.termination);
// =============================================================================

pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod extract;
pub mod fetch;
pub mod paginate;

#[cfg(test)]
mod test_helpers;

pub use config::{DelayRange, HarvestConfig};
pub use error::{ConfigError, DownloadError, FetchError, NetworkErrorKind, RunError};
pub use events::{EventSink, HarvestEvent};
pub use paginate::{harvest, Harvester, RunRequest, RunSummary, TerminationReason};

// Re-exported so callers do not need their own tokio-util dependency
pub use tokio_util::sync::CancellationToken;
