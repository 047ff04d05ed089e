// src/events.rs
// =============================================================================
// The structured log stream of a run.
//
// The engine never prints anything itself. It sends HarvestEvents through an
// unbounded tokio channel and whoever holds the receiving end (the CLI, a GUI,
// a test) decides how to show them. Sending never blocks and never fails the
// run: if nobody is listening any more, events are simply dropped.
// =============================================================================

use crate::extract::{MatchField, MatcherKind};
use crate::paginate::{PausePoint, TerminationReason};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

// Something that happened during a run, in the order it happened
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HarvestEvent {
    RunStarted {
        start_url: String,
        total_pages: usize,
        output_dir: PathBuf,
    },
    PageStarted {
        page_index: usize,
        total_pages: usize,
        url: String,
    },
    PageFetched {
        page_index: usize,
        status: u16,
        image_count: usize,
    },
    NoImages {
        page_index: usize,
    },
    DirectoryCreated {
        path: PathBuf,
    },
    ImageSaved {
        page_index: usize,
        seq_index: usize,
        image_count: usize,
        url: String,
        path: PathBuf,
    },
    ImageFailed {
        page_index: usize,
        seq_index: usize,
        url: String,
        reason: String,
    },
    PageCompleted {
        page_index: usize,
        succeeded: usize,
        attempted: usize,
        image_count: usize,
    },
    SearchingNextLink {
        page_index: usize,
    },
    NextLinkFound {
        page_index: usize,
        url: String,
        keyword: String,
        kind: MatcherKind,
        field: MatchField,
    },
    Resting {
        point: PausePoint,
        seconds: f64,
    },
    Terminated {
        reason: TerminationReason,
        pages_processed: usize,
        total_downloaded: usize,
    },
}

impl HarvestEvent {
    // Suggested log level when the event is rendered as a log line
    pub fn level(&self) -> log::Level {
        match self {
            HarvestEvent::ImageFailed { .. } => log::Level::Warn,
            HarvestEvent::Terminated { reason, .. } if reason.is_failure() => log::Level::Warn,
            HarvestEvent::Resting { point, .. } if *point != PausePoint::Navigation => {
                log::Level::Debug
            }
            HarvestEvent::SearchingNextLink { .. } => log::Level::Debug,
            _ => log::Level::Info,
        }
    }
}

impl fmt::Display for HarvestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarvestEvent::RunStarted {
                start_url,
                total_pages,
                output_dir,
            } => write!(
                f,
                "Starting at {} - will walk up to {} page(s) into {}",
                start_url,
                total_pages,
                output_dir.display()
            ),
            HarvestEvent::PageStarted {
                page_index,
                total_pages,
                url,
            } => write!(f, "Harvesting page {}/{}: {}", page_index, total_pages, url),
            HarvestEvent::PageFetched {
                page_index,
                status,
                image_count,
            } => write!(
                f,
                "Page {} fetched (HTTP {}), found {} image(s)",
                page_index, status, image_count
            ),
            HarvestEvent::NoImages { page_index } => {
                write!(f, "Page {}: no images found", page_index)
            }
            HarvestEvent::DirectoryCreated { path } => {
                write!(f, "Created directory {}", path.display())
            }
            HarvestEvent::ImageSaved {
                page_index,
                seq_index,
                image_count,
                path,
                ..
            } => write!(
                f,
                "Page {} download progress: {}/{} - {}",
                page_index,
                seq_index,
                image_count,
                path.display()
            ),
            HarvestEvent::ImageFailed { url, reason, .. } => {
                write!(f, "Download failed [{}]: {}", url, reason)
            }
            HarvestEvent::PageCompleted {
                page_index,
                succeeded,
                image_count,
                ..
            } => write!(
                f,
                "Page {} done: downloaded {}/{} image(s)",
                page_index, succeeded, image_count
            ),
            HarvestEvent::SearchingNextLink { page_index } => {
                write!(f, "Looking for the link after page {}", page_index)
            }
            HarvestEvent::NextLinkFound {
                url,
                keyword,
                kind,
                field,
                ..
            } => write!(
                f,
                "Found next page: {} (matched {} '{}' in {})",
                url, kind, keyword, field
            ),
            HarvestEvent::Resting { point, seconds } => {
                write!(f, "Resting {:.1}s ({})", seconds, point)
            }
            HarvestEvent::Terminated {
                reason,
                pages_processed,
                total_downloaded,
            } => write!(
                f,
                "Stopped after {} page(s), {} image(s) downloaded: {}",
                pages_processed, total_downloaded, reason
            ),
        }
    }
}

// The sending half of the event stream
//
// `EventSink::default()` discards everything, which is handy when the caller
// only cares about the final summary.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<HarvestEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<HarvestEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn emit(&self, event: HarvestEvent) {
        if let Some(tx) = &self.tx {
            // A closed receiver only means nobody is watching any more
            let _ = tx.send(event);
        }
    }
}

impl From<UnboundedSender<HarvestEvent>> for EventSink {
    fn from(tx: UnboundedSender<HarvestEvent>) -> Self {
        Self::new(tx)
    }
}
