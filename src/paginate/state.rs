// src/paginate/state.rs
// =============================================================================
// The mutable state of one pagination run.
//
// A PaginationState is created when a run starts, updated in place after
// every page and thrown away when the run ends. It is never persisted.
//
// Invariants kept by the methods below:
// - page_index starts at 1 and only ever grows by exactly 1 (advance)
// - current_url is always an absolute URL (it is a url::Url)
// - success_count is the sum of successful downloads of all finished pages
// - the run terminates exactly once; a second terminate() is refused loudly
// =============================================================================

use serde::Serialize;
use std::fmt;
use url::Url;

// Why a run stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminationReason {
    /// The requested number of pages was processed
    PageLimit,
    /// The last processed page had no recognisable next-page link
    NoNextLink,
    /// A page could not be fetched; the run cannot continue without it
    FetchFailed { page_index: usize, reason: String },
    /// The caller asked the run to stop
    Cancelled { page_index: usize },
}

impl TerminationReason {
    // Process exit code used by the command-line front end
    pub fn exit_code(&self) -> i32 {
        match self {
            TerminationReason::PageLimit => 0,
            TerminationReason::NoNextLink => 1,
            TerminationReason::FetchFailed { .. } => 3,
            TerminationReason::Cancelled { .. } => 130,
        }
    }

    // True for endings that mean "something went wrong"
    pub fn is_failure(&self) -> bool {
        matches!(self, TerminationReason::FetchFailed { .. })
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::PageLimit => f.write_str("page limit reached"),
            TerminationReason::NoNextLink => f.write_str("no next page link found"),
            TerminationReason::FetchFailed { page_index, reason } => {
                write!(f, "page {} could not be fetched: {}", page_index, reason)
            }
            TerminationReason::Cancelled { page_index } => {
                write!(f, "cancelled during page {}", page_index)
            }
        }
    }
}

// The states of the pagination state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    DoneLimit,
    DoneNoLink,
    DoneFetchFailed,
    DoneCancelled,
}

#[derive(Debug)]
pub struct PaginationState {
    current_url: Url,
    page_index: usize,
    total_pages: usize,
    success_count: usize,
    pages_processed: usize,
    termination: Option<TerminationReason>,
}

impl PaginationState {
    pub fn new(start_url: Url, total_pages: usize) -> Self {
        Self {
            current_url: start_url,
            page_index: 1,
            total_pages,
            success_count: 0,
            pages_processed: 0,
            termination: None,
        }
    }

    pub fn current_url(&self) -> &Url {
        &self.current_url
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn pages_processed(&self) -> usize {
        self.pages_processed
    }

    pub fn is_last_page(&self) -> bool {
        self.page_index >= self.total_pages
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    pub fn phase(&self) -> RunPhase {
        match &self.termination {
            None => RunPhase::Running,
            Some(TerminationReason::PageLimit) => RunPhase::DoneLimit,
            Some(TerminationReason::NoNextLink) => RunPhase::DoneNoLink,
            Some(TerminationReason::FetchFailed { .. }) => RunPhase::DoneFetchFailed,
            Some(TerminationReason::Cancelled { .. }) => RunPhase::DoneCancelled,
        }
    }

    // Books the outcome of the current page once its images are done
    pub fn record_page(&mut self, succeeded: usize) {
        self.success_count += succeeded;
        self.pages_processed += 1;
    }

    // Moves on to the next page
    pub fn advance(&mut self, next_url: Url) {
        debug_assert!(!self.is_terminated(), "advance() after termination");
        self.current_url = next_url;
        self.page_index += 1;
    }

    // Ends the run
    //
    // Returns false (and logs) if the run had already ended; the first
    // reason is kept.
    pub fn terminate(&mut self, reason: TerminationReason) -> bool {
        if let Some(existing) = &self.termination {
            log::warn!(
                "Ignoring second termination ({}); run already ended: {}",
                reason,
                existing
            );
            return false;
        }
        self.termination = Some(reason);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(total_pages: usize) -> PaginationState {
        PaginationState::new(Url::parse("https://site.test/p1").unwrap(), total_pages)
    }

    #[test]
    fn test_advance_steps_by_one() {
        let mut state = state(3);
        assert_eq!(state.page_index(), 1);
        assert!(!state.is_last_page());

        state.advance(Url::parse("https://site.test/p2").unwrap());
        assert_eq!(state.page_index(), 2);
        assert_eq!(state.current_url().as_str(), "https://site.test/p2");

        state.advance(Url::parse("https://site.test/p3").unwrap());
        assert!(state.is_last_page());
    }

    #[test]
    fn test_record_page_accumulates() {
        let mut state = state(2);
        state.record_page(3);
        state.record_page(0);
        assert_eq!(state.success_count(), 3);
        assert_eq!(state.pages_processed(), 2);
    }

    #[test]
    fn test_terminates_exactly_once() {
        let mut state = state(1);
        assert_eq!(state.phase(), RunPhase::Running);

        assert!(state.terminate(TerminationReason::PageLimit));
        assert!(!state.terminate(TerminationReason::NoNextLink));

        assert_eq!(state.termination(), Some(&TerminationReason::PageLimit));
        assert_eq!(state.phase(), RunPhase::DoneLimit);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let reasons = [
            TerminationReason::PageLimit,
            TerminationReason::NoNextLink,
            TerminationReason::FetchFailed {
                page_index: 1,
                reason: "HTTP 500".to_string(),
            },
            TerminationReason::Cancelled { page_index: 1 },
        ];
        let mut codes: Vec<i32> = reasons.iter().map(|r| r.exit_code()).collect();
        assert_eq!(codes[0], 0);
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), reasons.len());
    }
}
