// src/paginate/mod.rs
// =============================================================================
// This module drives a run across pages.
//
// Submodules:
// - state: PaginationState and the reasons a run can end
// - pacing: Randomized pauses and the Sleeper seam
// - driver: The Harvester loop that ties fetching, extraction and
//   downloading together
// =============================================================================

mod driver;
mod pacing;
mod state;

pub use driver::{harvest, normalize_start_url, Harvester, RunRequest, RunSummary};
pub use pacing::{Pacer, PausePoint, Sleeper, TokioSleeper};
pub use state::{PaginationState, RunPhase, TerminationReason};
