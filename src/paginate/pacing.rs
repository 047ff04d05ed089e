// src/paginate/pacing.rs
// =============================================================================
// Randomized pauses that keep the harvester looking like a person browsing.
//
// Three pause points, each with its own range (see HarvestConfig):
// - Dwell: after a page arrives, before its images are touched
// - Burst: after every Nth image of a page
// - Navigation: before following a freshly found next-page link
//
// The actual waiting goes through the Sleeper trait, so production code
// sleeps on the tokio timer while tests record the requested durations and
// return immediately.
// =============================================================================

use crate::config::{DelayRange, HarvestConfig};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// Where in the run a pause happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PausePoint {
    Dwell,
    Burst,
    Navigation,
}

impl fmt::Display for PausePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PausePoint::Dwell => "reading the page",
            PausePoint::Burst => "between image bursts",
            PausePoint::Navigation => "before the next page",
        })
    }
}

// Something that can wait for a while
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

// Real waiting on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// Draws pause lengths from the configured ranges and waits them out
#[derive(Clone)]
pub struct Pacer {
    dwell: DelayRange,
    burst: DelayRange,
    navigation: DelayRange,
    burst_size: usize,
    sleeper: Arc<dyn Sleeper>,
}

impl Pacer {
    pub fn new(config: &HarvestConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            dwell: config.dwell_delay,
            burst: config.burst_delay,
            navigation: config.navigation_delay,
            burst_size: config.burst_size.max(1),
            sleeper,
        }
    }

    pub fn range(&self, point: PausePoint) -> DelayRange {
        match point {
            PausePoint::Dwell => self.dwell,
            PausePoint::Burst => self.burst,
            PausePoint::Navigation => self.navigation,
        }
    }

    // Picks how long the next pause at `point` will be
    //
    // Kept separate from wait() so the caller can announce the pause first.
    pub fn sample(&self, point: PausePoint) -> Duration {
        // ThreadRng is not Send, so it must not live across an await
        let mut rng = rand::thread_rng();
        self.range(point).sample(&mut rng)
    }

    pub async fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            self.sleeper.sleep(duration).await;
        }
    }

    // Whether the image at 1-based `seq_index` closes a burst
    pub fn is_burst_boundary(&self, seq_index: usize) -> bool {
        seq_index > 0 && seq_index % self.burst_size == 0
    }
}
