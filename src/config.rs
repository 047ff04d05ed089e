// src/config.rs
// =============================================================================
// Tunable settings for a harvesting run.
//
// Every field has a sensible default: a desktop Chrome User-Agent, a 10
// second request timeout, the randomized pacing delays and the built-in
// next-page keywords.
//
// A config can also be loaded from a JSON file. Missing fields fall back to
// their defaults, so a file only needs the settings it wants to change:
//
//   { "download_concurrency": 4, "navigation_delay": { "min_secs": 5, "max_secs": 8 } }
// =============================================================================

use crate::error::ConfigError;
use crate::extract::DEFAULT_KEYWORDS;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// Longest pause a DelayRange may ask for, in seconds
pub const MAX_DELAY_SECS: f64 = 3600.0;

// Where images go when the caller does not say otherwise
pub const DEFAULT_OUTPUT_DIR: &str = "images";

// Spoofed browser identity sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// An inclusive range of seconds a pacing delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange::new(0.0, 0.0);

    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    // Draws a uniformly random duration from the range
    //
    // A degenerate range (min == max) always yields exactly min.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        let secs = if self.max_secs > self.min_secs {
            rng.gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        };
        Duration::from_secs_f64(secs)
    }

    pub fn contains(&self, duration: Duration) -> bool {
        let secs = duration.as_secs_f64();
        // from_secs_f64 rounds to whole nanoseconds
        secs >= self.min_secs - 1e-9 && secs <= self.max_secs + 1e-9
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let finite = self.min_secs.is_finite() && self.max_secs.is_finite();
        if !finite
            || self.min_secs < 0.0
            || self.min_secs > self.max_secs
            || self.max_secs > MAX_DELAY_SECS
        {
            return Err(ConfigError::InvalidDelay {
                name,
                min: self.min_secs,
                max: self.max_secs,
                max_allowed: MAX_DELAY_SECS,
            });
        }
        Ok(())
    }
}

// All the knobs of a run, apart from the per-run parameters
// (start URL, page count, output directory)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// User-Agent header sent with every page and image request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// How many redirects a single request may follow
    pub max_redirects: usize,

    /// Pause after each successful page fetch, before touching its images
    pub dwell_delay: DelayRange,

    /// Pause after every `burst_size`-th image of a page
    pub burst_delay: DelayRange,

    /// Pause before moving on to a newly found next page
    pub navigation_delay: DelayRange,

    /// Number of image downloads between two burst pauses
    pub burst_size: usize,

    /// How many images of one page may be in flight at once
    pub download_concurrency: usize,

    /// Substrings that mark an anchor as the "next page" link, in match order
    pub keywords: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 10,
            max_redirects: 10,
            dwell_delay: DelayRange::new(0.8, 1.5),
            burst_delay: DelayRange::new(0.3, 0.8),
            navigation_delay: DelayRange::new(1.5, 3.0),
            burst_size: 5,
            download_concurrency: 1,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl HarvestConfig {
    // Loads and validates a config from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    // Same settings with all three pacing delays switched off
    pub fn without_delays(mut self) -> Self {
        self.dwell_delay = DelayRange::ZERO;
        self.burst_delay = DelayRange::ZERO;
        self.navigation_delay = DelayRange::ZERO;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dwell_delay.validate("dwell_delay")?;
        self.burst_delay.validate("burst_delay")?;
        self.navigation_delay.validate("navigation_delay")?;

        if self.burst_size == 0 {
            return Err(ConfigError::Zero("burst_size"));
        }
        if self.download_concurrency == 0 {
            return Err(ConfigError::Zero("download_concurrency"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("request_timeout_secs"));
        }
        Ok(())
    }
}
