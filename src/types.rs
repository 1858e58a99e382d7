//! Core data types
//!
//! This module defines the trial-level types that flow from the marker stream
//! through segmentation into the statistics engine.

use serde::{Deserialize, Serialize};

/// Fixation cross marker; opens every trial window
pub const FIXATION_CODE: i64 = 99;

/// Block boundary markers
pub const BLOCK_START_CODE: i64 = 144;
pub const BLOCK_END_CODE: i64 = 255;

/// Response side of the target stimulus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// Semantic classification of one stimulus/response pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub side: Side,
    pub congruent: bool,
    pub correct: bool,
}

/// One marker inside a candidate trial window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTrial {
    pub code: i64,
    /// Raw tick timestamp
    pub time: i64,
}

impl RawTrial {
    pub fn new(code: i64, time: i64) -> Self {
        Self { code, time }
    }
}

/// An assembled trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub code: Code,
    /// May be negative when the log's timestamps are out of order
    pub response_time_ms: f64,
    /// Number of markers captured by the trial window (3 = fixation, stimulus, response)
    pub trial_size: usize,
}

impl TrialRecord {
    /// True when the window captured responses beyond the first one
    pub fn has_extra_responses(&self) -> bool {
        self.trial_size > 3
    }
}
