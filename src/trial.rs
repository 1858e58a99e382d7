//! Code classification and trial assembly
//!
//! A trial window is the run of markers between two fixation crosses (or a
//! fixation cross and a block boundary). Windows that do not look like
//! fixation → stimulus → response are dropped without error.

use crate::types::{Code, RawTrial, Side, TrialRecord, FIXATION_CODE};

/// Classify a stimulus code `a` and response code `b`.
///
/// Stimulus codes 1/2 are left-side targets, 1/3 congruent flankers.
/// Response codes 5/6 are correct responses. Anything else falls through
/// to right / incongruent / error.
pub fn classify(a: i64, b: i64) -> Code {
    let side = if matches!(a, 1 | 2) {
        Side::Left
    } else {
        Side::Right
    };

    Code {
        side,
        congruent: matches!(a, 1 | 3),
        correct: matches!(b, 5 | 6),
    }
}

/// Build a `TrialRecord` from a trial window.
///
/// Returns `None` when the window has fewer than three markers or does not
/// start with a fixation cross. Markers past the response only count toward
/// `trial_size`. The tick difference is taken in `f64`, so extreme
/// timestamps lose precision instead of overflowing.
pub fn assemble(window: &[RawTrial], tick_scale: f64) -> Option<TrialRecord> {
    let (fixation, stimulus, response) = match window {
        [fixation, stimulus, response, ..] => (fixation, stimulus, response),
        _ => return None,
    };

    if fixation.code != FIXATION_CODE {
        return None;
    }

    Some(TrialRecord {
        code: classify(stimulus.code, response.code),
        response_time_ms: tick_scale * (response.time as f64 - stimulus.time as f64),
        trial_size: window.len(),
    })
}
