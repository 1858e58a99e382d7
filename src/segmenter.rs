//! Marker stream segmentation
//!
//! Splits a session's marker stream into practice and experiment phases and
//! the experiment phase into blocks of assembled trials.
//!
//! The session opens in practice. The experiment starts at the first `S255`
//! that follows an `S144` seen after exactly three fixation crosses. From then
//! on, every fixation cross (`S99`) closes the pending trial window and seeds
//! the next one, and every boundary marker (`S144`/`S255`) closes the current
//! block if it has accumulated any trial content.

use crate::block::{Block, Dataset};
use crate::config::AnalysisConfig;
use crate::error::VmrkError;
use crate::marker::{Marker, MarkerKind, MarkerReader};
use crate::trial::assemble;
use crate::types::{RawTrial, BLOCK_END_CODE, BLOCK_START_CODE, FIXATION_CODE};
use serde::Serialize;

/// Number of practice fixation crosses that arm the experiment start
const PRACTICE_FIXATIONS: u32 = 3;

fn is_boundary(code: i64) -> bool {
    code == BLOCK_START_CODE || code == BLOCK_END_CODE
}

/// Tracks the practice-phase markers that lead into the experiment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PracticeGate {
    fixations: u32,
    block_start_seen: bool,
}

impl PracticeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The gate is only armed while exactly three fixations have been seen
    fn armed(&self) -> bool {
        self.fixations == PRACTICE_FIXATIONS
    }

    /// Feed one practice code; returns true when this code opens the experiment
    pub fn observe(&mut self, code: i64) -> bool {
        if code == FIXATION_CODE {
            self.fixations += 1;
        }
        if self.armed() && code == BLOCK_START_CODE {
            self.block_start_seen = true;
        }
        self.armed() && self.block_start_seen && code == BLOCK_END_CODE
    }

    pub fn fixations(&self) -> u32 {
        self.fixations
    }

    pub fn block_start_seen(&self) -> bool {
        self.block_start_seen
    }
}

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Practice(PracticeGate),
    Experiment,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Practice(PracticeGate::new())
    }
}

impl SessionPhase {
    /// Advance the phase with one practice code.
    ///
    /// Returns true when this code started the experiment. The code that
    /// triggers the transition is consumed; once in the experiment the phase
    /// no longer changes.
    pub fn advance(&mut self, code: i64) -> bool {
        match self {
            SessionPhase::Practice(gate) => {
                let started = gate.observe(code);
                if started {
                    *self = SessionPhase::Experiment;
                }
                started
            }
            SessionPhase::Experiment => false,
        }
    }

    pub fn is_experiment(&self) -> bool {
        matches!(self, SessionPhase::Experiment)
    }
}

/// Counters describing what happened during segmentation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentReport {
    /// Lines that are not marker rows (headers, section lines, blanks)
    pub skipped_rows: usize,
    pub stimulus_markers: usize,
    pub comment_markers: usize,
    pub unrecognized_markers: usize,
    pub practice_markers: usize,
    pub trials_assembled: usize,
    pub windows_dropped: usize,
    pub outliers_removed: usize,
}

/// Result of segmenting one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segmentation {
    pub dataset: Dataset,
    /// Block still open when the stream ended; not part of `dataset`
    pub trailing: Block,
    pub report: SegmentReport,
}

/// Incremental marker stream segmenter
pub struct Segmenter<'a> {
    config: &'a AnalysisConfig,
    phase: SessionPhase,
    window: Vec<RawTrial>,
    block: Block,
    /// Non-boundary markers accumulated since the last block boundary
    block_content: usize,
    dataset: Dataset,
    report: SegmentReport,
}

impl<'a> Segmenter<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            phase: SessionPhase::default(),
            window: Vec::new(),
            block: Block::new(),
            block_content: 0,
            dataset: Dataset::new(),
            report: SegmentReport::default(),
        }
    }

    /// Feed one marker. Fails only on an unparsable stimulus row.
    pub fn push_marker(&mut self, marker: &Marker) -> Result<(), VmrkError> {
        match &marker.kind {
            MarkerKind::Comment => {
                self.report.comment_markers += 1;
                Ok(())
            }
            MarkerKind::Other(kind) => {
                self.report.unrecognized_markers += 1;
                log::info!("Skipping {} marker on line {}", kind, marker.line);
                Ok(())
            }
            MarkerKind::Stimulus => {
                self.report.stimulus_markers += 1;
                let code = marker.stimulus_code()?;
                if self.phase.is_experiment() {
                    // Practice rows are not timed
                    self.accumulate(code, marker.timestamp()?);
                } else {
                    self.observe_practice(code);
                }
                Ok(())
            }
        }
    }

    /// Count a source line that is not a marker row
    pub fn skip_row(&mut self, line: usize) {
        self.report.skipped_rows += 1;
        log::info!("Skipping row {}", line);
    }

    /// Feed one already-parsed stimulus code
    pub fn push_code(&mut self, code: i64, time: i64) {
        if self.phase.is_experiment() {
            self.accumulate(code, time);
        } else {
            self.observe_practice(code);
        }
    }

    fn observe_practice(&mut self, code: i64) {
        self.report.practice_markers += 1;
        if self.phase.advance(code) {
            log::debug!("Experiment phase starts");
        }
    }

    fn accumulate(&mut self, code: i64, time: i64) {
        self.window.push(RawTrial::new(code, time));

        if is_boundary(code) {
            if self.block_content > 0 {
                self.close_window();
                self.close_block();
            }
            return;
        }
        self.block_content += 1;

        if code == FIXATION_CODE {
            self.close_window();
        }
    }

    /// Assemble everything but the just-pushed marker, which seeds the next window
    fn close_window(&mut self) {
        let seed = self.window.split_off(self.window.len() - 1);
        let window = std::mem::replace(&mut self.window, seed);
        self.assemble_into_block(&window);
    }

    fn close_block(&mut self) {
        let block = std::mem::take(&mut self.block);
        log::debug!(
            "Block {} closed with {} trials",
            self.dataset.len() + 1,
            block.len()
        );
        self.dataset.push(block);
        self.block_content = 0;
    }

    fn assemble_into_block(&mut self, window: &[RawTrial]) {
        match assemble(window, self.config.tick_scale) {
            Some(record) => {
                self.report.trials_assembled += 1;
                self.report.outliers_removed +=
                    self.block
                        .push(record, self.config.low_ms, self.config.high_ms);
            }
            None => {
                // Windows made only of boundary markers carry no trial
                if window.iter().any(|m| !is_boundary(m.code)) {
                    self.report.windows_dropped += 1;
                    log::debug!("Dropping malformed trial window of {} markers", window.len());
                }
            }
        }
    }

    /// Flush the pending window into the current block and finish
    pub fn finish(mut self) -> Segmentation {
        let window = std::mem::take(&mut self.window);
        self.assemble_into_block(&window);

        if !self.block.is_empty() {
            log::info!(
                "Discarding {} trials after the last block boundary",
                self.block.len()
            );
        }

        Segmentation {
            dataset: self.dataset,
            trailing: self.block,
            report: self.report,
        }
    }
}

/// Segment a full marker sequence
pub fn segment(markers: &[Marker], config: &AnalysisConfig) -> Result<Segmentation, VmrkError> {
    let mut segmenter = Segmenter::new(config);
    for marker in markers {
        segmenter.push_marker(marker)?;
    }
    Ok(segmenter.finish())
}

/// Read and segment VMRK text, counting the lines that are not marker rows
pub fn segment_str(text: &str, config: &AnalysisConfig) -> Result<Segmentation, VmrkError> {
    let mut segmenter = Segmenter::new(config);
    for (i, line) in text.lines().enumerate() {
        match MarkerReader::parse_line(i + 1, line) {
            Some(marker) => segmenter.push_marker(&marker)?,
            None => segmenter.skip_row(i + 1),
        }
    }
    Ok(segmenter.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerReader;
    use crate::types::Side;

    /// Practice prelude: three fixations, block start, block end
    const PRACTICE: &[i64] = &[99, 1, 5, 99, 2, 5, 99, 3, 6, 144, 255];

    fn permissive() -> AnalysisConfig {
        AnalysisConfig::default().with_bounds(f64::MIN, f64::MAX)
    }

    fn run(codes: &[(i64, i64)], config: &AnalysisConfig) -> Segmentation {
        let mut segmenter = Segmenter::new(config);
        let mut t = 0;
        for &code in PRACTICE {
            t += 1000;
            segmenter.push_code(code, t);
        }
        for &(code, time) in codes {
            segmenter.push_code(code, time);
        }
        segmenter.finish()
    }

    #[test]
    fn test_gate_requires_full_sequence() {
        let mut gate = PracticeGate::new();
        assert!(!gate.observe(255));
        assert!(!gate.observe(99));
        assert!(!gate.observe(99));
        // 144 before the third fixation does not count
        assert!(!gate.observe(144));
        assert!(!gate.observe(255));
        assert!(!gate.observe(99));
        assert_eq!(gate.fixations(), 3);
        assert!(!gate.block_start_seen());
        assert!(!gate.observe(144));
        assert!(gate.block_start_seen());
        assert!(gate.observe(255));
    }

    #[test]
    fn test_gate_disarmed_by_fourth_fixation() {
        let mut gate = PracticeGate::new();
        for code in [99, 99, 99, 144, 99] {
            assert!(!gate.observe(code));
        }
        assert!(!gate.observe(255));
    }

    #[test]
    fn test_phase_consumes_transition_marker() {
        let mut phase = SessionPhase::default();
        let (last, prelude) = PRACTICE.split_last().unwrap();
        for &code in prelude {
            assert!(!phase.advance(code));
        }
        assert!(!phase.is_experiment());
        assert!(phase.advance(*last));
        assert!(phase.is_experiment());
        // Experiment codes never restart the transition
        assert!(!phase.advance(255));
        assert!(phase.is_experiment());
    }

    #[test]
    fn test_single_trial_block() {
        let config = permissive();
        let seg = run(&[(99, 20_000), (1, 20_100), (5, 20_110), (144, 21_000)], &config);

        assert_eq!(seg.dataset.len(), 1);
        let block = &seg.dataset.blocks()[0];
        assert_eq!(block.len(), 1);
        let record = block.records()[0];
        assert_eq!(record.code.side, Side::Left);
        assert!(record.code.congruent);
        assert!(record.code.correct);
        assert_eq!(record.response_time_ms, 20.0);
        assert!(seg.trailing.is_empty());
    }

    #[test]
    fn test_short_window_dropped() {
        let config = permissive();
        let seg = run(&[(99, 20_000), (1, 20_100), (144, 21_000)], &config);

        assert_eq!(seg.dataset.len(), 1);
        assert!(seg.dataset.blocks()[0].is_empty());
        assert_eq!(seg.report.windows_dropped, 1);
    }

    #[test]
    fn test_consecutive_trials_and_blocks() {
        let config = AnalysisConfig::default();
        let seg = run(
            &[
                (99, 10_000),
                (2, 10_100),
                (7, 10_400), // error, 600ms
                (99, 11_000),
                (1, 11_100),
                (5, 11_300), // correct, 400ms
                (144, 12_000),
                (255, 12_010), // boundary with no content: ignored
                (99, 13_000),
                (3, 13_100),
                (6, 13_250), // correct, 300ms
                (8, 13_300), // extra response
                (255, 14_000),
            ],
            &config,
        );

        assert_eq!(seg.dataset.len(), 2);
        assert_eq!(seg.dataset.blocks()[0].response_times(), vec![600.0, 400.0]);
        let second = seg.dataset.blocks()[1].records();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].trial_size, 4);
        assert_eq!(seg.report.trials_assembled, 3);
    }

    #[test]
    fn test_outliers_removed_during_segmentation() {
        let config = AnalysisConfig::default();
        let seg = run(
            &[
                (99, 10_000),
                (1, 10_100),
                (5, 10_110), // 20ms
                (99, 11_000),
                (1, 11_100),
                (5, 11_300), // 400ms
                (144, 12_000),
            ],
            &config,
        );
        assert_eq!(seg.dataset.blocks()[0].response_times(), vec![400.0]);
        assert_eq!(seg.report.outliers_removed, 1);
    }

    #[test]
    fn test_trailing_block_not_in_dataset() {
        let config = AnalysisConfig::default();
        let seg = run(&[(99, 10_000), (1, 10_100), (5, 10_300)], &config);
        assert!(seg.dataset.is_empty());
        assert_eq!(seg.trailing.response_times(), vec![400.0]);
    }

    #[test]
    fn test_practice_never_accumulated() {
        let config = permissive();
        let mut segmenter = Segmenter::new(&config);
        for (i, code) in [99, 1, 5, 99, 2, 5, 144].iter().enumerate() {
            segmenter.push_code(*code, i as i64 * 100);
        }
        let seg = segmenter.finish();
        assert!(seg.dataset.is_empty());
        assert!(seg.trailing.is_empty());
        assert_eq!(seg.report.practice_markers, 7);
    }

    #[test]
    fn test_segment_markers() {
        let text = "Mk1=New Segment,,1,1,0\n\
            Mk2=Stimulus,S 99,100,1,0\n\
            Mk3=Stimulus,S 99,200,1,0\n\
            Mk4=Comment,break,250,1,0\n\
            Mk5=Stimulus,S 99,300,1,0\n\
            Mk6=Stimulus,S144,400,1,0\n\
            Mk7=Stimulus,S255,500,1,0\n\
            Mk8=Stimulus,S 99,1000,1,0\n\
            Mk9=Stimulus,S  4,1100,1,0\n\
            Mk10=Stimulus,S  6,1300,1,0\n\
            Mk11=Stimulus,S144,2000,1,0\n";
        let markers = MarkerReader::parse_str(text);
        let seg = segment(&markers, &AnalysisConfig::default()).unwrap();

        assert_eq!(seg.report.unrecognized_markers, 1);
        assert_eq!(seg.report.comment_markers, 1);
        assert_eq!(seg.dataset.len(), 1);
        let record = seg.dataset.blocks()[0].records()[0];
        assert_eq!(record.code.side, Side::Right);
        assert!(!record.code.congruent);
        assert_eq!(record.response_time_ms, 400.0);
    }

    #[test]
    fn test_segment_str_counts_skipped_rows() {
        let text = "Brain Vision Data Exchange Marker File, Version 1.0\n\
            \n\
            [Marker Infos]\n\
            Mk1=New Segment,,1,1,0\n\
            Mk2=Stimulus,S 99,100,1,0\n\
            ; trailing note\n";
        let seg = segment_str(text, &AnalysisConfig::default()).unwrap();
        assert_eq!(seg.report.skipped_rows, 4);
        assert_eq!(seg.report.unrecognized_markers, 1);
        assert_eq!(seg.report.stimulus_markers, 1);
    }

    #[test]
    fn test_extreme_timestamps_do_not_panic() {
        let text = "Mk2=Stimulus,S 99,1,1,0\n\
            Mk3=Stimulus,S 99,2,1,0\n\
            Mk4=Stimulus,S 99,3,1,0\n\
            Mk5=Stimulus,S144,4,1,0\n\
            Mk6=Stimulus,S255,5,1,0\n\
            Mk7=Stimulus,S 99,0,1,0\n\
            Mk8=Stimulus,S  1,-9223372036854775808,1,0\n\
            Mk9=Stimulus,S  5,9223372036854775807,1,0\n";
        let seg = segment_str(text, &AnalysisConfig::default()).unwrap();
        // The window is assembled and then dropped as an outlier
        assert_eq!(seg.report.trials_assembled, 1);
        assert!(seg.trailing.is_empty());
    }

    #[test]
    fn test_practice_timestamp_not_required() {
        let text = "Mk2=Stimulus,S 99,,1,0\n\
            Mk3=Stimulus,S 99,n/a,1,0\n";
        let markers = MarkerReader::parse_str(text);
        let seg = segment(&markers, &AnalysisConfig::default()).unwrap();
        assert_eq!(seg.report.practice_markers, 2);

        let text = "Mk2=Stimulus,S 99,1,1,0\n\
            Mk3=Stimulus,S 99,2,1,0\n\
            Mk4=Stimulus,S 99,3,1,0\n\
            Mk5=Stimulus,S144,4,1,0\n\
            Mk6=Stimulus,S255,5,1,0\n\
            Mk7=Stimulus,S 99,,1,0\n";
        let markers = MarkerReader::parse_str(text);
        assert!(matches!(
            segment(&markers, &AnalysisConfig::default()),
            Err(VmrkError::InvalidTimestamp { line: 6, .. })
        ));
    }

    #[test]
    fn test_unparsable_code_is_fatal() {
        let markers = MarkerReader::parse_str("Mk2=Stimulus,S 9x,100,1,0\n");
        let result = segment(&markers, &AnalysisConfig::default());
        assert!(matches!(
            result,
            Err(VmrkError::InvalidStimulusCode { line: 1, .. })
        ));
    }
}
