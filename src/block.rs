//! Blocks, outlier filtering and conditioned queries
//!
//! A `Block` holds the trials of one scored block in presentation order.
//! Adjacency matters: post-correct / post-error conditioning looks at the
//! record immediately before each trial, and never across block boundaries.

use crate::types::{Side, TrialRecord};
use serde::Serialize;

/// Predicates for `Block::query`; `None` leaves a dimension unconstrained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialFilter {
    pub side: Option<Side>,
    pub congruent: Option<bool>,
    pub correct: Option<bool>,
    /// Correctness required of the preceding record in the same block
    pub last_correct: Option<bool>,
}

impl TrialFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn congruent(mut self, congruent: bool) -> Self {
        self.congruent = Some(congruent);
        self
    }

    pub fn correct(mut self, correct: bool) -> Self {
        self.correct = Some(correct);
        self
    }

    pub fn last_correct(mut self, last_correct: bool) -> Self {
        self.last_correct = Some(last_correct);
        self
    }

    fn matches(&self, record: &TrialRecord, previous: Option<&TrialRecord>) -> bool {
        let code = &record.code;
        if self.side.is_some_and(|side| code.side != side) {
            return false;
        }
        if self.congruent.is_some_and(|c| code.congruent != c) {
            return false;
        }
        if self.correct.is_some_and(|c| code.correct != c) {
            return false;
        }
        match (self.last_correct, previous) {
            (None, _) => true,
            // The first record of a block has no predecessor
            (Some(_), None) => false,
            (Some(expected), Some(prev)) => prev.code.correct == expected,
        }
    }
}

/// Ordered, append-only trials of one block
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Block {
    records: Vec<TrialRecord>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and immediately re-apply the outlier filter.
    ///
    /// Returns the number of records removed by the filter.
    pub fn push(&mut self, record: TrialRecord, low_ms: f64, high_ms: f64) -> usize {
        self.records.push(record);
        self.filter_outliers(low_ms, high_ms)
    }

    /// Retain only records with `low_ms <= rt <= high_ms`; returns how many were removed
    pub fn filter_outliers(&mut self, low_ms: f64, high_ms: f64) -> usize {
        let before = self.records.len();
        self.records
            .retain(|r| r.response_time_ms >= low_ms && r.response_time_ms <= high_ms);
        before - self.records.len()
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn response_times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.response_time_ms).collect()
    }

    /// Response times of records matching `filter`, in block order
    pub fn query(&self, filter: &TrialFilter) -> Vec<f64> {
        self.records
            .iter()
            .enumerate()
            .filter(|(i, record)| {
                let previous = i.checked_sub(1).map(|j| &self.records[j]);
                filter.matches(record, previous)
            })
            .map(|(_, record)| record.response_time_ms)
            .collect()
    }
}

/// Completed experiment blocks in session order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    blocks: Vec<Block>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn trial_count(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }

    /// Concatenate all blocks into one, preserving block then trial order.
    ///
    /// Only valid for position-independent queries; a sequential filter on
    /// the collapsed view would pair the first trial of a block with the
    /// last trial of the previous one.
    pub fn collapse(&self) -> Block {
        Block {
            records: self
                .blocks
                .iter()
                .flat_map(|b| b.records.iter().copied())
                .collect(),
        }
    }

    /// Run `filter` against each block separately
    pub fn query_per_block(&self, filter: &TrialFilter) -> Vec<Vec<f64>> {
        self.blocks.iter().map(|b| b.query(filter)).collect()
    }
}

impl FromIterator<Block> for Dataset {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::classify;

    fn record(a: i64, b: i64, rt: f64) -> TrialRecord {
        TrialRecord {
            code: classify(a, b),
            response_time_ms: rt,
            trial_size: 3,
        }
    }

    fn block(records: &[TrialRecord]) -> Block {
        let mut block = Block::new();
        for r in records {
            block.push(*r, 150.0, 3000.0);
        }
        block
    }

    #[test]
    fn test_push_filters_immediately() {
        let mut block = Block::new();
        assert_eq!(block.push(record(1, 5, 400.0), 150.0, 3000.0), 0);
        assert_eq!(block.push(record(1, 5, 100.0), 150.0, 3000.0), 1);
        assert_eq!(block.push(record(1, 5, 3500.0), 150.0, 3000.0), 1);
        assert_eq!(block.push(record(1, 5, 3000.0), 150.0, 3000.0), 0);
        assert_eq!(block.response_times(), vec![400.0, 3000.0]);
    }

    #[test]
    fn test_filter_idempotent() {
        let mut block = block(&[record(1, 5, 200.0), record(2, 7, 900.0)]);
        let before = block.clone();
        assert_eq!(block.filter_outliers(150.0, 3000.0), 0);
        assert_eq!(block, before);
    }

    #[test]
    fn test_query_predicates() {
        let block = block(&[
            record(1, 5, 300.0), // left congruent correct
            record(2, 7, 400.0), // left incongruent error
            record(3, 6, 500.0), // right congruent correct
            record(4, 5, 600.0), // right incongruent correct
        ]);

        assert_eq!(block.query(&TrialFilter::new()).len(), 4);
        assert_eq!(
            block.query(&TrialFilter::new().side(Side::Left)),
            vec![300.0, 400.0]
        );
        assert_eq!(
            block.query(&TrialFilter::new().congruent(true).correct(true)),
            vec![300.0, 500.0]
        );
        assert_eq!(block.query(&TrialFilter::new().correct(false)), vec![400.0]);
    }

    #[test]
    fn test_query_post_error() {
        // Error followed by a correct trial
        let block = block(&[record(1, 7, 300.0), record(1, 5, 450.0)]);
        let filter = TrialFilter::new().correct(true).last_correct(false);
        assert_eq!(block.query(&filter), vec![450.0]);
    }

    #[test]
    fn test_query_last_correct_never_includes_first_record() {
        let single = block(&[record(1, 5, 300.0)]);
        assert!(single.query(&TrialFilter::new().last_correct(true)).is_empty());
        assert!(single.query(&TrialFilter::new().last_correct(false)).is_empty());

        let pair = block(&[record(1, 5, 300.0), record(1, 5, 310.0)]);
        assert_eq!(pair.query(&TrialFilter::new().last_correct(true)), vec![310.0]);
    }

    #[test]
    fn test_collapse_preserves_order() {
        let dataset: Dataset = vec![
            block(&[record(1, 5, 300.0), record(1, 7, 310.0)]),
            block(&[record(3, 5, 320.0)]),
        ]
        .into_iter()
        .collect();

        assert_eq!(dataset.trial_count(), 3);
        assert_eq!(dataset.collapse().response_times(), vec![300.0, 310.0, 320.0]);
    }

    #[test]
    fn test_collapse_equivalent_for_positional_free_filters() {
        let dataset: Dataset = vec![
            block(&[record(1, 5, 300.0), record(2, 7, 310.0)]),
            block(&[record(3, 5, 320.0), record(4, 8, 330.0)]),
        ]
        .into_iter()
        .collect();

        let filter = TrialFilter::new().correct(true);
        let per_block: Vec<f64> = dataset.query_per_block(&filter).concat();
        assert_eq!(dataset.collapse().query(&filter), per_block);

        // Sequential filters differ: the collapsed view links block boundaries
        let sequential = TrialFilter::new().last_correct(false);
        let per_block: Vec<f64> = dataset.query_per_block(&sequential).concat();
        assert_eq!(per_block, Vec::<f64>::new());
        assert_eq!(dataset.collapse().query(&sequential), vec![320.0]);
    }
}
