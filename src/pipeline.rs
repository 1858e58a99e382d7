//! Pipeline orchestration
//!
//! This module provides the public API for turning VMRK marker files into
//! session summaries: marker reading → segmentation → statistics.

use crate::config::AnalysisConfig;
use crate::error::VmrkError;
use crate::segmenter::{segment_str, Segmentation};
use crate::summary::{summarize, Summary};
use std::fs;
use std::path::Path;

/// Subject identifier for a marker file: its base name up to the first `.`
pub fn session_id(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

/// Summarize VMRK text with default settings (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let summary = summarize_vmrk("s01", &std::fs::read_to_string("s01.vmrk")?)?;
/// ```
pub fn summarize_vmrk(sid: &str, text: &str) -> Result<Summary, VmrkError> {
    VmrkProcessor::default().process_str(sid, text)
}

/// Processor holding a validated configuration for a batch of files.
///
/// No state is carried between files.
#[derive(Debug, Clone, Default)]
pub struct VmrkProcessor {
    config: AnalysisConfig,
}

impl VmrkProcessor {
    pub fn new(config: AnalysisConfig) -> Result<Self, VmrkError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Read and segment VMRK text without computing statistics
    pub fn segment_str(&self, text: &str) -> Result<Segmentation, VmrkError> {
        // Stages 1-2: Read marker rows and segment them into blocks of trials
        segment_str(text, &self.config)
    }

    pub fn process_str(&self, sid: &str, text: &str) -> Result<Summary, VmrkError> {
        let segmentation = self.segment_str(text)?;

        log::debug!(
            "{}: {} blocks, {} trials, {} windows dropped, {} outliers removed",
            sid,
            segmentation.dataset.len(),
            segmentation.dataset.trial_count(),
            segmentation.report.windows_dropped,
            segmentation.report.outliers_removed
        );

        // Stage 3: Compute statistics
        summarize(sid, &segmentation.dataset, &self.config)
    }

    /// Process one marker file; the session id is derived from the file name
    pub fn process_file(&self, path: &Path) -> Result<Summary, VmrkError> {
        let text = fs::read_to_string(path)?;
        let summary = self.process_str(&session_id(path), &text)?;
        log::info!("Summarized {}", path.display());
        Ok(summary)
    }

    /// Process files independently; a failing file does not affect the others
    pub fn process_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Vec<(String, Result<Summary, VmrkError>)> {
        paths
            .iter()
            .map(|p| {
                let path = p.as_ref();
                (path.display().to_string(), self.process_file(path))
            })
            .collect()
    }
}
