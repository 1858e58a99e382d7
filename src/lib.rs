//! VMRK Summary - behavioral statistics from flanker-task marker logs
//!
//! Turns one BrainVision marker file (`.vmrk`) recorded during a two-choice
//! flanker task into a fixed set of per-subject summary statistics through a
//! deterministic pipeline: marker reading → practice/experiment segmentation
//! → trial assembly with outlier filtering → aggregation → encoding.
//!
//! ## Modules
//!
//! - **Segmentation**: phase state machine and block/trial assembly
//! - **Summary**: accuracy, response time, congruency and post-error statistics

pub mod block;
pub mod config;
pub mod encoder;
pub mod error;
pub mod marker;
pub mod pipeline;
pub mod segmenter;
pub mod summary;
pub mod trial;
pub mod types;

pub use block::{Block, Dataset, TrialFilter};
pub use config::AnalysisConfig;
pub use encoder::{OutputFormat, SummaryEncoder};
pub use error::VmrkError;
pub use pipeline::{session_id, summarize_vmrk, VmrkProcessor};
pub use segmenter::{segment, segment_str, Segmentation, Segmenter};
pub use summary::{summarize, StatValue, Summary};

/// Crate version embedded in JSON output
pub const VMRK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for JSON output
pub const PRODUCER_NAME: &str = "vmrk-summary";
