//! Summary encoder
//!
//! Serializes session summaries as CSV rows (one row per session, header
//! from the first session) or as JSON records carrying producer metadata.

use crate::error::VmrkError;
use crate::summary::{StatValue, Summary};
use crate::{PRODUCER_NAME, VMRK_VERSION};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Supported output encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Ndjson,
    Json,
    JsonPretty,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// JSON record for one session
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord<'a> {
    pub producer: SummaryProducer,
    pub computed_at_utc: DateTime<Utc>,
    pub summary: &'a Summary,
}

pub struct SummaryEncoder {
    instance_id: String,
}

impl Default for SummaryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn record<'a>(&self, summary: &'a Summary) -> SummaryRecord<'a> {
        SummaryRecord {
            producer: SummaryProducer {
                name: PRODUCER_NAME.to_string(),
                version: VMRK_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now(),
            summary,
        }
    }

    /// Encode a batch of summaries. CSV columns come from the first summary.
    pub fn encode(&self, summaries: &[Summary], format: OutputFormat) -> Result<String, VmrkError> {
        match format {
            OutputFormat::Csv => {
                let Some(first) = summaries.first() else {
                    return Ok(String::new());
                };
                let mut out = csv_header(first);
                for summary in summaries {
                    out.push_str(&csv_row(summary));
                }
                Ok(out)
            }
            OutputFormat::Ndjson => {
                let mut out = String::new();
                for summary in summaries {
                    out.push_str(&serde_json::to_string(&self.record(summary))?);
                    out.push('\n');
                }
                Ok(out)
            }
            OutputFormat::Json => {
                let records: Vec<_> = summaries.iter().map(|s| self.record(s)).collect();
                Ok(serde_json::to_string(&records)?)
            }
            OutputFormat::JsonPretty => {
                let records: Vec<_> = summaries.iter().map(|s| self.record(s)).collect();
                Ok(serde_json::to_string_pretty(&records)?)
            }
        }
    }
}

/// Header line, `sid` first
pub fn csv_header(summary: &Summary) -> String {
    let mut line = summary.keys().join(",");
    line.push('\n');
    line
}

/// One data line in the summary's column order
pub fn csv_row(summary: &Summary) -> String {
    let mut fields = Vec::with_capacity(summary.stats.len() + 1);
    fields.push(csv_field(&summary.sid));
    fields.extend(summary.stats.iter().map(|s| format_value(s.value)));
    let mut line = fields.join(",");
    line.push('\n');
    line
}

/// Counts print as integers, reals always with a fractional part
fn format_value(value: StatValue) -> String {
    match value {
        StatValue::Count(n) => n.to_string(),
        StatValue::Real(x) => format!("{x:?}"),
    }
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}
