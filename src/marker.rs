//! VMRK marker reader
//!
//! BrainVision marker files are comma separated. Marker rows look like
//!
//! ```text
//! Mk12=Stimulus,S 99,48213,1,0
//! ```
//!
//! The first field carries the marker number and kind, the second the
//! stimulus token and the third the sample position. Everything else in
//! the file (section headers, comments, blank lines) is not a marker row.

use crate::error::VmrkError;

/// Kind tag of a marker row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    Comment,
    Stimulus,
    /// Any kind this crate does not interpret, e.g. `New Segment`
    Other(String),
}

impl MarkerKind {
    fn parse(kind: &str) -> Self {
        match kind.trim().to_lowercase().as_str() {
            "comment" => MarkerKind::Comment,
            "stimulus" => MarkerKind::Stimulus,
            _ => MarkerKind::Other(kind.trim().to_string()),
        }
    }
}

/// One marker row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// 1-based line number in the source file
    pub line: usize,
    pub kind: MarkerKind,
    /// Raw comma-separated fields, including the `Mk<N>=<Kind>` field
    pub fields: Vec<String>,
}

impl Marker {
    /// The stimulus token, e.g. `S 99`
    pub fn payload(&self) -> &str {
        self.fields.get(1).map(String::as_str).unwrap_or("")
    }

    /// Parse the integer code out of the stimulus token.
    ///
    /// Spaces are removed and the leading letter is dropped, so `S 99`,
    /// `S99` and `R  5` give 99, 99 and 5.
    pub fn stimulus_code(&self) -> Result<i64, VmrkError> {
        let compact: String = self.payload().chars().filter(|c| *c != ' ').collect();
        let mut chars = compact.chars();
        chars.next();
        chars
            .as_str()
            .parse::<i64>()
            .map_err(|_| VmrkError::InvalidStimulusCode {
                line: self.line,
                payload: self.payload().to_string(),
            })
    }

    /// Parse the timestamp (sample position) field
    pub fn timestamp(&self) -> Result<i64, VmrkError> {
        let field = self.fields.get(2).map(String::as_str).unwrap_or("");
        field
            .trim()
            .parse::<i64>()
            .map_err(|_| VmrkError::InvalidTimestamp {
                line: self.line,
                field: field.to_string(),
            })
    }
}

/// Reader for VMRK text
pub struct MarkerReader;

impl MarkerReader {
    /// Parse one line. Returns `None` for lines that are not marker rows.
    pub fn parse_line(line_number: usize, line: &str) -> Option<Marker> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<String> = line.split(',').map(str::to_string).collect();

        let head = fields.first()?;
        if !head.starts_with("Mk") {
            return None;
        }
        let (_, kind) = head.split_once('=')?;

        Some(Marker {
            line: line_number,
            kind: MarkerKind::parse(kind),
            fields,
        })
    }

    /// Parse a whole file, skipping (and logging) rows that are not markers
    pub fn parse_str(text: &str) -> Vec<Marker> {
        text.lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let marker = Self::parse_line(i + 1, line);
                if marker.is_none() {
                    log::info!("Skipping row {}: {:?}", i + 1, line);
                }
                marker
            })
            .collect()
    }
}
