//! Error types for feeplan-core
//!
//! Lookup and validation failures are hard errors built with thiserror.
//! Record-level problems met while summarising a batch are collected in a
//! [`SummaryReport`] instead, so one bad record never sinks the batch.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for fee and allocation operations
#[derive(Error, Debug)]
pub enum FeeError {
    // ===================
    // Lookup / Validation
    // ===================
    #[error("Unknown service code: {code}")]
    UnknownCode { code: String },

    #[error("Invalid unit count {requested} for {code}: must be between 1 and {max}")]
    InvalidUnits { code: String, requested: u32, max: u32 },

    #[error("Invalid session: {message}")]
    InvalidSession { message: String },

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl FeeError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unknown_code(code: impl Into<String>) -> Self {
        Self::UnknownCode { code: code.into() }
    }
}

pub type FeeResult<T> = Result<T, FeeError>;

/// One record skipped while reading a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    /// Where the record came from, e.g. "record 3"
    pub source: String,
    pub message: String,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl RecordError {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add an actionable suggestion to this error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Report of records skipped while summarising a batch
#[derive(Debug, Default)]
pub struct SummaryReport {
    pub errors: Vec<RecordError>,
    pub records_scanned: usize,
    pub records_skipped: usize,
}

impl SummaryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skipped record
    pub fn skip(&mut self, error: RecordError) {
        self.records_skipped += 1;
        self.errors.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FeeError::unknown_code("99.99Z");
        assert_eq!(err.to_string(), "Unknown service code: 99.99Z");

        let err = FeeError::InvalidUnits {
            code: "03.08I".to_string(),
            requested: 7,
            max: 6,
        };
        assert_eq!(
            err.to_string(),
            "Invalid unit count 7 for 03.08I: must be between 1 and 6"
        );
    }

    #[test]
    fn test_summary_report_skip() {
        let mut report = SummaryReport::new();
        report.records_scanned = 3;
        report.skip(RecordError::new("record 2", "missing fee").with_suggestion("Add a fee"));

        assert_eq!(report.records_skipped, 1);
        assert_eq!(report.errors[0].source, "record 2");
        assert_eq!(report.errors[0].suggestion.as_deref(), Some("Add a fee"));
    }
}
