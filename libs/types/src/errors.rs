//! Error types for the price feed pipeline
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Top-level pipeline error.
///
/// None of these are allowed to escape as an unhandled fault: decode and
/// buffering errors are contained where they happen and surface as metrics
/// or log lines, connection errors surface as a status event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Transient decode error: {0}")]
    TransientDecode(String),

    #[error("Schema not ready: message queued")]
    SchemaNotReady,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Capacity exceeded: capacity {capacity}, dropped {dropped}")]
    CapacityExceeded { capacity: usize, dropped: usize },

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Reference table error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Stream ended: {reason}")]
    FatalStreamEnd { reason: String },
}

impl PipelineError {
    /// Only a generator signalling completion ends a subscription.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::FatalStreamEnd { .. })
    }
}

/// Update record invariant violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("Field {field} is not finite")]
    NotFinite { field: &'static str },

    #[error("Invalid symbol index: {0}")]
    InvalidIndex(f64),

    #[error("Non-positive last price: {0}")]
    NonPositivePrice(f64),

    #[error("Range violated: high {high}, last {last}, low {low}")]
    RangeViolation { high: f64, last: f64, low: f64 },

    #[error("Invalid volume: {0}")]
    InvalidVolume(f64),
}

/// Reference table errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReferenceError {
    #[error("Reference table is empty")]
    Empty,

    #[error("Empty symbol at row {row}")]
    EmptySymbol { row: usize },

    #[error("Duplicate symbol: {symbol}")]
    DuplicateSymbol { symbol: String },

    #[error("Invalid price for {symbol}: {reason}")]
    InvalidPrice { symbol: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_display() {
        let err = RecordError::NonPositivePrice(-1.5);
        assert_eq!(err.to_string(), "Non-positive last price: -1.5");
    }

    #[test]
    fn test_pipeline_error_from_record_error() {
        let err: PipelineError = RecordError::InvalidVolume(2.5).into();
        assert!(matches!(err, PipelineError::Record(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_only_stream_end_is_fatal() {
        assert!(PipelineError::FatalStreamEnd {
            reason: "generator exhausted".to_string()
        }
        .is_fatal());
        assert!(!PipelineError::SchemaNotReady.is_fatal());
        assert!(!PipelineError::Connection("reset".to_string()).is_fatal());
        assert!(!PipelineError::CapacityExceeded {
            capacity: 100,
            dropped: 1
        }
        .is_fatal());
    }

    #[test]
    fn test_reference_error_duplicate() {
        let err = ReferenceError::DuplicateSymbol {
            symbol: "AAPL".to_string(),
        };
        assert!(err.to_string().contains("AAPL"));
    }
}
