// src/error.rs
//! Error taxonomy for the aggregation pipeline.
//!
//! `SourceError` never leaves the invoker except as data inside an
//! `InvocationResult`; `AggregatorError` is what a request handler may see.

/// Failure of a single upstream call. Recovered locally by the invoker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("malformed response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Body(e.to_string())
        } else if let Some(status) = e.status() {
            SourceError::Status {
                status: status.as_u16(),
            }
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

/// Errors that abort a whole `/combined-jobs` request.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// Empty credential pool, unknown or duplicate source names.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Building or serializing the spreadsheet failed.
    #[error("formatting error: {0}")]
    Formatting(String),
}

impl From<rust_xlsxwriter::XlsxError> for AggregatorError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        AggregatorError::Formatting(e.to_string())
    }
}
