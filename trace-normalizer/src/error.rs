//! Errors raised while normalizing a trace

use thiserror::Error;

/// Reasons a single trace line was not forwarded
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("malformed trace line: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("trace line is not a JSON object")]
    NotAnObject,

    #[error("trace line of {len} bytes exceeds the {max} byte limit")]
    LineTooLong { len: usize, max: usize },
}
