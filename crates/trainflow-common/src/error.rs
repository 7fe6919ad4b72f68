//! Error types shared by every Trainflow crate

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, TrainflowError>;

/// Errors raised by the shared value types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrainflowError {
    #[error("Invalid version number: {0}")]
    InvalidVersion(String),

    #[error("Malformed rank key '{key}': {reason}")]
    MalformedRank { key: String, reason: &'static str },

    #[error("Rank lower bound '{lower}' must sort strictly before upper bound '{upper}'")]
    InvalidOrder { lower: String, upper: String },
}

impl TrainflowError {
    pub(crate) fn malformed(key: &str, reason: &'static str) -> Self {
        Self::MalformedRank {
            key: key.to_string(),
            reason,
        }
    }
}
