//! Engine-level error types

use thiserror::Error;
use trainflow_common::TrainflowError;
use uuid::Uuid;

use crate::repository::RepositoryError;

/// Result type alias for engine services
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the versioning, snapshot and assignment services
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Flow version '{id}' is already active")]
    AlreadyActive { id: Uuid },

    #[error("Flow version '{id}' is active; create a new version to change it")]
    CannotModifyActiveVersion { id: Uuid },

    #[error("Flow version '{id}' has been published and is frozen; create a new version to change it")]
    VersionFrozen { id: Uuid },

    #[error("Invalid order: {0}")]
    InvalidOrder(TrainflowError),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Assignment cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Whether retrying the same operation against fresh state may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ConcurrentModification(_))
    }
}

impl From<TrainflowError> for EngineError {
    fn from(err: TrainflowError) -> Self {
        match err {
            TrainflowError::InvalidVersion(msg) => EngineError::Validation(msg),
            other => EngineError::InvalidOrder(other),
        }
    }
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => EngineError::ConcurrentModification(msg),
            RepositoryError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            RepositoryError::AlreadyActive { id } => EngineError::AlreadyActive { id },
            other => EngineError::Repository(other),
        }
    }
}
