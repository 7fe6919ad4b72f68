//! Persistence seams for flow versions, assignments and snapshots
//!
//! Services depend only on these traits. Two backends ship with the engine:
//!
//! - [`memory`]: `RwLock`-guarded maps, used by tests and the default config
//! - [`postgres`]: sqlx-backed tables created by the bundled migrations
//!
//! Each write that can race another writer is atomic inside the backend.
//! Lost races surface as [`RepositoryError::Conflict`], which services map to
//! a concurrent-modification error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use trainflow_common::{TrainflowError, VersionNumber, VersionedEntityId};
use uuid::Uuid;

use crate::models::{AssignmentStatus, FlowAssignment, FlowSnapshot, FlowVersion, FlowVersionSummary};

pub mod memory;
pub mod postgres;

pub use memory::{
    InMemoryAssignmentRepository, InMemoryFlowVersionRepository, InMemorySnapshotRepository,
};
pub use postgres::{PgAssignmentRepository, PgFlowVersionRepository, PgSnapshotRepository};

/// Result type alias for repository calls
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Flow version '{id}' is already active")]
    AlreadyActive { id: Uuid },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Corrupt(err.to_string())
    }
}

impl From<TrainflowError> for RepositoryError {
    fn from(err: TrainflowError) -> Self {
        RepositoryError::Corrupt(err.to_string())
    }
}

/// Everything needed to switch the active version of one flow atomically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub original_id: Uuid,
    pub target_id: Uuid,
    /// Active version observed when the caller made its decision
    pub expected_active_id: Option<Uuid>,
    pub activated_by_id: Uuid,
    pub activated_at: DateTime<Utc>,
}

#[async_trait]
pub trait FlowVersionRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<FlowVersion>>;

    async fn get_by_version(
        &self,
        version: VersionedEntityId<FlowVersion>,
    ) -> RepositoryResult<Option<FlowVersion>>;

    async fn get_active(&self, original_id: Uuid) -> RepositoryResult<Option<FlowVersion>>;

    /// Every version of a flow, ascending by version number
    async fn list_versions(&self, original_id: Uuid) -> RepositoryResult<Vec<FlowVersionSummary>>;

    async fn get_max_version(&self, original_id: Uuid) -> RepositoryResult<Option<VersionNumber>>;

    /// Insert a new version with its subtree.
    ///
    /// Fails with `Conflict` when `(original_id, version)` is already taken.
    async fn add(&self, flow: &FlowVersion) -> RepositoryResult<()>;

    /// Replace a draft version and its subtree.
    ///
    /// Succeeds only while the stored row is still an inactive draft with the
    /// same `row_version`; returns the new `row_version`.
    async fn update(&self, flow: &FlowVersion) -> RepositoryResult<i64>;

    /// Deactivate every version of the flow and activate the target, as one
    /// unit of work.
    ///
    /// Fails with `AlreadyActive` when the target is already the active
    /// version, with `Conflict` when the currently active version is no longer
    /// `expected_active_id`, and with `NotFound` when the target does not
    /// belong to the flow.
    async fn activate(&self, request: &ActivationRequest) -> RepositoryResult<()>;
}

#[async_trait]
pub trait FlowAssignmentRepository: Send + Sync {
    async fn add(&self, assignment: &FlowAssignment) -> RepositoryResult<()>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<FlowAssignment>>;

    async fn get_by_flow_id(&self, original_flow_id: Uuid) -> RepositoryResult<Vec<FlowAssignment>>;

    /// Open assignments whose snapshot came from `flow_version_id`
    async fn count_bound_to(&self, flow_version_id: Uuid) -> RepositoryResult<u64>;

    /// Compare-and-set status change.
    ///
    /// Fails with `Conflict` when the stored status is no longer `expected`.
    async fn update_status(
        &self,
        assignment: &FlowAssignment,
        expected: AssignmentStatus,
    ) -> RepositoryResult<()>;
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn save(&self, snapshot: &FlowSnapshot) -> RepositoryResult<()>;

    async fn get(&self, id: Uuid) -> RepositoryResult<Option<FlowSnapshot>>;
}
