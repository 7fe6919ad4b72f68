//! Domain services and the shared [`Engine`] handle
//!
//! - **versioning**: create, edit, activate and resolve flow versions
//! - **content**: structural draft edits positioned by rank key
//! - **snapshot**: freeze the active version for an assignment
//! - **assignment**: bind users to snapshots and resolve their content

pub mod assignment;
pub mod content;
pub mod snapshot;
pub mod versioning;

use std::sync::Arc;

use crate::config::VersioningConfig;
use crate::repository::{
    FlowAssignmentRepository, FlowVersionRepository, InMemoryAssignmentRepository,
    InMemoryFlowVersionRepository, InMemorySnapshotRepository, PgAssignmentRepository,
    PgFlowVersionRepository, PgSnapshotRepository, SnapshotRepository,
};

pub use assignment::{AssignmentService, NewAssignment};
pub use content::{apply_edit, ComponentInput, DraftEdit, EditOutcome, QuizOptionInput};
pub use snapshot::{CapturedSnapshot, CompletionSchedule, SnapshotService, SnapshotStrategy};
pub use versioning::{ActivationResult, NewFlowVersion, VersioningService};

/// Cloneable handle to every service, shared by command and query handlers
#[derive(Clone)]
pub struct Engine {
    pub versioning: Arc<VersioningService>,
    pub snapshots: Arc<SnapshotService>,
    pub assignments: Arc<AssignmentService>,
}

impl Engine {
    pub fn from_repositories(
        flows: Arc<dyn FlowVersionRepository>,
        assignments: Arc<dyn FlowAssignmentRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        config: &VersioningConfig,
    ) -> Self {
        let snapshot_service = Arc::new(SnapshotService::new(
            flows.clone(),
            snapshots,
            config.snapshot_strategy,
            CompletionSchedule {
                days_per_step: config.days_per_step,
                min_days: config.min_completion_days,
            },
        ));
        Self {
            versioning: Arc::new(VersioningService::new(
                flows,
                assignments.clone(),
                config.max_write_attempts,
            )),
            assignments: Arc::new(AssignmentService::new(assignments, snapshot_service.clone())),
            snapshots: snapshot_service,
        }
    }

    /// Engine over fresh in-memory repositories
    pub fn in_memory(config: &VersioningConfig) -> Self {
        Self::from_repositories(
            Arc::new(InMemoryFlowVersionRepository::new()),
            Arc::new(InMemoryAssignmentRepository::new()),
            Arc::new(InMemorySnapshotRepository::new()),
            config,
        )
    }

    /// Engine over PostgreSQL tables created by the bundled migrations
    pub fn postgres(pool: sqlx::PgPool, config: &VersioningConfig) -> Self {
        Self::from_repositories(
            Arc::new(PgFlowVersionRepository::new(pool.clone())),
            Arc::new(PgAssignmentRepository::new(pool.clone())),
            Arc::new(PgSnapshotRepository::new(pool)),
            config,
        )
    }
}
