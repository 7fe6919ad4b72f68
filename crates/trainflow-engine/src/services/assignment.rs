//! Binding users to frozen flow content

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::snapshot::SnapshotService;
use crate::error::{EngineError, EngineResult};
use crate::models::{AssignmentStatus, FlowAssignment, FlowVersion};
use crate::repository::FlowAssignmentRepository;

/// Input for [`AssignmentService::assign`]
#[derive(Debug, Clone, Copy)]
pub struct NewAssignment {
    pub user_id: Uuid,
    pub original_flow_id: Uuid,
    pub assigned_by_id: Uuid,
}

pub struct AssignmentService {
    assignments: Arc<dyn FlowAssignmentRepository>,
    snapshots: Arc<SnapshotService>,
}

impl AssignmentService {
    pub fn new(
        assignments: Arc<dyn FlowAssignmentRepository>,
        snapshots: Arc<SnapshotService>,
    ) -> Self {
        Self {
            assignments,
            snapshots,
        }
    }

    /// Assign the currently active version of a flow to a user.
    ///
    /// The snapshot is taken exactly once and stored on the assignment; every
    /// later read goes through it.
    #[tracing::instrument(skip(self))]
    pub async fn assign(
        &self,
        request: NewAssignment,
        at: DateTime<Utc>,
    ) -> EngineResult<FlowAssignment> {
        let captured = self.snapshots.capture(request.original_flow_id, at).await?;
        let due_at = self.snapshots.estimate_completion_date(&captured.content, at);

        let assignment = FlowAssignment {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            original_flow_id: request.original_flow_id,
            snapshot: captured.reference,
            status: AssignmentStatus::Assigned,
            assigned_by_id: request.assigned_by_id,
            assigned_at: at,
            due_at,
            started_at: None,
            completed_at: None,
            updated_at: at,
        };
        self.assignments.add(&assignment).await?;

        tracing::info!(
            assignment_id = %assignment.id,
            flow_version_id = %assignment.snapshot.flow_version_id(),
            %due_at,
            "Flow assigned"
        );
        Ok(assignment)
    }

    pub async fn get(&self, assignment_id: Uuid) -> EngineResult<FlowAssignment> {
        self.assignments
            .get_by_id(assignment_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Assignment", assignment_id))
    }

    /// Content the assignment is bound to, through its stored snapshot
    pub async fn resolve_content(&self, assignment_id: Uuid) -> EngineResult<FlowVersion> {
        let assignment = self.get(assignment_id).await?;
        self.snapshots.resolve(&assignment.snapshot).await
    }

    pub async fn count_bound_to(&self, flow_version_id: Uuid) -> EngineResult<u64> {
        Ok(self.assignments.count_bound_to(flow_version_id).await?)
    }

    pub async fn list_for_flow(&self, original_flow_id: Uuid) -> EngineResult<Vec<FlowAssignment>> {
        Ok(self.assignments.get_by_flow_id(original_flow_id).await?)
    }

    /// Move an assignment along its lifecycle.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        assignment_id: Uuid,
        status: AssignmentStatus,
        at: DateTime<Utc>,
    ) -> EngineResult<FlowAssignment> {
        let mut assignment = self.get(assignment_id).await?;
        let current = assignment.status;
        if !current.can_transition_to(status) {
            return Err(EngineError::InvalidTransition {
                from: current.to_string(),
                to: status.to_string(),
            });
        }
        assignment.apply_status(status, at);
        self.assignments.update_status(&assignment, current).await?;

        tracing::info!(from = %current, to = %status, "Assignment status changed");
        Ok(assignment)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::FlowFields;
    use crate::repository::{
        ActivationRequest, FlowVersionRepository, InMemoryAssignmentRepository,
        InMemoryFlowVersionRepository, InMemorySnapshotRepository,
    };
    use crate::services::snapshot::{CompletionSchedule, SnapshotStrategy};
    use trainflow_common::VersionNumber;

    async fn setup() -> (AssignmentService, Uuid) {
        let flows = Arc::new(InMemoryFlowVersionRepository::new());
        let flow = FlowVersion::new_draft(
            Uuid::new_v4(),
            VersionNumber::INITIAL,
            Uuid::new_v4(),
            FlowFields {
                title: "Compliance".into(),
                description: None,
                tags: Vec::new(),
                priority: Default::default(),
                is_required: true,
            },
            Utc::now(),
        );
        flows.add(&flow).await.unwrap();
        flows
            .activate(&ActivationRequest {
                original_id: flow.original_id,
                target_id: flow.id,
                expected_active_id: None,
                activated_by_id: Uuid::new_v4(),
                activated_at: Utc::now(),
            })
            .await
            .unwrap();

        let snapshots = Arc::new(SnapshotService::new(
            flows,
            Arc::new(InMemorySnapshotRepository::new()),
            SnapshotStrategy::Reference,
            CompletionSchedule::default(),
        ));
        let service = AssignmentService::new(Arc::new(InMemoryAssignmentRepository::new()), snapshots);
        (service, flow.original_id)
    }

    fn request(original_flow_id: Uuid) -> NewAssignment {
        NewAssignment {
            user_id: Uuid::new_v4(),
            original_flow_id,
            assigned_by_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_assign_binds_and_counts() {
        let (service, original_id) = setup().await;
        let assignment = service.assign(request(original_id), Utc::now()).await.unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Assigned);
        assert!(assignment.due_at > assignment.assigned_at);

        let bound_to = assignment.snapshot.flow_version_id();
        assert_eq!(service.count_bound_to(bound_to).await.unwrap(), 1);
        assert_eq!(service.list_for_flow(original_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_assignments_stop_counting() {
        let (service, original_id) = setup().await;
        let assignment = service.assign(request(original_id), Utc::now()).await.unwrap();
        let bound_to = assignment.snapshot.flow_version_id();

        let started = service
            .update_status(assignment.id, AssignmentStatus::InProgress, Utc::now())
            .await
            .unwrap();
        assert!(started.started_at.is_some());
        assert_eq!(service.count_bound_to(bound_to).await.unwrap(), 1);

        let done = service
            .update_status(assignment.id, AssignmentStatus::Completed, Utc::now())
            .await
            .unwrap();
        assert!(done.completed_at.is_some());
        assert_eq!(service.count_bound_to(bound_to).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_transition_is_rejected() {
        let (service, original_id) = setup().await;
        let assignment = service.assign(request(original_id), Utc::now()).await.unwrap();
        let err = service
            .update_status(assignment.id, AssignmentStatus::Completed, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_assign_without_active_version_fails() {
        let (service, _) = setup().await;
        let err = service.assign(request(Uuid::new_v4()), Utc::now()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
