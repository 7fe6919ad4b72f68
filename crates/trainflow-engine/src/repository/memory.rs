//! In-memory repositories
//!
//! Every method takes the map lock for its whole duration, so each call is
//! atomic with respect to every other call on the same repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use trainflow_common::{VersionNumber, VersionedEntityId};
use uuid::Uuid;

use super::{
    ActivationRequest, FlowAssignmentRepository, FlowVersionRepository, RepositoryError,
    RepositoryResult, SnapshotRepository,
};
use crate::models::{
    AssignmentStatus, FlowAssignment, FlowSnapshot, FlowStatus, FlowVersion, FlowVersionSummary,
};

#[derive(Default)]
pub struct InMemoryFlowVersionRepository {
    versions: RwLock<HashMap<Uuid, FlowVersion>>,
}

impl InMemoryFlowVersionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.versions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.versions.read().await.is_empty()
    }
}

#[async_trait]
impl FlowVersionRepository for InMemoryFlowVersionRepository {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<FlowVersion>> {
        Ok(self.versions.read().await.get(&id).cloned())
    }

    async fn get_by_version(
        &self,
        version: VersionedEntityId<FlowVersion>,
    ) -> RepositoryResult<Option<FlowVersion>> {
        let versions = self.versions.read().await;
        Ok(versions
            .values()
            .find(|f| f.versioned_id() == version)
            .cloned())
    }

    async fn get_active(&self, original_id: Uuid) -> RepositoryResult<Option<FlowVersion>> {
        let versions = self.versions.read().await;
        Ok(versions
            .values()
            .find(|f| f.original_id == original_id && f.is_active)
            .cloned())
    }

    async fn list_versions(&self, original_id: Uuid) -> RepositoryResult<Vec<FlowVersionSummary>> {
        let versions = self.versions.read().await;
        let mut summaries: Vec<FlowVersionSummary> = versions
            .values()
            .filter(|f| f.original_id == original_id)
            .map(FlowVersion::summary)
            .collect();
        summaries.sort_by_key(|s| s.version);
        Ok(summaries)
    }

    async fn get_max_version(&self, original_id: Uuid) -> RepositoryResult<Option<VersionNumber>> {
        let versions = self.versions.read().await;
        Ok(versions
            .values()
            .filter(|f| f.original_id == original_id)
            .map(|f| f.version)
            .max())
    }

    async fn add(&self, flow: &FlowVersion) -> RepositoryResult<()> {
        let mut versions = self.versions.write().await;
        if versions.contains_key(&flow.id) {
            return Err(RepositoryError::Conflict(format!(
                "flow version id {} already exists",
                flow.id
            )));
        }
        if versions
            .values()
            .any(|f| f.original_id == flow.original_id && f.version == flow.version)
        {
            return Err(RepositoryError::Conflict(format!(
                "{} already exists",
                flow.versioned_id()
            )));
        }
        let mut stored = flow.clone();
        stored.normalize_order();
        versions.insert(stored.id, stored);
        Ok(())
    }

    async fn update(&self, flow: &FlowVersion) -> RepositoryResult<i64> {
        let mut versions = self.versions.write().await;
        let stored = versions
            .get_mut(&flow.id)
            .ok_or(RepositoryError::NotFound {
                entity: "Flow version",
                id: flow.id,
            })?;
        if stored.is_active || stored.status != FlowStatus::Draft {
            return Err(RepositoryError::Conflict(format!(
                "flow version {} is no longer a draft",
                flow.id
            )));
        }
        if stored.row_version != flow.row_version {
            return Err(RepositoryError::Conflict(format!(
                "flow version {} was modified (row version {} != {})",
                flow.id, stored.row_version, flow.row_version
            )));
        }
        let mut next = flow.clone();
        next.row_version = stored.row_version + 1;
        next.is_active = stored.is_active;
        next.status = stored.status;
        next.normalize_order();
        let row_version = next.row_version;
        *stored = next;
        Ok(row_version)
    }

    async fn activate(&self, request: &ActivationRequest) -> RepositoryResult<()> {
        let mut versions = self.versions.write().await;

        let current_active = versions
            .values()
            .find(|f| f.original_id == request.original_id && f.is_active)
            .map(|f| f.id);
        if current_active == Some(request.target_id) {
            return Err(RepositoryError::AlreadyActive {
                id: request.target_id,
            });
        }
        if current_active != request.expected_active_id {
            return Err(RepositoryError::Conflict(format!(
                "active version of flow {} changed concurrently",
                request.original_id
            )));
        }
        match versions.get(&request.target_id) {
            Some(target) if target.original_id == request.original_id => {},
            _ => {
                return Err(RepositoryError::NotFound {
                    entity: "Flow version",
                    id: request.target_id,
                })
            },
        }

        for flow in versions
            .values_mut()
            .filter(|f| f.original_id == request.original_id)
        {
            if flow.id == request.target_id {
                flow.is_active = true;
                flow.status = FlowStatus::Published;
                flow.activated_at = Some(request.activated_at);
                flow.activated_by_id = Some(request.activated_by_id);
                flow.updated_at = request.activated_at;
                flow.row_version += 1;
            } else if flow.is_active {
                flow.is_active = false;
                flow.status = FlowStatus::Archived;
                flow.updated_at = request.activated_at;
                flow.row_version += 1;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAssignmentRepository {
    assignments: RwLock<HashMap<Uuid, FlowAssignment>>,
}

impl InMemoryAssignmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowAssignmentRepository for InMemoryAssignmentRepository {
    async fn add(&self, assignment: &FlowAssignment) -> RepositoryResult<()> {
        let mut assignments = self.assignments.write().await;
        if assignments.contains_key(&assignment.id) {
            return Err(RepositoryError::Conflict(format!(
                "assignment {} already exists",
                assignment.id
            )));
        }
        assignments.insert(assignment.id, assignment.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<FlowAssignment>> {
        Ok(self.assignments.read().await.get(&id).cloned())
    }

    async fn get_by_flow_id(&self, original_flow_id: Uuid) -> RepositoryResult<Vec<FlowAssignment>> {
        let assignments = self.assignments.read().await;
        let mut found: Vec<FlowAssignment> = assignments
            .values()
            .filter(|a| a.original_flow_id == original_flow_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.assigned_at, a.id));
        Ok(found)
    }

    async fn count_bound_to(&self, flow_version_id: Uuid) -> RepositoryResult<u64> {
        let assignments = self.assignments.read().await;
        let count = assignments
            .values()
            .filter(|a| a.status.is_open() && a.snapshot.flow_version_id() == flow_version_id)
            .count();
        Ok(count as u64)
    }

    async fn update_status(
        &self,
        assignment: &FlowAssignment,
        expected: AssignmentStatus,
    ) -> RepositoryResult<()> {
        let mut assignments = self.assignments.write().await;
        let stored = assignments
            .get_mut(&assignment.id)
            .ok_or(RepositoryError::NotFound {
                entity: "Assignment",
                id: assignment.id,
            })?;
        if stored.status != expected {
            return Err(RepositoryError::Conflict(format!(
                "assignment {} is now {}",
                assignment.id, stored.status
            )));
        }
        stored.status = assignment.status;
        stored.started_at = assignment.started_at;
        stored.completed_at = assignment.completed_at;
        stored.updated_at = assignment.updated_at;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySnapshotRepository {
    snapshots: RwLock<HashMap<Uuid, FlowSnapshot>>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stored_count(&self) -> usize {
        self.snapshots.read().await.len()
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn save(&self, snapshot: &FlowSnapshot) -> RepositoryResult<()> {
        let mut snapshots = self.snapshots.write().await;
        if snapshots.contains_key(&snapshot.id) {
            return Err(RepositoryError::Conflict(format!(
                "snapshot {} already exists",
                snapshot.id
            )));
        }
        snapshots.insert(snapshot.id, snapshot.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> RepositoryResult<Option<FlowSnapshot>> {
        Ok(self.snapshots.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::FlowFields;
    use chrono::Utc;

    fn draft(original_id: Uuid, version: u32) -> FlowVersion {
        FlowVersion::new_draft(
            original_id,
            VersionNumber::new(version).unwrap(),
            Uuid::new_v4(),
            FlowFields {
                title: format!("Flow v{version}"),
                description: None,
                tags: Vec::new(),
                priority: Default::default(),
                is_required: false,
            },
            Utc::now(),
        )
    }

    fn activation(flow: &FlowVersion, expected: Option<Uuid>) -> ActivationRequest {
        ActivationRequest {
            original_id: flow.original_id,
            target_id: flow.id,
            expected_active_id: expected,
            activated_by_id: Uuid::new_v4(),
            activated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_version_number() {
        let repo = InMemoryFlowVersionRepository::new();
        let original = Uuid::new_v4();
        repo.add(&draft(original, 1)).await.unwrap();

        let err = repo.add(&draft(original, 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.len().await, 1);
        assert_eq!(repo.get_max_version(original).await.unwrap().map(|v| v.get()), Some(1));
    }

    #[tokio::test]
    async fn test_update_bumps_row_version_and_rejects_stale_writes() {
        let repo = InMemoryFlowVersionRepository::new();
        let mut flow = draft(Uuid::new_v4(), 1);
        repo.add(&flow).await.unwrap();

        let stale = flow.clone();
        flow.title = "Edited".into();
        flow.row_version = repo.update(&flow).await.unwrap();
        assert_eq!(flow.row_version, 1);

        let err = repo.update(&stale).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.get_by_id(flow.id).await.unwrap().unwrap().title, "Edited");
    }

    #[tokio::test]
    async fn test_activate_swaps_active_version() {
        let repo = InMemoryFlowVersionRepository::new();
        let original = Uuid::new_v4();
        let v1 = draft(original, 1);
        let v2 = draft(original, 2);
        repo.add(&v1).await.unwrap();
        repo.add(&v2).await.unwrap();

        repo.activate(&activation(&v1, None)).await.unwrap();
        repo.activate(&activation(&v2, Some(v1.id))).await.unwrap();

        let stored_v1 = repo.get_by_id(v1.id).await.unwrap().unwrap();
        let stored_v2 = repo.get_by_id(v2.id).await.unwrap().unwrap();
        assert!(!stored_v1.is_active);
        assert_eq!(stored_v1.status, FlowStatus::Archived);
        assert!(stored_v2.is_active);
        assert_eq!(stored_v2.status, FlowStatus::Published);
        assert_eq!(repo.get_active(original).await.unwrap().unwrap().id, v2.id);
    }

    #[tokio::test]
    async fn test_activate_with_stale_expectation_conflicts() {
        let repo = InMemoryFlowVersionRepository::new();
        let original = Uuid::new_v4();
        let v1 = draft(original, 1);
        let v2 = draft(original, 2);
        repo.add(&v1).await.unwrap();
        repo.add(&v2).await.unwrap();
        repo.activate(&activation(&v1, None)).await.unwrap();

        let err = repo.activate(&activation(&v2, None)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.get_active(original).await.unwrap().unwrap().id, v1.id);
    }

    #[tokio::test]
    async fn test_activate_rejects_already_active_target() {
        let repo = InMemoryFlowVersionRepository::new();
        let flow = draft(Uuid::new_v4(), 1);
        repo.add(&flow).await.unwrap();
        repo.activate(&activation(&flow, None)).await.unwrap();
        let row_version = repo.get_by_id(flow.id).await.unwrap().unwrap().row_version;

        let err = repo
            .activate(&activation(&flow, Some(flow.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyActive { id } if id == flow.id));

        let stored = repo.get_by_id(flow.id).await.unwrap().unwrap();
        assert!(stored.is_active);
        assert_eq!(stored.row_version, row_version);
    }

    #[tokio::test]
    async fn test_update_refuses_activated_version() {
        let repo = InMemoryFlowVersionRepository::new();
        let flow = draft(Uuid::new_v4(), 1);
        repo.add(&flow).await.unwrap();
        repo.activate(&activation(&flow, None)).await.unwrap();

        let err = repo.update(&flow).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_snapshot_ids_are_unique() {
        let repo = InMemorySnapshotRepository::new();
        let flow = draft(Uuid::new_v4(), 1);
        let snapshot = FlowSnapshot {
            id: Uuid::new_v4(),
            flow_version_id: flow.id,
            content: flow,
            taken_at: Utc::now(),
        };
        repo.save(&snapshot).await.unwrap();
        assert!(repo.save(&snapshot).await.is_err());
        assert_eq!(repo.stored_count().await, 1);
        assert_eq!(repo.get(snapshot.id).await.unwrap().unwrap(), snapshot);
    }
}
