//! Flow version lifecycle: create, edit, activate, resolve

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trainflow_common::VersionNumber;
use uuid::Uuid;

use super::content::{apply_edit, DraftEdit, EditOutcome};
use crate::error::{EngineError, EngineResult};
use crate::models::{FlowFields, FlowFieldsPatch, FlowStatus, FlowVersion, FlowVersionSummary};
use crate::repository::{
    ActivationRequest, FlowAssignmentRepository, FlowVersionRepository, RepositoryError,
};

/// Default number of attempts for writes that can lose a race
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 3;

/// Input for [`VersioningService::create_version`]
#[derive(Debug, Clone)]
pub struct NewFlowVersion {
    /// Existing flow to version; `None` starts a new flow at version 1
    pub original_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub fields: FlowFields,
}

/// Outcome of an activation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActivationResult {
    Activated {
        flow_version_id: Uuid,
        version: VersionNumber,
        previous_active_version_id: Option<Uuid>,
        affected_assignments_count: u64,
        warnings: Vec<String>,
    },
    /// Nothing changed; the caller must confirm with `force`
    RequiresConfirmation {
        flow_version_id: Uuid,
        version: VersionNumber,
        previous_active_version_id: Option<Uuid>,
        affected_assignments_count: u64,
        warnings: Vec<String>,
    },
}

impl ActivationResult {
    pub fn is_activated(&self) -> bool {
        matches!(self, ActivationResult::Activated { .. })
    }

    pub fn affected_assignments_count(&self) -> u64 {
        match self {
            ActivationResult::Activated {
                affected_assignments_count,
                ..
            }
            | ActivationResult::RequiresConfirmation {
                affected_assignments_count,
                ..
            } => *affected_assignments_count,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            ActivationResult::Activated { warnings, .. }
            | ActivationResult::RequiresConfirmation { warnings, .. } => warnings,
        }
    }
}

pub struct VersioningService {
    flows: Arc<dyn FlowVersionRepository>,
    assignments: Arc<dyn FlowAssignmentRepository>,
    max_write_attempts: u32,
}

impl VersioningService {
    pub fn new(
        flows: Arc<dyn FlowVersionRepository>,
        assignments: Arc<dyn FlowAssignmentRepository>,
        max_write_attempts: u32,
    ) -> Self {
        Self {
            flows,
            assignments,
            max_write_attempts: max_write_attempts.max(1),
        }
    }

    /// Create the next version of a flow as an inactive draft.
    ///
    /// The draft starts as a deep copy of the active version, if there is one.
    /// Losing the race for a version number retries with a fresh maximum.
    #[tracing::instrument(skip(self, request), fields(original_id = ?request.original_id))]
    pub async fn create_version(
        &self,
        request: NewFlowVersion,
        at: DateTime<Utc>,
    ) -> EngineResult<FlowVersion> {
        let original_id = request.original_id.unwrap_or_else(Uuid::new_v4);

        for attempt in 1..=self.max_write_attempts {
            let current_max = self.flows.get_max_version(original_id).await?;
            if request.original_id.is_some() && current_max.is_none() {
                return Err(EngineError::not_found("Flow", original_id));
            }
            let version = VersionNumber::following(current_max);

            let draft = match self.flows.get_active(original_id).await? {
                Some(active) => {
                    active.derive_draft(version, request.created_by_id, request.fields.clone(), at)
                },
                None => FlowVersion::new_draft(
                    original_id,
                    version,
                    request.created_by_id,
                    request.fields.clone(),
                    at,
                ),
            };

            match self.flows.add(&draft).await {
                Ok(()) => {
                    tracing::info!(
                        flow_version_id = %draft.id,
                        %original_id,
                        version = %draft.version,
                        steps = draft.steps.len(),
                        components = draft.component_count(),
                        "Flow version created"
                    );
                    return Ok(draft);
                },
                Err(RepositoryError::Conflict(reason)) => {
                    tracing::warn!(attempt, %version, %reason, "Version number taken, retrying");
                },
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::ConcurrentModification(format!(
            "could not allocate a version number for flow {original_id} after {} attempts",
            self.max_write_attempts
        )))
    }

    /// Make `flow_version_id` the single active version of its flow.
    ///
    /// When open assignments are still bound to the current active version
    /// and `force` is false, nothing changes and a confirmation result is
    /// returned instead.
    #[tracing::instrument(skip(self))]
    pub async fn activate_version(
        &self,
        flow_version_id: Uuid,
        activated_by_id: Uuid,
        force: bool,
        at: DateTime<Utc>,
    ) -> EngineResult<ActivationResult> {
        let target = self.get_version(flow_version_id).await?;
        if target.is_active {
            return Err(EngineError::AlreadyActive {
                id: flow_version_id,
            });
        }

        let previous = self.flows.get_active(target.original_id).await?;
        let previous_active_version_id = previous.as_ref().map(|p| p.id);
        // Activated by someone else after the target was loaded.
        if previous_active_version_id == Some(flow_version_id) {
            return Err(EngineError::AlreadyActive {
                id: flow_version_id,
            });
        }
        let affected_assignments_count = match &previous {
            Some(p) => self.assignments.count_bound_to(p.id).await?,
            None => 0,
        };

        let mut warnings = Vec::new();
        if affected_assignments_count > 0 {
            if let Some(p) = &previous {
                warnings.push(format!(
                    "{affected_assignments_count} open assignment(s) remain bound to {} ({})",
                    p.version, p.id
                ));
            }
        }

        if affected_assignments_count > 0 && !force {
            tracing::warn!(
                affected_assignments_count,
                "Activation needs confirmation, leaving versions unchanged"
            );
            return Ok(ActivationResult::RequiresConfirmation {
                flow_version_id,
                version: target.version,
                previous_active_version_id,
                affected_assignments_count,
                warnings,
            });
        }

        self.flows
            .activate(&ActivationRequest {
                original_id: target.original_id,
                target_id: flow_version_id,
                expected_active_id: previous_active_version_id,
                activated_by_id,
                activated_at: at,
            })
            .await?;

        tracing::info!(
            original_id = %target.original_id,
            version = %target.version,
            ?previous_active_version_id,
            affected_assignments_count,
            "Flow version activated"
        );

        Ok(ActivationResult::Activated {
            flow_version_id,
            version: target.version,
            previous_active_version_id,
            affected_assignments_count,
            warnings,
        })
    }

    pub async fn get_active_version(&self, original_id: Uuid) -> EngineResult<Option<FlowVersion>> {
        Ok(self.flows.get_active(original_id).await?)
    }

    pub async fn get_version(&self, flow_version_id: Uuid) -> EngineResult<FlowVersion> {
        self.flows
            .get_by_id(flow_version_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Flow version", flow_version_id))
    }

    /// Every version of a flow, oldest first
    pub async fn list_versions(&self, original_id: Uuid) -> EngineResult<Vec<FlowVersionSummary>> {
        let versions = self.flows.list_versions(original_id).await?;
        if versions.is_empty() {
            return Err(EngineError::not_found("Flow", original_id));
        }
        Ok(versions)
    }

    /// Change the descriptive fields of a draft.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_draft(
        &self,
        flow_version_id: Uuid,
        patch: FlowFieldsPatch,
        expected_row_version: Option<i64>,
        at: DateTime<Utc>,
    ) -> EngineResult<FlowVersion> {
        let (flow, ()) = self
            .mutate_draft(flow_version_id, expected_row_version, |flow| {
                flow.apply_patch(patch.clone(), at);
                Ok(())
            })
            .await?;
        tracing::info!(row_version = flow.row_version, "Draft fields updated");
        Ok(flow)
    }

    /// Apply one structural edit to a draft's content tree.
    #[tracing::instrument(skip(self, edit), fields(edit = edit.kind()))]
    pub async fn edit_draft(
        &self,
        flow_version_id: Uuid,
        edit: DraftEdit,
        expected_row_version: Option<i64>,
        at: DateTime<Utc>,
    ) -> EngineResult<(FlowVersion, EditOutcome)> {
        let (flow, outcome) = self
            .mutate_draft(flow_version_id, expected_row_version, |flow| {
                apply_edit(flow, edit.clone(), at)
            })
            .await?;
        tracing::info!(
            node_id = %outcome.node_id,
            order = outcome.order.as_ref().map(|o| o.as_str()),
            "Draft content edited"
        );
        Ok((flow, outcome))
    }

    /// Load, check, mutate and store a draft under optimistic concurrency.
    ///
    /// The mutation is re-run against fresh state when another writer got in
    /// first, unless the caller pinned `expected_row_version`.
    async fn mutate_draft<T, F>(
        &self,
        flow_version_id: Uuid,
        expected_row_version: Option<i64>,
        mut mutate: F,
    ) -> EngineResult<(FlowVersion, T)>
    where
        F: FnMut(&mut FlowVersion) -> EngineResult<T> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut flow = self.get_version(flow_version_id).await?;
            ensure_editable(&flow)?;
            if let Some(expected) = expected_row_version {
                if flow.row_version != expected {
                    return Err(EngineError::ConcurrentModification(format!(
                        "flow version {flow_version_id} is at row version {}, expected {expected}",
                        flow.row_version
                    )));
                }
            }

            let output = mutate(&mut flow)?;
            match self.flows.update(&flow).await.map_err(EngineError::from) {
                Ok(row_version) => {
                    flow.row_version = row_version;
                    return Ok((flow, output));
                },
                Err(err)
                    if err.is_retryable()
                        && expected_row_version.is_none()
                        && attempt < self.max_write_attempts =>
                {
                    tracing::debug!(attempt, error = %err, "Draft changed underneath, reapplying");
                },
                Err(err) => return Err(err),
            }
        }
    }
}

fn ensure_editable(flow: &FlowVersion) -> EngineResult<()> {
    if flow.is_active {
        return Err(EngineError::CannotModifyActiveVersion { id: flow.id });
    }
    if flow.status != FlowStatus::Draft {
        return Err(EngineError::VersionFrozen { id: flow.id });
    }
    Ok(())
}
