//! Assign a flow to a user
//!
//! The assignment is bound to a snapshot of whatever version is active at
//! this moment. Later activations never change what the user sees.

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use trainflow_common::VersionNumber;
use uuid::Uuid;

use crate::error::EngineError;
use crate::services::{Engine, NewAssignment};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignFlowCommand {
    pub user_id: Uuid,
    pub original_flow_id: Uuid,
    pub assigned_by_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignFlowResponse {
    pub assignment_id: Uuid,
    pub flow_version_id: Uuid,
    pub version: VersionNumber,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum AssignFlowError {
    #[error("User and assigner must be set")]
    MissingActor,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<AssignFlowResponse, AssignFlowError>> for AssignFlowCommand {}

impl AssignFlowCommand {
    pub fn validate(&self) -> Result<(), AssignFlowError> {
        if self.user_id.is_nil() || self.assigned_by_id.is_nil() {
            return Err(AssignFlowError::MissingActor);
        }
        Ok(())
    }
}

#[tracing::instrument(
    skip(engine, command),
    fields(original_flow_id = %command.original_flow_id, user_id = %command.user_id)
)]
pub async fn handle(
    engine: Engine,
    command: AssignFlowCommand,
) -> Result<AssignFlowResponse, AssignFlowError> {
    command.validate()?;

    let assignment = engine
        .assignments
        .assign(
            NewAssignment {
                user_id: command.user_id,
                original_flow_id: command.original_flow_id,
                assigned_by_id: command.assigned_by_id,
            },
            Utc::now(),
        )
        .await?;

    Ok(AssignFlowResponse {
        assignment_id: assignment.id,
        flow_version_id: assignment.snapshot.flow_version_id(),
        version: assignment.snapshot.version().version,
        due_at: assignment.due_at,
    })
}
