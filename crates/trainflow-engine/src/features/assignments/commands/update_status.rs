use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::AssignmentStatus;
use crate::services::Engine;

/// Move an assignment along assigned -> in_progress -> completed, or cancel it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAssignmentStatusCommand {
    pub assignment_id: Uuid,
    pub status: AssignmentStatus,
    pub updated_by_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAssignmentStatusResponse {
    pub assignment_id: Uuid,
    pub status: AssignmentStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateAssignmentStatusError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<UpdateAssignmentStatusResponse, UpdateAssignmentStatusError>>
    for UpdateAssignmentStatusCommand
{
}

#[tracing::instrument(skip(engine))]
pub async fn handle(
    engine: Engine,
    command: UpdateAssignmentStatusCommand,
) -> Result<UpdateAssignmentStatusResponse, UpdateAssignmentStatusError> {
    let assignment = engine
        .assignments
        .update_status(command.assignment_id, command.status, Utc::now())
        .await?;

    Ok(UpdateAssignmentStatusResponse {
        assignment_id: assignment.id,
        status: assignment.status,
        updated_at: assignment.updated_at,
    })
}
