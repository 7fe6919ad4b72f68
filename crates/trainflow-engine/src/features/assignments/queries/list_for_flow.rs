use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::FlowAssignment;
use crate::services::Engine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFlowAssignmentsQuery {
    pub original_flow_id: Uuid,
    /// Only assigned and in-progress assignments
    #[serde(default)]
    pub open_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFlowAssignmentsResponse {
    pub original_flow_id: Uuid,
    pub assignments: Vec<FlowAssignment>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListFlowAssignmentsError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<ListFlowAssignmentsResponse, ListFlowAssignmentsError>>
    for ListFlowAssignmentsQuery
{
}

#[tracing::instrument(skip(engine))]
pub async fn handle(
    engine: Engine,
    query: ListFlowAssignmentsQuery,
) -> Result<ListFlowAssignmentsResponse, ListFlowAssignmentsError> {
    let mut assignments = engine
        .assignments
        .list_for_flow(query.original_flow_id)
        .await?;
    if query.open_only {
        assignments.retain(|a| a.status.is_open());
    }

    Ok(ListFlowAssignmentsResponse {
        original_flow_id: query.original_flow_id,
        assignments,
    })
}
