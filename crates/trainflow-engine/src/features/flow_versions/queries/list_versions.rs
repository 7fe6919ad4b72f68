use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::FlowVersionSummary;
use crate::services::Engine;

/// Version history of one flow, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFlowVersionsQuery {
    pub original_flow_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFlowVersionsResponse {
    pub original_flow_id: Uuid,
    pub active_version_id: Option<Uuid>,
    pub versions: Vec<FlowVersionSummary>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListFlowVersionsError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<ListFlowVersionsResponse, ListFlowVersionsError>> for ListFlowVersionsQuery {}

#[tracing::instrument(skip(engine))]
pub async fn handle(
    engine: Engine,
    query: ListFlowVersionsQuery,
) -> Result<ListFlowVersionsResponse, ListFlowVersionsError> {
    let versions = engine
        .versioning
        .list_versions(query.original_flow_id)
        .await?;
    let active_version_id = versions.iter().find(|v| v.is_active).map(|v| v.id);

    Ok(ListFlowVersionsResponse {
        original_flow_id: query.original_flow_id,
        active_version_id,
        versions,
    })
}
