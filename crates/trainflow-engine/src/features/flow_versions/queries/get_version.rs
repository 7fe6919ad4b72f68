use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::FlowVersion;
use crate::services::Engine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetFlowVersionQuery {
    pub flow_version_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetFlowVersionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<FlowVersion, GetFlowVersionError>> for GetFlowVersionQuery {}

#[tracing::instrument(skip(engine))]
pub async fn handle(
    engine: Engine,
    query: GetFlowVersionQuery,
) -> Result<FlowVersion, GetFlowVersionError> {
    Ok(engine.versioning.get_version(query.flow_version_id).await?)
}
