use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::FlowVersion;
use crate::services::Engine;

/// Active version of a flow, with its full content tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetActiveFlowVersionQuery {
    pub original_flow_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetActiveFlowVersionResponse {
    pub original_flow_id: Uuid,
    /// `None` when no version has been activated yet
    pub active: Option<FlowVersion>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetActiveFlowVersionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<GetActiveFlowVersionResponse, GetActiveFlowVersionError>>
    for GetActiveFlowVersionQuery
{
}

#[tracing::instrument(skip(engine))]
pub async fn handle(
    engine: Engine,
    query: GetActiveFlowVersionQuery,
) -> Result<GetActiveFlowVersionResponse, GetActiveFlowVersionError> {
    let active = engine
        .versioning
        .get_active_version(query.original_flow_id)
        .await?;
    Ok(GetActiveFlowVersionResponse {
        original_flow_id: query.original_flow_id,
        active,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::VersioningConfig;

    #[tokio::test]
    async fn test_unknown_flow_has_no_active_version() {
        let engine = Engine::in_memory(&VersioningConfig::default());
        let response = handle(
            engine,
            GetActiveFlowVersionQuery {
                original_flow_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap();
        assert!(response.active.is_none());
    }
}
