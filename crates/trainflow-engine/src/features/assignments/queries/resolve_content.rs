use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{AssignmentStatus, FlowVersion};
use crate::services::Engine;

/// Content an assignment is bound to, resolved through its snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveAssignmentContentQuery {
    pub assignment_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveAssignmentContentResponse {
    pub assignment_id: Uuid,
    pub status: AssignmentStatus,
    pub content: FlowVersion,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveAssignmentContentError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<ResolveAssignmentContentResponse, ResolveAssignmentContentError>>
    for ResolveAssignmentContentQuery
{
}

#[tracing::instrument(skip(engine))]
pub async fn handle(
    engine: Engine,
    query: ResolveAssignmentContentQuery,
) -> Result<ResolveAssignmentContentResponse, ResolveAssignmentContentError> {
    let assignment = engine.assignments.get(query.assignment_id).await?;
    let content = engine.snapshots.resolve(&assignment.snapshot).await?;

    Ok(ResolveAssignmentContentResponse {
        assignment_id: assignment.id,
        status: assignment.status,
        content,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::VersioningConfig;

    #[tokio::test]
    async fn test_unknown_assignment_is_not_found() {
        let engine = Engine::in_memory(&VersioningConfig::default());
        let err = handle(
            engine,
            ResolveAssignmentContentQuery {
                assignment_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveAssignmentContentError::Engine(EngineError::NotFound { .. })
        ));
    }
}
