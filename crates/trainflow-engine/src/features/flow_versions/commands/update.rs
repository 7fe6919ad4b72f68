use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use trainflow_common::VersionNumber;
use uuid::Uuid;

use crate::error::EngineError;
use crate::features::shared::validation::{
    validate_tags, validate_title, TagValidationError, TitleValidationError, MAX_TITLE_LENGTH,
};
use crate::models::FlowFieldsPatch;
use crate::services::Engine;

/// Change the descriptive fields of a draft version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFlowVersionCommand {
    pub flow_version_id: Uuid,
    #[serde(flatten)]
    pub fields: FlowFieldsPatch,
    pub updated_by_id: Uuid,
    /// Fail instead of retrying when the draft changed since this row version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_row_version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFlowVersionResponse {
    pub flow_version_id: Uuid,
    pub version: VersionNumber,
    pub row_version: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateFlowVersionError {
    #[error("No fields to update")]
    NothingToUpdate,

    #[error("Title validation failed: {0}")]
    TitleValidation(#[from] TitleValidationError),

    #[error("Tag validation failed: {0}")]
    TagValidation(#[from] TagValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<UpdateFlowVersionResponse, UpdateFlowVersionError>>
    for UpdateFlowVersionCommand
{
}

impl UpdateFlowVersionCommand {
    pub fn validate(&self) -> Result<(), UpdateFlowVersionError> {
        if self.fields.is_empty() {
            return Err(UpdateFlowVersionError::NothingToUpdate);
        }
        if let Some(title) = &self.fields.title {
            validate_title(title, MAX_TITLE_LENGTH)?;
        }
        if let Some(tags) = &self.fields.tags {
            validate_tags(tags)?;
        }
        Ok(())
    }
}

#[tracing::instrument(
    skip(engine, command),
    fields(flow_version_id = %command.flow_version_id, updated_by_id = %command.updated_by_id)
)]
pub async fn handle(
    engine: Engine,
    command: UpdateFlowVersionCommand,
) -> Result<UpdateFlowVersionResponse, UpdateFlowVersionError> {
    command.validate()?;

    let flow = engine
        .versioning
        .update_draft(
            command.flow_version_id,
            command.fields,
            command.expected_row_version,
            Utc::now(),
        )
        .await?;

    Ok(UpdateFlowVersionResponse {
        flow_version_id: flow.id,
        version: flow.version,
        row_version: flow.row_version,
        updated_at: flow.updated_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::VersioningConfig;
    use crate::models::{FlowFields, FlowPriority};
    use crate::services::NewFlowVersion;

    async fn draft(engine: &Engine) -> crate::models::FlowVersion {
        engine
            .versioning
            .create_version(
                NewFlowVersion {
                    original_id: None,
                    created_by_id: Uuid::new_v4(),
                    fields: FlowFields {
                        title: "Draft".to_string(),
                        description: None,
                        tags: Vec::new(),
                        priority: FlowPriority::Low,
                        is_required: false,
                    },
                },
                Utc::now(),
            )
            .await
            .unwrap()
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        let command = UpdateFlowVersionCommand {
            flow_version_id: Uuid::new_v4(),
            fields: FlowFieldsPatch::default(),
            updated_by_id: Uuid::new_v4(),
            expected_row_version: None,
        };
        assert!(matches!(
            command.validate(),
            Err(UpdateFlowVersionError::NothingToUpdate)
        ));
    }

    #[tokio::test]
    async fn test_update_bumps_row_version() {
        let engine = Engine::in_memory(&VersioningConfig::default());
        let flow = draft(&engine).await;

        let response = handle(
            engine.clone(),
            UpdateFlowVersionCommand {
                flow_version_id: flow.id,
                fields: FlowFieldsPatch {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
                updated_by_id: Uuid::new_v4(),
                expected_row_version: Some(flow.row_version),
            },
        )
        .await
        .unwrap();
        assert!(response.row_version > flow.row_version);

        let stored = engine.versioning.get_version(flow.id).await.unwrap();
        assert_eq!(stored.title, "Renamed");
    }

    #[tokio::test]
    async fn test_stale_row_version_is_a_conflict() {
        let engine = Engine::in_memory(&VersioningConfig::default());
        let flow = draft(&engine).await;
        let patch = FlowFieldsPatch {
            is_required: Some(true),
            ..Default::default()
        };
        engine
            .versioning
            .update_draft(flow.id, patch.clone(), None, Utc::now())
            .await
            .unwrap();

        let err = handle(
            engine,
            UpdateFlowVersionCommand {
                flow_version_id: flow.id,
                fields: patch,
                updated_by_id: Uuid::new_v4(),
                expected_row_version: Some(flow.row_version),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            UpdateFlowVersionError::Engine(EngineError::ConcurrentModification(_))
        ));
    }
}
