//! Activate flow version command
//!
//! Makes one version the active version of its flow, archiving the previous
//! one. Open assignments on the previous version need `force_activation`.

use mediator::Request;
use serde::{Deserialize, Serialize};
use trainflow_common::VersionNumber;
use uuid::Uuid;

use crate::error::EngineError;
use crate::services::{ActivationResult, Engine};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateFlowVersionCommand {
    pub flow_version_id: Uuid,
    pub activated_by_id: Uuid,
    /// Activate even when open assignments remain bound to the current version
    #[serde(default)]
    pub force_activation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateFlowVersionResponse {
    pub flow_version_id: Uuid,
    pub version: VersionNumber,
    pub previous_active_version_id: Option<Uuid>,
    pub affected_assignments_count: u64,
    /// True when nothing changed because confirmation is needed
    pub requires_confirmation: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<ActivationResult> for ActivateFlowVersionResponse {
    fn from(result: ActivationResult) -> Self {
        let requires_confirmation = !result.is_activated();
        match result {
            ActivationResult::Activated {
                flow_version_id,
                version,
                previous_active_version_id,
                affected_assignments_count,
                warnings,
            }
            | ActivationResult::RequiresConfirmation {
                flow_version_id,
                version,
                previous_active_version_id,
                affected_assignments_count,
                warnings,
            } => Self {
                flow_version_id,
                version,
                previous_active_version_id,
                affected_assignments_count,
                requires_confirmation,
                warnings,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActivateFlowVersionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<ActivateFlowVersionResponse, ActivateFlowVersionError>>
    for ActivateFlowVersionCommand
{
}

#[tracing::instrument(skip(engine))]
pub async fn handle(
    engine: Engine,
    command: ActivateFlowVersionCommand,
) -> Result<ActivateFlowVersionResponse, ActivateFlowVersionError> {
    let result = engine
        .versioning
        .activate_version(
            command.flow_version_id,
            command.activated_by_id,
            command.force_activation,
            chrono::Utc::now(),
        )
        .await?;
    Ok(result.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::VersioningConfig;
    use crate::models::{FlowFields, FlowPriority};
    use crate::services::{NewAssignment, NewFlowVersion};
    use chrono::Utc;

    fn fields() -> FlowFields {
        FlowFields {
            title: "Onboarding".to_string(),
            description: None,
            tags: Vec::new(),
            priority: FlowPriority::Medium,
            is_required: false,
        }
    }

    #[tokio::test]
    async fn test_activation_waits_for_confirmation_then_forces() {
        let engine = Engine::in_memory(&VersioningConfig::default());
        let author = Uuid::new_v4();
        let v1 = engine
            .versioning
            .create_version(
                NewFlowVersion {
                    original_id: None,
                    created_by_id: author,
                    fields: fields(),
                },
                Utc::now(),
            )
            .await
            .unwrap();
        engine
            .versioning
            .activate_version(v1.id, author, false, Utc::now())
            .await
            .unwrap();
        engine
            .assignments
            .assign(
                NewAssignment {
                    user_id: Uuid::new_v4(),
                    original_flow_id: v1.original_id,
                    assigned_by_id: author,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        let v2 = engine
            .versioning
            .create_version(
                NewFlowVersion {
                    original_id: Some(v1.original_id),
                    created_by_id: author,
                    fields: fields(),
                },
                Utc::now(),
            )
            .await
            .unwrap();

        let command = ActivateFlowVersionCommand {
            flow_version_id: v2.id,
            activated_by_id: author,
            force_activation: false,
        };
        let pending = handle(engine.clone(), command.clone()).await.unwrap();
        assert!(pending.requires_confirmation);
        assert_eq!(pending.affected_assignments_count, 1);
        assert_eq!(pending.previous_active_version_id, Some(v1.id));
        assert_eq!(pending.warnings.len(), 1);

        let forced = handle(
            engine.clone(),
            ActivateFlowVersionCommand {
                force_activation: true,
                ..command
            },
        )
        .await
        .unwrap();
        assert!(!forced.requires_confirmation);
        assert_eq!(forced.version.get(), 2);

        let err = handle(
            engine,
            ActivateFlowVersionCommand {
                flow_version_id: v2.id,
                activated_by_id: author,
                force_activation: true,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ActivateFlowVersionError::Engine(EngineError::AlreadyActive { .. })
        ));
    }
}
