//! Create flow version command
//!
//! Creates the next version of a flow (or version 1 of a new flow) as an
//! inactive draft copied from the active version. With
//! `activate_immediately` the new version is activated right away unless that
//! would need confirmation, in which case it stays a draft and the response
//! carries the warning.

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use trainflow_common::VersionNumber;
use uuid::Uuid;

use crate::error::EngineError;
use crate::features::shared::validation::{
    validate_tags, validate_title, TagValidationError, TitleValidationError, MAX_TITLE_LENGTH,
};
use crate::models::FlowFields;
use crate::services::{ActivationResult, Engine, NewFlowVersion};

/// Command to create a new flow version
///
/// # Examples
///
/// ```rust,ignore
/// use trainflow_engine::features::flow_versions::commands::CreateFlowVersionCommand;
///
/// let command = CreateFlowVersionCommand {
///     original_flow_id: None,
///     author_id,
///     fields: FlowFields {
///         title: "Forklift certification".to_string(),
///         description: None,
///         tags: vec!["safety".to_string()],
///         priority: FlowPriority::High,
///         is_required: true,
///     },
///     activate_immediately: false,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFlowVersionCommand {
    /// Flow to version; omitted to start a new flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_flow_id: Option<Uuid>,

    pub author_id: Uuid,

    #[serde(flatten)]
    pub fields: FlowFields,

    #[serde(default)]
    pub activate_immediately: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFlowVersionResponse {
    pub flow_version_id: Uuid,
    pub original_flow_id: Uuid,
    pub version: VersionNumber,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateFlowVersionError {
    #[error("Title validation failed: {0}")]
    TitleValidation(#[from] TitleValidationError),

    #[error("Tag validation failed: {0}")]
    TagValidation(#[from] TagValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<CreateFlowVersionResponse, CreateFlowVersionError>>
    for CreateFlowVersionCommand
{
}

impl CreateFlowVersionCommand {
    pub fn validate(&self) -> Result<(), CreateFlowVersionError> {
        validate_title(&self.fields.title, MAX_TITLE_LENGTH)?;
        validate_tags(&self.fields.tags)?;
        Ok(())
    }
}

#[tracing::instrument(
    skip(engine, command),
    fields(
        original_flow_id = ?command.original_flow_id,
        activate_immediately = command.activate_immediately
    )
)]
pub async fn handle(
    engine: Engine,
    command: CreateFlowVersionCommand,
) -> Result<CreateFlowVersionResponse, CreateFlowVersionError> {
    command.validate()?;

    let now = Utc::now();
    let flow = engine
        .versioning
        .create_version(
            NewFlowVersion {
                original_id: command.original_flow_id,
                created_by_id: command.author_id,
                fields: command.fields,
            },
            now,
        )
        .await?;

    let mut is_active = false;
    let mut warnings = Vec::new();
    if command.activate_immediately {
        let result = engine
            .versioning
            .activate_version(flow.id, command.author_id, false, now)
            .await?;
        warnings.extend_from_slice(result.warnings());
        match result {
            ActivationResult::Activated { .. } => is_active = true,
            ActivationResult::RequiresConfirmation { .. } => warnings.push(
                "version was created but not activated; activate it with force to confirm"
                    .to_string(),
            ),
        }
    }

    Ok(CreateFlowVersionResponse {
        flow_version_id: flow.id,
        original_flow_id: flow.original_id,
        version: flow.version,
        is_active,
        created_at: flow.created_at,
        warnings,
    })
}
