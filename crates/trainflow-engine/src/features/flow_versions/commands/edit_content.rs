//! Structural edits of a draft's content tree
//!
//! One command carries one [`DraftEdit`]. Inserts and moves return the rank
//! key written for the placed node; no other node's key changes.

use mediator::Request;
use serde::{Deserialize, Serialize};
use trainflow_common::RankKey;
use uuid::Uuid;

use crate::error::EngineError;
use crate::features::shared::validation::{
    validate_text, validate_title, TitleValidationError, MAX_TITLE_LENGTH,
};
use crate::services::{ComponentInput, DraftEdit, Engine};

const MAX_OPTION_TEXT_LENGTH: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFlowContentCommand {
    pub flow_version_id: Uuid,
    pub edit: DraftEdit,
    pub edited_by_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_row_version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFlowContentResponse {
    pub flow_version_id: Uuid,
    /// Step, component or option the edit touched
    pub node_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<RankKey>,
    pub row_version: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum EditFlowContentError {
    #[error("Validation failed: {0}")]
    TextValidation(#[from] TitleValidationError),

    #[error("Passing score {passing_score} exceeds the quiz maximum of {max_score}")]
    PassingScoreTooHigh { passing_score: i32, max_score: i32 },

    #[error("Quiz option points cannot be negative")]
    NegativePoints,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Request<Result<EditFlowContentResponse, EditFlowContentError>> for EditFlowContentCommand {}

impl EditFlowContentCommand {
    pub fn validate(&self) -> Result<(), EditFlowContentError> {
        match &self.edit {
            DraftEdit::AddStep { title, .. } => validate_title(title, MAX_TITLE_LENGTH)?,
            DraftEdit::AddComponent { component, .. } => validate_component(component)?,
            DraftEdit::AddQuizOption { option, .. } => {
                validate_text(&option.text, "Option text", MAX_OPTION_TEXT_LENGTH)?;
                if option.points < 0 {
                    return Err(EditFlowContentError::NegativePoints);
                }
            },
            _ => {},
        }
        Ok(())
    }
}

fn validate_component(component: &ComponentInput) -> Result<(), EditFlowContentError> {
    validate_title(component.title(), MAX_TITLE_LENGTH)?;
    if let ComponentInput::Quiz {
        passing_score,
        options,
        ..
    } = component
    {
        for option in options {
            validate_text(&option.text, "Option text", MAX_OPTION_TEXT_LENGTH)?;
            if option.points < 0 {
                return Err(EditFlowContentError::NegativePoints);
            }
        }
        // Options can still be added later, so only check a populated quiz.
        let max_score: i32 = options.iter().map(|o| o.points).sum();
        if !options.is_empty() && *passing_score > max_score {
            return Err(EditFlowContentError::PassingScoreTooHigh {
                passing_score: *passing_score,
                max_score,
            });
        }
    }
    Ok(())
}

#[tracing::instrument(
    skip(engine, command),
    fields(flow_version_id = %command.flow_version_id, edit = command.edit.kind())
)]
pub async fn handle(
    engine: Engine,
    command: EditFlowContentCommand,
) -> Result<EditFlowContentResponse, EditFlowContentError> {
    command.validate()?;

    let (flow, outcome) = engine
        .versioning
        .edit_draft(
            command.flow_version_id,
            command.edit,
            command.expected_row_version,
            chrono::Utc::now(),
        )
        .await?;

    Ok(EditFlowContentResponse {
        flow_version_id: flow.id,
        node_id: outcome.node_id,
        order: outcome.order,
        row_version: flow.row_version,
    })
}
