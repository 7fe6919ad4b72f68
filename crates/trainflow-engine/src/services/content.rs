//! Structural edits of a draft's step/component/option tree
//!
//! Every insert or move writes exactly one rank key, the one of the node being
//! placed. Siblings are never renumbered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trainflow_common::RankKey;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    rank_for, reposition, ArticleVersion, ComponentDetail, ComponentVersion, FlowStepVersion,
    FlowVersion, Placement, QuizOptionVersion, QuizVersion, Ranked, TaskVersion,
};

/// Quiz option supplied by an editor; ids and keys are assigned on insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOptionInput {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub points: i32,
}

/// Component payload supplied by an editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentInput {
    Article {
        title: String,
        content: String,
        #[serde(default)]
        estimated_minutes: Option<u32>,
    },
    Quiz {
        title: String,
        passing_score: i32,
        #[serde(default)]
        allow_retry: bool,
        #[serde(default)]
        options: Vec<QuizOptionInput>,
    },
    Task {
        title: String,
        instructions: String,
        #[serde(default)]
        requires_approval: bool,
    },
}

impl ComponentInput {
    pub fn title(&self) -> &str {
        match self {
            ComponentInput::Article { title, .. }
            | ComponentInput::Quiz { title, .. }
            | ComponentInput::Task { title, .. } => title,
        }
    }

    fn into_detail(self, component_id: Uuid) -> ComponentDetail {
        match self {
            ComponentInput::Article {
                title,
                content,
                estimated_minutes,
            } => ComponentDetail::Article(ArticleVersion {
                title,
                content,
                estimated_minutes,
            }),
            ComponentInput::Quiz {
                title,
                passing_score,
                allow_retry,
                options,
            } => {
                let keys = RankKey::evenly_spaced(options.len());
                let options = options
                    .into_iter()
                    .zip(keys)
                    .map(|(o, key)| {
                        QuizOptionVersion::new(component_id, key, o.text, o.is_correct, o.points)
                    })
                    .collect();
                ComponentDetail::Quiz(QuizVersion {
                    title,
                    passing_score,
                    allow_retry,
                    options,
                })
            },
            ComponentInput::Task {
                title,
                instructions,
                requires_approval,
            } => ComponentDetail::Task(TaskVersion {
                title,
                instructions,
                requires_approval,
            }),
        }
    }
}

/// One structural change to a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DraftEdit {
    AddStep {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        placement: Placement,
    },
    MoveStep {
        step_id: Uuid,
        placement: Placement,
    },
    RemoveStep {
        step_id: Uuid,
    },
    AddComponent {
        step_id: Uuid,
        #[serde(default)]
        is_required: bool,
        component: ComponentInput,
        #[serde(default)]
        placement: Placement,
    },
    /// Reposition a component, optionally into another step of the same draft
    MoveComponent {
        component_id: Uuid,
        #[serde(default)]
        to_step_id: Option<Uuid>,
        placement: Placement,
    },
    RemoveComponent {
        component_id: Uuid,
    },
    AddQuizOption {
        component_id: Uuid,
        option: QuizOptionInput,
        #[serde(default)]
        placement: Placement,
    },
    MoveQuizOption {
        component_id: Uuid,
        option_id: Uuid,
        placement: Placement,
    },
    RemoveQuizOption {
        component_id: Uuid,
        option_id: Uuid,
    },
}

impl DraftEdit {
    pub fn kind(&self) -> &'static str {
        match self {
            DraftEdit::AddStep { .. } => "add_step",
            DraftEdit::MoveStep { .. } => "move_step",
            DraftEdit::RemoveStep { .. } => "remove_step",
            DraftEdit::AddComponent { .. } => "add_component",
            DraftEdit::MoveComponent { .. } => "move_component",
            DraftEdit::RemoveComponent { .. } => "remove_component",
            DraftEdit::AddQuizOption { .. } => "add_quiz_option",
            DraftEdit::MoveQuizOption { .. } => "move_quiz_option",
            DraftEdit::RemoveQuizOption { .. } => "remove_quiz_option",
        }
    }
}

/// Node touched by an edit and, for inserts and moves, its new key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOutcome {
    pub node_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<RankKey>,
}

impl EditOutcome {
    fn placed(node_id: Uuid, order: RankKey) -> Self {
        Self {
            node_id,
            order: Some(order),
        }
    }

    fn removed(node_id: Uuid) -> Self {
        Self {
            node_id,
            order: None,
        }
    }
}

/// Apply `edit` to `flow` in place.
///
/// The caller is responsible for checking that `flow` is still an editable
/// draft and for persisting the result.
pub fn apply_edit(
    flow: &mut FlowVersion,
    edit: DraftEdit,
    at: DateTime<Utc>,
) -> EngineResult<EditOutcome> {
    flow.normalize_order();
    let outcome = match edit {
        DraftEdit::AddStep {
            title,
            description,
            placement,
        } => {
            let order = rank_for(&flow.steps, placement, None)?;
            let step = FlowStepVersion::new(flow.id, order.clone(), title, description);
            let id = step.id;
            flow.steps.push(step);
            EditOutcome::placed(id, order)
        },
        DraftEdit::MoveStep { step_id, placement } => {
            let order = reposition(&mut flow.steps, step_id, placement, "Step")?;
            EditOutcome::placed(step_id, order)
        },
        DraftEdit::RemoveStep { step_id } => {
            let before = flow.steps.len();
            flow.steps.retain(|s| s.id != step_id);
            if flow.steps.len() == before {
                return Err(EngineError::not_found("Step", step_id));
            }
            EditOutcome::removed(step_id)
        },
        DraftEdit::AddComponent {
            step_id,
            is_required,
            component,
            placement,
        } => {
            let step = flow
                .step_mut(step_id)
                .ok_or_else(|| EngineError::not_found("Step", step_id))?;
            let order = rank_for(&step.components, placement, None)?;
            let id = Uuid::new_v4();
            step.components.push(ComponentVersion {
                id,
                original_id: id,
                step_version_id: step_id,
                order: order.clone(),
                is_required,
                detail: component.into_detail(id),
            });
            EditOutcome::placed(id, order)
        },
        DraftEdit::MoveComponent {
            component_id,
            to_step_id,
            placement,
        } => move_component(flow, component_id, to_step_id, placement)?,
        DraftEdit::RemoveComponent { component_id } => {
            let step = flow
                .step_of_component_mut(component_id)
                .ok_or_else(|| EngineError::not_found("Component", component_id))?;
            step.components.retain(|c| c.id != component_id);
            EditOutcome::removed(component_id)
        },
        DraftEdit::AddQuizOption {
            component_id,
            option,
            placement,
        } => {
            let quiz = quiz_mut(flow, component_id)?;
            let order = rank_for(&quiz.options, placement, None)?;
            let created = QuizOptionVersion::new(
                component_id,
                order.clone(),
                option.text,
                option.is_correct,
                option.points,
            );
            let id = created.id;
            quiz.options.push(created);
            EditOutcome::placed(id, order)
        },
        DraftEdit::MoveQuizOption {
            component_id,
            option_id,
            placement,
        } => {
            let quiz = quiz_mut(flow, component_id)?;
            let order = reposition(&mut quiz.options, option_id, placement, "Quiz option")?;
            EditOutcome::placed(option_id, order)
        },
        DraftEdit::RemoveQuizOption {
            component_id,
            option_id,
        } => {
            let quiz = quiz_mut(flow, component_id)?;
            let before = quiz.options.len();
            quiz.options.retain(|o| o.id != option_id);
            if quiz.options.len() == before {
                return Err(EngineError::not_found("Quiz option", option_id));
            }
            EditOutcome::removed(option_id)
        },
    };
    flow.normalize_order();
    flow.updated_at = at;
    Ok(outcome)
}

fn move_component(
    flow: &mut FlowVersion,
    component_id: Uuid,
    to_step_id: Option<Uuid>,
    placement: Placement,
) -> EngineResult<EditOutcome> {
    let source_step_id = flow
        .step_of_component_mut(component_id)
        .map(|s| s.id)
        .ok_or_else(|| EngineError::not_found("Component", component_id))?;
    let target_step_id = to_step_id.unwrap_or(source_step_id);

    if target_step_id == source_step_id {
        let step = flow
            .step_mut(source_step_id)
            .ok_or_else(|| EngineError::not_found("Step", source_step_id))?;
        let order = reposition(&mut step.components, component_id, placement, "Component")?;
        return Ok(EditOutcome::placed(component_id, order));
    }

    // Compute the key before detaching so a bad anchor leaves the tree untouched.
    let target = flow
        .step(target_step_id)
        .ok_or_else(|| EngineError::not_found("Step", target_step_id))?;
    let order = rank_for(&target.components, placement, None)?;

    let source = flow
        .step_mut(source_step_id)
        .ok_or_else(|| EngineError::not_found("Step", source_step_id))?;
    let idx = source
        .components
        .iter()
        .position(|c| c.id == component_id)
        .ok_or_else(|| EngineError::not_found("Component", component_id))?;
    let mut component = source.components.remove(idx);
    component.step_version_id = target_step_id;
    component.set_order(order.clone());

    let target = flow
        .step_mut(target_step_id)
        .ok_or_else(|| EngineError::not_found("Step", target_step_id))?;
    target.components.push(component);
    Ok(EditOutcome::placed(component_id, order))
}

fn quiz_mut(flow: &mut FlowVersion, component_id: Uuid) -> EngineResult<&mut QuizVersion> {
    let component = flow
        .component_mut(component_id)
        .ok_or_else(|| EngineError::not_found("Component", component_id))?;
    match &mut component.detail {
        ComponentDetail::Quiz(quiz) => Ok(quiz),
        other => Err(EngineError::Validation(format!(
            "component {component_id} is a {}, not a quiz",
            other.component_type().as_str()
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{FlowFields, Ranked};
    use std::collections::HashMap;
    use trainflow_common::VersionNumber;

    fn empty_draft() -> FlowVersion {
        FlowVersion::new_draft(
            Uuid::new_v4(),
            VersionNumber::INITIAL,
            Uuid::new_v4(),
            FlowFields {
                title: "Draft".into(),
                description: None,
                tags: Vec::new(),
                priority: Default::default(),
                is_required: false,
            },
            Utc::now(),
        )
    }

    fn add_step(flow: &mut FlowVersion, title: &str, placement: Placement) -> Uuid {
        apply_edit(
            flow,
            DraftEdit::AddStep {
                title: title.into(),
                description: None,
                placement,
            },
            Utc::now(),
        )
        .unwrap()
        .node_id
    }

    fn titles(flow: &FlowVersion) -> Vec<&str> {
        flow.steps.iter().map(|s| s.title.as_str()).collect()
    }

    fn quiz_input(options: &[&str]) -> ComponentInput {
        ComponentInput::Quiz {
            title: "Check".into(),
            passing_score: 1,
            allow_retry: false,
            options: options
                .iter()
                .map(|t| QuizOptionInput {
                    text: t.to_string(),
                    is_correct: *t == "right",
                    points: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_add_steps_in_requested_positions() {
        let mut flow = empty_draft();
        let b = add_step(&mut flow, "B", Placement::Last);
        add_step(&mut flow, "D", Placement::Last);
        add_step(&mut flow, "A", Placement::First);
        add_step(&mut flow, "C", Placement::After(b));

        assert_eq!(titles(&flow), vec!["A", "B", "C", "D"]);
        assert_eq!(flow.steps[1].order.as_str(), "m");
    }

    #[test]
    fn test_move_step_rewrites_only_the_moved_key() {
        let mut flow = empty_draft();
        let a = add_step(&mut flow, "A", Placement::Last);
        add_step(&mut flow, "B", Placement::Last);
        let c = add_step(&mut flow, "C", Placement::Last);
        let before: HashMap<Uuid, RankKey> =
            flow.steps.iter().map(|s| (s.id, s.order.clone())).collect();

        let outcome = apply_edit(
            &mut flow,
            DraftEdit::MoveStep {
                step_id: c,
                placement: Placement::Before(a),
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(titles(&flow), vec!["C", "A", "B"]);
        for step in &flow.steps {
            if step.id == c {
                assert_eq!(Some(step.order.clone()), outcome.order);
                assert_ne!(step.order, before[&c]);
            } else {
                assert_eq!(step.order, before[&step.id]);
            }
        }
    }

    #[test]
    fn test_new_quiz_options_are_evenly_spaced() {
        let mut flow = empty_draft();
        let step = add_step(&mut flow, "A", Placement::Last);
        let outcome = apply_edit(
            &mut flow,
            DraftEdit::AddComponent {
                step_id: step,
                is_required: true,
                component: quiz_input(&["one", "two", "right", "four", "five"]),
                placement: Placement::Last,
            },
            Utc::now(),
        )
        .unwrap();

        let component = &flow.steps[0].components[0];
        assert_eq!(component.id, outcome.node_id);
        let ComponentDetail::Quiz(quiz) = &component.detail else {
            panic!("expected quiz");
        };
        let keys: Vec<&str> = quiz.options.iter().map(|o| o.order.as_str()).collect();
        assert_eq!(keys, vec!["e", "i", "n", "r", "v"]);
        assert!(quiz.options.iter().all(|o| o.component_version_id == component.id));
        assert_eq!(quiz.max_score(), 1);
    }

    #[test]
    fn test_quiz_option_insert_move_remove() {
        let mut flow = empty_draft();
        let step = add_step(&mut flow, "A", Placement::Last);
        let quiz_id = apply_edit(
            &mut flow,
            DraftEdit::AddComponent {
                step_id: step,
                is_required: false,
                component: quiz_input(&["x", "y"]),
                placement: Placement::Last,
            },
            Utc::now(),
        )
        .unwrap()
        .node_id;

        let added = apply_edit(
            &mut flow,
            DraftEdit::AddQuizOption {
                component_id: quiz_id,
                option: QuizOptionInput {
                    text: "first".into(),
                    is_correct: false,
                    points: 0,
                },
                placement: Placement::First,
            },
            Utc::now(),
        )
        .unwrap()
        .node_id;

        let options = |flow: &mut FlowVersion| -> Vec<String> {
            let ComponentDetail::Quiz(quiz) = &flow.component_mut(quiz_id).unwrap().detail else {
                panic!("expected quiz");
            };
            quiz.options.iter().map(|o| o.text.clone()).collect()
        };
        assert_eq!(options(&mut flow), vec!["first", "x", "y"]);

        apply_edit(
            &mut flow,
            DraftEdit::MoveQuizOption {
                component_id: quiz_id,
                option_id: added,
                placement: Placement::Last,
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(options(&mut flow), vec!["x", "y", "first"]);

        apply_edit(
            &mut flow,
            DraftEdit::RemoveQuizOption {
                component_id: quiz_id,
                option_id: added,
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(options(&mut flow), vec!["x", "y"]);
    }

    #[test]
    fn test_move_component_across_steps() {
        let mut flow = empty_draft();
        let first = add_step(&mut flow, "A", Placement::Last);
        let second = add_step(&mut flow, "B", Placement::Last);
        let task = ComponentInput::Task {
            title: "Sign form".into(),
            instructions: "Sign it".into(),
            requires_approval: true,
        };
        let component_id = apply_edit(
            &mut flow,
            DraftEdit::AddComponent {
                step_id: first,
                is_required: true,
                component: task,
                placement: Placement::Last,
            },
            Utc::now(),
        )
        .unwrap()
        .node_id;

        apply_edit(
            &mut flow,
            DraftEdit::MoveComponent {
                component_id,
                to_step_id: Some(second),
                placement: Placement::First,
            },
            Utc::now(),
        )
        .unwrap();

        assert!(flow.step(first).unwrap().components.is_empty());
        let moved = &flow.step(second).unwrap().components[0];
        assert_eq!(moved.id, component_id);
        assert_eq!(moved.step_version_id, second);
        assert_eq!(moved.order(), &RankKey::midpoint());
    }

    #[test]
    fn test_quiz_edit_on_non_quiz_is_rejected() {
        let mut flow = empty_draft();
        let step = add_step(&mut flow, "A", Placement::Last);
        let article = apply_edit(
            &mut flow,
            DraftEdit::AddComponent {
                step_id: step,
                is_required: false,
                component: ComponentInput::Article {
                    title: "Read".into(),
                    content: "Body".into(),
                    estimated_minutes: Some(5),
                },
                placement: Placement::Last,
            },
            Utc::now(),
        )
        .unwrap()
        .node_id;

        let err = apply_edit(
            &mut flow,
            DraftEdit::AddQuizOption {
                component_id: article,
                option: QuizOptionInput {
                    text: "?".into(),
                    is_correct: true,
                    points: 1,
                },
                placement: Placement::Last,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_missing_nodes_are_not_found() {
        let mut flow = empty_draft();
        let err = apply_edit(
            &mut flow,
            DraftEdit::RemoveStep {
                step_id: Uuid::new_v4(),
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_draft_edit_json_shape() {
        let edit: DraftEdit = serde_json::from_value(serde_json::json!({
            "op": "add_step",
            "title": "Intro"
        }))
        .unwrap();
        assert_eq!(edit.kind(), "add_step");
        assert!(matches!(
            edit,
            DraftEdit::AddStep {
                placement: Placement::Last,
                ..
            }
        ));
    }
}
