//! Versioned content tree: flow → steps → components → quiz options

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trainflow_common::{RankKey, VersionNumber, VersionedEntityId};
use uuid::Uuid;

use super::ordering::{sort_siblings, Ranked};

/// Publication state of one flow version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    /// Editable, never activated
    Draft,
    /// Currently (or most recently) the live version
    Published,
    /// Superseded by the activation of another version
    Archived,
}

impl FlowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowStatus::Draft => "draft",
            FlowStatus::Published => "published",
            FlowStatus::Archived => "archived",
        }
    }
}

impl std::str::FromStr for FlowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(FlowStatus::Draft),
            "published" => Ok(FlowStatus::Published),
            "archived" => Ok(FlowStatus::Archived),
            other => Err(format!("unknown flow status '{other}'")),
        }
    }
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl FlowPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowPriority::Low => "low",
            FlowPriority::Medium => "medium",
            FlowPriority::High => "high",
            FlowPriority::Critical => "critical",
        }
    }
}

impl std::str::FromStr for FlowPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(FlowPriority::Low),
            "medium" => Ok(FlowPriority::Medium),
            "high" => Ok(FlowPriority::High),
            "critical" => Ok(FlowPriority::Critical),
            other => Err(format!("unknown flow priority '{other}'")),
        }
    }
}

/// Caller-supplied descriptive fields of a flow version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowFields {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: FlowPriority,
    #[serde(default)]
    pub is_required: bool,
}

/// Partial update of [`FlowFields`]; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowFieldsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<FlowPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_required: Option<bool>,
}

impl FlowFieldsPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.priority.is_none()
            && self.is_required.is_none()
    }
}

/// One version of a flow together with its whole step subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowVersion {
    pub id: Uuid,
    /// Logical flow identity shared by every version
    pub original_id: Uuid,
    pub version: VersionNumber,
    pub is_active: bool,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub priority: FlowPriority,
    pub is_required: bool,
    pub status: FlowStatus,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub activated_by_id: Option<Uuid>,
    /// Optimistic concurrency token, bumped by every stored write
    pub row_version: i64,
    pub steps: Vec<FlowStepVersion>,
}

impl FlowVersion {
    /// Empty draft for `version` of `original_id`.
    pub fn new_draft(
        original_id: Uuid,
        version: VersionNumber,
        created_by_id: Uuid,
        fields: FlowFields,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_id,
            version,
            is_active: false,
            title: fields.title,
            description: fields.description,
            tags: fields.tags,
            priority: fields.priority,
            is_required: fields.is_required,
            status: FlowStatus::Draft,
            created_by_id,
            created_at: at,
            updated_at: at,
            activated_at: None,
            activated_by_id: None,
            row_version: 0,
            steps: Vec::new(),
        }
    }

    /// New draft whose subtree is a deep copy of `self`.
    ///
    /// Every node gets a fresh id but keeps its `original_id` and rank key;
    /// only content changes between versions, not order.
    pub fn derive_draft(
        &self,
        version: VersionNumber,
        created_by_id: Uuid,
        fields: FlowFields,
        at: DateTime<Utc>,
    ) -> Self {
        let mut draft = Self::new_draft(self.original_id, version, created_by_id, fields, at);
        let flow_version_id = draft.id;
        draft.steps = self
            .steps
            .iter()
            .map(|step| step.copy_into(flow_version_id))
            .collect();
        draft
    }

    pub fn versioned_id(&self) -> VersionedEntityId<FlowVersion> {
        VersionedEntityId::new(self.original_id, self.version)
    }

    pub fn apply_patch(&mut self, patch: FlowFieldsPatch, at: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(is_required) = patch.is_required {
            self.is_required = is_required;
        }
        self.updated_at = at;
    }

    /// Sort every sibling list by `(order, id)`.
    pub fn normalize_order(&mut self) {
        sort_siblings(&mut self.steps);
        for step in &mut self.steps {
            sort_siblings(&mut step.components);
            for component in &mut step.components {
                if let ComponentDetail::Quiz(quiz) = &mut component.detail {
                    sort_siblings(&mut quiz.options);
                }
            }
        }
    }

    pub fn step(&self, step_id: Uuid) -> Option<&FlowStepVersion> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn step_mut(&mut self, step_id: Uuid) -> Option<&mut FlowStepVersion> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }

    /// Step holding `component_id`
    pub fn step_of_component_mut(&mut self, component_id: Uuid) -> Option<&mut FlowStepVersion> {
        self.steps
            .iter_mut()
            .find(|s| s.components.iter().any(|c| c.id == component_id))
    }

    pub fn component_mut(&mut self, component_id: Uuid) -> Option<&mut ComponentVersion> {
        self.steps
            .iter_mut()
            .flat_map(|s| s.components.iter_mut())
            .find(|c| c.id == component_id)
    }

    pub fn component_count(&self) -> usize {
        self.steps.iter().map(|s| s.components.len()).sum()
    }

    pub fn summary(&self) -> FlowVersionSummary {
        FlowVersionSummary {
            id: self.id,
            original_id: self.original_id,
            version: self.version,
            is_active: self.is_active,
            status: self.status,
            title: self.title.clone(),
            step_count: self.steps.len(),
            created_by_id: self.created_by_id,
            created_at: self.created_at,
            activated_at: self.activated_at,
        }
    }
}

/// Listing view of a flow version without its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowVersionSummary {
    pub id: Uuid,
    pub original_id: Uuid,
    pub version: VersionNumber,
    pub is_active: bool,
    pub status: FlowStatus,
    pub title: String,
    pub step_count: usize,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStepVersion {
    pub id: Uuid,
    pub original_id: Uuid,
    pub flow_version_id: Uuid,
    pub order: RankKey,
    pub title: String,
    pub description: Option<String>,
    pub components: Vec<ComponentVersion>,
}

impl FlowStepVersion {
    pub fn new(
        flow_version_id: Uuid,
        order: RankKey,
        title: String,
        description: Option<String>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            original_id: id,
            flow_version_id,
            order,
            title,
            description,
            components: Vec::new(),
        }
    }

    fn copy_into(&self, flow_version_id: Uuid) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            original_id: self.original_id,
            flow_version_id,
            order: self.order.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            components: self.components.iter().map(|c| c.copy_into(id)).collect(),
        }
    }
}

impl Ranked for FlowStepVersion {
    fn id(&self) -> Uuid {
        self.id
    }

    fn order(&self) -> &RankKey {
        &self.order
    }

    fn set_order(&mut self, order: RankKey) {
        self.order = order;
    }
}

/// Discriminant of [`ComponentDetail`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Article,
    Quiz,
    Task,
}

impl ComponentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Article => "article",
            ComponentType::Quiz => "quiz",
            ComponentType::Task => "task",
        }
    }
}

impl std::str::FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "article" => Ok(ComponentType::Article),
            "quiz" => Ok(ComponentType::Quiz),
            "task" => Ok(ComponentType::Task),
            other => Err(format!("unknown component type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentVersion {
    pub id: Uuid,
    pub original_id: Uuid,
    pub step_version_id: Uuid,
    pub order: RankKey,
    pub is_required: bool,
    pub detail: ComponentDetail,
}

impl ComponentVersion {
    pub fn new(
        step_version_id: Uuid,
        order: RankKey,
        is_required: bool,
        detail: ComponentDetail,
    ) -> Self {
        let id = Uuid::new_v4();
        let mut component = Self {
            id,
            original_id: id,
            step_version_id,
            order,
            is_required,
            detail,
        };
        component.rebind_options();
        component
    }

    pub fn component_type(&self) -> ComponentType {
        self.detail.component_type()
    }

    fn copy_into(&self, step_version_id: Uuid) -> Self {
        let mut component = Self {
            id: Uuid::new_v4(),
            original_id: self.original_id,
            step_version_id,
            order: self.order.clone(),
            is_required: self.is_required,
            detail: self.detail.clone(),
        };
        component.rebind_options();
        component
    }

    /// Point quiz options at this component, giving copied options fresh ids.
    fn rebind_options(&mut self) {
        let component_id = self.id;
        if let ComponentDetail::Quiz(quiz) = &mut self.detail {
            for option in &mut quiz.options {
                if option.component_version_id != component_id {
                    option.id = Uuid::new_v4();
                    option.component_version_id = component_id;
                }
            }
        }
    }
}

impl Ranked for ComponentVersion {
    fn id(&self) -> Uuid {
        self.id
    }

    fn order(&self) -> &RankKey {
        &self.order
    }

    fn set_order(&mut self, order: RankKey) {
        self.order = order;
    }
}

/// Type-specific payload of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentDetail {
    Article(ArticleVersion),
    Quiz(QuizVersion),
    Task(TaskVersion),
}

impl ComponentDetail {
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentDetail::Article(_) => ComponentType::Article,
            ComponentDetail::Quiz(_) => ComponentType::Quiz,
            ComponentDetail::Task(_) => ComponentType::Task,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleVersion {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizVersion {
    pub title: String,
    /// Minimum points needed to pass
    pub passing_score: i32,
    #[serde(default)]
    pub allow_retry: bool,
    #[serde(default)]
    pub options: Vec<QuizOptionVersion>,
}

impl QuizVersion {
    pub fn max_score(&self) -> i32 {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.points)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskVersion {
    pub title: String,
    pub instructions: String,
    #[serde(default)]
    pub requires_approval: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOptionVersion {
    pub id: Uuid,
    pub component_version_id: Uuid,
    pub order: RankKey,
    pub text: String,
    pub is_correct: bool,
    pub points: i32,
}

impl QuizOptionVersion {
    pub fn new(
        component_version_id: Uuid,
        order: RankKey,
        text: String,
        is_correct: bool,
        points: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            component_version_id,
            order,
            text,
            is_correct,
            points,
        }
    }
}

impl Ranked for QuizOptionVersion {
    fn id(&self) -> Uuid {
        self.id
    }

    fn order(&self) -> &RankKey {
        &self.order
    }

    fn set_order(&mut self, order: RankKey) {
        self.order = order;
    }
}
