//! Domain models for versioned training flows

pub mod assignment;
pub mod flow_version;
pub mod ordering;

pub use assignment::{AssignmentStatus, FlowAssignment, FlowSnapshot, SnapshotRef};
pub use flow_version::{
    ArticleVersion, ComponentDetail, ComponentType, ComponentVersion, FlowFields,
    FlowFieldsPatch, FlowPriority, FlowStatus, FlowStepVersion, FlowVersion, FlowVersionSummary,
    QuizOptionVersion, QuizVersion, TaskVersion,
};
pub use ordering::{rank_for, reposition, sort_siblings, Placement, Ranked};
