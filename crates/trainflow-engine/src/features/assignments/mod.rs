//! Assigning flows to users and reading their frozen content

pub mod commands;
pub mod queries;

pub use commands::{
    AssignFlowCommand, AssignFlowError, AssignFlowResponse, UpdateAssignmentStatusCommand,
    UpdateAssignmentStatusError, UpdateAssignmentStatusResponse,
};

pub use queries::{
    ListFlowAssignmentsError, ListFlowAssignmentsQuery, ListFlowAssignmentsResponse,
    ResolveAssignmentContentError, ResolveAssignmentContentQuery,
    ResolveAssignmentContentResponse,
};
