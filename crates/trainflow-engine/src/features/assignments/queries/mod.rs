pub mod list_for_flow;
pub mod resolve_content;

pub use list_for_flow::{
    ListFlowAssignmentsError, ListFlowAssignmentsQuery, ListFlowAssignmentsResponse,
};
pub use resolve_content::{
    ResolveAssignmentContentError, ResolveAssignmentContentQuery,
    ResolveAssignmentContentResponse,
};
