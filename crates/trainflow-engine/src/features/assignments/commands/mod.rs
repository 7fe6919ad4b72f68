pub mod assign;
pub mod update_status;

pub use assign::{AssignFlowCommand, AssignFlowError, AssignFlowResponse};
pub use update_status::{
    UpdateAssignmentStatusCommand, UpdateAssignmentStatusError, UpdateAssignmentStatusResponse,
};
