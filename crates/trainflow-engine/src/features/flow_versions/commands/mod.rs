pub mod activate;
pub mod create;
pub mod edit_content;
pub mod update;

pub use activate::{
    ActivateFlowVersionCommand, ActivateFlowVersionError, ActivateFlowVersionResponse,
};
pub use create::{CreateFlowVersionCommand, CreateFlowVersionError, CreateFlowVersionResponse};
pub use edit_content::{EditFlowContentCommand, EditFlowContentError, EditFlowContentResponse};
pub use update::{UpdateFlowVersionCommand, UpdateFlowVersionError, UpdateFlowVersionResponse};
