//! Flow version lifecycle: create, edit, activate and read versions

pub mod commands;
pub mod queries;

pub use commands::{
    ActivateFlowVersionCommand, ActivateFlowVersionError, ActivateFlowVersionResponse,
    CreateFlowVersionCommand, CreateFlowVersionError, CreateFlowVersionResponse,
    EditFlowContentCommand, EditFlowContentError, EditFlowContentResponse,
    UpdateFlowVersionCommand, UpdateFlowVersionError, UpdateFlowVersionResponse,
};

pub use queries::{
    GetActiveFlowVersionError, GetActiveFlowVersionQuery, GetActiveFlowVersionResponse,
    GetFlowVersionError, GetFlowVersionQuery, ListFlowVersionsError, ListFlowVersionsQuery,
    ListFlowVersionsResponse,
};
