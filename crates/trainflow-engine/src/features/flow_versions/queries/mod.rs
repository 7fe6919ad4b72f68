pub mod get_active;
pub mod get_version;
pub mod list_versions;

pub use get_active::{
    GetActiveFlowVersionError, GetActiveFlowVersionQuery, GetActiveFlowVersionResponse,
};
pub use get_version::{GetFlowVersionError, GetFlowVersionQuery};
pub use list_versions::{ListFlowVersionsError, ListFlowVersionsQuery, ListFlowVersionsResponse};
