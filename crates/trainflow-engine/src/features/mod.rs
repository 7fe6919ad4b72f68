//! Command and query handlers, one vertical slice per feature
//!
//! Each operation lives in its own file with its request type, response type,
//! error enum and `handle` function:
//!
//! - **flow_versions**: create, update, edit content, activate, read history
//! - **assignments**: assign, change status, resolve bound content
//! - **ranks**: compute rank keys between neighbours or evenly spaced
//!
//! Handlers take a cloned [`crate::services::Engine`] and are registered on
//! the mediator in [`crate::cqrs`].

pub mod assignments;
pub mod flow_versions;
pub mod ranks;
pub mod shared;
