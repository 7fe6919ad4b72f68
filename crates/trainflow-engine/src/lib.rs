//! Trainflow Engine
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Versioned training flows: a flow is an ordered tree of steps, components
//! and quiz options that is edited as drafts, activated one version at a
//! time, and frozen into snapshots when assigned to a user.
//!
//! # Overview
//!
//! - **Versioning**: every version shares the flow's `original_id`; exactly one
//!   version per flow is active, and activation swaps it atomically
//! - **Ordering**: siblings carry base-26 rank keys, so inserting or moving a
//!   node writes only that node's key
//! - **Snapshots**: an assignment is bound to the version active when it was
//!   created, either by reference or as a materialized copy
//! - **Storage**: repository traits with in-memory and PostgreSQL backends
//!
//! # Architecture
//!
//! Operations are CQRS commands and queries under [`features`], one file per
//! operation, each with its own request, response and error types. Handlers
//! call into the domain [`services`], which talk to [`repository`] traits.
//! [`cqrs::build_mediator`] registers every handler on a mediator.
//!
//! # Example
//!
//! ```no_run
//! use trainflow_engine::config::VersioningConfig;
//! use trainflow_engine::features::flow_versions::{commands, CreateFlowVersionCommand};
//! use trainflow_engine::models::{FlowFields, FlowPriority};
//! use trainflow_engine::services::Engine;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let engine = Engine::in_memory(&VersioningConfig::default());
//! let created = commands::create::handle(
//!     engine,
//!     CreateFlowVersionCommand {
//!         original_flow_id: None,
//!         author_id: uuid::Uuid::new_v4(),
//!         fields: FlowFields {
//!             title: "Forklift safety".to_string(),
//!             description: None,
//!             tags: vec![],
//!             priority: FlowPriority::High,
//!             is_required: true,
//!         },
//!         activate_immediately: true,
//!     },
//! )
//! .await?;
//! assert!(created.is_active);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod error;
pub mod features;
pub mod models;
pub mod repository;
pub mod services;

// Re-export commonly used types
pub use error::{EngineError, EngineResult};
pub use services::Engine;
