//! Trainflow Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Trainflow workspace.
//!
//! # Overview
//!
//! - **Rank keys**: base-26 fractional indexing for ordering siblings without renumbering
//! - **Versions**: `VersionNumber` and the `(original_id, version)` composite identity
//! - **Error Handling**: Shared error type and result alias
//! - **Logging**: `tracing` subscriber configuration
//!
//! # Example
//!
//! ```
//! use trainflow_common::rank::RankKey;
//!
//! let first = RankKey::between(None, None).unwrap();
//! let second = RankKey::after(&first);
//! let middle = RankKey::between(Some(&first), Some(&second)).unwrap();
//! assert!(first < middle && middle < second);
//! ```

pub mod error;
pub mod logging;
pub mod rank;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TrainflowError};
pub use rank::RankKey;
pub use types::{VersionNumber, VersionedEntityId};
