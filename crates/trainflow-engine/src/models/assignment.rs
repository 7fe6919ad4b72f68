//! Flow assignments and the snapshots they are bound to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trainflow_common::VersionedEntityId;
use uuid::Uuid;

use super::flow_version::FlowVersion;

/// Lifecycle of a flow assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Cancelled => "cancelled",
        }
    }

    /// Open assignments still bind their user to a flow version.
    pub fn is_open(self) -> bool {
        matches!(self, AssignmentStatus::Assigned | AssignmentStatus::InProgress)
    }

    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (Assigned, InProgress) | (InProgress, Completed) | (Assigned | InProgress, Cancelled)
        )
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(AssignmentStatus::Assigned),
            "in_progress" => Ok(AssignmentStatus::InProgress),
            "completed" => Ok(AssignmentStatus::Completed),
            "cancelled" => Ok(AssignmentStatus::Cancelled),
            other => Err(format!("unknown assignment status '{other}'")),
        }
    }
}

/// Immutable pointer to the content an assignment was bound to.
///
/// A `Version` reference resolves through the version store and relies on
/// activated versions never being edited. A `Materialized` reference points
/// at a stored deep copy of the tree taken at assignment time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotRef {
    Version {
        flow_version_id: Uuid,
        version: VersionedEntityId<FlowVersion>,
    },
    Materialized {
        snapshot_id: Uuid,
        flow_version_id: Uuid,
        version: VersionedEntityId<FlowVersion>,
    },
}

impl SnapshotRef {
    /// Row id of the flow version the snapshot was taken from
    pub fn flow_version_id(&self) -> Uuid {
        match self {
            SnapshotRef::Version {
                flow_version_id, ..
            }
            | SnapshotRef::Materialized {
                flow_version_id, ..
            } => *flow_version_id,
        }
    }

    pub fn version(&self) -> VersionedEntityId<FlowVersion> {
        match self {
            SnapshotRef::Version { version, .. } | SnapshotRef::Materialized { version, .. } => {
                *version
            },
        }
    }
}

/// Deep copy of a flow version stored for materialized snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub id: Uuid,
    pub flow_version_id: Uuid,
    pub content: FlowVersion,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_flow_id: Uuid,
    pub snapshot: SnapshotRef,
    pub status: AssignmentStatus,
    pub assigned_by_id: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl FlowAssignment {
    /// Apply a status change, stamping lifecycle timestamps.
    ///
    /// Callers check [`AssignmentStatus::can_transition_to`] first.
    pub fn apply_status(&mut self, status: AssignmentStatus, at: DateTime<Utc>) {
        match status {
            AssignmentStatus::InProgress => self.started_at = Some(at),
            AssignmentStatus::Completed => self.completed_at = Some(at),
            AssignmentStatus::Assigned | AssignmentStatus::Cancelled => {},
        }
        self.status = status;
        self.updated_at = at;
    }
}
