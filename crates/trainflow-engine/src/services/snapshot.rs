//! Point-in-time snapshots of the active flow version

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{FlowSnapshot, FlowVersion, SnapshotRef};
use crate::repository::{FlowVersionRepository, SnapshotRepository};

/// How an assignment holds on to the content it was given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStrategy {
    /// Point at the version itself; activated versions are never edited or deleted
    #[default]
    Reference,
    /// Store a deep copy of the version tree
    Materialized,
}

impl std::str::FromStr for SnapshotStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reference" | "ref" => Ok(SnapshotStrategy::Reference),
            "materialized" | "copy" => Ok(SnapshotStrategy::Materialized),
            _ => Err(anyhow::anyhow!("Invalid snapshot strategy: {}", s)),
        }
    }
}

/// Due-date rule: `max(min_days, steps * days_per_step)` days after assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSchedule {
    pub days_per_step: u32,
    pub min_days: u32,
}

impl Default for CompletionSchedule {
    fn default() -> Self {
        Self {
            days_per_step: 2,
            min_days: 7,
        }
    }
}

impl CompletionSchedule {
    pub fn estimate(&self, flow: &FlowVersion, assigned_at: DateTime<Utc>) -> DateTime<Utc> {
        let steps = u32::try_from(flow.steps.len()).unwrap_or(u32::MAX);
        let days = steps.saturating_mul(self.days_per_step).max(self.min_days);
        assigned_at + Duration::days(i64::from(days))
    }
}

/// Snapshot reference together with the content it resolves to
#[derive(Debug, Clone)]
pub struct CapturedSnapshot {
    pub reference: SnapshotRef,
    pub content: FlowVersion,
}

pub struct SnapshotService {
    flows: Arc<dyn FlowVersionRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    strategy: SnapshotStrategy,
    schedule: CompletionSchedule,
}

impl SnapshotService {
    pub fn new(
        flows: Arc<dyn FlowVersionRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        strategy: SnapshotStrategy,
        schedule: CompletionSchedule,
    ) -> Self {
        Self {
            flows,
            snapshots,
            strategy,
            schedule,
        }
    }

    pub fn strategy(&self) -> SnapshotStrategy {
        self.strategy
    }

    /// Freeze the active version of `original_flow_id`.
    #[tracing::instrument(skip(self), fields(strategy = ?self.strategy))]
    pub async fn capture(
        &self,
        original_flow_id: Uuid,
        at: DateTime<Utc>,
    ) -> EngineResult<CapturedSnapshot> {
        let active = self
            .flows
            .get_active(original_flow_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Active flow version", original_flow_id))?;

        let reference = match self.strategy {
            SnapshotStrategy::Reference => SnapshotRef::Version {
                flow_version_id: active.id,
                version: active.versioned_id(),
            },
            SnapshotStrategy::Materialized => {
                let snapshot = FlowSnapshot {
                    id: Uuid::new_v4(),
                    flow_version_id: active.id,
                    content: active.clone(),
                    taken_at: at,
                };
                self.snapshots.save(&snapshot).await?;
                SnapshotRef::Materialized {
                    snapshot_id: snapshot.id,
                    flow_version_id: active.id,
                    version: active.versioned_id(),
                }
            },
        };

        tracing::debug!(
            flow_version_id = %active.id,
            version = %active.version,
            "Captured flow snapshot"
        );
        Ok(CapturedSnapshot {
            reference,
            content: active,
        })
    }

    pub async fn snapshot_for_assignment(
        &self,
        original_flow_id: Uuid,
        at: DateTime<Utc>,
    ) -> EngineResult<SnapshotRef> {
        Ok(self.capture(original_flow_id, at).await?.reference)
    }

    /// Content behind a snapshot reference. Never consults the active version.
    pub async fn resolve(&self, reference: &SnapshotRef) -> EngineResult<FlowVersion> {
        match reference {
            SnapshotRef::Version {
                flow_version_id,
                version,
            } => self
                .flows
                .get_by_version(*version)
                .await?
                .ok_or_else(|| EngineError::not_found("Flow version", *flow_version_id)),
            SnapshotRef::Materialized { snapshot_id, .. } => self
                .snapshots
                .get(*snapshot_id)
                .await?
                .map(|s| s.content)
                .ok_or_else(|| EngineError::not_found("Flow snapshot", *snapshot_id)),
        }
    }

    pub fn estimate_completion_date(
        &self,
        flow: &FlowVersion,
        assigned_at: DateTime<Utc>,
    ) -> DateTime<Utc> {
        self.schedule.estimate(flow, assigned_at)
    }
}
