//! Orchestrator error taxonomy and run reports

use crate::aws::cloudformation::{StackEvent, format_events};
use serde::Serialize;
use stackrun_common::{OrphanKind, StackStatus};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Fatal errors of the deploy path; recorded per unit during teardown.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Bad template, detected before any create call
    #[error("{unit}: invalid stack definition: {reason}")]
    DefinitionInvalid { unit: String, reason: String },

    /// Stack exists in a state the engine will not touch
    #[error("{unit} exists in state {status}; delete or fix it manually before re-running")]
    ConflictingState {
        unit: String,
        status: StackStatus,
        events: Vec<StackEvent>,
    },

    /// Required upstream output/export absent
    #[error("{unit}: required parameter {parameter} is unavailable ({wanted})")]
    MissingInput {
        unit: String,
        parameter: String,
        wanted: String,
    },

    /// Remote operation ended in a failure status
    #[error("{unit} reached {status}")]
    OperationFailed {
        unit: String,
        status: StackStatus,
        events: Vec<StackEvent>,
    },

    /// Polling budget exhausted
    #[error(
        "timed out after {}s waiting for {unit} (last status: {})",
        .waited.as_secs(),
        last_status_label(.last_status)
    )]
    Timeout {
        unit: String,
        waited: Duration,
        last_status: Option<StackStatus>,
        events: Vec<StackEvent>,
    },

    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

fn last_status_label(status: &Option<StackStatus>) -> String {
    status
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "not visible".to_string())
}

impl OrchestratorError {
    /// Diagnostic events attached to the error
    pub fn events(&self) -> &[StackEvent] {
        match self {
            Self::ConflictingState { events, .. }
            | Self::OperationFailed { events, .. }
            | Self::Timeout { events, .. } => events,
            _ => &[],
        }
    }

    /// The message followed by any recent events, one per line
    pub fn detailed(&self) -> String {
        match self {
            Self::ConflictingState { .. } | Self::OperationFailed { .. } | Self::Timeout { .. } => {
                format!("{self}\nRecent events:\n{}", format_events(self.events()))
            }
            _ => self.to_string(),
        }
    }
}

/// How the guard brought a unit to a successful state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Created by this run
    Created(StackStatus),
    /// An operation was already running; this run waited for it
    AwaitedInFlight(StackStatus),
    /// Already complete, nothing to do
    Skipped(StackStatus),
}

impl GuardOutcome {
    pub fn status(&self) -> &StackStatus {
        match self {
            Self::Created(s) | Self::AwaitedInFlight(s) | Self::Skipped(s) => s,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::AwaitedInFlight(_) => "awaited",
            Self::Skipped(_) => "skipped",
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Deploy state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "unit", rename_all = "snake_case")]
pub enum DeployPhase {
    NotStarted,
    PerUnit(usize),
    Done,
    Failed(usize),
}

/// Per-unit line of a deploy summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub role: String,
    pub name: String,
    pub outcome: String,
    pub status: String,
}

/// Operator-facing value pulled from a unit's outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub label: String,
    pub value: String,
}

/// Result of a successful deploy
#[derive(Debug, Clone, Serialize)]
pub struct DeploySummary {
    pub namespace: String,
    pub phase: DeployPhase,
    pub units: Vec<UnitReport>,
    pub highlights: Vec<Highlight>,
    /// Artifact bucket, when artifacts were published
    pub artifact_bucket: Option<String>,
}

impl DeploySummary {
    /// Units this run created (as opposed to skipped or awaited)
    pub fn created_count(&self) -> usize {
        self.units.iter().filter(|u| u.outcome == "created").count()
    }
}

/// Non-fatal sweep problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepWarning {
    pub bucket: String,
    pub message: String,
}

impl fmt::Display for SweepWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.bucket, self.message)
    }
}

/// Outcome of emptying buckets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub warnings: Vec<SweepWarning>,
}

impl SweepReport {
    pub fn merge(&mut self, other: SweepReport) {
        self.removed += other.removed;
        self.warnings.extend(other.warnings);
    }

    pub(crate) fn warn(&mut self, bucket: &str, message: impl Into<String>) {
        self.warnings.push(SweepWarning {
            bucket: bucket.to_string(),
            message: message.into(),
        });
    }
}

/// Outcome of the orphan pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanReport {
    pub deleted: Vec<(OrphanKind, String)>,
    pub warnings: Vec<String>,
}

/// What happened to one unit during teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// No such stack; skipped
    NotFound,
    Deleted,
    /// Deletion failed or timed out; the message includes recent events
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownUnit {
    pub role: String,
    pub name: String,
    pub outcome: TeardownOutcome,
}

/// Result of a teardown; never an error, check [`TeardownReport::is_success`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub units: Vec<TeardownUnit>,
    pub sweep: SweepReport,
    pub orphans: OrphanReport,
    /// Problems removing the artifact bucket
    pub artifact_warnings: Vec<String>,
}

impl TeardownReport {
    /// True iff every unit is gone
    pub fn is_success(&self) -> bool {
        self.failed_units().next().is_none()
    }

    pub fn failed_units(&self) -> impl Iterator<Item = &TeardownUnit> {
        self.units
            .iter()
            .filter(|u| matches!(u.outcome, TeardownOutcome::Failed(_)))
    }

    pub fn deleted_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.outcome == TeardownOutcome::Deleted)
            .count()
    }
}
