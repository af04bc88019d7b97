//! CloudFormation stack status codes and their classification
//!
//! Every status string the control plane can report is parsed into a closed
//! `StackStatus` enum. Call sites never pattern-match on raw strings; they ask
//! for a [`StatusClass`] instead.

use std::fmt;
use std::str::FromStr;

/// How a status relates to the operation that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// An operation is still running; the status will change on its own
    InProgress,
    /// Terminal and successful
    Succeeded,
    /// Terminal and failed (including completed rollbacks)
    Failed,
}

/// Stack status as reported by CloudFormation
///
/// Unknown values are kept verbatim in [`StackStatus::Other`] and classified
/// by suffix, so a status added by AWS later still behaves sensibly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StackStatus {
    CreateInProgress,
    CreateFailed,
    CreateComplete,
    RollbackInProgress,
    RollbackFailed,
    RollbackComplete,
    DeleteInProgress,
    DeleteFailed,
    DeleteComplete,
    UpdateInProgress,
    UpdateCompleteCleanupInProgress,
    UpdateComplete,
    UpdateFailed,
    UpdateRollbackInProgress,
    UpdateRollbackFailed,
    UpdateRollbackCompleteCleanupInProgress,
    UpdateRollbackComplete,
    ReviewInProgress,
    ImportInProgress,
    ImportComplete,
    ImportRollbackInProgress,
    ImportRollbackFailed,
    ImportRollbackComplete,
    #[strum(default)]
    Other(String),
}

impl StackStatus {
    /// Parse a status string; never fails, unknown values become `Other`
    pub fn parse(s: &str) -> Self {
        // `#[strum(default)]` makes this infallible
        Self::from_str(s).unwrap_or_else(|_| Self::Other(s.to_string()))
    }

    /// Wire representation (e.g. `CREATE_COMPLETE`)
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateFailed => "CREATE_FAILED",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            Self::RollbackFailed => "ROLLBACK_FAILED",
            Self::RollbackComplete => "ROLLBACK_COMPLETE",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            Self::UpdateComplete => "UPDATE_COMPLETE",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
            Self::UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
            Self::UpdateRollbackCompleteCleanupInProgress => {
                "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS"
            }
            Self::UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
            Self::ReviewInProgress => "REVIEW_IN_PROGRESS",
            Self::ImportInProgress => "IMPORT_IN_PROGRESS",
            Self::ImportComplete => "IMPORT_COMPLETE",
            Self::ImportRollbackInProgress => "IMPORT_ROLLBACK_IN_PROGRESS",
            Self::ImportRollbackFailed => "IMPORT_ROLLBACK_FAILED",
            Self::ImportRollbackComplete => "IMPORT_ROLLBACK_COMPLETE",
            Self::Other(s) => s,
        }
    }

    /// Classify this status
    pub fn class(&self) -> StatusClass {
        match self {
            Self::CreateComplete
            | Self::UpdateComplete
            | Self::DeleteComplete
            | Self::ImportComplete => StatusClass::Succeeded,

            Self::RollbackComplete
            | Self::UpdateRollbackComplete
            | Self::ImportRollbackComplete
            | Self::CreateFailed
            | Self::RollbackFailed
            | Self::DeleteFailed
            | Self::UpdateFailed
            | Self::UpdateRollbackFailed
            | Self::ImportRollbackFailed => StatusClass::Failed,

            Self::Other(s) if s.ends_with("_FAILED") => StatusClass::Failed,

            _ => StatusClass::InProgress,
        }
    }

    pub fn is_success(&self) -> bool {
        self.class() == StatusClass::Succeeded
    }

    /// True while a deletion is running
    pub fn is_deleting(&self) -> bool {
        matches!(self, Self::DeleteInProgress)
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
