use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Phase of a transaction.
///
/// Monotonic along `trying -> confirming -> committed` or
/// `trying -> cancelling -> aborted`; `failed` is reachable only from
/// `confirming` (a Confirm failure that could not be fully compensated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Trying,
    Confirming,
    Cancelling,
    Committed,
    Aborted,
    Failed,
}

impl Phase {
    /// `true` for the three states a transaction never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Aborted | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trying => "trying",
            Self::Confirming => "confirming",
            Self::Cancelling => "cancelling",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for Phase {
    type Err = PhaseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trying" => Ok(Self::Trying),
            "confirming" => Ok(Self::Confirming),
            "cancelling" => Ok(Self::Cancelling),
            "committed" => Ok(Self::Committed),
            "aborted" => Ok(Self::Aborted),
            "failed" => Ok(Self::Failed),
            other => Err(PhaseParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Phase`] string.
#[derive(Debug, Clone)]
pub struct PhaseParseError(pub String);

impl fmt::Display for PhaseParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transaction phase: {:?}", self.0)
    }
}

impl std::error::Error for PhaseParseError {}

// ---------------------------------------------------------------------------

/// Status of a single task (one action, within one transaction). Mirrors
/// the in-memory `TaskInstance` state in `tcc-core`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskRunStatus {
    Pending,
    Executing,
    Retrying,
    Success,
    Failed,
    Confirmed,
    Cancelled,
}

impl fmt::Display for TaskRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Executing => "executing",
            Self::Retrying => "retrying",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskRunStatus {
    type Err = TaskRunStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "executing" => Ok(Self::Executing),
            "retrying" => Ok(Self::Retrying),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(TaskRunStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskRunStatus`] string.
#[derive(Debug, Clone)]
pub struct TaskRunStatusParseError(pub String);

impl fmt::Display for TaskRunStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task run status: {:?}", self.0)
    }
}

impl std::error::Error for TaskRunStatusParseError {}

// ---------------------------------------------------------------------------
// Durable records
// ---------------------------------------------------------------------------

/// Per-action state snapshot embedded in a [`TxRecordRow`]'s `task_states`
/// JSON column. One entry per action in the flow, in flow order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStateSnapshot {
    pub action_id: String,
    pub status: TaskRunStatus,
    pub try_times: i32,
    pub error_msg: Option<String>,
}

/// Row shape of the `tcc_records` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TxRecordRow {
    pub id: Uuid,
    pub flow_id: String,
    pub phase: Phase,
    pub task_states: sqlx::types::Json<Vec<TaskStateSnapshot>>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Row shape of the `tcc_flows` table: a named flow definition stored as
/// raw text (JSON or YAML).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FlowRow {
    pub id: String,
    pub definition: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_display_roundtrip() {
        let variants = [
            Phase::Trying,
            Phase::Confirming,
            Phase::Cancelling,
            Phase::Committed,
            Phase::Aborted,
            Phase::Failed,
        ];
        for v in &variants {
            let s = v.to_string();
            let parsed: Phase = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn phase_invalid() {
        assert!("nope".parse::<Phase>().is_err());
    }

    #[test]
    fn phase_terminal_states() {
        assert!(Phase::Committed.is_terminal());
        assert!(Phase::Aborted.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::Trying.is_terminal());
        assert!(!Phase::Confirming.is_terminal());
        assert!(!Phase::Cancelling.is_terminal());
    }

    #[test]
    fn task_run_status_display_roundtrip() {
        let variants = [
            TaskRunStatus::Pending,
            TaskRunStatus::Executing,
            TaskRunStatus::Retrying,
            TaskRunStatus::Success,
            TaskRunStatus::Failed,
            TaskRunStatus::Confirmed,
            TaskRunStatus::Cancelled,
        ];
        for v in &variants {
            let s = v.to_string();
            let parsed: TaskRunStatus = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn task_run_status_invalid() {
        assert!("nope".parse::<TaskRunStatus>().is_err());
    }
}
