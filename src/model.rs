use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// Service-assigned handle for one submitted execution.
///
/// Only ever produced by the query service; the client never invents one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the caller wants done with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMode {
    /// Start the execution and return its id right away.
    SubmitOnly,
    /// Look up the state of an execution started earlier.
    StatusOnly { execution_id: ExecutionId },
    /// Start, wait for a terminal state, then fetch the rows.
    RunToCompletion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub sql: String,
    pub data_source: String,
    pub mode: QueryMode,
}

impl QueryRequest {
    pub fn submit(sql: impl Into<String>, data_source: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            data_source: data_source.into(),
            mode: QueryMode::SubmitOnly,
        }
    }

    pub fn run(sql: impl Into<String>, data_source: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            data_source: data_source.into(),
            mode: QueryMode::RunToCompletion,
        }
    }

    pub fn status(execution_id: ExecutionId) -> Self {
        Self {
            sql: String::new(),
            data_source: String::new(),
            mode: QueryMode::StatusOnly { execution_id },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Failed | ExecutionState::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionState::Queued => "QUEUED",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Succeeded => "SUCCEEDED",
            ExecutionState::Failed => "FAILED",
            ExecutionState::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an execution as last reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub submitted_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub state_change_reason: Option<String>,
}

impl ExecutionStatus {
    pub fn new(state: ExecutionState) -> Self {
        Self {
            state,
            submitted_at: None,
            completed_at: None,
            state_change_reason: None,
        }
    }

    /// Time spent since submission, up to completion if the service reported one.
    pub fn elapsed_at(&self, now: OffsetDateTime) -> Option<Duration> {
        let start = self.submitted_at?;
        let end = self.completed_at.unwrap_or(now);
        Some(Duration::try_from(end - start).unwrap_or(Duration::ZERO))
    }
}

/// Column metadata exactly as the service describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub nullable: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            schema_name: None,
            table_name: None,
            nullable: None,
        }
    }
}

/// One value per column, positionally aligned; `None` is a service-side NULL.
pub type Row = Vec<Option<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub execution_id: ExecutionId,
    /// `None` for submit-only requests, which never observe a status.
    pub final_status: Option<ExecutionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_set: Option<ResultSet>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn elapsed_spans_submission_to_completion() {
        let status = ExecutionStatus {
            submitted_at: Some(datetime!(2020-01-01 1:00 UTC)),
            completed_at: Some(datetime!(2020-01-02 1:00 UTC)),
            ..ExecutionStatus::new(ExecutionState::Succeeded)
        };
        let now = datetime!(2030-01-01 0:00 UTC);
        assert_eq!(status.elapsed_at(now), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn elapsed_runs_to_now_while_incomplete() {
        let status = ExecutionStatus {
            submitted_at: Some(datetime!(2020-01-01 1:00 UTC)),
            ..ExecutionStatus::new(ExecutionState::Running)
        };
        let now = datetime!(2020-01-01 1:00:30 UTC);
        assert_eq!(status.elapsed_at(now), Some(Duration::from_secs(30)));
        assert_eq!(ExecutionStatus::new(ExecutionState::Queued).elapsed_at(now), None);
    }

    #[test]
    fn terminal_states() {
        assert!(ExecutionState::Succeeded.is_terminal());
        assert!(ExecutionState::Failed.is_terminal());
        assert!(ExecutionState::Cancelled.is_terminal());
        assert!(!ExecutionState::Queued.is_terminal());
        assert!(!ExecutionState::Running.is_terminal());
    }

    #[test]
    fn outcome_serializes_with_service_state_names() {
        let outcome = QueryOutcome {
            execution_id: ExecutionId::new("12345-12345"),
            final_status: Some(ExecutionState::Succeeded),
            result_set: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["execution_id"], "12345-12345");
        assert_eq!(json["final_status"], "SUCCEEDED");
        assert!(json.get("result_set").is_none());
    }
}
