use crate::engine::ClientError;
use crate::model::{ExecutionId, ExecutionState};
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = QueryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("query submission failed")]
    Submission { source: ClientError },

    #[error("lookup for execution {execution_id} failed")]
    Lookup {
        execution_id: ExecutionId,
        source: ClientError,
    },

    #[error("execution {execution_id} ended as {state}{}", reason_suffix(.reason))]
    Execution {
        execution_id: ExecutionId,
        state: ExecutionState,
        reason: Option<String>,
    },

    #[error("execution {execution_id} still {last_state} after {}", format_elapsed(.elapsed))]
    Timeout {
        execution_id: ExecutionId,
        elapsed: Duration,
        last_state: ExecutionState,
    },
}

impl QueryError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        QueryError::Configuration(msg.into())
    }

    /// Execution the error refers to, when one had already been assigned.
    pub fn execution_id(&self) -> Option<&ExecutionId> {
        match self {
            QueryError::Lookup { execution_id, .. }
            | QueryError::Execution { execution_id, .. }
            | QueryError::Timeout { execution_id, .. } => Some(execution_id),
            QueryError::Configuration(_) | QueryError::Submission { .. } => None,
        }
    }
}

fn format_elapsed(elapsed: &Duration) -> String {
    humantime::format_duration(*elapsed).to_string()
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(r) if !r.is_empty() => format!(": {r}"),
        _ => String::new(),
    }
}
