//! Execution client boundary.
//!
//! The lifecycle controller talks to the query service only through
//! [`ExecutionClient`], so the transport can be swapped for an in-memory fake.

pub mod athena;

use crate::model::{ColumnDescriptor, ExecutionId, ExecutionStatus, Row};
use async_trait::async_trait;
use thiserror::Error;

/// Transport or service failure reported by an [`ExecutionClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("service error: {0}")]
    Service(String),

    #[error("execution {0} is not known to the service")]
    NotFound(ExecutionId),

    #[error("malformed service response: {0}")]
    Malformed(String),
}

/// Raw column/row payload as returned by the service, before assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResults {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
}

/// Capability set of the remote query service.
///
/// Implementations must be safe to share between concurrently running
/// controllers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Start an execution; the service writes full results to `output_location`.
    async fn submit(
        &self,
        sql: &str,
        data_source: &str,
        output_location: &str,
    ) -> Result<ExecutionId, ClientError>;

    async fn get_status(&self, execution_id: &ExecutionId) -> Result<ExecutionStatus, ClientError>;

    /// Fetch every row of a succeeded execution.
    ///
    /// Calling this before the execution reached `Succeeded` is a sequencing
    /// error on the caller's side.
    async fn get_results(&self, execution_id: &ExecutionId) -> Result<RawResults, ClientError>;

    /// Ask the service to stop a running execution.
    async fn cancel(&self, execution_id: &ExecutionId) -> Result<(), ClientError>;
}
