//! Execution lifecycle controller.
//!
//! Owns the submit / poll / fetch protocol against an [`ExecutionClient`]. The
//! controller keeps no per-execution state, so one instance can drive any
//! number of executions from concurrent tasks.

use super::assembly::{assemble, HeaderPolicy};
use super::lifecycle::LifecycleState;
use crate::config::{Config, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use crate::engine::{ClientError, ExecutionClient};
use crate::error::{QueryError, Result};
use crate::model::{
    ExecutionId, ExecutionState, ExecutionStatus, QueryMode, QueryOutcome, QueryRequest, ResultSet,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub output_location: String,
    /// Sleep between status checks; also the amount charged against `timeout` per check.
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub lookup_retries: u32,
    pub header: HeaderPolicy,
}

impl ControllerSettings {
    pub fn new(output_location: impl Into<String>) -> Self {
        Self {
            output_location: output_location.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            lookup_retries: 0,
            header: HeaderPolicy::Keep,
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            output_location: cfg.output_location.clone(),
            poll_interval: cfg.poll_interval,
            timeout: cfg.timeout,
            lookup_retries: cfg.lookup_retries,
            header: if cfg.skip_header {
                HeaderPolicy::Skip
            } else {
                HeaderPolicy::Keep
            },
        }
    }
}

#[derive(Clone)]
pub struct LifecycleController {
    client: Arc<dyn ExecutionClient>,
    settings: ControllerSettings,
}

impl LifecycleController {
    pub fn new(client: Arc<dyn ExecutionClient>, settings: ControllerSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Dispatch a request by its mode. An absent request is a no-op.
    pub async fn execute(&self, request: Option<&QueryRequest>) -> Result<Option<QueryOutcome>> {
        let Some(request) = request else {
            debug!("no request supplied, nothing to do");
            return Ok(None);
        };

        let outcome = match &request.mode {
            QueryMode::SubmitOnly => QueryOutcome {
                execution_id: self.submit(request).await?,
                final_status: None,
                result_set: None,
            },
            QueryMode::StatusOnly { execution_id } => {
                let status = self.poll_once(execution_id).await?;
                QueryOutcome {
                    execution_id: execution_id.clone(),
                    final_status: Some(status.state),
                    result_set: None,
                }
            }
            QueryMode::RunToCompletion => self.run_to_completion(request).await?,
        };
        Ok(Some(outcome))
    }

    /// Start an execution and return the service-assigned id as is.
    pub async fn submit(&self, request: &QueryRequest) -> Result<ExecutionId> {
        let execution_id = self
            .client
            .submit(
                &request.sql,
                &request.data_source,
                &self.settings.output_location,
            )
            .await
            .map_err(|source| QueryError::Submission { source })?;
        info!(%execution_id, database = %request.data_source, "submitted query");
        Ok(execution_id)
    }

    /// One status check, logged as a status line. Failed lookups are retried
    /// up to `lookup_retries` times.
    pub async fn poll_once(&self, execution_id: &ExecutionId) -> Result<ExecutionStatus> {
        let status = self
            .with_lookup_retries(execution_id, "status check", || {
                self.client.get_status(execution_id)
            })
            .await?;
        info!("{}", status_line(execution_id, &status, OffsetDateTime::now_utc()));
        Ok(status)
    }

    pub async fn run_to_completion(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let execution_id = self.submit(request).await?;
        self.complete(execution_id).await
    }

    /// Wait for an already submitted execution and fetch its rows.
    pub async fn complete(&self, execution_id: ExecutionId) -> Result<QueryOutcome> {
        self.wait_for_completion(&execution_id).await?;
        let result_set = self.fetch_result_set(&execution_id).await?;
        Ok(QueryOutcome {
            execution_id,
            final_status: Some(ExecutionState::Succeeded),
            result_set: Some(result_set),
        })
    }

    /// Poll until the execution succeeds, fails, or the timeout budget is spent.
    ///
    /// Each non-terminal observation charges one `poll_interval` to the budget;
    /// the budget is exhausted once the charge exceeds `timeout`. On timeout
    /// the remote execution is asked to stop before the error is returned.
    pub async fn wait_for_completion(&self, execution_id: &ExecutionId) -> Result<ExecutionStatus> {
        let interval = self.settings.poll_interval;
        let mut lifecycle = LifecycleState::Submitted;
        let mut elapsed = Duration::ZERO;

        loop {
            let status = self.poll_once(execution_id).await?;
            let next = lifecycle.observe(status.state);
            if next != lifecycle {
                debug!(%execution_id, from = %lifecycle, to = %next, "lifecycle transition");
            }
            lifecycle = next;

            match lifecycle {
                LifecycleState::Succeeded => return Ok(status),
                LifecycleState::Failed | LifecycleState::Cancelled => {
                    return Err(QueryError::Execution {
                        execution_id: execution_id.clone(),
                        state: status.state,
                        reason: status.state_change_reason,
                    });
                }
                _ => {}
            }

            elapsed = elapsed.saturating_add(interval);
            if elapsed > self.settings.timeout {
                debug!(
                    %execution_id,
                    from = %lifecycle,
                    to = %lifecycle.time_out(),
                    "lifecycle transition"
                );
                self.cancel_abandoned(execution_id).await;
                return Err(QueryError::Timeout {
                    execution_id: execution_id.clone(),
                    elapsed,
                    last_state: status.state,
                });
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Fetch and assemble the rows of a succeeded execution, exactly once.
    pub async fn fetch_result_set(&self, execution_id: &ExecutionId) -> Result<ResultSet> {
        let raw = self
            .with_lookup_retries(execution_id, "result fetch", || {
                self.client.get_results(execution_id)
            })
            .await?;
        Ok(assemble(execution_id, raw, self.settings.header))
    }

    /// Ask the service to stop an execution.
    pub async fn cancel(&self, execution_id: &ExecutionId) -> Result<()> {
        self.client
            .cancel(execution_id)
            .await
            .map_err(|source| lookup_error(execution_id, source))?;
        info!(%execution_id, "requested cancellation");
        Ok(())
    }

    /// Stopping waiting locally does not stop the remote execution, so ask for that too.
    async fn cancel_abandoned(&self, execution_id: &ExecutionId) {
        match self.client.cancel(execution_id).await {
            Ok(()) => info!(%execution_id, "timed out; requested cancellation"),
            Err(e) => warn!(%execution_id, error = %e, "timed out; cancellation request failed"),
        }
    }

    async fn with_lookup_retries<T, F, Fut>(
        &self,
        execution_id: &ExecutionId,
        what: &str,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ClientError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.settings.lookup_retries => {
                    let delay = self
                        .settings
                        .poll_interval
                        .saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(
                        %execution_id,
                        attempt,
                        error = %e,
                        retry_in = ?delay,
                        "{what} failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(source) => return Err(lookup_error(execution_id, source)),
            }
        }
    }
}

fn lookup_error(execution_id: &ExecutionId, source: ClientError) -> QueryError {
    QueryError::Lookup {
        execution_id: execution_id.clone(),
        source,
    }
}

/// Human-readable status line: id, state and time since submission.
pub(crate) fn status_line(
    execution_id: &ExecutionId,
    status: &ExecutionStatus,
    now: OffsetDateTime,
) -> String {
    let duration = status.elapsed_at(now).unwrap_or(Duration::ZERO);
    format!(
        "[query status] query_id={} state={} duration={:.3}s",
        execution_id,
        status.state,
        duration.as_secs_f64()
    )
}
