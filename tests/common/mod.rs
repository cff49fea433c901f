#![allow(dead_code)]

use async_trait::async_trait;
use athena_query::engine::{ClientError, ExecutionClient, RawResults};
use athena_query::model::{ColumnDescriptor, ExecutionId, ExecutionState, ExecutionStatus};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Arguments of one `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub sql: String,
    pub data_source: String,
    pub output_location: String,
}

/// In-memory stand-in for the query service.
///
/// Status answers come from `script` in order; once it is drained every
/// further check reports `settled`.
pub struct FakeClient {
    execution_id: String,
    fail_with: Option<ClientError>,
    script: Mutex<VecDeque<ExecutionState>>,
    settled: ExecutionState,
    results: RawResults,
    pub submits: Mutex<Vec<Submitted>>,
    pub status_calls: AtomicUsize,
    pub result_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
}

impl FakeClient {
    fn with(
        execution_id: &str,
        script: Vec<ExecutionState>,
        settled: ExecutionState,
        results: RawResults,
        fail_with: Option<ClientError>,
    ) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            fail_with,
            script: Mutex::new(script.into()),
            settled,
            results,
            submits: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
        }
    }

    /// Reports `Succeeded` on the first status check.
    pub fn succeeding(execution_id: &str, results: RawResults) -> Self {
        Self::with(
            execution_id,
            Vec::new(),
            ExecutionState::Succeeded,
            results,
            None,
        )
    }

    /// Every call fails at the transport layer.
    pub fn failing() -> Self {
        Self::with(
            "unused",
            Vec::new(),
            ExecutionState::Running,
            RawResults::default(),
            Some(ClientError::Service("mock transport failure".into())),
        )
    }

    /// `Running` for `running_polls` checks, then `terminal` for good.
    pub fn slow(execution_id: &str, running_polls: usize, terminal: ExecutionState) -> Self {
        Self::with(
            execution_id,
            vec![ExecutionState::Running; running_polls],
            terminal,
            viewership_results(),
            None,
        )
    }

    /// Never leaves `Running`.
    pub fn stuck(execution_id: &str) -> Self {
        Self::with(
            execution_id,
            Vec::new(),
            ExecutionState::Running,
            RawResults::default(),
            None,
        )
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn result_calls(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> Vec<Submitted> {
        self.submits.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), ClientError> {
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExecutionClient for FakeClient {
    async fn submit(
        &self,
        sql: &str,
        data_source: &str,
        output_location: &str,
    ) -> Result<ExecutionId, ClientError> {
        self.submits.lock().unwrap().push(Submitted {
            sql: sql.to_string(),
            data_source: data_source.to_string(),
            output_location: output_location.to_string(),
        });
        self.check()?;
        Ok(ExecutionId::new(self.execution_id.clone()))
    }

    async fn get_status(&self, _execution_id: &ExecutionId) -> Result<ExecutionStatus, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let state = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.settled);
        Ok(ExecutionStatus::new(state))
    }

    async fn get_results(&self, _execution_id: &ExecutionId) -> Result<RawResults, ClientError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.results.clone())
    }

    async fn cancel(&self, _execution_id: &ExecutionId) -> Result<(), ClientError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.check()
    }
}

/// One `max_job_id` column holding a single row.
pub fn viewership_results() -> RawResults {
    RawResults {
        columns: vec![ColumnDescriptor {
            schema_name: Some("job_id".into()),
            table_name: Some("viewership".into()),
            ..ColumnDescriptor::new("max_job_id", "string")
        }],
        rows: vec![vec![Some("20200825".into())]],
    }
}
