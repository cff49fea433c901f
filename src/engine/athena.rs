//! [`ExecutionClient`] backed by the Amazon Athena API.

use super::{ClientError, ExecutionClient, RawResults};
use crate::model::{ColumnDescriptor, ExecutionId, ExecutionState, ExecutionStatus, Row};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::primitives::DateTime;
use aws_sdk_athena::types::{
    ColumnInfo, QueryExecutionContext, QueryExecutionState, ResultConfiguration,
};
use aws_sdk_athena::Client;
use time::OffsetDateTime;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AthenaClient {
    client: Client,
}

impl AthenaClient {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

fn service_error<E>(err: E) -> ClientError
where
    E: std::error::Error,
{
    ClientError::Service(DisplayErrorContext(err).to_string())
}

fn map_state(state: &QueryExecutionState) -> Result<ExecutionState, ClientError> {
    match state {
        QueryExecutionState::Queued => Ok(ExecutionState::Queued),
        QueryExecutionState::Running => Ok(ExecutionState::Running),
        QueryExecutionState::Succeeded => Ok(ExecutionState::Succeeded),
        QueryExecutionState::Failed => Ok(ExecutionState::Failed),
        QueryExecutionState::Cancelled => Ok(ExecutionState::Cancelled),
        other => Err(ClientError::Malformed(format!(
            "unrecognized execution state {}",
            other.as_str()
        ))),
    }
}

fn to_offset(dt: &DateTime) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos()).ok()
}

fn to_column(info: &ColumnInfo) -> ColumnDescriptor {
    ColumnDescriptor {
        name: info.name().to_string(),
        type_name: info.r#type().to_string(),
        schema_name: info.schema_name().map(str::to_string),
        table_name: info.table_name().map(str::to_string),
        nullable: info.nullable().map(|n| n.as_str().to_string()),
    }
}

#[async_trait]
impl ExecutionClient for AthenaClient {
    async fn submit(
        &self,
        sql: &str,
        data_source: &str,
        output_location: &str,
    ) -> Result<ExecutionId, ClientError> {
        debug!(database = data_source, sql, "starting query execution");
        let output = self
            .client
            .start_query_execution()
            .query_string(sql)
            .query_execution_context(QueryExecutionContext::builder().database(data_source).build())
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(output_location)
                    .build(),
            )
            .send()
            .await
            .map_err(service_error)?;

        output
            .query_execution_id()
            .map(ExecutionId::new)
            .ok_or_else(|| ClientError::Malformed("no execution id in start response".into()))
    }

    async fn get_status(&self, execution_id: &ExecutionId) -> Result<ExecutionStatus, ClientError> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(execution_id.as_str())
            .send()
            .await
            .map_err(service_error)?;

        let execution = output
            .query_execution()
            .ok_or_else(|| ClientError::NotFound(execution_id.clone()))?;
        let status = execution
            .status()
            .ok_or_else(|| ClientError::Malformed(format!("no status for {execution_id}")))?;
        let state = status
            .state()
            .ok_or_else(|| ClientError::Malformed(format!("no state for {execution_id}")))?;

        Ok(ExecutionStatus {
            state: map_state(state)?,
            submitted_at: status.submission_date_time().and_then(to_offset),
            completed_at: status.completion_date_time().and_then(to_offset),
            state_change_reason: status.state_change_reason().map(str::to_string),
        })
    }

    async fn get_results(&self, execution_id: &ExecutionId) -> Result<RawResults, ClientError> {
        let mut results = RawResults::default();
        let mut next_token: Option<String> = None;
        let mut page = 0usize;

        loop {
            let output = self
                .client
                .get_query_results()
                .query_execution_id(execution_id.as_str())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(service_error)?;

            if let Some(set) = output.result_set() {
                // Every page repeats the metadata; the first one is authoritative.
                if page == 0 {
                    if let Some(meta) = set.result_set_metadata() {
                        results.columns = meta.column_info().iter().map(to_column).collect();
                    }
                }
                results.rows.extend(set.rows().iter().map(|row| {
                    row.data()
                        .iter()
                        .map(|datum| datum.var_char_value().map(str::to_string))
                        .collect::<Row>()
                }));
            }
            page += 1;

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(
            %execution_id,
            pages = page,
            rows = results.rows.len(),
            "fetched query results"
        );
        Ok(results)
    }

    async fn cancel(&self, execution_id: &ExecutionId) -> Result<(), ClientError> {
        self.client
            .stop_query_execution()
            .query_execution_id(execution_id.as_str())
            .send()
            .await
            .map_err(service_error)?;
        Ok(())
    }
}
