//! Transactional write tool

use crate::context::ContextManager;
use crate::error::DatabaseError;
use crate::readonly::validate_write_query;
use crate::tools::Tool;
use crate::tools::helpers::{preview, requested_database};
use crate::tools::timeout::execute_once;
use crate::types::{ExecuteWriteArgs, ExecuteWriteEcho, ExecuteWriteOutput, ToolOutcome};
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;
use std::sync::Arc;

/// Runs one INSERT/UPDATE/DELETE/REPLACE inside its own transaction
#[derive(Clone)]
pub struct ExecuteWriteTool {
    contexts: Arc<ContextManager>,
}

impl ExecuteWriteTool {
    pub fn new(contexts: Arc<ContextManager>) -> Self {
        Self { contexts }
    }

    async fn run(&self, args: &ExecuteWriteArgs) -> Result<ExecuteWriteOutput, DatabaseError> {
        validate_write_query(&args.query)?;

        let requested = requested_database(args.database.as_deref());
        let timeout = self.contexts.settings().timeouts.query;
        let params: &[Value] = args.params.as_deref().unwrap_or_default();
        let sql = args.query.as_str();

        log::info!(
            "Executing write: {} ({} parameter(s))",
            preview(sql),
            params.len()
        );

        let (affected_rows, last_insert_id, database) = self
            .contexts
            .scoped(requested, |target| async move {
                let mut tx =
                    execute_once(timeout, target.pool().begin(), "Beginning transaction").await?;

                let query = params
                    .iter()
                    .fold(sqlx::query(sql), |query, value| bind_json(query, value));

                let executed =
                    execute_once(timeout, query.execute(&mut *tx), "Executing write").await;

                match executed {
                    Ok(done) => {
                        execute_once(timeout, tx.commit(), "Committing transaction")
                            .await
                            .map_err(|e| DatabaseError::TransactionFailure(e.to_string()))?;
                        Ok((
                            done.rows_affected(),
                            done.last_insert_id(),
                            target.database().map(str::to_string),
                        ))
                    }
                    Err(e) => {
                        if let Err(rollback_err) = tx.rollback().await {
                            log::error!("Rollback failed: {}", rollback_err);
                        } else {
                            log::warn!("Write rolled back: {}", e);
                        }
                        Err(DatabaseError::TransactionFailure(e.to_string()))
                    }
                }
            })
            .await?;

        Ok(ExecuteWriteOutput {
            success: true,
            message: format!("Write committed, {} row(s) affected", affected_rows),
            database,
            query: args.query.clone(),
            affected_rows,
            last_insert_id,
        })
    }
}

/// Bind one JSON value positionally
///
/// null -> NULL, bool -> BOOL, integers -> BIGINT (unsigned above
/// `i64::MAX`), floats -> DOUBLE, strings -> VARCHAR, arrays and objects ->
/// their JSON text.
pub fn bind_json<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                match n.as_f64() {
                    Some(f) => query.bind(f),
                    None => query.bind(n.to_string()),
                }
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}

impl Tool for ExecuteWriteTool {
    type Args = ExecuteWriteArgs;
    type Output = ExecuteWriteOutput;
    type Echo = ExecuteWriteEcho;

    fn name() -> &'static str {
        "execute_write"
    }

    fn read_only() -> bool {
        false
    }

    async fn execute(
        &self,
        args: ExecuteWriteArgs,
    ) -> ToolOutcome<ExecuteWriteOutput, ExecuteWriteEcho> {
        match self.run(&args).await {
            Ok(output) => ToolOutcome::Success(output),
            Err(e) => {
                log::error!("{} failed: {}", Self::name(), e);
                ToolOutcome::failure(&e, args.into())
            }
        }
    }
}
