//! Read query tool

use crate::context::ContextManager;
use crate::error::DatabaseError;
use crate::readonly::validate_read_query;
use crate::sql_limiter::apply_row_limit;
use crate::tools::Tool;
use crate::tools::helpers::{preview, requested_database};
use crate::tools::row_converter::{column_names, row_to_json};
use crate::tools::timeout::execute_with_timeout;
use crate::types::{QueryDataArgs, QueryDataOutput, ToolOutcome};
use std::sync::Arc;

/// Runs read queries with row limiting
#[derive(Clone)]
pub struct QueryDataTool {
    contexts: Arc<ContextManager>,
}

impl QueryDataTool {
    pub fn new(contexts: Arc<ContextManager>) -> Self {
        Self { contexts }
    }

    async fn run(&self, args: &QueryDataArgs) -> Result<QueryDataOutput, DatabaseError> {
        validate_read_query(&args.query)?;

        let limit = usize::try_from(args.limit).unwrap_or(0);
        let plan = apply_row_limit(&args.query, limit);
        let requested = requested_database(args.database.as_deref());
        let timeouts = self.contexts.settings().timeouts.clone();

        log::info!("Executing query: {}", preview(&plan.sql));

        let executed = plan.sql.clone();
        let (mut rows, database) = self
            .contexts
            .scoped(requested, |target| async move {
                let rows = execute_with_timeout(
                    &timeouts,
                    timeouts.query,
                    || {
                        let pool = target.pool().clone();
                        let sql = executed.clone();
                        async move { sqlx::raw_sql(&sql).fetch_all(&pool).await }
                    },
                    "Executing query",
                )
                .await?;

                Ok((rows, target.database().map(str::to_string)))
            })
            .await?;

        let mut truncated = false;
        if let Some(max) = plan.truncate_to
            && rows.len() > max
        {
            rows.truncate(max);
            truncated = true;
        }

        let columns = rows.first().map(column_names).unwrap_or_default();
        let rows = rows
            .iter()
            .map(row_to_json)
            .collect::<Result<Vec<_>, _>>()?;
        let row_count = rows.len();

        Ok(QueryDataOutput {
            success: true,
            message: format!("Query executed successfully, {} row(s) returned", row_count),
            database,
            query: plan.sql,
            columns,
            rows,
            row_count,
            truncated,
        })
    }
}

impl Tool for QueryDataTool {
    type Args = QueryDataArgs;
    type Output = QueryDataOutput;
    type Echo = QueryDataArgs;

    fn name() -> &'static str {
        "query_data"
    }

    fn read_only() -> bool {
        true
    }

    async fn execute(&self, args: QueryDataArgs) -> ToolOutcome<QueryDataOutput, QueryDataArgs> {
        match self.run(&args).await {
            Ok(output) => ToolOutcome::Success(output),
            Err(e) => {
                log::error!("{} failed: {}", Self::name(), e);
                ToolOutcome::failure(&e, args)
            }
        }
    }
}
