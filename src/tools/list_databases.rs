//! ListDatabases tool

use crate::context::ContextManager;
use crate::error::DatabaseError;
use crate::schema_queries::{is_system_schema, list_databases_query};
use crate::tools::Tool;
use crate::tools::timeout::execute_with_timeout;
use crate::types::{ListDatabasesOutput, NoArgs, ToolOutcome};
use sqlx::Row;
use std::sync::Arc;

#[derive(Clone)]
pub struct ListDatabasesTool {
    contexts: Arc<ContextManager>,
}

impl ListDatabasesTool {
    pub fn new(contexts: Arc<ContextManager>) -> Self {
        Self { contexts }
    }

    async fn run(&self) -> Result<ListDatabasesOutput, DatabaseError> {
        let timeouts = self.contexts.settings().timeouts.clone();

        let rows = self
            .contexts
            .scoped(None, |target| async move {
                execute_with_timeout(
                    &timeouts,
                    timeouts.metadata,
                    || {
                        let pool = target.pool().clone();
                        async move { sqlx::raw_sql(list_databases_query()).fetch_all(&pool).await }
                    },
                    "Listing databases",
                )
                .await
            })
            .await?;

        let mut databases = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get(0).map_err(|e| {
                DatabaseError::QueryError(format!("Failed to read database name: {}", e))
            })?;
            if !is_system_schema(&name) {
                databases.push(name);
            }
        }

        Ok(ListDatabasesOutput {
            success: true,
            message: format!("Found {} database(s)", databases.len()),
            count: databases.len(),
            databases,
        })
    }
}

impl Tool for ListDatabasesTool {
    type Args = NoArgs;
    type Output = ListDatabasesOutput;
    type Echo = NoArgs;

    fn name() -> &'static str {
        "list_databases"
    }

    fn read_only() -> bool {
        true
    }

    async fn execute(&self, args: NoArgs) -> ToolOutcome<ListDatabasesOutput, NoArgs> {
        match self.run().await {
            Ok(output) => ToolOutcome::Success(output),
            Err(e) => {
                log::error!("{} failed: {}", Self::name(), e);
                ToolOutcome::failure(&e, args)
            }
        }
    }
}
