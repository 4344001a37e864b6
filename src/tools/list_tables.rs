//! ListTables tool for database table exploration

use crate::context::ContextManager;
use crate::error::DatabaseError;
use crate::schema_queries::list_tables_query;
use crate::tools::Tool;
use crate::tools::helpers::resolve_target_database;
use crate::tools::timeout::execute_with_timeout;
use crate::types::{ListTablesArgs, ListTablesOutput, ToolOutcome};
use sqlx::Row;
use std::sync::Arc;

#[derive(Clone)]
pub struct ListTablesTool {
    contexts: Arc<ContextManager>,
}

impl ListTablesTool {
    pub fn new(contexts: Arc<ContextManager>) -> Self {
        Self { contexts }
    }

    async fn run(&self, args: &ListTablesArgs) -> Result<ListTablesOutput, DatabaseError> {
        let database = resolve_target_database(&self.contexts, args.database.as_deref()).await?;
        let timeouts = self.contexts.settings().timeouts.clone();

        log::info!("Listing tables of {}", database);

        let schema = database.clone();
        let rows = self
            .contexts
            .scoped(Some(database.as_str()), |target| async move {
                execute_with_timeout(
                    &timeouts,
                    timeouts.metadata,
                    || {
                        let pool = target.pool().clone();
                        let schema = schema.clone();
                        async move {
                            sqlx::query(list_tables_query())
                                .bind(schema)
                                .fetch_all(&pool)
                                .await
                        }
                    },
                    "Listing tables",
                )
                .await
            })
            .await?;

        let tables: Vec<String> = rows
            .iter()
            .filter_map(|row| row.try_get("table_name").ok())
            .collect();

        Ok(ListTablesOutput {
            success: true,
            message: format!("Found {} table(s) in {}", tables.len(), database),
            database,
            count: tables.len(),
            tables,
        })
    }
}

impl Tool for ListTablesTool {
    type Args = ListTablesArgs;
    type Output = ListTablesOutput;
    type Echo = ListTablesArgs;

    fn name() -> &'static str {
        "list_tables"
    }

    fn read_only() -> bool {
        true
    }

    async fn execute(&self, args: ListTablesArgs) -> ToolOutcome<ListTablesOutput, ListTablesArgs> {
        match self.run(&args).await {
            Ok(output) => ToolOutcome::Success(output),
            Err(e) => {
                log::error!("{} failed: {}", Self::name(), e);
                ToolOutcome::failure(&e, args)
            }
        }
    }
}
