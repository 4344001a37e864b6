//! Read-only text resources
//!
//! Both readers turn every failure into a line of text.

use crate::context::ContextManager;
use crate::schema_queries::ping_query;
use crate::tools::timeout::execute_once;
use crate::tools::{ListTablesTool, Tool};
use crate::types::{ListTablesArgs, ToolOutcome};

pub const STATUS_URI: &str = "mysql://status";
pub const TABLES_URI: &str = "mysql://tables";

/// Liveness check against the global context
pub async fn get_status(contexts: &ContextManager) -> String {
    let timeout = contexts.settings().timeouts.metadata;

    let ping = contexts
        .scoped(None, |target| async move {
            execute_once(
                timeout,
                sqlx::raw_sql(ping_query()).execute(target.pool()),
                "Health check",
            )
            .await
        })
        .await;

    match ping {
        Ok(_) => "✅ MySQL server is healthy and ready".to_string(),
        Err(e) => {
            log::warn!("Health check failed: {}", e);
            format!("❌ MySQL server error: {}", e)
        }
    }
}

/// Tables of the default database, one per line
pub async fn get_tables_resource(list_tables: &ListTablesTool) -> String {
    match list_tables.execute(ListTablesArgs::default()).await {
        ToolOutcome::Success(output) if output.tables.is_empty() => {
            format!("📋 No tables found in database {}", output.database)
        }
        ToolOutcome::Success(output) => output
            .tables
            .iter()
            .map(|table| format!("📊 {}", table))
            .collect::<Vec<_>>()
            .join("\n"),
        ToolOutcome::Error(failure) => format!("❌ Error: {}", failure.message),
    }
}
