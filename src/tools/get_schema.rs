//! Get table schema (column information) tool

use crate::context::ContextManager;
use crate::error::DatabaseError;
use crate::schema_queries::{table_columns_query, table_comment_query};
use crate::tools::Tool;
use crate::tools::helpers::resolve_target_database;
use crate::tools::timeout::execute_with_timeout;
use crate::types::{ColumnSchema, GetSchemaArgs, GetSchemaOutput, ToolOutcome};
use sqlx::Row;
use sqlx::mysql::MySqlRow;
use std::sync::Arc;

/// Tool for retrieving table column information
#[derive(Clone)]
pub struct GetSchemaTool {
    contexts: Arc<ContextManager>,
}

impl GetSchemaTool {
    pub fn new(contexts: Arc<ContextManager>) -> Self {
        Self { contexts }
    }

    async fn run(&self, args: &GetSchemaArgs) -> Result<GetSchemaOutput, DatabaseError> {
        let database = resolve_target_database(&self.contexts, args.database.as_deref()).await?;
        let table = args.table_name.trim().to_string();
        let timeouts = self.contexts.settings().timeouts.clone();

        log::info!("Getting schema for {}.{}", database, table);

        let (schema, table_name) = (database.clone(), table.clone());
        let (column_rows, comment) = self
            .contexts
            .scoped(Some(database.as_str()), |target| async move {
                let columns = execute_with_timeout(
                    &timeouts,
                    timeouts.metadata,
                    || {
                        let pool = target.pool().clone();
                        let (schema, table_name) = (schema.clone(), table_name.clone());
                        async move {
                            sqlx::query(table_columns_query())
                                .bind(schema)
                                .bind(table_name)
                                .fetch_all(&pool)
                                .await
                        }
                    },
                    "Reading table columns",
                )
                .await?;

                if columns.is_empty() {
                    return Ok((columns, None));
                }

                let comment = execute_with_timeout(
                    &timeouts,
                    timeouts.metadata,
                    || {
                        let pool = target.pool().clone();
                        let (schema, table_name) = (schema.clone(), table_name.clone());
                        async move {
                            sqlx::query(table_comment_query())
                                .bind(schema)
                                .bind(table_name)
                                .fetch_optional(&pool)
                                .await
                        }
                    },
                    "Reading table comment",
                )
                .await?
                .and_then(|row| row.try_get::<Option<String>, _>("table_comment").ok().flatten())
                .filter(|c| !c.is_empty());

                Ok((columns, comment))
            })
            .await?;

        if column_rows.is_empty() {
            return Err(DatabaseError::TableNotFound(format!(
                "no columns found for table '{}' in database '{}'",
                table, database
            )));
        }

        let columns = column_rows
            .iter()
            .map(column_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GetSchemaOutput {
            success: true,
            message: format!("Schema for {} retrieved successfully", table),
            database,
            table,
            table_comment: comment,
            count: columns.len(),
            columns,
        })
    }
}

fn column_from_row(row: &MySqlRow) -> Result<ColumnSchema, DatabaseError> {
    let text = |name: &str| -> Result<Option<String>, DatabaseError> {
        row.try_get::<Option<String>, _>(name).map_err(|e| {
            DatabaseError::QueryError(format!("Failed to read column metadata '{}': {}", name, e))
        })
    };

    Ok(ColumnSchema {
        name: text("column_name")?.unwrap_or_default(),
        column_type: text("column_type")?.unwrap_or_default(),
        nullable: text("is_nullable")?.is_some_and(|v| v.eq_ignore_ascii_case("YES")),
        key: text("column_key")?.unwrap_or_default(),
        default: text("column_default")?,
        extra: text("extra")?.unwrap_or_default(),
        comment: text("column_comment")?.unwrap_or_default(),
    })
}

impl Tool for GetSchemaTool {
    type Args = GetSchemaArgs;
    type Output = GetSchemaOutput;
    type Echo = GetSchemaArgs;

    fn name() -> &'static str {
        "get_schema"
    }

    fn read_only() -> bool {
        true
    }

    async fn execute(&self, args: GetSchemaArgs) -> ToolOutcome<GetSchemaOutput, GetSchemaArgs> {
        match self.run(&args).await {
            Ok(output) => ToolOutcome::Success(output),
            Err(e) => {
                log::error!("{} failed: {}", Self::name(), e);
                ToolOutcome::failure(&e, args)
            }
        }
    }
}
