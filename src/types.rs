//! Tool arguments and structured results

use crate::error::{DatabaseError, ErrorKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row, columns in select order
pub type Row = Map<String, Value>;

fn default_limit() -> i64 {
    100
}

/// Arguments of `query_data`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueryDataArgs {
    /// Read query (SELECT or SHOW)
    pub query: String,

    /// Maximum rows to return; 0 or negative disables the limit
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Database to run against; defaults to the current default database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Arguments of `execute_write`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteWriteArgs {
    /// INSERT, UPDATE, DELETE or REPLACE statement with `?` placeholders
    pub query: String,

    /// Values bound to the `?` placeholders, in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,

    /// Database to run against; defaults to the current default database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Arguments of `list_tables`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListTablesArgs {
    /// Database to list; defaults to the current default database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Arguments of `get_schema`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetSchemaArgs {
    /// Table to describe
    pub table_name: String,

    /// Database holding the table; defaults to the current default database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Arguments of `change_database`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChangeDatabaseArgs {
    /// New default database
    pub database: String,
}

/// Empty input echo for operations without arguments
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoArgs {}

/// Success payload of `query_data`
#[derive(Debug, Clone, Serialize)]
pub struct QueryDataOutput {
    pub success: bool,
    pub message: String,
    pub database: Option<String>,
    /// Text actually executed, after limit injection
    pub query: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    /// Rows were cut to the limit after execution
    pub truncated: bool,
}

/// Success payload of `execute_write`
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteWriteOutput {
    pub success: bool,
    pub message: String,
    pub database: Option<String>,
    pub query: String,
    pub affected_rows: u64,
    pub last_insert_id: u64,
}

/// Failure echo of `execute_write`, always reports zero affected rows
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteWriteEcho {
    #[serde(flatten)]
    pub request: ExecuteWriteArgs,
    pub affected_rows: u64,
}

impl From<ExecuteWriteArgs> for ExecuteWriteEcho {
    fn from(request: ExecuteWriteArgs) -> Self {
        Self {
            request,
            affected_rows: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListDatabasesOutput {
    pub success: bool,
    pub message: String,
    pub databases: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListTablesOutput {
    pub success: bool,
    pub message: String,
    pub database: String,
    pub tables: Vec<String>,
    pub count: usize,
}

/// Column metadata from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Declared type, e.g. `varchar(255)` or `int unsigned`
    pub column_type: String,
    pub nullable: bool,
    /// `PRI`, `UNI`, `MUL` or empty
    pub key: String,
    pub default: Option<String>,
    /// e.g. `auto_increment`
    pub extra: String,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetSchemaOutput {
    pub success: bool,
    pub message: String,
    pub database: String,
    pub table: String,
    pub table_comment: Option<String>,
    pub columns: Vec<ColumnSchema>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeDatabaseOutput {
    pub success: bool,
    pub message: String,
    pub previous_database: Option<String>,
    pub database: String,
}

/// Failure payload: classification, message and the caller's input
#[derive(Debug, Clone, Serialize)]
pub struct Failure<I> {
    pub success: bool,
    pub error_kind: ErrorKind,
    pub message: String,
    #[serde(flatten)]
    pub request: I,
}

/// Result of every tool call, tagged by `status`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome<T, I> {
    Success(T),
    Error(Failure<I>),
}

impl<T, I> ToolOutcome<T, I> {
    /// Failure outcome carrying `request` back to the caller
    pub fn failure(err: &DatabaseError, request: I) -> Self {
        Self::Error(Failure {
            success: false,
            error_kind: err.kind(),
            message: err.to_string(),
            request,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Error(failure) => Some(failure.error_kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_args_default_limit() {
        let args: QueryDataArgs = serde_json::from_value(json!({"query": "SELECT 1"})).unwrap();
        assert_eq!(args.limit, 100);
        assert!(args.database.is_none());
    }

    #[test]
    fn success_is_tagged() {
        let outcome: ToolOutcome<ListDatabasesOutput, NoArgs> =
            ToolOutcome::Success(ListDatabasesOutput {
                success: true,
                message: "ok".to_string(),
                databases: vec!["shop".to_string()],
                count: 1,
            });

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["success"], true);
        assert_eq!(value["databases"][0], "shop");
    }

    #[test]
    fn failure_echoes_request() {
        let err = DatabaseError::TableNotFound("orders".to_string());
        let outcome: ToolOutcome<GetSchemaOutput, GetSchemaArgs> = ToolOutcome::failure(
            &err,
            GetSchemaArgs {
                table_name: "orders".to_string(),
                database: Some("shop".to_string()),
            },
        );

        assert_eq!(outcome.error_kind(), Some(ErrorKind::TableNotFound));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["success"], false);
        assert_eq!(value["error_kind"], "TableNotFound");
        assert_eq!(value["table_name"], "orders");
        assert_eq!(value["database"], "shop");
        assert!(value["message"].as_str().unwrap().contains("orders"));
    }

    #[test]
    fn write_failure_reports_zero_rows() {
        let err = DatabaseError::TransactionFailure("duplicate key".to_string());
        let echo = ExecuteWriteEcho::from(ExecuteWriteArgs {
            query: "INSERT INTO t VALUES (?)".to_string(),
            params: Some(vec![json!(1)]),
            database: None,
        });
        let outcome: ToolOutcome<ExecuteWriteOutput, ExecuteWriteEcho> =
            ToolOutcome::failure(&err, echo);

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["affected_rows"], 0);
        assert_eq!(value["query"], "INSERT INTO t VALUES (?)");
        assert_eq!(value["params"][0], 1);
        assert!(value.get("database").is_none());
    }
}
