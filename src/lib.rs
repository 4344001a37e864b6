//! MySQL gateway for MCP clients
//!
//! Exposes a MySQL server to tool-calling agents: read queries with row
//! limits, transactional parameterized writes, schema introspection and a
//! switchable default database. Connections are served from a global pool
//! for the default database and short-lived pools for any other database.

pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod readonly;
pub mod resources;
pub mod schema_queries;
pub mod server;
pub mod sql_limiter;
pub mod sql_parser;
pub mod tools;
pub mod types;
pub mod validate;

// Re-export secrecy types for consumers
pub use secrecy::{ExposeSecret, SecretString};

// Re-exports
pub use config::{DatabaseSettings, PoolSettings, QueryTimeouts};
pub use connection::{MySqlConnector, PoolConnector, PoolSpec, acquire_pool, close_pool};
pub use context::{ContextKind, ContextManager, DbContext, Target};
pub use error::{DatabaseError, ErrorKind};
pub use readonly::{validate_read_query, validate_write_query};
pub use sql_limiter::{LimitPlan, apply_row_limit};
pub use sql_parser::{
    contains_keyword, extract_first_keyword, has_multiple_statements, mask_literals_and_comments,
};
pub use server::DatabaseServer;
pub use tools::{
    ChangeDatabaseTool, ExecuteWriteTool, GetSchemaTool, ListDatabasesTool, ListTablesTool,
    QueryDataTool, Tool,
};
pub use types::{Failure, ToolOutcome};
pub use validate::validate_database_name;
