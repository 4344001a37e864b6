//! Database tools for the MCP server
//!
//! One struct per operation. Each `execute` is a failure boundary: every
//! error below it comes back as [`ToolOutcome::Error`].

use crate::types::ToolOutcome;
use std::future::Future;

pub mod helpers;
pub mod row_converter;
pub mod timeout;

pub mod query_data;
pub use query_data::QueryDataTool;

pub mod execute_write;
pub use execute_write::ExecuteWriteTool;

pub mod list_databases;
pub use list_databases::ListDatabasesTool;

pub mod list_tables;
pub use list_tables::ListTablesTool;

pub mod get_schema;
pub use get_schema::GetSchemaTool;

pub mod change_database;
pub use change_database::ChangeDatabaseTool;

/// A named operation with a fixed input/output contract
pub trait Tool {
    type Args;
    type Output;
    /// Caller input echoed back in failure payloads
    type Echo;

    fn name() -> &'static str;

    fn read_only() -> bool;

    fn execute(
        &self,
        args: Self::Args,
    ) -> impl Future<Output = ToolOutcome<Self::Output, Self::Echo>> + Send;
}
