//! MCP server: tool router and resource handlers

use crate::context::ContextManager;
use crate::resources::{STATUS_URI, TABLES_URI, get_status, get_tables_resource};
use crate::tools::{
    ChangeDatabaseTool, ExecuteWriteTool, GetSchemaTool, ListDatabasesTool, ListTablesTool,
    QueryDataTool, Tool,
};
use crate::types::{
    ChangeDatabaseArgs, ExecuteWriteArgs, GetSchemaArgs, ListTablesArgs, NoArgs, QueryDataArgs,
    ToolOutcome,
};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        AnnotateAble, CallToolResult, Content, Implementation, ListResourcesResult,
        PaginatedRequestParam, RawResource, ReadResourceRequestParam, ReadResourceResult,
        ResourceContents, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::Serialize;
use std::sync::Arc;

const INSTRUCTIONS: &str = "MySQL gateway. Use list_databases and list_tables to explore, \
    get_schema before writing queries, query_data for SELECT/SHOW \
    (limit defaults to 100 rows) and execute_write for single INSERT/UPDATE/DELETE/REPLACE \
    statements with ? placeholders bound from params. Every tool accepts an optional \
    database; change_database switches the default. Resources: mysql://status, mysql://tables.";

/// MCP server exposing the database tools and resources
#[derive(Clone)]
pub struct DatabaseServer {
    contexts: Arc<ContextManager>,
    query_data_tool: QueryDataTool,
    execute_write_tool: ExecuteWriteTool,
    list_databases_tool: ListDatabasesTool,
    list_tables_tool: ListTablesTool,
    get_schema_tool: GetSchemaTool,
    change_database_tool: ChangeDatabaseTool,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl DatabaseServer {
    pub fn new(contexts: Arc<ContextManager>) -> Self {
        Self {
            query_data_tool: QueryDataTool::new(contexts.clone()),
            execute_write_tool: ExecuteWriteTool::new(contexts.clone()),
            list_databases_tool: ListDatabasesTool::new(contexts.clone()),
            list_tables_tool: ListTablesTool::new(contexts.clone()),
            get_schema_tool: GetSchemaTool::new(contexts.clone()),
            change_database_tool: ChangeDatabaseTool::new(contexts.clone()),
            contexts,
            tool_router: Self::tool_router(),
        }
    }

    pub fn contexts(&self) -> &Arc<ContextManager> {
        &self.contexts
    }

    #[tool(
        description = "Run a read-only query (SELECT or SHOW). \
        A LIMIT is appended when the query has none (default 100, 0 disables); SHOW results \
        are truncated instead. Optional `database` runs against another database. Returns \
        rows as column->value objects plus column names and row_count."
    )]
    async fn query_data(
        &self,
        Parameters(args): Parameters<QueryDataArgs>,
    ) -> Result<CallToolResult, McpError> {
        outcome_result(self.query_data_tool.execute(args).await)
    }

    #[tool(
        description = "Run one INSERT, UPDATE, DELETE or REPLACE inside a transaction. \
        Use ? placeholders and pass values in `params`; they are bound by the driver, never \
        interpolated. Returns affected_rows and last_insert_id; on failure the transaction \
        is rolled back and affected_rows is 0."
    )]
    async fn execute_write(
        &self,
        Parameters(args): Parameters<ExecuteWriteArgs>,
    ) -> Result<CallToolResult, McpError> {
        outcome_result(self.execute_write_tool.execute(args).await)
    }

    #[tool(description = "List databases on the server, excluding system schemas.")]
    async fn list_databases(&self) -> Result<CallToolResult, McpError> {
        outcome_result(self.list_databases_tool.execute(NoArgs {}).await)
    }

    #[tool(
        description = "List tables and views of `database`, or of the default database when \
        omitted. Fails with MissingDatabase when neither is available."
    )]
    async fn list_tables(
        &self,
        Parameters(args): Parameters<ListTablesArgs>,
    ) -> Result<CallToolResult, McpError> {
        outcome_result(self.list_tables_tool.execute(args).await)
    }

    #[tool(
        description = "Describe a table: per column name, type, nullability, key, default, \
        extra and comment, plus the table comment. Fails with TableNotFound when the table \
        does not exist."
    )]
    async fn get_schema(
        &self,
        Parameters(args): Parameters<GetSchemaArgs>,
    ) -> Result<CallToolResult, McpError> {
        outcome_result(self.get_schema_tool.execute(args).await)
    }

    #[tool(
        description = "Switch the default database used when tools are called without \
        `database`. The switch is verified before it takes effect; on failure the previous \
        default stays active."
    )]
    async fn change_database(
        &self,
        Parameters(args): Parameters<ChangeDatabaseArgs>,
    ) -> Result<CallToolResult, McpError> {
        outcome_result(self.change_database_tool.execute(args).await)
    }
}

/// Serialize an outcome as JSON text, flagging failures with `is_error`
fn outcome_result<T: Serialize, I: Serialize>(
    outcome: ToolOutcome<T, I>,
) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&outcome).map_err(|e| {
        McpError::internal_error(format!("Failed to serialize tool result: {}", e), None)
    })?;

    Ok(if outcome.is_success() {
        CallToolResult::success(vec![Content::text(text)])
    } else {
        CallToolResult::error(vec![Content::text(text)])
    })
}

fn text_resource(uri: &str, name: &str, description: &str) -> rmcp::model::Resource {
    let mut resource = RawResource::new(uri, name);
    resource.description = Some(description.to_string());
    resource.mime_type = Some("text/plain".to_string());
    resource.no_annotation()
}

#[tool_handler]
impl ServerHandler for DatabaseServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![
                text_resource(STATUS_URI, "status", "MySQL server health"),
                text_resource(TABLES_URI, "tables", "Tables of the default database"),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let text = match request.uri.as_str() {
            STATUS_URI => get_status(&self.contexts).await,
            TABLES_URI => get_tables_resource(&self.list_tables_tool).await,
            other => {
                return Err(McpError::resource_not_found(
                    format!("Unknown resource: {}", other),
                    None,
                ));
            }
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::manager;
    use crate::types::QueryDataOutput;

    #[test]
    fn advertises_tools_and_resources() {
        let (contexts, _) = manager(None);
        let info = DatabaseServer::new(contexts).get_info();

        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
        assert_eq!(info.server_info.name, "mysql_mcp_gateway");
        assert!(info.instructions.is_some_and(|i| i.contains("query_data")));
    }

    #[test]
    fn routes_all_six_tools() {
        let (contexts, _) = manager(None);
        let server = DatabaseServer::new(contexts);

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();

        assert_eq!(
            names,
            [
                "change_database",
                "execute_write",
                "get_schema",
                "list_databases",
                "list_tables",
                "query_data",
            ]
        );
    }

    #[test]
    fn failures_set_is_error() {
        let err = crate::DatabaseError::RejectedQuery("only read queries permitted".into());
        let outcome: ToolOutcome<QueryDataOutput, NoArgs> = ToolOutcome::failure(&err, NoArgs {});

        let result = outcome_result(outcome).expect("serializable");
        assert_eq!(result.is_error, Some(true));
    }
}
