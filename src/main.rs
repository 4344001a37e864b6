// MySQL MCP gateway binary
//
// Serves the database tools over stdio (default) or streamable HTTP.
// Configuration comes from flags or DB_* / MCP_* environment variables.

use anyhow::{Context, Result};
use clap::Parser;
use mysql_mcp_gateway::config::{Cli, DatabaseSettings, Transport};
use mysql_mcp_gateway::{ContextManager, DatabaseServer, MySqlConnector};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings =
        DatabaseSettings::try_from(cli.database).context("Invalid database configuration")?;

    init_logging(settings.debug);

    log::info!(
        "Starting mysql-mcp-gateway {} ({:?} transport, {}@{}:{}, default database: {})",
        env!("CARGO_PKG_VERSION"),
        cli.transport,
        settings.user,
        settings.host,
        settings.port,
        settings.default_database.as_deref().unwrap_or("<none>")
    );

    let contexts = Arc::new(ContextManager::new(
        Arc::new(settings),
        Arc::new(MySqlConnector),
    ));
    let server = DatabaseServer::new(contexts.clone());

    let ct = CancellationToken::new();
    tokio::spawn(shutdown_signal(ct.clone()));

    let served = match cli.transport {
        Transport::Stdio => serve_stdio(server, ct.clone()).await,
        Transport::StreamableHttp => serve_http(server, cli.bind, ct.clone()).await,
    };
    ct.cancel();

    if let Err(e) = contexts.close().await {
        log::warn!("Failed to close database pool: {}", e);
    }
    log::info!("Gateway stopped");

    served
}

/// Logs always go to stderr; stdout belongs to the stdio transport
fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

async fn serve_stdio(server: DatabaseServer, ct: CancellationToken) -> Result<()> {
    log::info!("Serving MCP over stdio");

    let service = server
        .serve_with_ct(stdio(), ct)
        .await
        .inspect_err(|e| log::error!("serving error: {e:?}"))?;
    let reason = service.waiting().await?;

    log::info!("Stdio session ended: {:?}", reason);
    Ok(())
}

async fn serve_http(server: DatabaseServer, bind: SocketAddr, ct: CancellationToken) -> Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    log::info!("Serving MCP over streamable HTTP at http://{}/mcp", bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(ct.cancelled_owned())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal(ct: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                    _ = ct.cancelled() => return,
                }
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = ct.cancelled() => return,
                }
            }
        }
    }

    #[cfg(not(unix))]
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = ct.cancelled() => return,
    }

    log::info!("Shutdown signal received");
    ct.cancel();
}
