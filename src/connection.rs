//! Connection pool creation, warmup and teardown
//!
//! Pools are built from a [`PoolSpec`] describing one
//! (host, port, credentials, database-or-none) tuple. Creation goes through
//! the [`PoolConnector`] trait so the context layer can be exercised without
//! a live server.

use crate::config::DatabaseSettings;
use crate::error::DatabaseError;
use crate::{ExposeSecret, SecretString};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{Executor, Row};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything needed to open one pool
#[derive(Debug, Clone)]
pub struct PoolSpec {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Arc<SecretString>,
    /// Database selected on every connection, or none
    pub database: Option<String>,
    pub min_connections: u32,
    pub max_connections: u32,
    pub charset: String,
    pub autocommit: bool,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl PoolSpec {
    /// Spec for the process-wide pool
    pub fn global(settings: &DatabaseSettings, database: Option<&str>) -> Self {
        Self::build(
            settings,
            database,
            settings.pool.min_connections,
            settings.pool.max_connections,
        )
    }

    /// Spec for a short-lived pool serving one call against another database
    ///
    /// Its max size stays below the global pool's whenever the global pool
    /// holds more than one connection.
    pub fn ephemeral(settings: &DatabaseSettings, database: &str) -> Self {
        let max = settings
            .pool
            .ephemeral_max_connections
            .min(settings.pool.max_connections.saturating_sub(1))
            .max(1);
        Self::build(settings, Some(database), 1, max)
    }

    fn build(settings: &DatabaseSettings, database: Option<&str>, min: u32, max: u32) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            user: settings.user.clone(),
            password: Arc::clone(&settings.password),
            database: database.map(str::to_string),
            min_connections: min,
            max_connections: max,
            charset: "utf8mb4".to_string(),
            autocommit: true,
            acquire_timeout: settings.pool.acquire_timeout,
            idle_timeout: settings.pool.idle_timeout,
            max_lifetime: settings.pool.max_lifetime,
        }
    }

    /// sqlx connect options for this spec
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose_secret())
            .charset(&self.charset);

        match &self.database {
            Some(db) => options.database(db),
            None => options,
        }
    }

    /// sqlx pool options for this spec
    pub fn pool_options(&self) -> MySqlPoolOptions {
        let autocommit = self.autocommit;
        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(Some(self.idle_timeout))
            .max_lifetime(Some(self.max_lifetime))
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    let statement = if autocommit {
                        "SET autocommit = 1"
                    } else {
                        "SET autocommit = 0"
                    };
                    conn.execute(statement).await?;
                    Ok(())
                })
            })
    }

    /// Short description for log lines, never includes the password
    pub fn describe(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user,
            self.host,
            self.port,
            self.database.as_deref().unwrap_or("<none>")
        )
    }
}

/// Opens pools and answers which database a pool is bound to
#[async_trait]
pub trait PoolConnector: Send + Sync {
    /// Open a pool, failing with `ConnectionError` when unreachable
    async fn connect(&self, spec: &PoolSpec) -> Result<MySqlPool, DatabaseError>;

    /// Database currently selected on connections of `pool`
    async fn active_database(&self, pool: &MySqlPool) -> Result<Option<String>, DatabaseError> {
        let row = sqlx::query("SELECT DATABASE() AS db")
            .fetch_one(pool)
            .await
            .map_err(|e| DatabaseError::from_query(e, "Getting current database name"))?;

        row.try_get::<Option<String>, _>("db").map_err(|e| {
            DatabaseError::QueryError(format!("Failed to parse database name: {}", e))
        })
    }
}

/// Production connector talking to a MySQL server
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlConnector;

#[async_trait]
impl PoolConnector for MySqlConnector {
    async fn connect(&self, spec: &PoolSpec) -> Result<MySqlPool, DatabaseError> {
        acquire_pool(spec).await
    }
}

/// Open a pool for `spec` and warm up its minimum connections
///
/// # Errors
/// `ConnectionError` if the server cannot be reached or rejects the
/// credentials, `PoolExhausted` if no connection could be acquired in time.
pub async fn acquire_pool(spec: &PoolSpec) -> Result<MySqlPool, DatabaseError> {
    log::info!(
        "Opening connection pool {} (min {}, max {})",
        spec.describe(),
        spec.min_connections,
        spec.max_connections
    );

    let pool = spec
        .pool_options()
        .connect_with(spec.connect_options())
        .await
        .map_err(DatabaseError::from_connect)?;

    if let Err(e) = warmup_pool(&pool, spec.min_connections.max(1)).await {
        pool.close().await;
        return Err(e);
    }

    Ok(pool)
}

/// Close every connection of `pool`
///
/// # Errors
/// `ShutdownError` if the pool was already closed. Closing twice is safe.
pub async fn close_pool(pool: &MySqlPool) -> Result<(), DatabaseError> {
    if pool.is_closed() {
        return Err(DatabaseError::ShutdownError(
            "connection pool already closed".to_string(),
        ));
    }
    pool.close().await;
    log::info!("Connection pool closed");
    Ok(())
}

/// Warm up connection pool by pre-establishing min_connections
///
/// Concurrently acquires min_connections to force pool establishment.
/// Ensures database is reachable before the pool is handed out.
///
/// # Errors
/// Returns the first error if all warmup connections fail
pub async fn warmup_pool(pool: &MySqlPool, min_connections: u32) -> Result<(), DatabaseError> {
    let start = Instant::now();

    let mut handles = Vec::new();
    for _ in 0..min_connections {
        let pool_clone = pool.clone();
        handles.push(tokio::spawn(async move {
            sqlx::query("SELECT 1").fetch_one(&pool_clone).await
        }));
    }

    let mut success_count = 0;
    let mut first_error = None;
    for (i, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(_)) => success_count += 1,
            Ok(Err(e)) => {
                log::warn!("Connection {} warmup failed: {}", i + 1, e);
                first_error.get_or_insert(DatabaseError::from_connect(e));
            }
            Err(e) => log::warn!("Connection {} warmup task panicked: {}", i + 1, e),
        }
    }

    let elapsed = start.elapsed();

    if success_count > 0 {
        log::info!(
            "Connection pool warmed up: {}/{} connections ready ({:?})",
            success_count,
            min_connections,
            elapsed
        );
        if elapsed > Duration::from_secs(2) {
            log::warn!(
                "Pool warmup was slow ({:?}), queries may experience high latency",
                elapsed
            );
        }
        Ok(())
    } else {
        Err(first_error.unwrap_or_else(|| {
            DatabaseError::ConnectionError(format!(
                "Pool warmup failed: 0/{} connections established",
                min_connections
            ))
        }))
    }
}
