//! Gateway configuration
//!
//! Every setting can be given as a command-line flag or through the
//! environment. Values are read once at startup and frozen into
//! [`DatabaseSettings`].

use crate::SecretString;
use clap::{Args, Parser, ValueEnum};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Command-line interface of the gateway binary
#[derive(Parser, Debug)]
#[command(name = "mysql-mcp-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Transport used to talk to the MCP client
    #[arg(long, env = "MCP_TRANSPORT", value_enum, default_value_t = Transport::Stdio)]
    pub transport: Transport,

    /// Bind address for the streamable HTTP transport
    #[arg(long, env = "MCP_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Database connection and pool settings
    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// Supported MCP transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Line-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// Streamable HTTP served at `/mcp`
    StreamableHttp,
}

/// Raw database settings as parsed from flags and environment
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Database server host
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// Database server port
    #[arg(long, env = "DB_PORT", default_value_t = 3306)]
    pub db_port: u16,

    /// Database user
    #[arg(long, env = "DB_USER", default_value = "root")]
    pub db_user: String,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    /// Default database; leave unset to connect without one
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Verbose logging
    #[arg(long, env = "DEBUG_MODE")]
    pub debug: bool,

    /// Minimum connections kept by the default pool
    #[arg(long, env = "DB_POOL_MIN", default_value_t = 1)]
    pub pool_min: u32,

    /// Maximum connections of the default pool
    #[arg(long, env = "DB_POOL_MAX", default_value_t = 10)]
    pub pool_max: u32,

    /// Maximum connections of a per-call pool for another database
    #[arg(long, env = "DB_EPHEMERAL_POOL_MAX", default_value_t = 2)]
    pub ephemeral_pool_max: u32,

    /// Seconds to wait for a free pooled connection
    #[arg(long, env = "DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 10)]
    pub acquire_timeout_secs: u64,

    /// Seconds an idle connection is kept
    #[arg(long, env = "DB_IDLE_TIMEOUT_SECS", default_value_t = 600)]
    pub idle_timeout_secs: u64,

    /// Seconds before a connection is recycled
    #[arg(long, env = "DB_MAX_LIFETIME_SECS", default_value_t = 1800)]
    pub max_lifetime_secs: u64,

    /// Timeout for data queries and writes
    #[arg(long, env = "DB_QUERY_TIMEOUT_SECS", default_value_t = 60)]
    pub query_timeout_secs: u64,

    /// Timeout for catalog queries
    #[arg(long, env = "DB_METADATA_TIMEOUT_SECS", default_value_t = 10)]
    pub metadata_timeout_secs: u64,

    /// Retries for transient connection errors on reads
    #[arg(long, env = "DB_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: u32,
}

/// Connection pool sizing and lifetime settings
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub min_connections: u32,
    pub max_connections: u32,
    pub ephemeral_max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            ephemeral_max_connections: 2,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// Query timeout and retry settings
#[derive(Debug, Clone)]
pub struct QueryTimeouts {
    pub query: Duration,
    pub metadata: Duration,
    pub max_retries: u32,
    /// Base backoff between retries, doubled per attempt
    pub retry_backoff: Duration,
    /// Cap for the doubled backoff
    pub max_backoff: Duration,
}

impl Default for QueryTimeouts {
    fn default() -> Self {
        Self {
            query: Duration::from_secs(60),
            metadata: Duration::from_secs(10),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Frozen runtime configuration shared by every component
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Arc<SecretString>,
    /// Database bound to the global pool at startup
    pub default_database: Option<String>,
    pub debug: bool,
    pub pool: PoolSettings,
    pub timeouts: QueryTimeouts,
}

impl DatabaseSettings {
    /// Settings with default pool and timeout values
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>, password: &str) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: Arc::new(SecretString::from(password.to_string())),
            default_database: None,
            debug: false,
            pool: PoolSettings::default(),
            timeouts: QueryTimeouts::default(),
        }
    }

    pub fn with_default_database(mut self, database: Option<&str>) -> Self {
        self.default_database = normalize_database(database.map(str::to_string));
        self
    }

    pub fn with_pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_timeouts(mut self, timeouts: QueryTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

impl TryFrom<DatabaseArgs> for DatabaseSettings {
    type Error = anyhow::Error;

    fn try_from(args: DatabaseArgs) -> anyhow::Result<Self> {
        if args.pool_max == 0 {
            anyhow::bail!("DB_POOL_MAX must be at least 1");
        }
        if args.pool_min > args.pool_max {
            anyhow::bail!(
                "DB_POOL_MIN ({}) cannot exceed DB_POOL_MAX ({})",
                args.pool_min,
                args.pool_max
            );
        }
        if args.ephemeral_pool_max == 0 {
            anyhow::bail!("DB_EPHEMERAL_POOL_MAX must be at least 1");
        }

        Ok(Self {
            host: args.db_host,
            port: args.db_port,
            user: args.db_user,
            password: Arc::new(SecretString::from(args.db_password)),
            default_database: normalize_database(args.db_name),
            debug: args.debug,
            pool: PoolSettings {
                min_connections: args.pool_min,
                max_connections: args.pool_max,
                ephemeral_max_connections: args.ephemeral_pool_max,
                acquire_timeout: Duration::from_secs(args.acquire_timeout_secs),
                idle_timeout: Duration::from_secs(args.idle_timeout_secs),
                max_lifetime: Duration::from_secs(args.max_lifetime_secs),
            },
            timeouts: QueryTimeouts {
                query: Duration::from_secs(args.query_timeout_secs),
                metadata: Duration::from_secs(args.metadata_timeout_secs),
                max_retries: args.max_retries,
                ..QueryTimeouts::default()
            },
        })
    }
}

/// Treat an empty or blank database name as "no database"
fn normalize_database(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["mysql-mcp-gateway"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--db-host",
            "db.internal",
            "--db-port",
            "3307",
            "--db-password",
            "s3cret",
            "--db-name",
            "shop",
            "--pool-max",
            "4",
            "--transport",
            "streamable-http",
        ]);
        assert_eq!(cli.transport, Transport::StreamableHttp);

        let settings = DatabaseSettings::try_from(cli.database).unwrap();
        assert_eq!(settings.host, "db.internal");
        assert_eq!(settings.port, 3307);
        assert_eq!(settings.password.expose_secret(), "s3cret");
        assert_eq!(settings.default_database.as_deref(), Some("shop"));
        assert_eq!(settings.pool.max_connections, 4);
    }

    #[test]
    fn blank_database_name_means_none() {
        let cli = parse(&["--db-name", "  "]);
        let settings = DatabaseSettings::try_from(cli.database).unwrap();
        assert!(settings.default_database.is_none());
    }

    #[test]
    fn rejects_min_above_max() {
        let cli = parse(&["--pool-min", "5", "--pool-max", "2"]);
        assert!(DatabaseSettings::try_from(cli.database).is_err());
    }

    #[test]
    fn rejects_empty_ephemeral_pool() {
        let cli = parse(&["--ephemeral-pool-max", "0"]);
        assert!(DatabaseSettings::try_from(cli.database).is_err());
    }

    #[test]
    fn single_connection_pool_keeps_ephemeral_pools_at_one() {
        let cli = parse(&["--pool-max", "1", "--pool-min", "1"]);
        let settings = DatabaseSettings::try_from(cli.database).unwrap();

        let global = crate::PoolSpec::global(&settings, None);
        let ephemeral = crate::PoolSpec::ephemeral(&settings, "analytics");
        assert_eq!(global.max_connections, 1);
        assert_eq!(ephemeral.max_connections, 1);
    }

    #[test]
    fn password_is_redacted_in_debug_output() {
        let settings = DatabaseSettings::new("localhost", 3306, "root", "hunter2");
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }
}
