//! Query timeout and retry utilities

use crate::config::QueryTimeouts;
use crate::error::DatabaseError;
use std::time::Duration;
use tokio::time::timeout;

/// Calculate retry backoff duration with exponential growth, cap, and jitter
///
/// `backoff = min(base * 2^attempt, max) + random_jitter(0-100ms)`
///
/// With defaults (base=500ms, max=5000ms):
/// - Attempt 0: 500-600ms
/// - Attempt 1: 1000-1100ms
/// - Attempt 4+: 5000-5100ms (capped)
fn calculate_backoff(timeouts: &QueryTimeouts, attempt: u32) -> Duration {
    let base_ms = timeouts.retry_backoff.as_millis() as u64;
    let max_ms = timeouts.max_backoff.as_millis() as u64;

    let jitter = rand::random::<u64>() % 100;
    let backoff_ms = base_ms
        .saturating_mul(2_u64.saturating_pow(attempt))
        .min(max_ms)
        + jitter;

    Duration::from_millis(backoff_ms)
}

/// Execute a database operation with a timeout and automatic retry
///
/// Transient connection errors and timeouts are retried up to
/// `timeouts.max_retries` times with exponential backoff. Only idempotent
/// reads go through here; writes use [`execute_once`].
///
/// # Example
///
/// ```rust
/// # use mysql_mcp_gateway::tools::timeout::execute_with_timeout;
/// # use mysql_mcp_gateway::config::QueryTimeouts;
/// # use std::time::Duration;
/// # async fn example() -> Result<(), mysql_mcp_gateway::DatabaseError> {
/// let timeouts = QueryTimeouts::default();
/// let rows = execute_with_timeout(
///     &timeouts,
///     timeouts.metadata,
///     || async { Ok::<Vec<()>, sqlx::Error>(vec![]) },
///     "Listing tables",
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn execute_with_timeout<T, F, Fut>(
    timeouts: &QueryTimeouts,
    timeout_duration: Duration,
    query_fn: F,
    operation_description: &str,
) -> Result<T, DatabaseError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    let max_retries = timeouts.max_retries;

    for attempt in 0..=max_retries {
        match timeout(timeout_duration, query_fn()).await {
            Ok(Ok(result)) => return Ok(result),
            Ok(Err(sqlx_err)) => {
                if is_connection_error(&sqlx_err) && attempt < max_retries {
                    log::warn!(
                        "Connection error on attempt {}/{}: {}. Retrying...",
                        attempt + 1,
                        max_retries + 1,
                        sqlx_err
                    );
                    tokio::time::sleep(calculate_backoff(timeouts, attempt)).await;
                    continue;
                }
                return Err(DatabaseError::from_query(sqlx_err, operation_description));
            }
            Err(_elapsed) => {
                if attempt < max_retries {
                    log::warn!(
                        "Timeout on attempt {}/{}. Retrying...",
                        attempt + 1,
                        max_retries + 1
                    );
                    tokio::time::sleep(calculate_backoff(timeouts, attempt)).await;
                    continue;
                }
                return Err(timeout_error(operation_description, timeout_duration));
            }
        }
    }

    Err(DatabaseError::Timeout(format!(
        "{}: max retries ({}) exceeded",
        operation_description, max_retries
    )))
}

/// Execute a database operation once, bounded by a timeout
pub async fn execute_once<T, Fut>(
    timeout_duration: Duration,
    fut: Fut,
    operation_description: &str,
) -> Result<T, DatabaseError>
where
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(timeout_duration, fut).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(DatabaseError::from_query(e, operation_description)),
        Err(_elapsed) => Err(timeout_error(operation_description, timeout_duration)),
    }
}

fn timeout_error(operation_description: &str, timeout_duration: Duration) -> DatabaseError {
    DatabaseError::Timeout(format!(
        "{} timed out after {:?}. Add a WHERE clause or LIMIT, or raise \
         DB_QUERY_TIMEOUT_SECS / DB_METADATA_TIMEOUT_SECS",
        operation_description, timeout_duration
    ))
}

/// Check if a sqlx error is connection-related and retryable
///
/// Pool timeouts and closed pools are not retried.
fn is_connection_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => {
            let msg = db_err.message().to_lowercase();
            msg.contains("gone away")
                || msg.contains("lost connection")
                || msg.contains("broken pipe")
                || msg.contains("reset by peer")
        }
        _ => false,
    }
}
