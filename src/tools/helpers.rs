//! Helper functions for database tools

use crate::context::ContextManager;
use crate::error::DatabaseError;

/// Treat a blank database argument as absent
pub fn requested_database(database: Option<&str>) -> Option<&str> {
    database.map(str::trim).filter(|db| !db.is_empty())
}

/// Resolve the database a catalog operation targets
///
/// Uses the explicit argument when given, otherwise the current default
/// database. Never falls back to whatever the connection happens to have
/// selected.
///
/// # Errors
///
/// `MissingDatabase` when neither is available.
pub async fn resolve_target_database(
    contexts: &ContextManager,
    database: Option<&str>,
) -> Result<String, DatabaseError> {
    if let Some(db) = requested_database(database) {
        return Ok(db.to_string());
    }

    contexts.default_database().await.ok_or_else(|| {
        DatabaseError::MissingDatabase(
            "no database given and no default database configured. \
             Pass `database` or call change_database first"
                .to_string(),
        )
    })
}

/// First 100 characters of a query, for log lines
pub fn preview(sql: &str) -> String {
    let trimmed = sql.trim();
    let mut out: String = trimmed.chars().take(100).collect();
    if trimmed.chars().count() > 100 {
        out.push_str("...");
    }
    out
}
