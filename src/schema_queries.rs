//! MySQL catalog queries
//!
//! Pure functions returning SQL text. Catalog columns are cast to `CHAR` so
//! they decode as strings regardless of server version and collation.
//! Schema and table names are always bound as `?` parameters.

/// Schemas reserved by the server, never listed to callers
pub const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "mysql", "performance_schema", "sys"];

/// True for a reserved system schema (case-insensitive)
pub fn is_system_schema(name: &str) -> bool {
    SYSTEM_SCHEMAS
        .iter()
        .any(|schema| schema.eq_ignore_ascii_case(name))
}

/// Lists every database visible to the current user
pub fn list_databases_query() -> &'static str {
    "SHOW DATABASES"
}

/// Lists base tables and views of one schema
///
/// Parameters: `table_schema`
pub fn list_tables_query() -> &'static str {
    "SELECT CAST(TABLE_NAME AS CHAR) AS table_name, \
            CAST(TABLE_TYPE AS CHAR) AS table_type \
     FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = ? AND TABLE_TYPE IN ('BASE TABLE', 'VIEW') \
     ORDER BY TABLE_NAME"
}

/// Columns of one table in ordinal order
///
/// Parameters: `table_schema`, `table_name`
pub fn table_columns_query() -> &'static str {
    "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name, \
            CAST(COLUMN_TYPE AS CHAR) AS column_type, \
            CAST(IS_NULLABLE AS CHAR) AS is_nullable, \
            CAST(COLUMN_KEY AS CHAR) AS column_key, \
            CAST(COLUMN_DEFAULT AS CHAR) AS column_default, \
            CAST(EXTRA AS CHAR) AS extra, \
            CAST(COLUMN_COMMENT AS CHAR) AS column_comment \
     FROM information_schema.COLUMNS \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
     ORDER BY ORDINAL_POSITION"
}

/// Table-level comment
///
/// Parameters: `table_schema`, `table_name`
pub fn table_comment_query() -> &'static str {
    "SELECT CAST(TABLE_COMMENT AS CHAR) AS table_comment \
     FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?"
}

/// Liveness check
pub fn ping_query() -> &'static str {
    "SELECT 1"
}
