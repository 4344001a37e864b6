//! Leading-keyword classification of read and write queries
//!
//! Only the first keyword of the trimmed text decides the class. Both paths
//! also refuse multi-statement text so a permitted prefix cannot smuggle a
//! second statement through.

use crate::error::DatabaseError;
use crate::sql_parser::{extract_first_keyword, has_multiple_statements};

/// Keywords accepted by the read path
///
/// `EXPLAIN` and its `DESC`/`DESCRIBE` synonyms are absent:
/// `EXPLAIN ANALYZE` executes the explained statement.
pub const READ_KEYWORDS: &[&str] = &["SELECT", "SHOW"];

/// Keywords accepted by the write path
pub const WRITE_KEYWORDS: &[&str] = &["INSERT", "UPDATE", "DELETE", "REPLACE"];

/// Validate that `sql` is a single read query
///
/// Returns the uppercased leading keyword on success.
///
/// # Examples
/// ```
/// # use mysql_mcp_gateway::readonly::validate_read_query;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// assert_eq!(validate_read_query("select * from users")?, "SELECT");
/// # assert!(validate_read_query("DROP TABLE users").is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_read_query(sql: &str) -> Result<String, DatabaseError> {
    let keyword = extract_first_keyword(sql)
        .map_err(|_| DatabaseError::RejectedQuery("only read queries permitted".to_string()))?;

    if !READ_KEYWORDS.contains(&keyword.as_str()) {
        return Err(DatabaseError::RejectedQuery(format!(
            "only read queries permitted ({} allowed, got {})",
            READ_KEYWORDS.join("/"),
            keyword
        )));
    }

    reject_multiple_statements(sql)?;
    Ok(keyword)
}

/// Validate that `sql` is a single INSERT, UPDATE, DELETE or REPLACE
pub fn validate_write_query(sql: &str) -> Result<String, DatabaseError> {
    let keyword = extract_first_keyword(sql).map_err(|_| {
        DatabaseError::RejectedQuery("only write queries permitted".to_string())
    })?;

    if !WRITE_KEYWORDS.contains(&keyword.as_str()) {
        return Err(DatabaseError::RejectedQuery(format!(
            "only {} queries permitted, got {}",
            WRITE_KEYWORDS.join("/"),
            keyword
        )));
    }

    reject_multiple_statements(sql)?;
    Ok(keyword)
}

fn reject_multiple_statements(sql: &str) -> Result<(), DatabaseError> {
    if has_multiple_statements(sql) {
        return Err(DatabaseError::RejectedQuery(
            "multiple statements are not permitted".to_string(),
        ));
    }
    Ok(())
}
