//! Database name validation

use crate::error::DatabaseError;

/// Maximum length of a MySQL database name, in characters
pub const MAX_DATABASE_NAME_LEN: usize = 64;

/// Validate a database name before a pool is opened for it
///
/// Names are only handed to the driver's connect options, never spliced
/// into SQL, so anything a backtick-quoted MySQL identifier may hold is
/// accepted: hyphens, dots, spaces and non-ASCII letters included.
///
/// ## Validation Rules
///
/// - **Length**: 1-64 characters
/// - **Characters**: no NUL
/// - **Trailing space**: not allowed (MySQL rejects it)
///
/// ```rust
/// use mysql_mcp_gateway::validate::validate_database_name;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// validate_database_name("shop")?;
/// validate_database_name("my-db")?;
/// validate_database_name("2024_archive")?;
/// # assert!(validate_database_name("").is_err());
/// # assert!(validate_database_name("shop ").is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_database_name(name: &str) -> Result<(), DatabaseError> {
    if name.is_empty() {
        return Err(DatabaseError::InvalidIdentifier(
            "Database name cannot be empty".to_string(),
        ));
    }

    let length = name.chars().count();
    if length > MAX_DATABASE_NAME_LEN {
        return Err(DatabaseError::InvalidIdentifier(format!(
            "Database name too long: {} characters (max {})",
            length, MAX_DATABASE_NAME_LEN
        )));
    }

    if name.contains('\0') {
        return Err(DatabaseError::InvalidIdentifier(
            "Database name cannot contain NUL".to_string(),
        ));
    }

    if name.ends_with(' ') {
        return Err(DatabaseError::InvalidIdentifier(format!(
            "Database name cannot end with a space: '{}'",
            name
        )));
    }

    Ok(())
}
