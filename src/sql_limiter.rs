//! Row limiting for read queries

use crate::sql_parser::{contains_keyword, extract_first_keyword, statement_body};

/// How a read query should be limited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitPlan {
    /// Text to execute
    pub sql: String,
    /// Truncate the fetched rows to this many after execution
    pub truncate_to: Option<usize>,
}

/// Plan the row limit for a read query
///
/// # Behavior
/// - `limit == 0` leaves the query alone
/// - Text with a `LIMIT` keyword in code (not in literals or comments) is
///   left alone
/// - `SHOW` statements reject a trailing `LIMIT`, so their rows are truncated
///   after execution instead
/// - `SELECT` loses trailing terminators and trailing comments, and gets
///   `LIMIT <n>` appended on its own line
///
/// # Examples
/// ```
/// # use mysql_mcp_gateway::sql_limiter::apply_row_limit;
/// let plan = apply_row_limit("SELECT * FROM users;", 100);
/// assert_eq!(plan.sql, "SELECT * FROM users\nLIMIT 100");
///
/// let plan = apply_row_limit("SHOW TABLES", 5);
/// assert_eq!(plan.sql, "SHOW TABLES");
/// assert_eq!(plan.truncate_to, Some(5));
/// ```
pub fn apply_row_limit(sql: &str, limit: usize) -> LimitPlan {
    let unchanged = LimitPlan {
        sql: sql.to_string(),
        truncate_to: None,
    };

    if limit == 0 || contains_keyword(sql, "LIMIT") {
        return unchanged;
    }

    match extract_first_keyword(sql).as_deref() {
        Ok("SHOW") => LimitPlan {
            sql: sql.to_string(),
            truncate_to: Some(limit),
        },
        Ok("SELECT") => LimitPlan {
            sql: format!("{}\nLIMIT {}", statement_body(sql), limit),
            truncate_to: None,
        },
        _ => unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_limit() {
        let plan = apply_row_limit("SELECT * FROM users", 100);
        assert_eq!(plan.sql, "SELECT * FROM users\nLIMIT 100");
        assert_eq!(plan.truncate_to, None);
    }

    #[test]
    fn test_strips_terminator_before_limit() {
        let plan = apply_row_limit("  SELECT * FROM users ;  ", 3);
        assert_eq!(plan.sql, "SELECT * FROM users\nLIMIT 3");
    }

    #[test]
    fn test_trailing_comment_does_not_swallow_limit() {
        for sql in [
            "SELECT * FROM t -- recent rows",
            "SELECT * FROM t # note",
            "SELECT * FROM t /* all of them */",
            "SELECT * FROM t; -- done",
        ] {
            let plan = apply_row_limit(sql, 3);
            assert_eq!(plan.sql, "SELECT * FROM t\nLIMIT 3", "{}", sql);
        }
    }

    #[test]
    fn test_inner_comment_is_kept() {
        let plan = apply_row_limit("SELECT a -- first column\nFROM t", 2);
        assert_eq!(plan.sql, "SELECT a -- first column\nFROM t\nLIMIT 2");
    }

    #[test]
    fn test_keeps_existing_limit() {
        let sql = "SELECT * FROM users limit 50";
        let plan = apply_row_limit(sql, 100);
        assert_eq!(plan.sql, sql);
    }

    #[test]
    fn test_limit_in_literal_or_comment_is_not_a_limit() {
        let plan = apply_row_limit("SELECT * FROM t WHERE note = 'no limit'", 3);
        assert_eq!(plan.sql, "SELECT * FROM t WHERE note = 'no limit'\nLIMIT 3");

        let plan = apply_row_limit("SELECT `limit` FROM t", 3);
        assert_eq!(plan.sql, "SELECT `limit` FROM t\nLIMIT 3");

        let plan = apply_row_limit("SELECT * FROM t /* limit 5 */", 3);
        assert_eq!(plan.sql, "SELECT * FROM t\nLIMIT 3");
    }

    #[test]
    fn test_limit_inside_identifier_is_not_a_limit() {
        let plan = apply_row_limit("SELECT credit_limit FROM accounts", 10);
        assert_eq!(plan.sql, "SELECT credit_limit FROM accounts\nLIMIT 10");
    }

    #[test]
    fn test_zero_limit_is_noop() {
        let plan = apply_row_limit("SELECT * FROM users", 0);
        assert_eq!(plan.sql, "SELECT * FROM users");
        assert_eq!(plan.truncate_to, None);
    }

    #[test]
    fn test_show_truncates_after_execution() {
        let plan = apply_row_limit("show databases;", 5);
        assert_eq!(plan.sql, "show databases;");
        assert_eq!(plan.truncate_to, Some(5));
    }

    #[test]
    fn test_other_statements_untouched() {
        for sql in ["DESCRIBE users", "INSERT INTO t VALUES (1)", ""] {
            let plan = apply_row_limit(sql, 10);
            assert_eq!(plan.sql, sql);
            assert_eq!(plan.truncate_to, None);
        }
    }
}
