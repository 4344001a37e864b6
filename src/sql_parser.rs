//! Lexical helpers for query classification
//!
//! Classification looks at the leading keyword only. Everything deeper
//! works on [`mask_literals_and_comments`], a copy of the text where string
//! literals, quoted identifiers and comments are blanked out.

use crate::error::DatabaseError;

/// Extract the leading SQL keyword, uppercased
///
/// # Examples
/// ```
/// # use mysql_mcp_gateway::sql_parser::extract_first_keyword;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// assert_eq!(extract_first_keyword("  select * from users")?, "SELECT");
/// assert_eq!(extract_first_keyword("SHOW\tTABLES")?, "SHOW");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// `RejectedQuery` when the text is blank or does not start with a word.
pub fn extract_first_keyword(sql: &str) -> Result<String, DatabaseError> {
    let trimmed = sql.trim();

    if trimmed.is_empty() {
        return Err(DatabaseError::RejectedQuery(
            "Empty SQL statement".to_string(),
        ));
    }

    let keyword: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    if keyword.is_empty() {
        return Err(DatabaseError::RejectedQuery(
            "No SQL keyword found at start of statement".to_string(),
        ));
    }

    Ok(keyword.to_ascii_uppercase())
}

/// Strip trailing statement terminators and whitespace
pub fn strip_trailing_terminators(sql: &str) -> &str {
    sql.trim_end().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Blank out string literals, quoted identifiers and comments
///
/// Quote characters stay in place; every blanked byte becomes a space, so
/// byte offsets in the result match the input. `-- ` comments need the
/// trailing whitespace MySQL requires. Executable `/*! ... */` comments are
/// kept as code since the server runs their content.
///
/// # Examples
/// ```
/// # use mysql_mcp_gateway::sql_parser::mask_literals_and_comments;
/// assert_eq!(
///     mask_literals_and_comments("SELECT 'a;b' -- note"),
///     "SELECT '   '        "
/// );
/// ```
pub fn mask_literals_and_comments(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                out.push(quote);
                i = mask_quoted(bytes, i + 1, quote, &mut out);
            }
            b'-' if bytes.get(i + 1) == Some(&b'-')
                && bytes.get(i + 2).is_none_or(|b| b.is_ascii_whitespace()) =>
            {
                i = mask_line(bytes, i, &mut out);
            }
            b'#' => i = mask_line(bytes, i, &mut out),
            b'/' if bytes.get(i + 1) == Some(&b'*') && bytes.get(i + 2) != Some(&b'!') => {
                i = mask_block(bytes, i, &mut out);
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    // multi-byte characters are either copied whole or blanked whole
    String::from_utf8_lossy(&out).into_owned()
}

fn mask_quoted(bytes: &[u8], mut i: usize, quote: u8, out: &mut Vec<u8>) -> usize {
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && quote != b'`' {
            let end = (i + 2).min(bytes.len());
            out.extend(std::iter::repeat_n(b' ', end - i));
            i = end;
        } else if b == quote {
            // doubled quote is an escaped quote
            if bytes.get(i + 1) == Some(&quote) {
                out.extend_from_slice(b"  ");
                i += 2;
            } else {
                out.push(quote);
                return i + 1;
            }
        } else {
            out.push(b' ');
            i += 1;
        }
    }
    i
}

fn mask_line(bytes: &[u8], start: usize, out: &mut Vec<u8>) -> usize {
    let end = bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| start + offset);
    out.extend(std::iter::repeat_n(b' ', end - start));
    end
}

fn mask_block(bytes: &[u8], start: usize, out: &mut Vec<u8>) -> usize {
    let end = bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |offset| start + 2 + offset + 2);
    out.extend(std::iter::repeat_n(b' ', end - start));
    end
}

/// True when the text holds more than one statement
///
/// A `;` counts as a separator only outside string literals, quoted
/// identifiers and comments. Trailing terminators are ignored.
///
/// # Examples
/// ```
/// # use mysql_mcp_gateway::sql_parser::has_multiple_statements;
/// assert!(!has_multiple_statements("SELECT 'a;b' FROM t;"));
/// assert!(has_multiple_statements("SELECT 1; DROP TABLE t"));
/// ```
pub fn has_multiple_statements(sql: &str) -> bool {
    strip_trailing_terminators(&mask_literals_and_comments(sql)).contains(';')
}

/// True when `keyword` appears as a whole word in code
///
/// Occurrences inside literals, quoted identifiers and comments do not
/// count. Comparison ignores ASCII case.
pub fn contains_keyword(sql: &str, keyword: &str) -> bool {
    mask_literals_and_comments(sql)
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .any(|word| word.eq_ignore_ascii_case(keyword))
}

/// Statement text without trailing terminators and trailing comments
pub fn statement_body(sql: &str) -> &str {
    let masked = mask_literals_and_comments(sql);
    let end = strip_trailing_terminators(&masked).len();
    sql.get(..end).unwrap_or(sql).trim_start()
}
