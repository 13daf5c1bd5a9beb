//! Static validation of generated SQL candidates.
//!
//! A candidate statement moves through
//! `GENERATED → SYNTAX_CHECKED → SAFETY_CHECKED → EXECUTED`; rejection is
//! terminal and carries one of the reasons below. The safety check is a
//! coarse keyword denylist and is a known-incomplete defense; the row
//! ceiling and read-only root-keyword rule do the rest of the work.

use thiserror::Error;

/// Why a generated SQL candidate was rejected.
///
/// Deliberately not part of the application error enum: a rejection is a
/// user-facing terminal outcome of the pipeline, not a fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("Multiple statements are not allowed")]
    MultipleStatements,

    #[error("Statement failed to parse: {0}")]
    SyntaxError(String),

    #[error("Statement uses a disallowed operation: {0}")]
    UnsafeStatement(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Execution failed: {0}")]
    ExecutionError(String),
}

impl RejectionReason {
    /// Short label for analytics records.
    pub fn label(&self) -> &'static str {
        match self {
            RejectionReason::MultipleStatements => "multiple_statements",
            RejectionReason::SyntaxError(_) => "syntax_error",
            RejectionReason::UnsafeStatement(_) => "unsafe_statement",
            RejectionReason::UnknownTable(_) => "unknown_table",
            RejectionReason::ExecutionError(_) => "execution_error",
        }
    }
}

/// Keywords that immediately reject a candidate when present as a word
/// token. Coarse by intent; identifiers like `created_at` do not match.
const DENYLIST: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "attach", "detach", "pragma",
    "vacuum", "reindex", "replace", "truncate", "exec", "execute", "call", "grant", "revoke",
    "copy",
];

/// Strip code fences and common prefixes from raw model output.
///
/// Models wrap SQL in markdown fences or prefix it with "SQL:" despite
/// instructions; both are removed before validation.
pub fn strip_formatting(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop an optional language tag on the fence line
        let rest = match rest.split_once('\n') {
            Some((first_line, body)) if first_line.trim().chars().all(char::is_alphanumeric) => {
                body
            }
            _ => rest,
        };
        text = rest.strip_suffix("```").unwrap_or(rest).trim();
    }

    for prefix in ["SQL:", "sql:", "Query:", "query:"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim();
            break;
        }
    }

    text.trim_end_matches(';').trim().to_string()
}

/// Split on statement separators, aware of single- and double-quoted
/// strings. A trailing empty segment (from a final semicolon) is ignored.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(ch);
            }
            ';' if !in_single && !in_double => {
                if !current.trim().is_empty() {
                    statements.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }

    statements
}

/// Safety check over a single syntactically valid statement.
///
/// The root keyword must be SELECT (WITH is allowed as a prefix for
/// common table expressions ending in a SELECT) and no denylisted
/// keyword may appear as a word token anywhere in the statement.
pub fn check_safety(sql: &str) -> Result<(), RejectionReason> {
    let lowered = sql.to_lowercase();
    let tokens = word_tokens(&lowered);

    let root = match tokens.first() {
        Some(first) => first.as_str(),
        None => return Err(RejectionReason::SyntaxError("Empty statement".to_string())),
    };

    if root != "select" && root != "with" {
        return Err(RejectionReason::UnsafeStatement(format!(
            "Only SELECT statements are allowed, got '{}'",
            root.to_uppercase()
        )));
    }

    if root == "with" && !tokens.iter().any(|t| t == "select") {
        return Err(RejectionReason::UnsafeStatement(
            "Only SELECT statements are allowed".to_string(),
        ));
    }

    if let Some(bad) = tokens.iter().find(|t| DENYLIST.contains(&t.as_str())) {
        return Err(RejectionReason::UnsafeStatement(bad.to_uppercase()));
    }

    Ok(())
}

/// Lower-cased word tokens: maximal runs of alphanumerics and
/// underscores. `created_at` is one token and never matches `create`.
fn word_tokens(sql: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in sql.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        let raw = "```sql\nSELECT * FROM orders\n```";
        assert_eq!(strip_formatting(raw), "SELECT * FROM orders");
    }

    #[test]
    fn test_strip_bare_fence() {
        let raw = "```\nSELECT 1\n```";
        assert_eq!(strip_formatting(raw), "SELECT 1");
    }

    #[test]
    fn test_strip_sql_prefix_and_trailing_semicolon() {
        assert_eq!(strip_formatting("SQL: SELECT 1;"), "SELECT 1");
        assert_eq!(strip_formatting("  SELECT 1  "), "SELECT 1");
    }

    #[test]
    fn test_split_single_statement() {
        let parts = split_statements("SELECT * FROM t");
        assert_eq!(parts, vec!["SELECT * FROM t"]);
    }

    #[test]
    fn test_split_multiple_statements() {
        let parts = split_statements("SELECT 1; SELECT 2");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_split_ignores_semicolon_in_string() {
        let parts = split_statements("SELECT * FROM t WHERE note = 'a;b'");
        assert_eq!(parts.len(), 1);

        let parts = split_statements("SELECT \"weird;col\" FROM t");
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_split_trailing_semicolon_not_counted() {
        let parts = split_statements("SELECT 1;");
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_safety_allows_select() {
        assert!(check_safety("SELECT a, b FROM orders WHERE a > 1").is_ok());
    }

    #[test]
    fn test_safety_allows_cte() {
        assert!(check_safety("WITH top AS (SELECT a FROM t) SELECT * FROM top").is_ok());
    }

    #[test]
    fn test_safety_rejects_drop() {
        let result = check_safety("DROP TABLE orders");
        assert!(matches!(result, Err(RejectionReason::UnsafeStatement(_))));
    }

    #[test]
    fn test_safety_rejects_embedded_keyword() {
        // Root is SELECT but a write keyword still appears as a token
        let result = check_safety("SELECT * FROM t WHERE x = 1 UNION SELECT 1; DELETE FROM t");
        // split happens earlier in the pipeline; here DELETE is a token
        assert!(matches!(result, Err(RejectionReason::UnsafeStatement(_))));
    }

    #[test]
    fn test_safety_identifier_does_not_trip_denylist() {
        assert!(check_safety("SELECT created_at, updated_at FROM orders").is_ok());
        assert!(check_safety("SELECT delete_flag FROM orders").is_ok());
    }

    #[test]
    fn test_safety_rejects_non_select_root() {
        let result = check_safety("EXPLAIN SELECT 1");
        assert!(matches!(result, Err(RejectionReason::UnsafeStatement(_))));
    }

    #[test]
    fn test_rejection_labels() {
        assert_eq!(RejectionReason::MultipleStatements.label(), "multiple_statements");
        assert_eq!(
            RejectionReason::UnsafeStatement("DROP".to_string()).label(),
            "unsafe_statement"
        );
    }
}
