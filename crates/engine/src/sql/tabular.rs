//! SQLite-backed tabular store for CSV-derived tables.
//!
//! Tables are loaded from parsed CSV content with simple type inference
//! (INTEGER, REAL, TEXT by column scan). The store doubles as the SQL
//! parser: `check_statement` probes a candidate with `prepare`, the same
//! engine that will execute it.

use crate::types::TableRows;
use docqa_core::{AppError, AppResult};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Outcome of the parser probe.
///
/// A missing table surfaces from the parser as an error, but the pipeline
/// reports it in its own validation step, so it is classified separately
/// from a genuine parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementCheck {
    Ok,
    ParseError(String),
    MissingTable(String),
}

/// Trait for tabular store backends.
pub trait TabularStore: Send + Sync {
    /// Create (or replace) a table from column names and row values.
    fn load_table(&self, name: &str, columns: &[String], rows: &[Vec<String>]) -> AppResult<()>;

    /// List loaded table names.
    fn tables(&self) -> AppResult<Vec<String>>;

    /// Column names and affinities for a table.
    fn schema(&self, name: &str) -> AppResult<Vec<(String, String)>>;

    /// Up to `n` rows from the top of a table.
    fn sample(&self, name: &str, n: usize) -> AppResult<TableRows>;

    /// Probe a statement with the engine's parser without executing it.
    fn check_statement(&self, sql: &str) -> AppResult<StatementCheck>;

    /// Execute a statement with a row ceiling.
    fn execute(&self, sql: &str, max_rows: usize) -> AppResult<TableRows>;
}

/// In-memory SQLite implementation.
pub struct SqliteTabularStore {
    conn: Mutex<Connection>,
}

impl SqliteTabularStore {
    pub fn new() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Store(format!("Failed to open tabular store: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Load a CSV file, deriving the table name from the file stem.
    ///
    /// Returns the (sanitized) table name.
    pub fn load_csv(&self, path: &Path) -> AppResult<String> {
        let contents = std::fs::read_to_string(path)?;
        let records = parse_csv(&contents);

        let mut rows = records.into_iter();
        let header = rows
            .next()
            .ok_or_else(|| AppError::Store(format!("CSV file is empty: {}", path.display())))?;

        let columns: Vec<String> = header.iter().map(|h| sanitize_identifier(h)).collect();
        let rows: Vec<Vec<String>> = rows.collect();

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AppError::Store(format!("Invalid CSV path: {}", path.display())))?;
        let table = sanitize_identifier(stem);

        self.load_table(&table, &columns, &rows)?;

        tracing::info!(
            "Loaded table '{}' from {} ({} rows, {} columns)",
            table,
            path.display(),
            rows.len(),
            columns.len()
        );

        Ok(table)
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TabularStore for SqliteTabularStore {
    fn load_table(&self, name: &str, columns: &[String], rows: &[Vec<String>]) -> AppResult<()> {
        if columns.is_empty() {
            return Err(AppError::Store("Table must have at least one column".to_string()));
        }

        let types: Vec<&str> = (0..columns.len())
            .map(|i| infer_column_type(rows.iter().filter_map(|r| r.get(i).map(|s| s.as_str()))))
            .collect();

        let column_defs: Vec<String> = columns
            .iter()
            .zip(&types)
            .map(|(col, ty)| format!("\"{}\" {}", col, ty))
            .collect();

        let conn = self.lock_conn();

        conn.execute(&format!("DROP TABLE IF EXISTS \"{}\"", name), [])
            .map_err(|e| AppError::Store(format!("Failed to replace table: {}", e)))?;

        conn.execute(
            &format!("CREATE TABLE \"{}\" ({})", name, column_defs.join(", ")),
            [],
        )
        .map_err(|e| AppError::Store(format!("Failed to create table '{}': {}", name, e)))?;

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO \"{}\" VALUES ({})",
            name,
            placeholders.join(", ")
        );

        let mut stmt = conn
            .prepare(&insert_sql)
            .map_err(|e| AppError::Store(format!("Failed to prepare insert: {}", e)))?;

        for row in rows {
            // Short rows pad with empty values, long rows are clipped
            let values: Vec<&str> = (0..columns.len())
                .map(|i| row.get(i).map(|s| s.as_str()).unwrap_or(""))
                .collect();

            stmt.execute(rusqlite::params_from_iter(values.iter()))
                .map_err(|e| AppError::Store(format!("Failed to insert row: {}", e)))?;
        }

        Ok(())
    }

    fn tables(&self) -> AppResult<Vec<String>> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .map_err(|e| AppError::Store(format!("Failed to list tables: {}", e)))?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| AppError::Store(format!("Failed to list tables: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Store(format!("Failed to read table name: {}", e)))?;

        Ok(names)
    }

    fn schema(&self, name: &str) -> AppResult<Vec<(String, String)>> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info(\"{}\")", name))
            .map_err(|e| AppError::Store(format!("Failed to read schema: {}", e)))?;

        let columns = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(|e| AppError::Store(format!("Failed to read schema: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Store(format!("Failed to read schema row: {}", e)))?;

        if columns.is_empty() {
            return Err(AppError::Store(format!("Unknown table: {}", name)));
        }

        Ok(columns)
    }

    fn sample(&self, name: &str, n: usize) -> AppResult<TableRows> {
        self.execute(&format!("SELECT * FROM \"{}\"", name), n)
    }

    fn check_statement(&self, sql: &str) -> AppResult<StatementCheck> {
        let conn = self.lock_conn();
        // The prepared statement borrows the guard; drop it before the
        // guard goes out of scope
        let check = match conn.prepare(sql) {
            Ok(stmt) => {
                drop(stmt);
                StatementCheck::Ok
            }
            Err(e) => {
                let message = e.to_string();
                if let Some(table) = missing_table_name(&message) {
                    StatementCheck::MissingTable(table)
                } else {
                    StatementCheck::ParseError(message)
                }
            }
        };
        Ok(check)
    }

    fn execute(&self, sql: &str, max_rows: usize) -> AppResult<TableRows> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AppError::Store(e.to_string()))?;

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut rows_iter = stmt
            .query([])
            .map_err(|e| AppError::Store(e.to_string()))?;

        let mut rows = Vec::new();
        let mut truncated = false;

        while let Some(row) = rows_iter.next().map_err(|e| AppError::Store(e.to_string()))? {
            if rows.len() >= max_rows {
                truncated = true;
                break;
            }

            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = row
                    .get_ref(i)
                    .map_err(|e| AppError::Store(e.to_string()))?;
                values.push(format_value(value));
            }
            rows.push(values);
        }

        let row_count = rows.len();
        Ok(TableRows {
            columns,
            rows,
            row_count,
            truncated,
        })
    }
}

/// Extract the table name from SQLite's "no such table" message.
fn missing_table_name(message: &str) -> Option<String> {
    let marker = "no such table: ";
    message
        .find(marker)
        .map(|idx| message[idx + marker.len()..].trim().to_string())
        .filter(|name| !name.is_empty())
}

fn format_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(_) => "<blob>".to_string(),
    }
}

/// Infer a column affinity by scanning the values.
///
/// All non-empty values parse as i64 → INTEGER; as f64 → REAL; else TEXT.
/// An all-empty column is TEXT.
fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> &'static str {
    let mut saw_value = false;
    let mut all_int = true;
    let mut all_real = true;

    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        saw_value = true;

        if value.parse::<i64>().is_err() {
            all_int = false;
        }
        if value.parse::<f64>().is_err() {
            all_real = false;
        }
        if !all_real {
            break;
        }
    }

    if !saw_value {
        "TEXT"
    } else if all_int {
        "INTEGER"
    } else if all_real {
        "REAL"
    } else {
        "TEXT"
    }
}

/// Sanitize a CSV-derived name into a safe SQL identifier: lower-case,
/// non-alphanumerics become underscores, digit-leading names get a
/// prefix.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut name: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();

    if name.is_empty() {
        name = "unnamed".to_string();
    }

    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        name = format!("t_{}", name);
    }

    name
}

/// Minimal quote-aware CSV parser.
///
/// Handles quoted fields, escaped quotes (`""`), commas and newlines
/// inside quotes, and CRLF line endings. Good enough for the extracted
/// tables this engine ingests; not a general-purpose CSV library.
pub fn parse_csv(contents: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = contents.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(ch),
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => {
                    record.push(std::mem::take(&mut field));
                }
                '\r' => {
                    // Consumed as part of CRLF; a bare CR is ignored
                }
                '\n' => {
                    record.push(std::mem::take(&mut field));
                    if !(record.len() == 1 && record[0].is_empty()) {
                        records.push(std::mem::take(&mut record));
                    } else {
                        record.clear();
                    }
                }
                _ => field.push(ch),
            }
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_orders() -> SqliteTabularStore {
        let store = SqliteTabularStore::new().unwrap();
        store
            .load_table(
                "orders",
                &["id".to_string(), "total".to_string(), "region".to_string()],
                &[
                    vec!["1".to_string(), "9.99".to_string(), "north".to_string()],
                    vec!["2".to_string(), "15.50".to_string(), "south".to_string()],
                    vec!["3".to_string(), "7.25".to_string(), "north".to_string()],
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_load_and_list_tables() {
        let store = store_with_orders();
        assert_eq!(store.tables().unwrap(), vec!["orders"]);
    }

    #[test]
    fn test_schema_with_inferred_types() {
        let store = store_with_orders();
        let schema = store.schema("orders").unwrap();

        assert_eq!(schema[0], ("id".to_string(), "INTEGER".to_string()));
        assert_eq!(schema[1], ("total".to_string(), "REAL".to_string()));
        assert_eq!(schema[2], ("region".to_string(), "TEXT".to_string()));
    }

    #[test]
    fn test_schema_unknown_table() {
        let store = SqliteTabularStore::new().unwrap();
        assert!(store.schema("missing").is_err());
    }

    #[test]
    fn test_sample_limits_rows() {
        let store = store_with_orders();
        let sample = store.sample("orders", 2).unwrap();

        assert_eq!(sample.row_count, 2);
        assert!(sample.truncated);
    }

    #[test]
    fn test_execute_with_row_ceiling() {
        let store = store_with_orders();

        let all = store.execute("SELECT * FROM orders", 500).unwrap();
        assert_eq!(all.row_count, 3);
        assert!(!all.truncated);

        let capped = store.execute("SELECT * FROM orders", 1).unwrap();
        assert_eq!(capped.row_count, 1);
        assert!(capped.truncated);
    }

    #[test]
    fn test_execute_aggregates() {
        let store = store_with_orders();
        let result = store
            .execute("SELECT region, COUNT(*) AS n FROM orders GROUP BY region ORDER BY region", 500)
            .unwrap();

        assert_eq!(result.columns, vec!["region", "n"]);
        assert_eq!(result.rows[0], vec!["north", "2"]);
        assert_eq!(result.rows[1], vec!["south", "1"]);
    }

    #[test]
    fn test_check_statement_ok() {
        let store = store_with_orders();
        assert_eq!(
            store.check_statement("SELECT id FROM orders").unwrap(),
            StatementCheck::Ok
        );
    }

    #[test]
    fn test_check_statement_parse_error() {
        let store = store_with_orders();
        let check = store.check_statement("SELEC id FROM orders").unwrap();
        assert!(matches!(check, StatementCheck::ParseError(_)));
    }

    #[test]
    fn test_check_statement_missing_table() {
        let store = store_with_orders();
        let check = store.check_statement("SELECT * FROM invoices").unwrap();
        assert_eq!(check, StatementCheck::MissingTable("invoices".to_string()));
    }

    #[test]
    fn test_load_table_replaces_existing() {
        let store = store_with_orders();
        store
            .load_table(
                "orders",
                &["only".to_string()],
                &[vec!["x".to_string()]],
            )
            .unwrap();

        let schema = store.schema("orders").unwrap();
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("Sales Report"), "sales_report");
        assert_eq!(sanitize_identifier("2024-data"), "t_2024_data");
        assert_eq!(sanitize_identifier("clean_name"), "clean_name");
        assert_eq!(sanitize_identifier("  "), "unnamed");
    }

    #[test]
    fn test_parse_csv_basic() {
        let records = parse_csv("a,b,c\n1,2,3\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec!["a", "b", "c"]);
        assert_eq!(records[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_parse_csv_quoted_fields() {
        let records = parse_csv("name,note\n\"Smith, Jo\",\"said \"\"hi\"\"\"\n");
        assert_eq!(records[1], vec!["Smith, Jo", "said \"hi\""]);
    }

    #[test]
    fn test_parse_csv_newline_in_quotes() {
        let records = parse_csv("a,b\n\"line1\nline2\",x\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1][0], "line1\nline2");
    }

    #[test]
    fn test_parse_csv_crlf() {
        let records = parse_csv("a,b\r\n1,2\r\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], vec!["1", "2"]);
    }

    #[test]
    fn test_load_csv_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Q1 Sales.csv");
        std::fs::write(&path, "id,amount\n1,100\n2,250\n").unwrap();

        let store = SqliteTabularStore::new().unwrap();
        let table = store.load_csv(&path).unwrap();

        assert_eq!(table, "q1_sales");
        let result = store.execute("SELECT SUM(amount) FROM q1_sales", 10).unwrap();
        assert_eq!(result.rows[0][0], "350");
    }

    #[test]
    fn test_load_csv_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();

        let store = SqliteTabularStore::new().unwrap();
        assert!(store.load_csv(&path).is_err());
    }
}
