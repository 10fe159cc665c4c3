// ABOUTME: Dialect-independent SQL text helpers
// ABOUTME: Identifier quoting, value literal rendering, and INSERT statement generation

use serde_json::Value;

use crate::db::ServiceError;
use crate::models::Row;

/// Error for a column value the driver cannot decode into any supported form.
///
/// Raised instead of substituting a placeholder, so an export never writes a
/// value that was not actually read.
pub fn undecodable_column(column: &str, type_name: &str) -> ServiceError {
    ServiceError::Malformed(format!(
        "column {column} has type {type_name} with no supported decoding"
    ))
}

/// Reject identifiers that cannot be made safe by quoting.
pub fn validate_identifier(name: &str) -> Result<(), ServiceError> {
    if name.is_empty() || name.contains('\0') {
        return Err(ServiceError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Double-quote an identifier for PostgreSQL, doubling embedded quotes.
pub fn quote_ident_pg(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Backtick-quote an identifier for MySQL, doubling embedded backticks.
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Render a JSON value as a SQL literal.
///
/// Null becomes the bare NULL token, strings are single-quoted with embedded
/// quotes doubled, everything else keeps its default textual form.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Arrays and objects surface as quoted JSON text
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

/// Render one INSERT statement per row, joined by newlines.
///
/// The column list comes from the first row's keys; an empty row set renders
/// as an empty string rather than a degenerate INSERT.
pub fn render_inserts(table: &str, rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let columns: Vec<String> = first.keys().cloned().collect();
    let column_list = columns.join(", ");

    let statements: Vec<String> = rows
        .iter()
        .map(|row| {
            let values: Vec<String> = columns
                .iter()
                .map(|col| sql_literal(row.get(col).unwrap_or(&Value::Null)))
                .collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({});",
                table,
                column_list,
                values.join(", ")
            )
        })
        .collect();

    statements.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert(k.to_string(), v.clone());
        }
        row
    }

    #[test]
    fn test_quote_ident_doubles_embedded_quotes() {
        assert_eq!(quote_ident_pg("users"), "\"users\"");
        assert_eq!(quote_ident_pg("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_ident_mysql("users"), "`users`");
        assert_eq!(quote_ident_mysql("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_undecodable_column_names_column_and_type() {
        let err = undecodable_column("price", "MONEY");
        let message = err.to_string();
        assert!(message.contains("price"));
        assert!(message.contains("MONEY"));
        assert!(matches!(err, ServiceError::Malformed(_)));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("a\0b").is_err());
    }

    #[test]
    fn test_string_literal_escapes_single_quotes() {
        assert_eq!(sql_literal(&json!("O'Brien")), "'O''Brien'");
    }

    #[test]
    fn test_null_literal_is_bare() {
        assert_eq!(sql_literal(&Value::Null), "NULL");
    }

    #[test]
    fn test_scalar_literals() {
        assert_eq!(sql_literal(&json!(42)), "42");
        assert_eq!(sql_literal(&json!(2.5)), "2.5");
        assert_eq!(sql_literal(&json!(true)), "true");
    }

    #[test]
    fn test_render_inserts_single_row_with_null() {
        let rows = vec![row(&[("id", json!(1)), ("name", Value::Null)])];
        assert_eq!(
            render_inserts("users", &rows),
            "INSERT INTO users (id, name) VALUES (1, NULL);"
        );
    }

    #[test]
    fn test_render_inserts_joins_rows_with_newlines() {
        let rows = vec![
            row(&[("id", json!(1)), ("name", json!("O'Brien"))]),
            row(&[("id", json!(2)), ("name", Value::Null)]),
        ];
        assert_eq!(
            render_inserts("users", &rows),
            "INSERT INTO users (id, name) VALUES (1, 'O''Brien');\n\
             INSERT INTO users (id, name) VALUES (2, NULL);"
        );
    }

    #[test]
    fn test_render_inserts_empty_rows_yield_empty_string() {
        assert_eq!(render_inserts("users", &[]), "");
    }
}
