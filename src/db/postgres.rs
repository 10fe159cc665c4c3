// ABOUTME: PostgreSQL backend using sqlx
// ABOUTME: Catalog introspection via information_schema/pg_catalog and SQL export generation

use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{Column, ConnectOptions, Pool, Postgres, Row as SqlxRow, TypeInfo, ValueRef};

use crate::config::{default_port, DatabaseKind, RelationalParams};
use crate::db::helpers::{quote_ident_pg, render_inserts, undecodable_column, validate_identifier};
use crate::db::{DatabaseBackend, ServiceError};
use crate::models::{ColumnInfo, FunctionInfo, Row, TableInfo, TriggerInfo};

pub struct PostgresBackend {
    pool: Pool<Postgres>,
}

impl PostgresBackend {
    /// Connect to PostgreSQL; suspends until the handshake completes.
    pub async fn connect(params: &RelationalParams) -> Result<Self, ServiceError> {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port.unwrap_or(default_port(DatabaseKind::Postgres)))
            .database(&params.database)
            .username(&params.user)
            .password(&params.password)
            .log_statements(log::LevelFilter::Debug);

        // A single connection is the backend handle; the pool only manages its lifetime.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        info!(
            "[Postgres] Connected to {}:{}/{}",
            params.host,
            params.port.unwrap_or(default_port(DatabaseKind::Postgres)),
            params.database
        );
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>, ServiceError> {
        let query = r#"
            SELECT c.table_name,
                   json_agg(
                       json_build_object(
                           'name', c.column_name,
                           'type', c.data_type,
                           'nullable', c.is_nullable = 'YES'
                       )
                       ORDER BY c.ordinal_position
                   ) AS columns
            FROM information_schema.columns c
            WHERE c.table_schema = 'public'
            GROUP BY c.table_name
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        debug!("[Postgres] list_tables returned {} tables", rows.len());

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("table_name")?;
            let columns: Value = row.try_get("columns")?;
            let columns: Vec<ColumnInfo> = serde_json::from_value(columns)
                .map_err(|e| ServiceError::Malformed(format!("column aggregate for {name}: {e}")))?;
            tables.push(TableInfo { name, columns });
        }
        Ok(tables)
    }

    async fn list_triggers(&self) -> Result<Vec<TriggerInfo>, ServiceError> {
        let query = r#"
            SELECT trigger_name,
                   event_object_table,
                   event_manipulation,
                   action_timing,
                   action_statement
            FROM information_schema.triggers
            WHERE trigger_schema = 'public'
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<TriggerInfo, ServiceError> {
                Ok(TriggerInfo {
                    name: row.try_get("trigger_name")?,
                    table: row.try_get("event_object_table")?,
                    event: row.try_get("event_manipulation")?,
                    timing: row.try_get("action_timing")?,
                    statement: row
                        .try_get::<Option<String>, _>("action_statement")?
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn list_functions(&self) -> Result<Vec<FunctionInfo>, ServiceError> {
        let query = r#"
            SELECT p.proname AS name,
                   l.lanname AS language,
                   pg_get_function_result(p.oid) AS return_type,
                   pg_get_function_arguments(p.oid) AS arguments,
                   p.prosrc AS definition
            FROM pg_proc p
            JOIN pg_language l ON p.prolang = l.oid
            JOIN pg_namespace n ON p.pronamespace = n.oid
            WHERE n.nspname = 'public'
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<FunctionInfo, ServiceError> {
                Ok(FunctionInfo {
                    name: row.try_get("name")?,
                    language: row.try_get("language")?,
                    return_type: row
                        .try_get::<Option<String>, _>("return_type")?
                        .unwrap_or_default(),
                    arguments: row
                        .try_get::<Option<String>, _>("arguments")?
                        .unwrap_or_default(),
                    definition: row
                        .try_get::<Option<String>, _>("definition")?
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn run_query(&self, sql: &str) -> Result<Vec<Row>, ServiceError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn export_schema(&self, table: &str) -> Result<String, ServiceError> {
        validate_identifier(table)?;

        let query = r#"
            SELECT column_name,
                   data_type,
                   character_maximum_length,
                   is_nullable
            FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = $1
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(query).bind(table).fetch_all(&self.pool).await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(ColumnSpec {
                name: row.try_get("column_name")?,
                data_type: row.try_get("data_type")?,
                max_length: row.try_get("character_maximum_length")?,
                nullable: row.try_get::<String, _>("is_nullable")? == "YES",
            });
        }
        Ok(build_create_table(table, &columns))
    }

    async fn export_data(&self, table: &str) -> Result<String, ServiceError> {
        validate_identifier(table)?;

        let query = format!("SELECT * FROM {}", quote_ident_pg(table));
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let decoded = rows.iter().map(decode_row).collect::<Result<Vec<Row>, _>>()?;
        Ok(render_inserts(table, &decoded))
    }

    async fn disconnect(&self) -> Result<(), ServiceError> {
        self.pool.close().await;
        info!("[Postgres] Disconnected");
        Ok(())
    }
}

/// One column definition as read back from information_schema.
pub(crate) struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    pub max_length: Option<i32>,
    pub nullable: bool,
}

/// Assemble a CREATE TABLE statement from column definitions.
///
/// Returns an empty string when the column set is empty, which is how a
/// missing table surfaces from the information_schema lookup.
pub(crate) fn build_create_table(table: &str, columns: &[ColumnSpec]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let defs: Vec<String> = columns
        .iter()
        .map(|col| {
            let mut def = format!("  {} {}", quote_ident_pg(&col.name), col.data_type);
            if let Some(len) = col.max_length {
                def.push_str(&format!("({len})"));
            }
            if !col.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();

    format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_ident_pg(table),
        defs.join(",\n")
    )
}

/// Decode a driver row into a column-name-to-JSON mapping, best effort.
fn decode_row(row: &PgRow) -> Result<Row, ServiceError> {
    let mut out = Row::new();
    for (i, col) in row.columns().iter().enumerate() {
        let (is_null, type_name) = {
            let raw = row.try_get_raw(i)?;
            (raw.is_null(), raw.type_info().name().to_string())
        };

        let value = if is_null {
            Value::Null
        } else {
            match type_name.as_str() {
                "BOOL" => Value::Bool(row.try_get::<bool, _>(i)?),
                "INT2" => Value::from(row.try_get::<i16, _>(i)?),
                "INT4" => Value::from(row.try_get::<i32, _>(i)?),
                "INT8" => Value::from(row.try_get::<i64, _>(i)?),
                "FLOAT4" => Value::from(row.try_get::<f32, _>(i)? as f64),
                "FLOAT8" => Value::from(row.try_get::<f64, _>(i)?),
                "JSON" | "JSONB" => row.try_get::<Value, _>(i)?,
                "TIMESTAMPTZ" => {
                    Value::String(row.try_get::<chrono::DateTime<chrono::Utc>, _>(i)?.to_rfc3339())
                }
                "TIMESTAMP" => {
                    Value::String(row.try_get::<chrono::NaiveDateTime, _>(i)?.to_string())
                }
                "DATE" => Value::String(row.try_get::<chrono::NaiveDate, _>(i)?.to_string()),
                "TIME" => Value::String(row.try_get::<chrono::NaiveTime, _>(i)?.to_string()),
                "NUMERIC" => {
                    Value::String(row.try_get::<sqlx::types::Decimal, _>(i)?.to_string())
                }
                "UUID" => Value::String(row.try_get::<sqlx::types::Uuid, _>(i)?.to_string()),
                "BYTEA" => Value::String(bytea_literal(&row.try_get::<Vec<u8>, _>(i)?)),
                _ => match row.try_get::<String, _>(i) {
                    Ok(s) => Value::String(s),
                    // Never substitute a placeholder for a value that was not read
                    Err(_) => return Err(undecodable_column(col.name(), &type_name)),
                },
            }
        };
        out.insert(col.name().to_string(), value);
    }
    Ok(out)
}

/// Render bytea contents in the hex input syntax, so the quoted literal
/// round-trips through an INSERT.
fn bytea_literal(bytes: &[u8]) -> String {
    format!("\\x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytea_literal_uses_hex_input_syntax() {
        assert_eq!(bytea_literal(&[0xde, 0xad, 0xbe, 0xef]), "\\xdeadbeef");
        assert_eq!(bytea_literal(&[]), "\\x");
    }

    #[test]
    fn test_build_create_table_marks_not_null_and_length() {
        let columns = vec![
            ColumnSpec {
                name: "id".to_string(),
                data_type: "integer".to_string(),
                max_length: None,
                nullable: false,
            },
            ColumnSpec {
                name: "name".to_string(),
                data_type: "character varying".to_string(),
                max_length: Some(50),
                nullable: true,
            },
        ];

        assert_eq!(
            build_create_table("users", &columns),
            "CREATE TABLE \"users\" (\n  \"id\" integer NOT NULL,\n  \"name\" character varying(50)\n);"
        );
    }

    #[test]
    fn test_build_create_table_empty_columns_yield_empty_string() {
        assert_eq!(build_create_table("ghost", &[]), "");
    }
}
