// ABOUTME: MySQL backend using sqlx
// ABOUTME: information_schema introspection, SHOW CREATE TABLE export, and INSERT generation

use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, ConnectOptions, Executor, MySql, Pool, Row as SqlxRow, TypeInfo, ValueRef};

use crate::config::{default_port, DatabaseKind, RelationalParams};
use crate::db::helpers::{quote_ident_mysql, render_inserts, undecodable_column, validate_identifier};
use crate::db::{DatabaseBackend, ServiceError};
use crate::models::{ColumnInfo, FunctionInfo, Row, TableInfo, TriggerInfo};

pub struct MySqlBackend {
    pool: Pool<MySql>,
}

impl MySqlBackend {
    /// Connect to MySQL; suspends until the handshake completes.
    pub async fn connect(params: &RelationalParams) -> Result<Self, ServiceError> {
        let options = MySqlConnectOptions::new()
            .host(&params.host)
            .port(params.port.unwrap_or(default_port(DatabaseKind::MySql)))
            .database(&params.database)
            .username(&params.user)
            .password(&params.password)
            .log_statements(log::LevelFilter::Debug);

        // A single connection is the backend handle; the pool only manages its lifetime.
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    // GROUP_CONCAT truncates at group_concat_max_len (1024 by
                    // default), which cuts off the column aggregate on wide tables
                    conn.execute("SET SESSION group_concat_max_len = 1000000")
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;

        info!(
            "[MySQL] Connected to {}:{}/{}",
            params.host,
            params.port.unwrap_or(default_port(DatabaseKind::MySql)),
            params.database
        );
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseBackend for MySqlBackend {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>, ServiceError> {
        // MySQL has no json_agg; GROUP_CONCAT emits comma-joined JSON objects
        // that become a JSON array once wrapped in brackets.
        let query = r#"
            SELECT TABLE_NAME AS table_name,
                   CAST(GROUP_CONCAT(
                       JSON_OBJECT(
                           'name', COLUMN_NAME,
                           'type', DATA_TYPE,
                           'nullable', IF(IS_NULLABLE = 'YES', 1, 0)
                       )
                       ORDER BY ORDINAL_POSITION
                   ) AS CHAR) AS columns
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE()
            GROUP BY TABLE_NAME
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        debug!("[MySQL] list_tables returned {} tables", rows.len());

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("table_name")?;
            let columns = match row.try_get::<Option<String>, _>("columns")? {
                Some(raw) => parse_column_fragments(&raw)?,
                None => Vec::new(),
            };
            tables.push(TableInfo { name, columns });
        }
        Ok(tables)
    }

    async fn list_triggers(&self) -> Result<Vec<TriggerInfo>, ServiceError> {
        let query = r#"
            SELECT TRIGGER_NAME,
                   EVENT_OBJECT_TABLE,
                   EVENT_MANIPULATION,
                   ACTION_TIMING,
                   ACTION_STATEMENT
            FROM information_schema.TRIGGERS
            WHERE TRIGGER_SCHEMA = DATABASE()
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<TriggerInfo, ServiceError> {
                Ok(TriggerInfo {
                    name: row.try_get("TRIGGER_NAME")?,
                    table: row.try_get("EVENT_OBJECT_TABLE")?,
                    event: row.try_get("EVENT_MANIPULATION")?,
                    timing: row.try_get("ACTION_TIMING")?,
                    statement: row
                        .try_get::<Option<String>, _>("ACTION_STATEMENT")?
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn list_functions(&self) -> Result<Vec<FunctionInfo>, ServiceError> {
        // Parameter name/type pairs collapse into one declaration-order string
        // per routine; position 0 is the return value and is skipped.
        let query = r#"
            SELECT r.ROUTINE_NAME AS name,
                   r.ROUTINE_BODY AS language,
                   r.DATA_TYPE AS return_type,
                   CAST(COALESCE(GROUP_CONCAT(
                       CONCAT(p.PARAMETER_NAME, ' ', p.DATA_TYPE)
                       ORDER BY p.ORDINAL_POSITION
                       SEPARATOR ', '
                   ), '') AS CHAR) AS arguments,
                   r.ROUTINE_DEFINITION AS definition
            FROM information_schema.ROUTINES r
            LEFT JOIN information_schema.PARAMETERS p
                   ON p.SPECIFIC_NAME = r.SPECIFIC_NAME
                  AND p.SPECIFIC_SCHEMA = r.ROUTINE_SCHEMA
                  AND p.ORDINAL_POSITION > 0
            WHERE r.ROUTINE_SCHEMA = DATABASE()
              AND r.ROUTINE_TYPE = 'FUNCTION'
            GROUP BY r.SPECIFIC_NAME, r.ROUTINE_NAME, r.ROUTINE_BODY,
                     r.DATA_TYPE, r.ROUTINE_DEFINITION
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

        // SHOW CREATE TABLE has no bind mechanism for the identifier
        let query = format!("SHOW CREATE TABLE {}", quote_ident_mysql(table));
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<String, _>(1)?),
            None => Ok(String::new()),
        }
    }

    async fn export_data(&self, table: &str) -> Result<String, ServiceError> {
        validate_identifier(table)?;

        let query = format!("SELECT * FROM {}", quote_ident_mysql(table));
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let decoded = rows.iter().map(decode_row).collect::<Result<Vec<Row>, _>>()?;
        Ok(render_inserts(table, &decoded))
    }

    async fn disconnect(&self) -> Result<(), ServiceError> {
        self.pool.close().await;
        info!("[MySQL] Disconnected");
        Ok(())
    }
}

/// Parse a GROUP_CONCAT of JSON object fragments into column descriptors.
///
/// The fragments arrive comma-joined without surrounding brackets; wrapping
/// them yields a parseable JSON array. MySQL renders the nullable flag as
/// 0/1, so both numeric and boolean forms are accepted.
pub(crate) fn parse_column_fragments(raw: &str) -> Result<Vec<ColumnInfo>, ServiceError> {
    let wrapped = format!("[{raw}]");
    let values: Vec<Value> = serde_json::from_str(&wrapped)
        .map_err(|e| ServiceError::Malformed(format!("column aggregate: {e}")))?;

    values
        .iter()
        .map(|fragment| -> Result<ColumnInfo, ServiceError> {
            let name = fragment
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ServiceError::Malformed("column fragment missing name".to_string())
                })?
                .to_string();
            let data_type = fragment
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let nullable = match fragment.get("nullable") {
                Some(Value::Bool(flag)) => *flag,
                Some(Value::Number(n)) => n.as_i64() == Some(1),
                _ => false,
            };
            Ok(ColumnInfo {
                name,
                data_type,
                nullable,
            })
        })
        .collect()
}

/// Decode a driver row into a column-name-to-JSON mapping, best effort.
fn decode_row(row: &MySqlRow) -> Result<Row, ServiceError> {
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
                "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(i)?),
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                    Value::from(row.try_get::<i64, _>(i)?)
                }
                "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED"
                | "INT UNSIGNED" | "BIGINT UNSIGNED" => Value::from(row.try_get::<u64, _>(i)?),
                "FLOAT" => Value::from(row.try_get::<f32, _>(i)? as f64),
                "DOUBLE" => Value::from(row.try_get::<f64, _>(i)?),
                "JSON" => row.try_get::<Value, _>(i)?,
                "TIMESTAMP" => {
                    Value::String(row.try_get::<chrono::DateTime<chrono::Utc>, _>(i)?.to_rfc3339())
                }
                "DATETIME" => {
                    Value::String(row.try_get::<chrono::NaiveDateTime, _>(i)?.to_string())
                }
                "DATE" => Value::String(row.try_get::<chrono::NaiveDate, _>(i)?.to_string()),
                "TIME" => Value::String(row.try_get::<chrono::NaiveTime, _>(i)?.to_string()),
                "DECIMAL" => {
                    Value::String(row.try_get::<sqlx::types::Decimal, _>(i)?.to_string())
                }
                "BIT" => Value::from(row.try_get::<u64, _>(i)?),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_fragments_wraps_and_parses() {
        let raw = r#"{"name": "id", "type": "int", "nullable": 0},{"name": "name", "type": "varchar", "nullable": 1}"#;
        let columns = parse_column_fragments(raw).unwrap();
        assert_eq!(
            columns,
            vec![
                ColumnInfo {
                    name: "id".to_string(),
                    data_type: "int".to_string(),
                    nullable: false,
                },
                ColumnInfo {
                    name: "name".to_string(),
                    data_type: "varchar".to_string(),
                    nullable: true,
                },
            ]
        );
    }

    #[test]
    fn test_parse_column_fragments_accepts_boolean_flags() {
        let raw = r#"{"name": "id", "type": "int", "nullable": true}"#;
        let columns = parse_column_fragments(raw).unwrap();
        assert!(columns[0].nullable);
    }

    #[test]
    fn test_fragment_path_matches_native_array_path() {
        // The bracket-wrapped fragment parse must yield the same shape the
        // PostgreSQL json_agg path deserializes directly.
        let fragments = r#"{"name": "id", "type": "int", "nullable": 0}"#;
        let native: Vec<ColumnInfo> =
            serde_json::from_str(r#"[{"name": "id", "type": "int", "nullable": false}]"#).unwrap();
        assert_eq!(parse_column_fragments(fragments).unwrap(), native);
    }

    #[test]
    fn test_parse_column_fragments_wide_column_set() {
        // Aggregates well past the 1 KiB group_concat_max_len session default
        // must survive the wrap-and-parse path intact.
        let fragments: Vec<String> = (0..40)
            .map(|i| format!(r#"{{"name": "column_{i}", "type": "varchar", "nullable": 1}}"#))
            .collect();
        let raw = fragments.join(",");
        assert!(raw.len() > 1024);

        let columns = parse_column_fragments(&raw).unwrap();
        assert_eq!(columns.len(), 40);
        assert_eq!(columns[39].name, "column_39");
        assert!(columns.iter().all(|col| col.nullable));
    }

    #[test]
    fn test_parse_column_fragments_rejects_garbage() {
        assert!(parse_column_fragments("not json at all").is_err());
    }
}
