// ABOUTME: Backend abstraction for dbscope
// ABOUTME: One capability trait, one error taxonomy, and a factory keyed on the configured kind

pub mod firestore;
pub mod helpers;
pub mod mysql;
pub mod postgres;
pub mod service;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ConnectionConfig, DatabaseKind};
use crate::models::{FunctionInfo, Row, TableInfo, TriggerInfo};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not connected to a database")]
    NotConnected,
    #[error("Operation {operation} is not supported for {kind} databases")]
    Unsupported {
        operation: &'static str,
        kind: DatabaseKind,
    },
    #[error("Database error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Malformed metadata payload: {0}")]
    Malformed(String),
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("Key file error: {0}")]
    KeyFile(String),
}

/// The capability set every backend presents.
///
/// Backends that structurally lack a capability return
/// [`ServiceError::Unsupported`] (SQL operations on Firestore) or an empty
/// sequence (trigger/function listings on Firestore) without touching the
/// network.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    fn kind(&self) -> DatabaseKind;

    async fn list_tables(&self) -> Result<Vec<TableInfo>, ServiceError>;

    async fn list_triggers(&self) -> Result<Vec<TriggerInfo>, ServiceError>;

    async fn list_functions(&self) -> Result<Vec<FunctionInfo>, ServiceError>;

    /// Execute an arbitrary statement in the backend's native dialect.
    async fn run_query(&self, sql: &str) -> Result<Vec<Row>, ServiceError>;

    /// Produce a single CREATE TABLE statement, or an empty string when the
    /// table has no columns.
    async fn export_schema(&self, table: &str) -> Result<String, ServiceError>;

    /// Produce newline-joined INSERT statements, or an empty string when the
    /// table has no rows.
    async fn export_data(&self, table: &str) -> Result<String, ServiceError>;

    async fn disconnect(&self) -> Result<(), ServiceError>;
}

/// Open the backend named by the configuration.
pub async fn connect_backend(
    config: &ConnectionConfig,
) -> Result<Box<dyn DatabaseBackend>, ServiceError> {
    match config {
        ConnectionConfig::Postgres(params) => {
            Ok(Box::new(postgres::PostgresBackend::connect(params).await?))
        }
        ConnectionConfig::MySql(params) => {
            Ok(Box::new(mysql::MySqlBackend::connect(params).await?))
        }
        ConnectionConfig::Firestore(params) => {
            Ok(Box::new(firestore::FirestoreBackend::connect(params).await?))
        }
    }
}
