// ABOUTME: Main library for dbscope
// ABOUTME: Uniform introspection, query, and export surface over PostgreSQL, MySQL and Firestore

pub mod config;
pub mod db;
pub mod models;

pub use config::{ConnectionConfig, DatabaseKind, FirestoreParams, Profiles, RelationalParams};
pub use db::service::DatabaseService;
pub use db::{DatabaseBackend, ServiceError};
pub use models::{ColumnInfo, FunctionInfo, Row, TableInfo, TriggerInfo};
