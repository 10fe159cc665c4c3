// ABOUTME: Shared data models for dbscope
// ABOUTME: Descriptor shapes returned by every backend, serialized with camelCase wire names

use serde::{Deserialize, Serialize};

/// A single column of a relational table.
///
/// `data_type` carries the backend's native type name verbatim; the two SQL
/// dialects are not normalized against each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
}

/// A table (or, for Firestore, a top-level collection).
///
/// Firestore has no schema concept, so `columns` is always empty there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

/// A trigger as reported by the relational catalogs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub name: String,
    pub table: String,
    pub event: String,
    pub timing: String,
    pub statement: String,
}

/// A stored function signature plus its definition text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub language: String,
    #[serde(rename = "returnType")]
    pub return_type: String,
    pub arguments: String,
    pub definition: String,
}

/// One result row: column name mapped to a backend-native value decoded into JSON.
pub type Row = serde_json::Map<String, serde_json::Value>;
