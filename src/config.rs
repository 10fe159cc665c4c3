// ABOUTME: Connection configuration for dbscope
// ABOUTME: Kind-tagged connection parameters plus a JSON profile store on disk

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),
}

/// The three supported backend kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Postgres,
    MySql,
    Firestore,
}

impl std::fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseKind::Postgres => write!(f, "postgres"),
            DatabaseKind::MySql => write!(f, "mysql"),
            DatabaseKind::Firestore => write!(f, "firestore"),
        }
    }
}

/// Address and credentials for a relational server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationalParams {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
}

/// Project and key file for a Firestore database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreParams {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "keyFilename")]
    pub key_filename: String,
}

/// Everything needed to reach one database, tagged by kind.
///
/// A document with an unrecognized `type` tag fails at parse time, so an
/// unknown kind can never reach the connect path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    Postgres(RelationalParams),
    MySql(RelationalParams),
    Firestore(FirestoreParams),
}

impl ConnectionConfig {
    pub fn kind(&self) -> DatabaseKind {
        match self {
            ConnectionConfig::Postgres(_) => DatabaseKind::Postgres,
            ConnectionConfig::MySql(_) => DatabaseKind::MySql,
            ConnectionConfig::Firestore(_) => DatabaseKind::Firestore,
        }
    }
}

/// Default server port for a relational kind.
pub fn default_port(kind: DatabaseKind) -> u16 {
    match kind {
        DatabaseKind::Postgres => 5432,
        DatabaseKind::MySql => 3306,
        DatabaseKind::Firestore => 0,
    }
}

/// Named connection profiles persisted as JSON in the platform config dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profiles {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(rename = "activeProfile", default)]
    pub active_profile: String,
    #[serde(default)]
    pub profiles: HashMap<String, ConnectionConfig>,
}

fn default_version() -> u32 {
    1
}

impl Default for Profiles {
    fn default() -> Self {
        Self {
            version: 1,
            active_profile: String::new(),
            profiles: HashMap::new(),
        }
    }
}

impl Profiles {
    /// Get the config file path based on OS
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoDirFound)?;
        Ok(config_dir.join("dbscope").join("profiles.json"))
    }

    /// Load profiles from the default location, or create an empty set if none exist
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load profiles from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let profiles: Profiles = serde_json::from_str(&contents)?;
        Ok(profiles)
    }

    /// Save profiles to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save profiles to an explicit path, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the active connection configuration
    pub fn active_config(&self) -> Result<&ConnectionConfig, ConfigError> {
        self.profiles
            .get(&self.active_profile)
            .ok_or_else(|| ConfigError::ProfileNotFound(self.active_profile.clone()))
    }

    /// Add or update a profile
    pub fn set_profile(&mut self, key: String, config: ConnectionConfig) {
        if self.profiles.is_empty() {
            self.active_profile = key.clone();
        }
        self.profiles.insert(key, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pg_config() -> ConnectionConfig {
        ConnectionConfig::Postgres(RelationalParams {
            host: "localhost".to_string(),
            port: None,
            database: "app".to_string(),
            user: "app".to_string(),
            password: "secret".to_string(),
        })
    }

    #[test]
    fn test_kind_tags() {
        let json = serde_json::to_value(pg_config()).unwrap();
        assert_eq!(json["type"], "postgres");

        let fs = ConnectionConfig::Firestore(FirestoreParams {
            project_id: "demo".to_string(),
            key_filename: "/tmp/key.json".to_string(),
        });
        let json = serde_json::to_value(&fs).unwrap();
        assert_eq!(json["type"], "firestore");
        assert_eq!(json["projectId"], "demo");
    }

    #[test]
    fn test_unknown_kind_fails_parse() {
        let raw = r#"{"type":"mongodb","host":"localhost","database":"x","user":"u"}"#;
        let parsed: Result<ConnectionConfig, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(default_port(DatabaseKind::Postgres), 5432);
        assert_eq!(default_port(DatabaseKind::MySql), 3306);
    }

    #[test]
    fn test_profiles_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");

        let mut profiles = Profiles::default();
        profiles.set_profile("dev".to_string(), pg_config());
        profiles.save_to(&path).unwrap();

        let loaded = Profiles::load_from(&path).unwrap();
        assert_eq!(loaded.active_profile, "dev");
        assert_eq!(loaded.active_config().unwrap().kind(), DatabaseKind::Postgres);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Profiles::load_from(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.profiles.is_empty());
    }
}
