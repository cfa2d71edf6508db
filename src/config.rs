// src/config.rs

//! Process configuration.
//!
//! A registry process is configured with a storage backend, a data
//! directory, and the list of administrator identities. Configuration comes
//! from a JSON file; every field has a default so a missing file or a
//! partial one still yields a working setup. Load failures are operator
//! errors (`NotConfigured`), not registry errors.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Default data directory when none is configured
pub const DEFAULT_DATA_DIR: &str = "/var/lib/curator";

/// Which storage backend persists the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// JSON registry file plus artifact files under the data directory
    File,
    /// SQLite database under the data directory
    Sqlite,
    /// In-memory storage; nothing survives the process
    Memory,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(StorageKind::File),
            "sqlite" => Ok(StorageKind::Sqlite),
            "memory" => Ok(StorageKind::Memory),
            other => Err(Error::NotConfigured(format!(
                "unknown storage backend '{other}' (expected file, sqlite, or memory)"
            ))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::File => write!(f, "file"),
            StorageKind::Sqlite => write!(f, "sqlite"),
            StorageKind::Memory => write!(f, "memory"),
        }
    }
}

/// Registry process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage backend for the registry and its artifacts
    pub storage: StorageKind,
    /// Directory holding the registry file/database and stored artifacts
    pub data_dir: PathBuf,
    /// Identities allowed to run administrative commands on any package
    pub admins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageKind::File,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            admins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// Unreadable or unparsable files are fatal operator errors.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::NotConfigured(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            Error::NotConfigured(format!("cannot parse config {}: {e}", path.display()))
        })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage, StorageKind::File);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert!(config.admins.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"storage": "sqlite", "data_dir": "/tmp/registry", "admins": ["root", "ops"]}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.storage, StorageKind::Sqlite);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/registry"));
        assert_eq!(config.admins, vec!["root".to_string(), "ops".to_string()]);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"admins": ["root"]}}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.storage, StorageKind::File);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.admins, vec!["root".to_string()]);
    }

    #[test]
    fn test_missing_config_is_not_configured() {
        let result = Config::load(Path::new("/nonexistent/curator.json"));
        assert!(matches!(result.unwrap_err(), Error::NotConfigured(_)));
    }

    #[test]
    fn test_garbage_config_is_not_configured() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json at all").unwrap();

        let result = Config::load(file.path());
        assert!(matches!(result.unwrap_err(), Error::NotConfigured(_)));
    }

    #[test]
    fn test_storage_kind_from_str() {
        assert_eq!("file".parse::<StorageKind>().unwrap(), StorageKind::File);
        assert_eq!(
            "sqlite".parse::<StorageKind>().unwrap(),
            StorageKind::Sqlite
        );
        assert_eq!(
            "memory".parse::<StorageKind>().unwrap(),
            StorageKind::Memory
        );
        assert!("postgres".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_storage_kind_display_round_trips() {
        for kind in [StorageKind::File, StorageKind::Sqlite, StorageKind::Memory] {
            assert_eq!(kind.to_string().parse::<StorageKind>().unwrap(), kind);
        }
    }
}
