// src/storage/sqlite.rs

//! SQLite storage backend.
//!
//! Everything lives in one database file under the data directory:
//! - `packages`: name → serialized registry entry (the durable map)
//! - `artifacts`: stored artifact blobs with their SHA-256 digests
//!
//! Schema changes are tracked in a `schema_version` table and applied
//! stepwise by [`migrate`], so opening an older database upgrades it in
//! place.

use crate::error::Result;
use crate::registry::{RegistryEntry, RegistryMap};
use crate::storage::Storage;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Database file name under the data directory
const DB_FILE: &str = "registry.db";

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Stores the registry and its artifacts in a SQLite database.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (creating and migrating if needed) a database under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;

        // Set pragmas for better performance and reliability
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        migrate(&conn)?;
        debug!("opened registry database at {}", db_path.display());

        Ok(SqliteStorage {
            conn: Mutex::new(conn),
        })
    }
}

impl Storage for SqliteStorage {
    fn load_registry(&self) -> Result<RegistryMap> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT name, entry FROM packages")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut registry = RegistryMap::new();
        for row in rows {
            let (name, raw) = row?;
            let entry: RegistryEntry = serde_json::from_str(&raw)?;
            registry.insert(name, entry);
        }
        Ok(registry)
    }

    fn save_registry(&self, registry: &RegistryMap) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM packages", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO packages (name, entry) VALUES (?1, ?2)")?;
            for (name, entry) in registry {
                stmt.execute(params![name, serde_json::to_string(entry)?])?;
            }
        }
        tx.commit()?;
        debug!("wrote {} package(s) to the database", registry.len());
        Ok(())
    }

    fn save_package(&self, entry: &RegistryEntry, artifact: &Path) -> Result<()> {
        let data = fs::read(artifact)?;
        let digest = format!("{:x}", Sha256::digest(&data));

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO artifacts (name, version, sha256, data)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.metadata.name, entry.metadata.version, digest, data],
        )?;

        info!(
            "stored artifact {}-{} ({} bytes, sha256 {})",
            entry.metadata.name,
            entry.metadata.version,
            data.len(),
            digest
        );
        Ok(())
    }
}

/// Get the current schema version, creating the tracking table if needed.
fn schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;
    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .optional()?;
    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply any pending schema migrations.
fn migrate(conn: &Connection) -> Result<()> {
    let mut version = schema_version(conn)?;
    while version < SCHEMA_VERSION {
        version += 1;
        match version {
            1 => migrate_v1(conn)?,
            _ => unreachable!("unknown schema version {version}"),
        }
        set_schema_version(conn, version)?;
    }
    Ok(())
}

/// Initial schema - Version 1
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        -- Packages: the registry map, one serialized entry per name
        CREATE TABLE packages (
            name TEXT PRIMARY KEY,
            entry TEXT NOT NULL
        );

        -- Artifacts: stored package content with integrity digests
        CREATE TABLE artifacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            version TEXT NOT NULL,
            sha256 TEXT NOT NULL,
            data BLOB NOT NULL,
            stored_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(name, version)
        );

        CREATE INDEX idx_artifacts_name ON artifacts(name);
        ",
    )?;

    info!("Schema version 1 created successfully");
    Ok(())
}
