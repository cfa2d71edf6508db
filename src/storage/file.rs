// src/storage/file.rs

//! Filesystem storage backend.
//!
//! Layout under the data directory:
//! - `registry.json`: the whole registry map, written atomically
//! - `files/<name>/<name>-<version>.tar.gz`: stored artifacts
//! - `files/<name>/<name>-<version>.tar.gz.sha256`: digest sidecars

use crate::error::{Error, Result};
use crate::registry::{RegistryEntry, RegistryMap};
use crate::storage::Storage;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Registry map file name under the data directory
const REGISTRY_FILE: &str = "registry.json";

/// Subdirectory holding stored artifacts
const FILES_DIR: &str = "files";

/// Stores the registry as a JSON file and artifacts as files.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a file-backed store under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        Ok(FileStorage {
            root: data_dir.to_path_buf(),
        })
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }
}

impl Storage for FileStorage {
    fn load_registry(&self) -> Result<RegistryMap> {
        let path = self.registry_path();
        if !path.exists() {
            debug!("no registry file at {}, starting empty", path.display());
            return Ok(RegistryMap::new());
        }
        let raw = fs::read_to_string(&path)?;
        if raw.trim().is_empty() {
            return Ok(RegistryMap::new());
        }
        let registry = serde_json::from_str(&raw)?;
        Ok(registry)
    }

    fn save_registry(&self, registry: &RegistryMap) -> Result<()> {
        let path = self.registry_path();
        let json = serde_json::to_string_pretty(registry)?;

        // Write to a temp file in the same directory, then rename over the
        // old registry so readers never observe a partial file.
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;

        debug!("wrote {} ({} packages)", path.display(), registry.len());
        Ok(())
    }

    fn save_package(&self, entry: &RegistryEntry, artifact: &Path) -> Result<()> {
        let name = &entry.metadata.name;
        let version = &entry.metadata.version;

        let dir = self.root.join(FILES_DIR).join(name);
        fs::create_dir_all(&dir)?;

        let file_name = format!("{name}-{version}.tar.gz");
        let dest = dir.join(&file_name);
        fs::copy(artifact, &dest)?;

        let digest = sha256_file(&dest)?;
        fs::write(dir.join(format!("{file_name}.sha256")), format!("{digest}  {file_name}\n"))?;

        info!("stored artifact {} (sha256 {})", dest.display(), digest);
        Ok(())
    }
}

/// Hex SHA-256 digest of a file's contents, streamed.
fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
