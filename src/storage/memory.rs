// src/storage/memory.rs

//! In-memory storage backend.
//!
//! Holds the persisted registry map and artifact bytes in process memory.
//! Nothing survives the process; useful for tests and ephemeral registries.

use crate::error::Result;
use crate::registry::{RegistryEntry, RegistryMap};
use crate::storage::Storage;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Keeps "persisted" state in memory.
#[derive(Default)]
pub struct MemoryStorage {
    registry: Mutex<RegistryMap>,
    artifacts: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// The registry map as last persisted.
    pub fn persisted(&self) -> RegistryMap {
        self.registry.lock().unwrap().clone()
    }

    /// Stored artifact bytes for a name/version pair.
    pub fn artifact(&self, name: &str, version: &str) -> Option<Vec<u8>> {
        self.artifacts
            .lock()
            .unwrap()
            .get(&(name.to_string(), version.to_string()))
            .cloned()
    }
}

impl Storage for MemoryStorage {
    fn load_registry(&self) -> Result<RegistryMap> {
        Ok(self.registry.lock().unwrap().clone())
    }

    fn save_registry(&self, registry: &RegistryMap) -> Result<()> {
        *self.registry.lock().unwrap() = registry.clone();
        Ok(())
    }

    fn save_package(&self, entry: &RegistryEntry, artifact: &Path) -> Result<()> {
        let data = fs::read(artifact)?;
        self.artifacts.lock().unwrap().insert(
            (entry.metadata.name.clone(), entry.metadata.version.clone()),
            data,
        );
        Ok(())
    }
}
