// src/registry/mod.rs

//! Package registry: entries, the in-memory store, and the mutation
//! workflows built on top of it.
//!
//! [`Registry`] is the facade callers hold. It owns the loaded map, the
//! storage backend, the artifact validator, and the authorization guard;
//! the publish, download, and command workflows hang off it as methods.
//! Dropping a `Registry` joins the persistence worker, flushing any queued
//! registry write.

pub mod commands;
pub mod downloads;
pub mod entry;
mod publish;
pub mod store;

pub use commands::{ChangeOwner, ChangeRequirements, Command, DeleteMetadata, Disposition};
pub use downloads::{DownloadReport, RECENT_WINDOW_DAYS};
pub use entry::{PackageMetadata, RegistryEntry, RegistryMap, VersionRecord};
pub use store::RegistryStore;

use crate::auth::{AuthorizationGuard, OwnerField};
use crate::config::Config;
use crate::error::Result;
use crate::storage::{self, Storage};
use crate::validate::{TarballValidator, Validator};
use std::sync::Arc;

/// The extension package registry.
pub struct Registry {
    store: RegistryStore,
    storage: Arc<dyn Storage>,
    validator: Box<dyn Validator>,
    guard: AuthorizationGuard,
}

impl Registry {
    /// Assemble a registry from explicit collaborators.
    pub fn new(
        storage: Arc<dyn Storage>,
        validator: Box<dyn Validator>,
        guard: AuthorizationGuard,
    ) -> Result<Self> {
        let store = RegistryStore::new(storage.clone())?;
        Ok(Registry {
            store,
            storage,
            validator,
            guard,
        })
    }

    /// Open a registry with the standard collaborators for `config`: the
    /// configured storage backend, tarball validation, and owner-field
    /// authorization with the configured admins.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = storage::open(config)?;
        let guard = AuthorizationGuard::new(Arc::new(OwnerField), config.admins.clone());
        Registry::new(storage, Box::new(TarballValidator), guard)
    }

    /// Load the in-memory map from storage, returning the package count.
    pub fn load(&self) -> Result<usize> {
        self.store.load()
    }

    /// Look up one package.
    pub fn get(&self, name: &str) -> Result<Option<RegistryEntry>> {
        self.store.get(name)
    }

    /// All packages, sorted by name.
    pub fn list(&self) -> Result<Vec<RegistryEntry>> {
        let mut entries = self
            .store
            .read_map(|map| map.values().cloned().collect::<Vec<_>>())?;
        entries.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(entries)
    }

    /// The underlying store, for direct map access.
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }
}
