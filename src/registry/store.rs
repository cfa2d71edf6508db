// src/registry/store.rs

//! The authoritative in-memory registry map.
//!
//! The store starts in a `NotLoaded` state; every operation fails with
//! `RegistryNotLoaded` until [`RegistryStore::load`] has populated the map
//! from storage. Once loaded, the in-memory map is authoritative;
//! persistence is an asynchronous snapshot write behind it.
//!
//! The store also owns the per-name lock table: callers serialize all
//! mutations of one package through [`RegistryStore::with_entry_lock`] while
//! unrelated packages proceed concurrently. Lock order is always lock-table,
//! then name lock, then the map lock, and name locks never nest.

use crate::error::{Error, Result};
use crate::registry::entry::{RegistryEntry, RegistryMap};
use crate::storage::{PersistQueue, Storage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

enum StoreState {
    NotLoaded,
    Ready(RegistryMap),
}

/// In-memory package map with asynchronous persistence.
pub struct RegistryStore {
    state: RwLock<StoreState>,
    name_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    storage: Arc<dyn Storage>,
    queue: PersistQueue,
}

impl RegistryStore {
    /// Create an unloaded store over a storage backend, starting its
    /// persistence worker.
    pub fn new(storage: Arc<dyn Storage>) -> Result<Self> {
        let queue = PersistQueue::spawn(storage.clone())?;
        Ok(RegistryStore {
            state: RwLock::new(StoreState::NotLoaded),
            name_locks: Mutex::new(HashMap::new()),
            storage,
            queue,
        })
    }

    /// Populate the map from storage, returning the package count.
    /// Loading again replaces the in-memory map.
    pub fn load(&self) -> Result<usize> {
        let map = self.storage.load_registry()?;
        let count = map.len();
        *self.state.write().unwrap() = StoreState::Ready(map);
        info!("registry loaded ({} packages)", count);
        Ok(count)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.read().unwrap(), StoreState::Ready(_))
    }

    /// Look up an entry, cloned out of the map.
    pub fn get(&self, name: &str) -> Result<Option<RegistryEntry>> {
        self.read_map(|map| map.get(name).cloned())
    }

    /// Insert or replace an entry.
    pub fn set(&self, name: &str, entry: RegistryEntry) -> Result<()> {
        self.update(|map| {
            map.insert(name.to_string(), entry);
        })
    }

    /// Remove an entry, reporting whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        self.update(|map| map.remove(name).is_some())
    }

    /// A cloned copy of the whole map.
    pub fn snapshot(&self) -> Result<RegistryMap> {
        self.read_map(|map| map.clone())
    }

    /// Queue an asynchronous write of the current map to storage.
    ///
    /// Fire-and-forget: the write's outcome is logged by the persistence
    /// worker, never reported here, so the durable copy can lag the
    /// in-memory map if the process dies before the worker catches up.
    pub fn persist(&self) -> Result<()> {
        let snapshot = self.snapshot()?;
        self.queue.enqueue(snapshot);
        Ok(())
    }

    /// Run `f` while holding the mutation lock for `name`.
    ///
    /// All mutations of one package go through here so that no two of them
    /// interleave between lookup and commit.
    pub(crate) fn with_entry_lock<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let slot = {
            let mut table = self.name_locks.lock().unwrap();
            Arc::clone(table.entry(name.to_string()).or_default())
        };
        let _guard = slot.lock().unwrap();
        f()
    }

    /// Run `f` against the map under the read lock.
    pub(crate) fn read_map<T>(&self, f: impl FnOnce(&RegistryMap) -> T) -> Result<T> {
        match &*self.state.read().unwrap() {
            StoreState::Ready(map) => Ok(f(map)),
            StoreState::NotLoaded => Err(Error::RegistryNotLoaded),
        }
    }

    /// Run `f` against the map under the write lock.
    pub(crate) fn update<T>(&self, f: impl FnOnce(&mut RegistryMap) -> T) -> Result<T> {
        match &mut *self.state.write().unwrap() {
            StoreState::Ready(map) => Ok(f(map)),
            StoreState::NotLoaded => Err(Error::RegistryNotLoaded),
        }
    }
}
