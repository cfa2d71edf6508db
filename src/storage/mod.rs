// src/storage/mod.rs

//! Storage backends and the persistence worker.
//!
//! A backend persists two things: the registry map (the durable contract, a
//! flat JSON-serializable map from package name to entry) and the package
//! artifacts themselves. Three backends ship:
//! - [`FileStorage`]: JSON registry file plus artifact files
//! - [`SqliteStorage`]: everything in a SQLite database
//! - [`MemoryStorage`]: in-process only, for tests and ephemeral use
//!
//! Registry persistence is asynchronous and best-effort: mutations enqueue a
//! snapshot on [`PersistQueue`] and move on. The worker coalesces queued
//! snapshots and logs failures without propagating them, so the in-memory
//! map and the durable copy can diverge if the process dies between a commit
//! and the corresponding write. Dropping the queue joins the worker, which
//! drains everything still queued.

pub mod file;
pub mod memory;
pub mod sqlite;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::config::{Config, StorageKind};
use crate::error::{Error, Result};
use crate::registry::{RegistryEntry, RegistryMap};
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Persists the registry map and package artifacts.
pub trait Storage: Send + Sync {
    /// Read the whole registry map; an uninitialized backend yields an empty
    /// map, not an error.
    fn load_registry(&self) -> Result<RegistryMap>;

    /// Write the whole registry map, replacing any previous copy.
    fn save_registry(&self, registry: &RegistryMap) -> Result<()>;

    /// Persist the artifact content for `entry.metadata.version`. Called
    /// before the entry is committed to the in-memory registry; failure
    /// aborts the publish.
    fn save_package(&self, entry: &RegistryEntry, artifact: &Path) -> Result<()>;
}

/// Open the backend selected by the configuration.
pub fn open(config: &Config) -> Result<Arc<dyn Storage>> {
    match config.storage {
        StorageKind::File => Ok(Arc::new(FileStorage::open(&config.data_dir)?)),
        StorageKind::Sqlite => Ok(Arc::new(SqliteStorage::open(&config.data_dir)?)),
        StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
    }
}

/// Fire-and-forget registry persistence.
///
/// Snapshots are handed to a dedicated worker thread over a channel; the
/// sender never waits for or learns about the write's outcome. Failures are
/// logged and swallowed. Dropping the queue closes the channel and joins the
/// worker, so queued snapshots are flushed on a clean shutdown.
pub struct PersistQueue {
    tx: Mutex<Option<Sender<RegistryMap>>>,
    worker: Option<JoinHandle<()>>,
}

impl PersistQueue {
    /// Start the persistence worker for the given backend.
    pub fn spawn(storage: Arc<dyn Storage>) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("curator-persist".to_string())
            .spawn(move || run_worker(rx, storage))
            .map_err(|e| {
                Error::NotConfigured(format!("cannot start persistence worker: {e}"))
            })?;
        Ok(PersistQueue {
            tx: Mutex::new(Some(tx)),
            worker: Some(worker),
        })
    }

    /// Queue a snapshot for writing. Never blocks on and never reports the
    /// outcome of the write.
    pub fn enqueue(&self, snapshot: RegistryMap) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            let _ = tx.send(snapshot);
        }
    }
}

impl Drop for PersistQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("persistence worker panicked during shutdown");
            }
        }
    }
}

fn run_worker(rx: Receiver<RegistryMap>, storage: Arc<dyn Storage>) {
    while let Ok(mut snapshot) = rx.recv() {
        // Collapse queued snapshots; only the newest state matters.
        while let Ok(newer) = rx.try_recv() {
            snapshot = newer;
        }
        match storage.save_registry(&snapshot) {
            Ok(()) => debug!("persisted registry snapshot ({} packages)", snapshot.len()),
            Err(e) => error!("registry persist failed, in-memory state kept: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{PackageMetadata, RegistryEntry};

    fn entry(name: &str) -> RegistryEntry {
        RegistryEntry::new(
            PackageMetadata {
                name: name.to_string(),
                title: None,
                version: "1.0.0".to_string(),
                author: None,
                description: None,
                engine: None,
            },
            "alice",
        )
    }

    fn snapshot(names: &[&str]) -> RegistryMap {
        names
            .iter()
            .map(|name| (name.to_string(), entry(name)))
            .collect()
    }

    struct FailingStorage;

    impl Storage for FailingStorage {
        fn load_registry(&self) -> Result<RegistryMap> {
            Ok(RegistryMap::new())
        }

        fn save_registry(&self, _registry: &RegistryMap) -> Result<()> {
            Err(Error::NotConfigured("disk on fire".to_string()))
        }

        fn save_package(&self, _entry: &RegistryEntry, _artifact: &Path) -> Result<()> {
            Err(Error::NotConfigured("disk on fire".to_string()))
        }
    }

    #[test]
    fn test_drop_flushes_newest_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let queue = PersistQueue::spawn(storage.clone()).unwrap();

        queue.enqueue(snapshot(&["one"]));
        queue.enqueue(snapshot(&["one", "two"]));
        drop(queue);

        let persisted = storage.persisted();
        assert_eq!(persisted.len(), 2);
        assert!(persisted.contains_key("two"));
    }

    #[test]
    fn test_persist_failure_is_swallowed() {
        let queue = PersistQueue::spawn(Arc::new(FailingStorage)).unwrap();
        queue.enqueue(snapshot(&["one"]));
        // Dropping joins the worker; the failed write must not panic it.
        drop(queue);
    }

    #[test]
    fn test_open_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: StorageKind::Memory,
            data_dir: dir.path().to_path_buf(),
            admins: Vec::new(),
        };
        let storage = open(&config).unwrap();
        assert!(storage.load_registry().unwrap().is_empty());
    }
}
