// src/registry/publish.rs

//! The publish workflow: validate, gate, persist, commit.
//!
//! Publishing walks a fixed sequence and the first failing gate aborts the
//! whole attempt with nothing changed:
//!
//! 1. Registry must be loaded.
//! 2. Artifact validation (archive, manifest, name, version, engine range).
//! 3. Title uniqueness across all other packages.
//! 4. For an existing package: owner check, then strict version ordering.
//! 5. Artifact persistence.
//! 6. In-memory commit, then an asynchronous registry write.
//!
//! Steps 3-6 run under the package's name lock so two publishes of the same
//! name cannot interleave between lookup and commit.

use crate::error::{Error, Result};
use crate::registry::entry::{RegistryEntry, VersionRecord};
use crate::registry::Registry;
use crate::validate::{Validation, ValidationIssue};
use crate::version;
use std::path::Path;
use tracing::{debug, info};

impl Registry {
    /// Publish an artifact as `identity`.
    ///
    /// A new package is created owned by `identity`. For an existing package
    /// `identity` must be the owner (admin membership grants nothing here)
    /// and the manifest version must order strictly above the newest
    /// published version. On success the entry's metadata reflects the new
    /// manifest wholesale and a version record is appended.
    ///
    /// # Returns
    /// The committed entry.
    pub fn publish(&self, artifact: &Path, identity: &str) -> Result<RegistryEntry> {
        if !self.store.is_loaded() {
            return Err(Error::RegistryNotLoaded);
        }

        let metadata = match self.validator.validate(artifact)? {
            Validation::Invalid(issues) => return Err(Error::ValidationFailed(issues)),
            Validation::Valid(metadata) => metadata,
        };
        let name = metadata.name.clone();

        self.store.with_entry_lock(&name, || {
            if let Some(title) = metadata.title.as_deref().filter(|t| !t.is_empty()) {
                let lowered = title.to_lowercase();
                let conflict = self.store.read_map(|map| {
                    map.values().any(|other| {
                        other.metadata.name != name
                            && other
                                .metadata
                                .title
                                .as_deref()
                                .is_some_and(|t| t.to_lowercase() == lowered)
                    })
                })?;
                if conflict {
                    return Err(Error::ValidationFailed(vec![
                        ValidationIssue::DuplicateTitle(title.to_string()),
                    ]));
                }
            }

            let mut entry = match self.store.get(&name)? {
                None => {
                    debug!("first publish of '{}'", name);
                    RegistryEntry::new(metadata, identity)
                }
                Some(mut entry) => {
                    // Gates run against this clone; the live entry is only
                    // replaced after every one of them has passed.
                    if !self.guard.is_owner(&entry, identity) {
                        return Err(Error::NotAuthorized {
                            identity: identity.to_string(),
                            name: name.clone(),
                        });
                    }
                    if let Some(last) = entry.latest() {
                        if !version::is_newer(&metadata.version, &last.version)? {
                            return Err(Error::BadVersion {
                                candidate: metadata.version.clone(),
                                current: last.version.clone(),
                            });
                        }
                    }
                    entry.versions.push(VersionRecord::new(&metadata.version));
                    entry.metadata = metadata;
                    entry
                }
            };

            // A failed artifact write aborts before the in-memory commit.
            self.storage.save_package(&entry, artifact)?;

            if let Some(engine) = entry.metadata.engine.clone() {
                if let Some(last) = entry.versions.last_mut() {
                    last.engine = Some(engine);
                }
            }

            self.store.set(&name, entry.clone())?;
            self.store.persist()?;
            info!(
                "published {} {} (owner '{}')",
                name, entry.metadata.version, entry.owner
            );
            Ok(entry)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthorizationGuard, OwnerField};
    use crate::registry::entry::RegistryMap;
    use crate::storage::{MemoryStorage, Storage};
    use crate::validate::TarballValidator;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::File;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn tarball(dir: &TempDir, file_name: &str, manifest: &str) -> PathBuf {
        let path = dir.path().join(file_name);
        let file = File::create(&path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        header.set_size(manifest.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, "package/package.json", manifest.as_bytes())
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    fn registry(storage: Arc<MemoryStorage>) -> Registry {
        let guard = AuthorizationGuard::new(Arc::new(OwnerField), vec!["root".to_string()]);
        let registry = Registry::new(storage, Box::new(TarballValidator), guard).unwrap();
        registry.load().unwrap();
        registry
    }

    #[test]
    fn test_publish_requires_loaded_registry() {
        let dir = TempDir::new().unwrap();
        let artifact = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0"}"#,
        );
        let guard = AuthorizationGuard::new(Arc::new(OwnerField), vec![]);
        let registry = Registry::new(
            Arc::new(MemoryStorage::new()),
            Box::new(TarballValidator),
            guard,
        )
        .unwrap();

        assert!(matches!(
            registry.publish(&artifact, "alice").unwrap_err(),
            Error::RegistryNotLoaded
        ));
    }

    #[test]
    fn test_first_publish_creates_entry() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new());
        let registry = registry(storage.clone());

        let artifact = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0", "title": "Pathfinder"}"#,
        );
        let entry = registry.publish(&artifact, "alice").unwrap();

        assert_eq!(entry.owner, "alice");
        assert_eq!(entry.metadata.version, "1.0.0");
        assert_eq!(entry.versions.len(), 1);
        assert_eq!(entry.versions[0].version, "1.0.0");
        assert!(storage.artifact("pathfinder", "1.0.0").is_some());
    }

    #[test]
    fn test_owner_appends_newer_version() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(MemoryStorage::new()));

        let v1 = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0", "description": "first"}"#,
        );
        registry.publish(&v1, "alice").unwrap();

        let v2 = tarball(
            &dir,
            "pathfinder-1.1.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.1.0", "description": "second"}"#,
        );
        let entry = registry.publish(&v2, "alice").unwrap();

        assert_eq!(entry.versions.len(), 2);
        assert_eq!(entry.versions[1].version, "1.1.0");
        // Metadata is replaced wholesale by the newest manifest.
        assert_eq!(entry.metadata.description.as_deref(), Some("second"));
        assert_eq!(entry.owner, "alice");
    }

    #[test]
    fn test_non_owner_cannot_publish_existing_package() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(MemoryStorage::new()));

        let v1 = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0"}"#,
        );
        registry.publish(&v1, "alice").unwrap();

        let v2 = tarball(
            &dir,
            "pathfinder-2.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "2.0.0"}"#,
        );
        let err = registry.publish(&v2, "bob").unwrap_err();
        assert!(matches!(err, Error::NotAuthorized { .. }));

        let entry = registry.get("pathfinder").unwrap().unwrap();
        assert_eq!(entry.versions.len(), 1);
    }

    #[test]
    fn test_admin_membership_grants_no_publish_rights() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(MemoryStorage::new()));

        let v1 = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0"}"#,
        );
        registry.publish(&v1, "alice").unwrap();

        // "root" is in the admin list but does not own the package.
        let v2 = tarball(
            &dir,
            "pathfinder-2.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "2.0.0"}"#,
        );
        assert!(matches!(
            registry.publish(&v2, "root").unwrap_err(),
            Error::NotAuthorized { .. }
        ));
    }

    #[test]
    fn test_version_must_order_strictly_above_newest() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(MemoryStorage::new()));

        let v1 = tarball(
            &dir,
            "pathfinder-1.1.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.1.0"}"#,
        );
        registry.publish(&v1, "alice").unwrap();

        // Equal and lower versions are both rejected, even for the owner.
        for version in ["1.1.0", "1.0.9"] {
            let artifact = tarball(
                &dir,
                &format!("pathfinder-{}.tar.gz", version),
                &format!(r#"{{"name": "pathfinder", "version": "{}"}}"#, version),
            );
            let err = registry.publish(&artifact, "alice").unwrap_err();
            match err {
                Error::BadVersion { candidate, current } => {
                    assert_eq!(candidate, version);
                    assert_eq!(current, "1.1.0");
                }
                other => panic!("expected BadVersion, got {other:?}"),
            }
        }

        assert_eq!(
            registry.get("pathfinder").unwrap().unwrap().versions.len(),
            1
        );
    }

    #[test]
    fn test_duplicate_title_rejected_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(MemoryStorage::new()));

        let first = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0", "title": "Pathfinder"}"#,
        );
        registry.publish(&first, "alice").unwrap();

        let clash = tarball(
            &dir,
            "wayfinder-1.0.0.tar.gz",
            r#"{"name": "wayfinder", "version": "1.0.0", "title": "PATHFINDER"}"#,
        );
        let err = registry.publish(&clash, "bob").unwrap_err();
        match err {
            Error::ValidationFailed(issues) => {
                assert_eq!(issues.len(), 1);
                assert!(matches!(issues[0], ValidationIssue::DuplicateTitle(_)));
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
        assert!(registry.get("wayfinder").unwrap().is_none());
    }

    #[test]
    fn test_package_keeps_its_own_title_across_updates() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(MemoryStorage::new()));

        let v1 = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0", "title": "Pathfinder"}"#,
        );
        registry.publish(&v1, "alice").unwrap();

        // Republishing under the same title must not conflict with itself.
        let v2 = tarball(
            &dir,
            "pathfinder-1.1.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.1.0", "title": "Pathfinder"}"#,
        );
        registry.publish(&v2, "alice").unwrap();
    }

    #[test]
    fn test_untitled_packages_never_conflict() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(MemoryStorage::new()));

        let first = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0", "title": ""}"#,
        );
        registry.publish(&first, "alice").unwrap();

        let second = tarball(
            &dir,
            "wayfinder-1.0.0.tar.gz",
            r#"{"name": "wayfinder", "version": "1.0.0", "title": ""}"#,
        );
        registry.publish(&second, "bob").unwrap();
    }

    #[test]
    fn test_validation_issues_propagate() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(MemoryStorage::new()));

        let artifact = tarball(&dir, "broken-1.0.0.tar.gz", r#"{"version": "1.0.0"}"#);
        let err = registry.publish(&artifact, "alice").unwrap_err();
        match err {
            Error::ValidationFailed(issues) => {
                assert!(issues.contains(&ValidationIssue::MissingName));
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_engine_range_lands_on_newest_version_record() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(MemoryStorage::new()));

        let v1 = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0"}"#,
        );
        registry.publish(&v1, "alice").unwrap();

        let v2 = tarball(
            &dir,
            "pathfinder-1.1.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.1.0", "engine": ">=2.0.0"}"#,
        );
        let entry = registry.publish(&v2, "alice").unwrap();

        assert_eq!(entry.versions[0].engine, None);
        assert_eq!(entry.versions[1].engine.as_deref(), Some(">=2.0.0"));
    }

    #[test]
    fn test_failed_artifact_write_leaves_registry_untouched() {
        struct RejectingStorage {
            inner: MemoryStorage,
        }

        impl Storage for RejectingStorage {
            fn load_registry(&self) -> crate::Result<RegistryMap> {
                self.inner.load_registry()
            }

            fn save_registry(&self, map: &RegistryMap) -> crate::Result<()> {
                self.inner.save_registry(map)
            }

            fn save_package(
                &self,
                _entry: &RegistryEntry,
                _artifact: &std::path::Path,
            ) -> crate::Result<()> {
                Err(Error::NotConfigured("artifact store offline".to_string()))
            }
        }

        let dir = TempDir::new().unwrap();
        let guard = AuthorizationGuard::new(Arc::new(OwnerField), vec![]);
        let registry = Registry::new(
            Arc::new(RejectingStorage {
                inner: MemoryStorage::new(),
            }),
            Box::new(TarballValidator),
            guard,
        )
        .unwrap();
        registry.load().unwrap();

        let artifact = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0"}"#,
        );
        assert!(registry.publish(&artifact, "alice").is_err());
        assert!(registry.get("pathfinder").unwrap().is_none());
    }

    #[test]
    fn test_successful_publish_is_persisted() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new());
        let registry = registry(storage.clone());

        let artifact = tarball(
            &dir,
            "pathfinder-1.0.0.tar.gz",
            r#"{"name": "pathfinder", "version": "1.0.0"}"#,
        );
        registry.publish(&artifact, "alice").unwrap();
        drop(registry);

        let persisted = storage.persisted();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted["pathfinder"].owner, "alice");
    }
}
