// src/registry/entry.rs

//! Registry data model.
//!
//! One [`RegistryEntry`] per package name: validated metadata, the owning
//! identity, the append-only version history, and download statistics. The
//! whole registry is a flat map from name to entry, and that map is also the
//! durable layout every storage backend reads and writes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The registry: package name to entry. Also the persisted layout.
pub type RegistryMap = HashMap<String, RegistryEntry>;

/// Validated package descriptor, produced by a validator from an artifact's
/// manifest and replaced wholesale on every successful publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package name; the registry key
    pub name: String,
    /// Display title; must be unique (case-insensitive) across other packages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Version being published, a semantic version string
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared host-compatibility range (semver requirement)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
}

/// One published release of a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Semantic version string
    pub version: String,
    /// RFC 3339 publish timestamp
    pub published: String,
    /// Host-compatibility range declared at publish time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Cumulative downloads recorded against this version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,
}

impl VersionRecord {
    /// A record for `version` published now, with no engine range and no
    /// downloads yet.
    pub fn new(version: &str) -> Self {
        VersionRecord {
            version: version.to_string(),
            published: Utc::now().to_rfc3339(),
            engine: None,
            downloads: None,
        }
    }
}

/// The full record for one published package.
///
/// `versions` is append-only and ordered by publish time; by construction it
/// is also ordered by increasing semantic version. `total_downloads` is an
/// incremental accumulator over recorded per-version downloads, never
/// recomputed from the version records. `recent` maps calendar-day keys
/// (`YYYYMMDD`) to counts and holds at most the 7 greatest keys seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub metadata: PackageMetadata,
    /// Identity of the owning account
    pub owner: String,
    pub versions: Vec<VersionRecord>,
    #[serde(default)]
    pub total_downloads: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub recent: BTreeMap<String, u64>,
}

impl RegistryEntry {
    /// A fresh entry for a first publish: the given metadata, `owner` as the
    /// owning identity, and a single version record stamped now.
    pub fn new(metadata: PackageMetadata, owner: &str) -> Self {
        let first = VersionRecord::new(&metadata.version);
        RegistryEntry {
            metadata,
            owner: owner.to_string(),
            versions: vec![first],
            total_downloads: 0,
            recent: BTreeMap::new(),
        }
    }

    /// The most recently published version record.
    pub fn latest(&self) -> Option<&VersionRecord> {
        self.versions.last()
    }
}
