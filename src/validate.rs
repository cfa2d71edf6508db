// src/validate.rs

//! Artifact validation.
//!
//! A package artifact is a gzipped tarball carrying a `package.json`
//! manifest at its top level (or one directory deep, the layout produced by
//! archiving a package directory). [`TarballValidator`] extracts and checks
//! the manifest; structural problems come back as [`ValidationIssue`]s so
//! the caller can report all of them at once, while failure to open the
//! artifact path at all is an I/O error.

use crate::error::Result;
use crate::registry::PackageMetadata;
use flate2::read::GzDecoder;
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Manifest file name looked up inside artifacts
pub const MANIFEST_NAME: &str = "package.json";

/// One structural problem with a submitted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("artifact is not a readable gzipped tarball: {0}")]
    CorruptArchive(String),
    #[error("artifact contains no package.json manifest")]
    MissingManifest,
    #[error("manifest is not valid JSON: {0}")]
    InvalidManifest(String),
    #[error("manifest is missing a package name")]
    MissingName,
    #[error("invalid package name '{0}'")]
    InvalidName(String),
    #[error("manifest is missing a version")]
    MissingVersion,
    #[error("invalid version '{0}'")]
    InvalidVersion(String),
    #[error("invalid engine compatibility range '{0}'")]
    InvalidEngineRange(String),
    #[error("title '{0}' is already used by another package")]
    DuplicateTitle(String),
}

/// Outcome of validating an artifact.
#[derive(Debug)]
pub enum Validation {
    Valid(PackageMetadata),
    Invalid(Vec<ValidationIssue>),
}

/// Parses and checks a package artifact.
pub trait Validator: Send + Sync {
    fn validate(&self, artifact: &Path) -> Result<Validation>;
}

/// Raw manifest fields as submitted; everything optional so all problems can
/// be reported together.
#[derive(Debug, Deserialize)]
struct Manifest {
    name: Option<String>,
    version: Option<String>,
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    engine: Option<String>,
}

/// Validator for `.tar.gz` package artifacts.
pub struct TarballValidator;

impl Validator for TarballValidator {
    fn validate(&self, artifact: &Path) -> Result<Validation> {
        let file = File::open(artifact)?;
        let raw = match read_manifest(file) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no manifest found in {}", artifact.display());
                return Ok(Validation::Invalid(vec![ValidationIssue::MissingManifest]));
            }
            Err(e) => {
                return Ok(Validation::Invalid(vec![ValidationIssue::CorruptArchive(
                    e.to_string(),
                )]));
            }
        };
        Ok(check_manifest(&raw))
    }
}

/// Scans the gzipped tarball for a manifest at the top level or one
/// directory deep and returns its contents.
fn read_manifest(file: File) -> std::io::Result<Option<String>> {
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let shallow = path.components().count() <= 2;
        if shallow && path.file_name() == Some(OsStr::new(MANIFEST_NAME)) {
            let mut raw = String::new();
            entry.read_to_string(&mut raw)?;
            return Ok(Some(raw));
        }
    }
    Ok(None)
}

fn check_manifest(raw: &str) -> Validation {
    let manifest: Manifest = match serde_json::from_str(raw) {
        Ok(manifest) => manifest,
        Err(e) => {
            return Validation::Invalid(vec![ValidationIssue::InvalidManifest(e.to_string())]);
        }
    };

    let mut issues = Vec::new();

    let name = match manifest.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) if valid_name(name) => Some(name.to_string()),
        Some(name) => {
            issues.push(ValidationIssue::InvalidName(name.to_string()));
            None
        }
        None => {
            issues.push(ValidationIssue::MissingName);
            None
        }
    };

    let version = match manifest.version.as_deref() {
        Some(version) if Version::parse(version).is_ok() => Some(version.to_string()),
        Some(version) => {
            issues.push(ValidationIssue::InvalidVersion(version.to_string()));
            None
        }
        None => {
            issues.push(ValidationIssue::MissingVersion);
            None
        }
    };

    if let Some(engine) = manifest.engine.as_deref() {
        if VersionReq::parse(engine).is_err() {
            issues.push(ValidationIssue::InvalidEngineRange(engine.to_string()));
        }
    }

    match (name, version) {
        (Some(name), Some(version)) if issues.is_empty() => Validation::Valid(PackageMetadata {
            name,
            title: manifest.title,
            version,
            author: manifest.author,
            description: manifest.description,
            engine: manifest.engine,
        }),
        _ => Validation::Invalid(issues),
    }
}

/// Package names: lowercase ASCII letters, digits, `.`, `_`, `-`; the first
/// character must be a letter or digit.
fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let leading_ok = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit());
    leading_ok
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
}
