// src/version.rs

//! Semantic version ordering for publish gates.
//!
//! The registry accepts a new version only when it sorts strictly after the
//! latest published one, so everything funnels through [`is_newer`].

use crate::error::Result;
use semver::Version;

/// Returns true when `candidate` sorts strictly after `current` in semantic
/// version order (prerelease-aware; build metadata is ignored).
///
/// Equal versions are not newer.
pub fn is_newer(candidate: &str, current: &str) -> Result<bool> {
    let candidate = Version::parse(candidate)?;
    let current = Version::parse(current)?;
    Ok(candidate > current)
}
