// src/auth.rs

//! Mutation authorization.
//!
//! Two distinct policies apply, and the difference is intentional:
//!
//! - Administrative commands (delete metadata, change owner, change
//!   requirements) accept the owner *or* any configured admin.
//! - Publishing accepts the owner only. Admins maintain other people's
//!   packages; they do not release versions of them.

use crate::registry::RegistryEntry;
use std::sync::Arc;

/// Maps an opaque identity to whether it owns a given entry.
pub trait OwnershipResolver: Send + Sync {
    fn is_owner(&self, entry: &RegistryEntry, identity: &str) -> bool;
}

/// Default resolver: the identity string must equal the entry's owner field.
pub struct OwnerField;

impl OwnershipResolver for OwnerField {
    fn is_owner(&self, entry: &RegistryEntry, identity: &str) -> bool {
        entry.owner == identity
    }
}

/// Decides whether a caller may mutate an entry.
pub struct AuthorizationGuard {
    resolver: Arc<dyn OwnershipResolver>,
    admins: Vec<String>,
}

impl AuthorizationGuard {
    pub fn new(resolver: Arc<dyn OwnershipResolver>, admins: Vec<String>) -> Self {
        AuthorizationGuard { resolver, admins }
    }

    /// Admin-or-owner check used by administrative commands.
    pub fn is_authorized(&self, entry: &RegistryEntry, identity: &str) -> bool {
        self.is_admin(identity) || self.resolver.is_owner(entry, identity)
    }

    /// Ownership-only check used by the publish workflow. Admin membership
    /// grants no publish rights.
    pub fn is_owner(&self, entry: &RegistryEntry, identity: &str) -> bool {
        self.resolver.is_owner(entry, identity)
    }

    pub fn is_admin(&self, identity: &str) -> bool {
        self.admins.iter().any(|admin| admin == identity)
    }
}
