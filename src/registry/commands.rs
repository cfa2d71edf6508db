// src/registry/commands.rs

//! Typed administrative commands.
//!
//! Each command is a small struct implementing [`Command`]; the shared
//! executor resolves the package, checks admin-or-owner authorization, and
//! only then applies the mutation and queues a registry write. Unknown
//! packages and failed authorization abort before the command runs, so a
//! command body never needs its own guard clauses.

use crate::error::{Error, Result};
use crate::registry::entry::RegistryEntry;
use crate::registry::Registry;
use tracing::info;

/// Whether the entry survives the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Remove,
}

/// An administrative mutation of one registry entry.
pub trait Command {
    /// Short description for the audit log.
    fn describe(&self) -> String;

    /// Mutate the entry, reporting whether it stays in the registry.
    fn apply(&self, entry: &mut RegistryEntry) -> Disposition;
}

/// Remove a package's registry entry. Stored artifacts are untouched, so the
/// name can be re-published starting from any version.
pub struct DeleteMetadata;

impl Command for DeleteMetadata {
    fn describe(&self) -> String {
        "delete metadata".to_string()
    }

    fn apply(&self, _entry: &mut RegistryEntry) -> Disposition {
        Disposition::Remove
    }
}

/// Transfer a package to a new owning identity.
pub struct ChangeOwner {
    pub new_owner: String,
}

impl Command for ChangeOwner {
    fn describe(&self) -> String {
        format!("change owner to '{}'", self.new_owner)
    }

    fn apply(&self, entry: &mut RegistryEntry) -> Disposition {
        entry.owner = self.new_owner.clone();
        Disposition::Keep
    }
}

/// Replace the host-compatibility range on every published version.
pub struct ChangeRequirements {
    pub engine: String,
}

impl Command for ChangeRequirements {
    fn describe(&self) -> String {
        format!("change requirements to '{}'", self.engine)
    }

    fn apply(&self, entry: &mut RegistryEntry) -> Disposition {
        for record in &mut entry.versions {
            record.engine = Some(self.engine.clone());
        }
        Disposition::Keep
    }
}

impl Registry {
    /// Run `command` against `name` as `identity`.
    ///
    /// The package must exist and `identity` must be an admin or the owner;
    /// otherwise the command is never invoked. On success the change is
    /// queued for persistence.
    pub fn execute<C: Command>(&self, name: &str, identity: &str, command: C) -> Result<()> {
        self.store.with_entry_lock(name, || {
            self.store.update(|map| {
                let Some(entry) = map.get_mut(name) else {
                    return Err(Error::UnknownPackage(name.to_string()));
                };
                if !self.guard.is_authorized(entry, identity) {
                    return Err(Error::NotAuthorized {
                        identity: identity.to_string(),
                        name: name.to_string(),
                    });
                }
                info!("{} on '{}' by '{}'", command.describe(), name, identity);
                if command.apply(entry) == Disposition::Remove {
                    map.remove(name);
                }
                Ok(())
            })??;
            self.store.persist()
        })
    }

    pub fn delete_metadata(&self, name: &str, identity: &str) -> Result<()> {
        self.execute(name, identity, DeleteMetadata)
    }

    pub fn change_owner(&self, name: &str, identity: &str, new_owner: &str) -> Result<()> {
        self.execute(
            name,
            identity,
            ChangeOwner {
                new_owner: new_owner.to_string(),
            },
        )
    }

    pub fn change_requirements(&self, name: &str, identity: &str, engine: &str) -> Result<()> {
        self.execute(
            name,
            identity,
            ChangeRequirements {
                engine: engine.to_string(),
            },
        )
    }
}
