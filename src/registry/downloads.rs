// src/registry/downloads.rs

//! Download-statistics aggregation.
//!
//! Telemetry arrives as per-package reports of download counts keyed by
//! version and by calendar day. Reports merge additively into the entry:
//! counters only ever grow, and the running total accumulates alongside the
//! per-version counters rather than being recomputed from them. Reports for
//! unknown packages and counts for unknown versions are dropped silently;
//! this path carries no authorization.

use crate::error::Result;
use crate::registry::Registry;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Days of per-day counters retained per package.
pub const RECENT_WINDOW_DAYS: usize = 7;

/// One package's download counters as submitted by a telemetry source.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DownloadReport {
    /// Downloads keyed by published version.
    #[serde(default)]
    pub versions: HashMap<String, u64>,
    /// Downloads keyed by calendar day (`YYYYMMDD`).
    #[serde(default)]
    pub days: HashMap<String, u64>,
}

impl Registry {
    /// Merge a download report into a package's statistics.
    ///
    /// Per-version counts are added to the matching version records and to
    /// the package total; counts for versions that were never published are
    /// ignored. Per-day counts merge into the recent window, which is then
    /// trimmed to the [`RECENT_WINDOW_DAYS`] greatest day keys.
    ///
    /// # Returns
    /// Whether the entry changed (a report for an unknown package is a
    /// silent no-op returning `false`).
    pub fn record_downloads(
        &self,
        name: &str,
        versions: &HashMap<String, u64>,
        days: &HashMap<String, u64>,
    ) -> Result<bool> {
        self.store.with_entry_lock(name, || {
            let changed = self.store.update(|map| {
                let Some(entry) = map.get_mut(name) else {
                    debug!("download report for unknown package '{}' dropped", name);
                    return false;
                };

                let mut changed = false;
                for (version, count) in versions {
                    if let Some(record) =
                        entry.versions.iter_mut().find(|r| &r.version == version)
                    {
                        record.downloads = Some(record.downloads.unwrap_or(0) + count);
                        entry.total_downloads += count;
                        changed = true;
                    }
                }

                if !days.is_empty() {
                    for (day, count) in days {
                        *entry.recent.entry(day.clone()).or_insert(0) += count;
                    }
                    while entry.recent.len() > RECENT_WINDOW_DAYS {
                        entry.recent.pop_first();
                    }
                    changed = true;
                }

                changed
            })?;

            if changed {
                self.store.persist()?;
            }
            Ok(changed)
        })
    }
}
