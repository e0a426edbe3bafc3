// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin registry combining the static catalogue with discovered records.
//!
//! The registry map is copy-on-write: every merge publishes a new immutable
//! version through [`ArcSwap`], so `list()` and `find()` never block and never
//! observe a partially applied merge. Concurrent merges are linearized by the
//! compare-and-swap loop; the last merge to commit wins for a shared name.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;
use trellis_core::PluginRecord;

use crate::catalogue::Catalogue;

type Entries = HashMap<String, Arc<PluginRecord>>;

/// Queryable view over static and dynamically discovered plugin records.
pub struct PluginRegistry {
    entries: ArcSwap<Entries>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Create a registry seeded with every entry of the catalogue.
    pub fn from_catalogue(catalogue: &Catalogue) -> Self {
        Self {
            entries: ArcSwap::from_pointee(catalogue.entries().clone()),
        }
    }

    /// Snapshot of all records, sorted by name.
    ///
    /// Later merges do not affect the returned vector.
    pub fn list(&self) -> Vec<Arc<PluginRecord>> {
        let mut records: Vec<_> = self.entries.load().values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Exact-name lookup.
    pub fn find(&self, name: &str) -> Option<Arc<PluginRecord>> {
        self.entries.load().get(name).cloned()
    }

    /// Records flagged `core`, sorted by name.
    pub fn core_plugins(&self) -> Vec<Arc<PluginRecord>> {
        self.list().into_iter().filter(|r| r.core).collect()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Insert or overwrite records by name. Returns how many were applied.
    pub fn merge(&self, records: impl IntoIterator<Item = PluginRecord>) -> usize {
        let incoming: Vec<Arc<PluginRecord>> = records.into_iter().map(Arc::new).collect();
        if incoming.is_empty() {
            return 0;
        }

        let previous = self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            for record in &incoming {
                next.insert(record.name.clone(), Arc::clone(record));
            }
            next
        });

        for record in &incoming {
            debug!(
                plugin = %record.name,
                source = %record.source,
                replaced = previous.contains_key(&record.name),
                "merged plugin record"
            );
        }
        incoming.len()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
