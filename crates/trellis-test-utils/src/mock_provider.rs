// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock plugin provider for deterministic discovery tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;
use trellis_core::{PluginProvider, PluginRecord};

/// A provider that returns the same pre-configured records on every call.
pub struct MockProvider {
    records: Vec<PluginRecord>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(records: Vec<PluginRecord>) -> Self {
        Self {
            records,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider contributing a single non-core record.
    pub fn single(name: &str, source: &str) -> Self {
        Self::new(vec![PluginRecord::new(name, source)])
    }

    /// Number of times `create_plugins` was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PluginProvider for MockProvider {
    fn create_plugins(&self) -> Vec<PluginRecord> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(call, count = self.records.len(), "mock provider invoked");
        self.records.clone()
    }
}
