// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin provider capability.

use crate::types::PluginRecord;

/// A capability that, when invoked, yields zero or more plugin records.
///
/// Providers are announced through a discovery mechanism. Callers never need
/// provider identity beyond this one operation. Invocation may block; the
/// discovery adapter runs it on the blocking pool.
pub trait PluginProvider: Send + Sync + 'static {
    /// Produce the plugin records this provider contributes.
    fn create_plugins(&self) -> Vec<PluginRecord>;
}

impl<F> PluginProvider for F
where
    F: Fn() -> Vec<PluginRecord> + Send + Sync + 'static,
{
    fn create_plugins(&self) -> Vec<PluginRecord> {
        self()
    }
}
