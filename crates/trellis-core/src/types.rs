// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin records and discovery events.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::traits::PluginProvider;

/// A named descriptor of an extension.
///
/// Records are built by the descriptor parser or by a provider and are never
/// mutated once a registry holds them (registries store them behind `Arc`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Unique name within a registry.
    pub name: String,
    /// Opaque locator, usually a module path relative to the webapp root.
    pub source: String,
    /// Whether the plugin belongs to the core set.
    #[serde(default)]
    pub core: bool,
    /// Free-form string properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl PluginRecord {
    /// Create a non-core record with no properties.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            core: false,
            properties: HashMap::new(),
        }
    }

    pub fn with_core(mut self, core: bool) -> Self {
        self.core = core;
        self
    }

    /// Add a property, replacing any earlier value for the same key.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Identifies a provider registration within a discovery mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProviderId(pub u64);

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider-{}", self.0)
    }
}

/// Kind of provider announcement, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderEventKind {
    Added,
    Modified,
    Removed,
}

/// A provider announcement delivered by the discovery mechanism.
#[derive(Clone)]
pub enum ProviderEvent {
    /// A provider was registered.
    Added {
        id: ProviderId,
        provider: Arc<dyn PluginProvider>,
    },
    /// A registered provider changed its registration metadata.
    Modified {
        id: ProviderId,
        provider: Arc<dyn PluginProvider>,
    },
    /// A provider was withdrawn.
    Removed { id: ProviderId },
}

impl ProviderEvent {
    pub fn id(&self) -> ProviderId {
        match self {
            ProviderEvent::Added { id, .. }
            | ProviderEvent::Modified { id, .. }
            | ProviderEvent::Removed { id } => *id,
        }
    }

    pub fn kind(&self) -> ProviderEventKind {
        match self {
            ProviderEvent::Added { .. } => ProviderEventKind::Added,
            ProviderEvent::Modified { .. } => ProviderEventKind::Modified,
            ProviderEvent::Removed { .. } => ProviderEventKind::Removed,
        }
    }
}

impl fmt::Debug for ProviderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEvent")
            .field("kind", &self.kind())
            .field("id", &self.id())
            .finish()
    }
}
