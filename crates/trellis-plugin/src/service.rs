// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consumer-facing plugin service.
//!
//! A `PluginService` seeds its own [`PluginRegistry`] from the shared
//! [`StaticCatalogue`] and, when a discovery port is supplied, attaches a
//! [`DiscoveryAdapter`] that keeps merging provider records into it.

use std::sync::Arc;

use tracing::info;
use trellis_config::TrellisConfig;
use trellis_core::{PluginRecord, TrellisError};

use crate::catalogue::StaticCatalogue;
use crate::discovery::{DiscoveryAdapter, DiscoveryMode, DiscoveryPort};
use crate::registry::PluginRegistry;

/// Read-only plugin view handed to consumers.
#[derive(Debug)]
pub struct PluginService {
    registry: Arc<PluginRegistry>,
    adapter: Option<DiscoveryAdapter>,
}

impl PluginService {
    /// Service over the static catalogue only.
    pub async fn new(catalogue: &StaticCatalogue) -> Result<Self, TrellisError> {
        let registry = Arc::new(PluginRegistry::from_catalogue(&*catalogue.get_or_init().await?));
        info!(count = registry.len(), "plugin service initialized");
        Ok(Self {
            registry,
            adapter: None,
        })
    }

    /// Service over the static catalogue plus providers from `port`.
    pub async fn with_discovery(
        catalogue: &StaticCatalogue,
        port: Arc<dyn DiscoveryPort>,
    ) -> Result<Self, TrellisError> {
        let mut service = Self::new(catalogue).await?;
        let adapter = DiscoveryAdapter::new(port, Arc::clone(&service.registry));
        let mode = adapter.start().await?;
        info!(mode = %mode, count = service.registry.len(), "plugin discovery attached");
        service.adapter = Some(adapter);
        Ok(service)
    }

    /// Attach discovery only when `discovery.enabled` is set and a port is available.
    pub async fn from_config(
        config: &TrellisConfig,
        catalogue: &StaticCatalogue,
        port: Option<Arc<dyn DiscoveryPort>>,
    ) -> Result<Self, TrellisError> {
        match port {
            Some(port) if config.discovery.enabled => Self::with_discovery(catalogue, port).await,
            _ => Self::new(catalogue).await,
        }
    }

    /// All registered plugins, sorted by name.
    pub fn registered_plugins(&self) -> Vec<Arc<PluginRecord>> {
        self.registry.list()
    }

    pub fn find_plugin(&self, name: &str) -> Option<Arc<PluginRecord>> {
        self.registry.find(name)
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// `None` when no discovery adapter is attached.
    pub fn discovery_mode(&self) -> Option<DiscoveryMode> {
        self.adapter.as_ref().and_then(DiscoveryAdapter::mode)
    }

    /// Stop the discovery adapter, if any. Registered plugins stay readable.
    pub async fn shutdown(&self) {
        if let Some(adapter) = &self.adapter {
            adapter.stop().await;
        }
    }
}
