// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process provider discovery bus.
//!
//! [`ServiceBus`] keeps a table of registered plugin providers and fans out
//! add/modify/remove events to every subscriber over unbounded mpsc
//! channels. It implements [`DiscoveryPort`], so it can back a
//! [`DiscoveryAdapter`](trellis_plugin::DiscoveryAdapter) directly, and it
//! holds every registry published back to it until that registry is withdrawn.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info};
use trellis_core::{PluginProvider, ProviderEvent, ProviderId, TrellisError};
use trellis_plugin::{DiscoveryPort, PluginRegistry, RegistryPublisher};

#[derive(Default)]
struct BusState {
    next_id: u64,
    providers: BTreeMap<ProviderId, Arc<dyn PluginProvider>>,
    subscribers: Vec<mpsc::UnboundedSender<ProviderEvent>>,
    registries: Vec<Arc<PluginRegistry>>,
}

impl BusState {
    /// Deliver to every live subscriber, dropping closed ones.
    fn broadcast(&mut self, event: ProviderEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        debug!(
            provider = %event.id(),
            kind = %event.kind(),
            subscribers = self.subscribers.len(),
            "provider event broadcast"
        );
    }
}

/// Process-local discovery mechanism.
pub struct ServiceBus {
    state: Mutex<BusState>,
    enumeration: bool,
}

impl ServiceBus {
    /// A bus that supports synchronous provider enumeration.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BusState::default()),
            enumeration: true,
        }
    }

    /// A bus that only offers event subscription, forcing reactive discovery.
    pub fn without_enumeration() -> Self {
        Self {
            enumeration: false,
            ..Self::new()
        }
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a provider and announce it to subscribers.
    pub fn register_provider(&self, provider: Arc<dyn PluginProvider>) -> ProviderId {
        let mut state = self.state();
        state.next_id += 1;
        let id = ProviderId(state.next_id);
        state.providers.insert(id, Arc::clone(&provider));
        state.broadcast(ProviderEvent::Added { id, provider });
        info!(provider = %id, "plugin provider registered");
        id
    }

    /// Replace a registered provider. Returns `false` for an unknown id.
    pub fn update_provider(&self, id: ProviderId, provider: Arc<dyn PluginProvider>) -> bool {
        let mut state = self.state();
        if !state.providers.contains_key(&id) {
            return false;
        }
        state.providers.insert(id, Arc::clone(&provider));
        state.broadcast(ProviderEvent::Modified { id, provider });
        true
    }

    /// Withdraw a provider. Returns `false` for an unknown id.
    pub fn unregister_provider(&self, id: ProviderId) -> bool {
        let mut state = self.state();
        if state.providers.remove(&id).is_none() {
            return false;
        }
        state.broadcast(ProviderEvent::Removed { id });
        info!(provider = %id, "plugin provider unregistered");
        true
    }

    pub fn provider_count(&self) -> usize {
        self.state().providers.len()
    }

    /// Registries currently published to this bus, in publication order.
    pub fn published_registries(&self) -> Vec<Arc<PluginRegistry>> {
        self.state().registries.clone()
    }
}

impl Default for ServiceBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryPublisher for ServiceBus {
    fn publish_registry(&self, registry: Arc<PluginRegistry>) {
        let mut state = self.state();
        state.registries.push(registry);
        info!(published = state.registries.len(), "plugin registry published");
    }

    fn withdraw_registry(&self, registry: &Arc<PluginRegistry>) {
        let mut state = self.state();
        let before = state.registries.len();
        state.registries.retain(|published| !Arc::ptr_eq(published, registry));
        if state.registries.len() < before {
            info!(published = state.registries.len(), "plugin registry withdrawn");
        }
    }
}

impl DiscoveryPort for ServiceBus {
    fn supports_enumeration(&self) -> bool {
        self.enumeration
    }

    fn lookup_providers(&self) -> Result<Vec<Arc<dyn PluginProvider>>, TrellisError> {
        if !self.enumeration {
            return Err(TrellisError::DiscoveryLookup(
                "provider enumeration is not supported by this bus".to_string(),
            ));
        }
        Ok(self.state().providers.values().cloned().collect())
    }

    fn watch_providers(&self) -> mpsc::UnboundedReceiver<ProviderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state();

        // Replay under the lock so no registration is seen twice or missed.
        for (id, provider) in &state.providers {
            let _ = tx.send(ProviderEvent::Added {
                id: *id,
                provider: Arc::clone(provider),
            });
        }
        state.subscribers.push(tx);
        rx
    }
}

impl std::fmt::Debug for ServiceBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ServiceBus")
            .field("enumeration", &self.enumeration)
            .field("providers", &state.providers.len())
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}
