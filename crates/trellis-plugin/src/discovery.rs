// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge from a service-discovery mechanism into registry merges.
//!
//! A [`DiscoveryAdapter`] resolves providers in one of two modes:
//!
//! - **Immediate**: the port can enumerate providers and returns at least one.
//!   Each provider is invoked once and its records merged before `start`
//!   returns.
//! - **Reactive**: enumeration is unsupported, fails, or finds nothing. The
//!   adapter subscribes to provider events and merges the records of every
//!   `Added` provider as it arrives. The registry is also published back
//!   through the port so other discovery-aware consumers can find it.
//!
//! `Removed` and `Modified` events are accepted but do not change the
//! registry: records contributed by a withdrawn provider stay registered.
//!
//! In reactive mode every provider runs as its own task, so a provider that
//! never returns holds up neither later announcements nor `stop`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use strum::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use trellis_core::{PluginProvider, PluginRecord, ProviderEvent, TrellisError};

use crate::registry::PluginRegistry;

/// How a discovery adapter resolved its providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DiscoveryMode {
    Immediate,
    Reactive,
}

/// Lifecycle of a [`DiscoveryAdapter`].
///
/// `Created → Started → (ImmediateResolved | Watching) → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AdapterState {
    Created,
    Started,
    ImmediateResolved,
    Watching,
    Stopped,
}

/// Capability to announce an assembled registry to the hosting environment.
pub trait RegistryPublisher: Send + Sync {
    fn publish_registry(&self, registry: Arc<PluginRegistry>);

    /// Retract a registry previously passed to `publish_registry`.
    fn withdraw_registry(&self, registry: &Arc<PluginRegistry>);
}

/// The two primitives the adapter needs from a discovery mechanism, plus publication.
pub trait DiscoveryPort: RegistryPublisher {
    /// Whether [`lookup_providers`](DiscoveryPort::lookup_providers) is available.
    fn supports_enumeration(&self) -> bool;

    /// Synchronously list the currently registered providers.
    fn lookup_providers(&self) -> Result<Vec<Arc<dyn PluginProvider>>, TrellisError>;

    /// Subscribe to provider events.
    ///
    /// The stream starts with an `Added` event for every provider already
    /// registered, followed by live events.
    fn watch_providers(&self) -> mpsc::UnboundedReceiver<ProviderEvent>;
}

/// Merges records from discovered providers into a registry.
pub struct DiscoveryAdapter {
    port: Arc<dyn DiscoveryPort>,
    registry: Arc<PluginRegistry>,
    state: Mutex<AdapterState>,
    cancel: CancellationToken,
    watcher: Mutex<Option<JoinHandle<()>>>,
    invocations: TaskTracker,
    published: AtomicBool,
}

impl DiscoveryAdapter {
    pub fn new(port: Arc<dyn DiscoveryPort>, registry: Arc<PluginRegistry>) -> Self {
        Self {
            port,
            registry,
            state: Mutex::new(AdapterState::Created),
            cancel: CancellationToken::new(),
            watcher: Mutex::new(None),
            invocations: TaskTracker::new(),
            published: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> AdapterState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The resolved mode, once `start` has completed.
    pub fn mode(&self) -> Option<DiscoveryMode> {
        match self.state() {
            AdapterState::ImmediateResolved => Some(DiscoveryMode::Immediate),
            AdapterState::Watching => Some(DiscoveryMode::Reactive),
            _ => None,
        }
    }

    /// Resolve providers. Must run inside a Tokio runtime.
    ///
    /// Only valid from `Created`; any other state returns
    /// [`TrellisError::InvalidState`].
    pub async fn start(&self) -> Result<DiscoveryMode, TrellisError> {
        self.transition(AdapterState::Created, AdapterState::Started)?;

        if let Some(providers) = self.enumerate() {
            info!(providers = providers.len(), "resolving plugin providers immediately");
            for provider in providers {
                if let Some(records) = invoke(provider).await {
                    self.registry.merge(records);
                }
            }
            self.finish_start(AdapterState::ImmediateResolved, || {});
            return Ok(DiscoveryMode::Immediate);
        }

        info!("watching for plugin providers");
        let events = self.port.watch_providers();
        let handle = tokio::spawn(watch(
            events,
            Arc::clone(&self.registry),
            self.cancel.clone(),
            self.invocations.clone(),
        ));
        *self.watcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        self.finish_start(AdapterState::Watching, || {
            self.port.publish_registry(Arc::clone(&self.registry));
            self.published.store(true, Ordering::SeqCst);
        });
        Ok(DiscoveryMode::Reactive)
    }

    /// Stop watching and withdraw the published registry. Terminal; calling
    /// it again is a no-op.
    ///
    /// Waits for the watcher loop only. A provider call still in flight is
    /// left to finish on its own and its records are discarded.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == AdapterState::Stopped {
                return;
            }
            *state = AdapterState::Stopped;
        }
        self.cancel.cancel();
        self.invocations.close();
        self.withdraw();

        let handle = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "discovery watcher ended abnormally");
        }
        info!("discovery adapter stopped");
    }

    /// Providers for immediate mode, or `None` to fall back to reactive mode.
    fn enumerate(&self) -> Option<Vec<Arc<dyn PluginProvider>>> {
        if !self.port.supports_enumeration() {
            debug!("discovery port cannot enumerate providers");
            return None;
        }

        match self.port.lookup_providers() {
            Ok(providers) if !providers.is_empty() => Some(providers),
            Ok(_) => {
                debug!("no plugin providers registered yet");
                None
            }
            Err(e) => {
                warn!(error = %e, "provider lookup failed, falling back to reactive discovery");
                None
            }
        }
    }

    fn transition(&self, from: AdapterState, to: AdapterState) -> Result<(), TrellisError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != from {
            return Err(TrellisError::InvalidState {
                expected: from.to_string(),
                actual: state.to_string(),
            });
        }
        *state = to;
        Ok(())
    }

    /// Leave `Started`, unless `stop` already ran in the meantime.
    ///
    /// `on_enter` runs under the state lock, only when the transition happens.
    fn finish_start(&self, to: AdapterState, on_enter: impl FnOnce()) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == AdapterState::Started {
            on_enter();
            *state = to;
        } else {
            debug!(state = %*state, "adapter stopped while starting");
        }
    }

    fn withdraw(&self) {
        if self.published.swap(false, Ordering::SeqCst) {
            self.port.withdraw_registry(&self.registry);
        }
    }
}

impl Drop for DiscoveryAdapter {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.invocations.close();
        self.withdraw();
    }
}

impl std::fmt::Debug for DiscoveryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryAdapter")
            .field("state", &self.state())
            .finish()
    }
}

async fn watch(
    mut events: mpsc::UnboundedReceiver<ProviderEvent>,
    registry: Arc<PluginRegistry>,
    cancel: CancellationToken,
    invocations: TaskTracker,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(ProviderEvent::Added { id, provider }) => {
                    let registry = Arc::clone(&registry);
                    let cancel = cancel.clone();
                    invocations.spawn(async move {
                        let Some(records) = invoke(provider).await else {
                            return;
                        };
                        if cancel.is_cancelled() {
                            debug!(provider = %id, "discarding records from provider after stop");
                            return;
                        }
                        let merged = registry.merge(records);
                        info!(provider = %id, merged, "merged plugins from discovered provider");
                    });
                }
                Some(event) => {
                    debug!(provider = %event.id(), kind = %event.kind(), "provider event has no registry effect");
                }
                None => {
                    debug!("provider event stream closed");
                    break;
                }
            },
        }
    }
}

/// Invoke a provider on the blocking pool. `None` if it panicked.
async fn invoke(provider: Arc<dyn PluginProvider>) -> Option<Vec<PluginRecord>> {
    match tokio::task::spawn_blocking(move || provider.create_plugins()).await {
        Ok(records) => Some(records),
        Err(e) => {
            warn!(error = %e, "plugin provider failed");
            None
        }
    }
}
