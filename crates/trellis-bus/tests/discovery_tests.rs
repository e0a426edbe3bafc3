// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end discovery through the in-process bus.

use std::sync::Arc;
use std::time::Duration;

use trellis_bus::ServiceBus;
use trellis_core::{PluginProvider, PluginRecord};
use trellis_plugin::{DiscoveryMode, DiscoveryPort, PluginService, StaticCatalogue};
use trellis_test_utils::fixtures::TWO_PLUGIN_DESCRIPTOR;
use trellis_test_utils::{MockDescriptor, MockProvider};

fn static_catalogue() -> StaticCatalogue {
    StaticCatalogue::new(Arc::new(MockDescriptor::new(TWO_PLUGIN_DESCRIPTOR)))
}

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registered_providers_resolve_immediately() {
    let bus = Arc::new(ServiceBus::new());
    let grid = Arc::new(MockProvider::single("Grid", "js/Plugins/grid.js"));
    let ruler = Arc::new(MockProvider::single("Ruler", "js/Plugins/ruler.js"));
    bus.register_provider(grid.clone());
    bus.register_provider(ruler.clone());

    let service = PluginService::with_discovery(&static_catalogue(), bus.clone())
        .await
        .unwrap();

    assert_eq!(service.discovery_mode(), Some(DiscoveryMode::Immediate));
    assert_eq!(service.registered_plugins().len(), 2 + 2);
    assert_eq!(grid.calls(), 1);
    assert_eq!(ruler.calls(), 1);
    assert!(bus.published_registries().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn late_providers_are_merged_reactively() {
    let bus = Arc::new(ServiceBus::new());
    let service = PluginService::with_discovery(&static_catalogue(), bus.clone())
        .await
        .unwrap();

    assert_eq!(service.discovery_mode(), Some(DiscoveryMode::Reactive));
    assert_eq!(service.registered_plugins().len(), 2);

    let published = bus.published_registries();
    assert_eq!(published.len(), 1);
    assert!(Arc::ptr_eq(&published[0], service.registry()));

    bus.register_provider(Arc::new(MockProvider::single("Grid", "js/Plugins/grid.js")));
    wait_until(|| service.find_plugin("Grid").is_some()).await;
    assert_eq!(service.registered_plugins().len(), 3);

    service.shutdown().await;
    assert!(bus.published_registries().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subscription_only_bus_replays_existing_providers() {
    let bus = Arc::new(ServiceBus::without_enumeration());
    bus.register_provider(Arc::new(MockProvider::single("Grid", "js/Plugins/grid.js")));

    let service = PluginService::with_discovery(&static_catalogue(), bus.clone())
        .await
        .unwrap();
    assert_eq!(service.discovery_mode(), Some(DiscoveryMode::Reactive));

    wait_until(|| service.find_plugin("Grid").is_some()).await;
    assert_eq!(service.registered_plugins().len(), 3);
    service.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn withdrawn_provider_records_stay_registered() {
    let bus = Arc::new(ServiceBus::new());
    let service = PluginService::with_discovery(&static_catalogue(), bus.clone())
        .await
        .unwrap();

    let id = bus.register_provider(Arc::new(MockProvider::single("Grid", "js/Plugins/grid.js")));
    wait_until(|| service.find_plugin("Grid").is_some()).await;

    assert!(bus.unregister_provider(id));
    bus.register_provider(Arc::new(MockProvider::single("Ruler", "js/Plugins/ruler.js")));
    wait_until(|| service.find_plugin("Ruler").is_some()).await;

    assert!(service.find_plugin("Grid").is_some());
    service.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn discovered_record_overrides_static_entry() {
    let bus = Arc::new(ServiceBus::new());
    let override_undo: Arc<dyn PluginProvider> = Arc::new(MockProvider::new(vec![
        PluginRecord::new("Undo", "vendor/undo.js").with_core(true),
    ]));
    bus.register_provider(override_undo);

    let catalogue = static_catalogue();
    let service = PluginService::with_discovery(&catalogue, bus.clone())
        .await
        .unwrap();

    let undo = service.find_plugin("Undo").unwrap();
    assert_eq!(undo.source, "vendor/undo.js");
    assert!(undo.core);
    assert_eq!(service.registered_plugins().len(), 2);

    // The shared catalogue keeps the descriptor's version.
    let cached = catalogue.get().unwrap();
    assert_eq!(cached.get("Undo").unwrap().source, "js/Plugins/undo.js");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stopped_service_ignores_new_providers() {
    let bus = Arc::new(ServiceBus::new());
    let service = PluginService::with_discovery(&static_catalogue(), bus.clone())
        .await
        .unwrap();
    service.shutdown().await;

    bus.register_provider(Arc::new(MockProvider::single("Late", "late.js")));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(service.find_plugin("Late").is_none());
    assert_eq!(bus.lookup_providers().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn config_driven_service_reads_webapp_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let plugins_dir = dir.path().join("js").join("Plugins");
    std::fs::create_dir_all(&plugins_dir).unwrap();

    let toml = format!(
        "[host]\nwebapp_root = {:?}\n\n[discovery]\nenabled = true\n",
        dir.path().display().to_string()
    );
    let config = trellis_config::load_and_validate_str(&toml).unwrap();
    let catalogue = StaticCatalogue::from_config(&config);
    let bus = Arc::new(ServiceBus::new());
    bus.register_provider(Arc::new(MockProvider::single("Grid", "grid.js")));

    // The descriptor is not there yet; nothing is cached.
    let port: Arc<dyn DiscoveryPort> = bus.clone();
    assert!(
        PluginService::from_config(&config, &catalogue, Some(port.clone()))
            .await
            .is_err()
    );
    assert!(catalogue.get().is_none());

    std::fs::write(plugins_dir.join("plugins.xml"), TWO_PLUGIN_DESCRIPTOR).unwrap();
    let service = PluginService::from_config(&config, &catalogue, Some(port))
        .await
        .unwrap();
    assert_eq!(service.discovery_mode(), Some(DiscoveryMode::Immediate));
    assert_eq!(service.registered_plugins().len(), 3);
}

#[tokio::test]
async fn disabled_discovery_skips_the_bus() {
    let config = trellis_config::load_and_validate_str("[discovery]\nenabled = false\n").unwrap();
    let bus = Arc::new(ServiceBus::new());
    bus.register_provider(Arc::new(MockProvider::single("Grid", "grid.js")));
    let port: Arc<dyn DiscoveryPort> = bus;

    let service = PluginService::from_config(&config, &static_catalogue(), Some(port))
        .await
        .unwrap();
    assert_eq!(service.discovery_mode(), None);
    assert!(service.find_plugin("Grid").is_none());
}

struct BlockedProvider {
    gate: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
}

impl PluginProvider for BlockedProvider {
    fn create_plugins(&self) -> Vec<PluginRecord> {
        let _ = self.gate.lock().unwrap().recv();
        vec![PluginRecord::new("Stuck", "stuck.js")]
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocked_provider_does_not_stall_the_bus() {
    let bus = Arc::new(ServiceBus::new());
    let service = PluginService::with_discovery(&static_catalogue(), bus.clone())
        .await
        .unwrap();

    let (release, gate) = std::sync::mpsc::channel();
    bus.register_provider(Arc::new(BlockedProvider {
        gate: std::sync::Mutex::new(gate),
    }));
    bus.register_provider(Arc::new(MockProvider::single("Grid", "js/Plugins/grid.js")));

    wait_until(|| service.find_plugin("Grid").is_some()).await;
    tokio::time::timeout(Duration::from_secs(2), service.shutdown())
        .await
        .expect("shutdown must not wait for a blocked provider");
    assert!(bus.published_registries().is_empty());

    release.send(()).unwrap();
}
