// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin descriptor parser, static catalogue, registry, and discovery adapter.
//!
//! Plugins come from two places: the static `plugins.xml` descriptor, parsed
//! once per [`StaticCatalogue`], and providers announced at runtime through a
//! [`DiscoveryPort`]. A [`PluginService`] merges both into its own
//! [`PluginRegistry`] and exposes it read-only to consumers.

pub mod catalogue;
pub mod descriptor;
pub mod discovery;
pub mod registry;
pub mod service;

pub use catalogue::{Catalogue, StaticCatalogue, load_catalogue};
pub use descriptor::{DescriptorParser, WebappDescriptor, parse_core_flag};
pub use discovery::{
    AdapterState, DiscoveryAdapter, DiscoveryMode, DiscoveryPort, RegistryPublisher,
};
pub use registry::PluginRegistry;
pub use service::PluginService;
