// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Trellis plugin registry.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Trellis configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrellisConfig {
    /// Hosting environment settings.
    #[serde(default)]
    pub host: HostConfig,

    /// Static plugin descriptor settings.
    #[serde(default)]
    pub descriptor: DescriptorConfig,

    /// Dynamic provider discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl TrellisConfig {
    /// Absolute (or root-relative) path of the static descriptor file.
    pub fn descriptor_path(&self) -> PathBuf {
        PathBuf::from(&self.host.webapp_root).join(&self.descriptor.relative_path)
    }
}

/// Hosting environment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Root directory of the web application serving the plugins.
    #[serde(default = "default_webapp_root")]
    pub webapp_root: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            webapp_root: default_webapp_root(),
            log_level: default_log_level(),
        }
    }
}

fn default_webapp_root() -> String {
    ".".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Static descriptor file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorConfig {
    /// Location of the descriptor, relative to `host.webapp_root`.
    #[serde(default = "default_relative_path")]
    pub relative_path: String,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            relative_path: default_relative_path(),
        }
    }
}

fn default_relative_path() -> String {
    "js/Plugins/plugins.xml".to_string()
}

/// Dynamic discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Whether to attach a discovery adapter to each plugin service.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}
