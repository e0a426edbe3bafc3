// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./trellis.toml` > `~/.config/trellis/trellis.toml` > `/etc/trellis/trellis.toml`
//! with environment variable overrides via `TRELLIS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TrellisConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/trellis/trellis.toml` (system-wide)
/// 3. `~/.config/trellis/trellis.toml` (user XDG config)
/// 4. `./trellis.toml` (local directory)
/// 5. `TRELLIS_*` environment variables
pub fn load_config() -> Result<TrellisConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<TrellisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TrellisConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TrellisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TrellisConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Config files consulted by [`load_config`], lowest precedence first.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/trellis/trellis.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("trellis").join("trellis.toml"));
    }
    paths.push(PathBuf::from("trellis.toml"));
    paths
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    config_file_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(TrellisConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Environment provider mapping `TRELLIS_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")`: keys such as
/// `webapp_root` contain underscores and must stay intact.
fn env_provider() -> Env {
    Env::prefixed("TRELLIS_").map(|key| {
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("host_", "host.", 1)
            .replacen("descriptor_", "descriptor.", 1)
            .replacen("discovery_", "discovery.", 1);
        mapped.into()
    })
}
