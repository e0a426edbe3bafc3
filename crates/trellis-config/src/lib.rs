// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Trellis plugin registry host.
//!
//! `trellis.toml` tells the host where the web application lives, where the
//! static plugin descriptor sits under it, and whether runtime discovery is
//! attached. Files are layered system, then user, then local, then
//! `TRELLIS_*` environment variables. Unknown keys are rejected with a
//! suggestion for the closest valid key.
//!
//! ```no_run
//! let config = trellis_config::load_and_validate().unwrap_or_else(|errors| {
//!     eprint!("{}", trellis_config::render_errors(&errors));
//!     std::process::exit(2);
//! });
//! trellis_config::init_tracing(&config.host.log_level);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::TrellisConfig;

/// Load the layered configuration and validate it.
pub fn load_and_validate() -> Result<TrellisConfig, Vec<ConfigError>> {
    checked(loader::load_config(), readable_config_files)
}

/// Parse and validate a single inline TOML document. No files, no env.
pub fn load_and_validate_str(toml_content: &str) -> Result<TrellisConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validate an extracted config, or turn the figment failure into
/// diagnostics. `sources` is only read on failure.
fn checked(
    extracted: Result<TrellisConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<TrellisConfig, Vec<ConfigError>> {
    let config =
        extracted.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// `(absolute path, contents)` of every config file that exists.
fn readable_config_files() -> Vec<(String, String)> {
    loader::config_file_paths()
        .into_iter()
        .filter_map(|path| {
            let contents = std::fs::read_to_string(&path).ok()?;
            let name = std::path::absolute(&path).unwrap_or(path);
            Some((name.display().to_string(), contents))
        })
        .collect()
}

/// Install the global `tracing` subscriber for a host process.
///
/// `RUST_LOG` wins over `log_level`. A second call leaves the first
/// subscriber in place.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("trellis={log_level},warn")));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
