// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use std::path::Path;

use crate::diagnostic::ConfigError;
use crate::model::TrellisConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &TrellisConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.host.webapp_root.trim().is_empty() {
        errors.push(ConfigError::Validation {
            key: "host.webapp_root",
            message: "must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.host.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            key: "host.log_level",
            message: format!(
                "`{}` is not one of: {}",
                config.host.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    let relative = config.descriptor.relative_path.trim();
    if relative.is_empty() {
        errors.push(ConfigError::Validation {
            key: "descriptor.relative_path",
            message: "must not be empty".to_string(),
        });
    } else if Path::new(relative).is_absolute() {
        errors.push(ConfigError::Validation {
            key: "descriptor.relative_path",
            message: format!(
                "`{relative}` must be relative to host.webapp_root"
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
