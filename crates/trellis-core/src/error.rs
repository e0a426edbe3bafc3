// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Trellis plugin registry.

use std::path::PathBuf;

use thiserror::Error;

/// The error type shared by the descriptor parser, catalogue, registry, and discovery layer.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// The descriptor file is missing or unreadable.
    #[error("plugin descriptor unavailable at {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The descriptor token stream could not be parsed. Aborts the whole load.
    #[error("malformed plugin descriptor {location}: {message}")]
    MalformedDescriptor { location: String, message: String },

    /// The discovery mechanism rejected a provider query.
    #[error("discovery lookup failed: {0}")]
    DiscoveryLookup(String),

    /// A lifecycle operation was attempted from the wrong state.
    #[error("invalid state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    /// A blocking task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TrellisError {
    /// Convenience constructor for parse failures.
    pub fn malformed(location: impl Into<String>, message: impl Into<String>) -> Self {
        TrellisError::MalformedDescriptor {
            location: location.into(),
            message: message.into(),
        }
    }
}
