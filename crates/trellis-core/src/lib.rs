// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Trellis plugin registry.
//!
//! This crate provides the error type, the plugin record model, and the
//! provider capability trait shared by the parser, the registry, and any
//! discovery mechanism.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TrellisError;
pub use traits::{DescriptorSource, PluginProvider};
pub use types::{PluginRecord, ProviderEvent, ProviderEventKind, ProviderId};
