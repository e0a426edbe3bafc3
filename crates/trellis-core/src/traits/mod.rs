// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits implemented by external collaborators.

pub mod provider;
pub mod source;

pub use provider::PluginProvider;
pub use source::DescriptorSource;
