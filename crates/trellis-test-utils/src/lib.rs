// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Trellis integration tests.
//!
//! # Components
//!
//! - [`MockDescriptor`] - In-memory descriptor source that counts opens
//! - [`MockProvider`] - Plugin provider returning pre-configured records
//! - [`fixtures`] - Sample descriptor documents

pub mod fixtures;
pub mod mock_descriptor;
pub mod mock_provider;

pub use mock_descriptor::MockDescriptor;
pub use mock_provider::MockProvider;
