// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Descriptor source capability.

use std::io::BufRead;

use crate::error::TrellisError;

/// Where the static plugin descriptor comes from.
///
/// Each call to [`open`](DescriptorSource::open) yields a fresh stream; the
/// catalogue opens it at most once per successful load.
pub trait DescriptorSource: Send + Sync + 'static {
    /// Human-readable location used in logs and error messages.
    fn location(&self) -> String;

    /// Open the descriptor for reading.
    ///
    /// Returns [`TrellisError::SourceUnavailable`] when the descriptor is
    /// missing or unreadable.
    fn open(&self) -> Result<Box<dyn BufRead + Send>, TrellisError>;
}
