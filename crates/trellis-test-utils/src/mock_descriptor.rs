// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory descriptor source for catalogue tests.

use std::io::{BufRead, Cursor};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use trellis_core::{DescriptorSource, TrellisError};

/// A descriptor source backed by a string.
///
/// Counts how often it is opened so tests can assert single-parse behavior.
/// A `None` document behaves like a missing file.
pub struct MockDescriptor {
    document: Mutex<Option<String>>,
    opens: AtomicUsize,
    delay: Option<Duration>,
}

impl MockDescriptor {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
            opens: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// A source whose file does not exist yet.
    pub fn missing() -> Self {
        Self {
            document: Mutex::new(None),
            opens: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep inside `open` to widen race windows in concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the document (or remove it with `None`).
    pub fn set_document(&self, document: Option<&str>) {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = document.map(str::to_string);
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl DescriptorSource for MockDescriptor {
    fn location(&self) -> String {
        "memory://plugins.xml".to_string()
    }

    fn open(&self) -> Result<Box<dyn BufRead + Send>, TrellisError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match self.document.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            Some(document) => Ok(Box::new(Cursor::new(document.into_bytes()))),
            None => Err(TrellisError::SourceUnavailable {
                path: PathBuf::from(self.location()),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            }),
        }
    }
}
