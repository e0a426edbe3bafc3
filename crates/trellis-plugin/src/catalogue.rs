// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static plugin catalogue built once from the descriptor file.
//!
//! [`StaticCatalogue`] is owned by the host's startup sequence and shared
//! (behind `Arc`) with every plugin service. The first call to
//! [`get_or_init`](StaticCatalogue::get_or_init) parses the descriptor;
//! concurrent callers wait for that attempt and receive the same `Arc`.
//! A failed attempt caches nothing, so a later call retries.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};
use trellis_config::TrellisConfig;
use trellis_core::{DescriptorSource, PluginRecord, TrellisError};

use crate::descriptor::{DescriptorParser, WebappDescriptor};

/// Read-only mapping from plugin name to record.
#[derive(Debug, Default)]
pub struct Catalogue {
    records: HashMap<String, Arc<PluginRecord>>,
}

impl Catalogue {
    /// Build from records in document order. A later duplicate name replaces an earlier one.
    pub fn from_records(records: impl IntoIterator<Item = PluginRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.name.clone(), Arc::new(record)))
            .collect();
        Self { records }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<PluginRecord>> {
        self.records.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PluginRecord>> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn entries(&self) -> &HashMap<String, Arc<PluginRecord>> {
        &self.records
    }
}

/// Parse the whole descriptor into a catalogue. Blocking.
///
/// Any structural error aborts the load; no partial catalogue is returned.
pub fn load_catalogue(source: &dyn DescriptorSource) -> Result<Catalogue, TrellisError> {
    let location = source.location();
    let input = source.open().inspect_err(|e| {
        error!(location = %location, error = %e, "plugin descriptor unavailable");
    })?;

    let records = DescriptorParser::new(input, location.as_str())
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|e| {
            error!(location = %location, error = %e, "failed to parse plugin descriptor");
        })?;

    let catalogue = Catalogue::from_records(records);
    info!(location = %location, count = catalogue.len(), "static plugin catalogue loaded");
    Ok(catalogue)
}

/// Lazily built, exactly-once plugin catalogue.
pub struct StaticCatalogue {
    source: Arc<dyn DescriptorSource>,
    cell: OnceCell<Arc<Catalogue>>,
}

impl StaticCatalogue {
    pub fn new(source: Arc<dyn DescriptorSource>) -> Self {
        Self {
            source,
            cell: OnceCell::new(),
        }
    }

    /// Catalogue reading `<host.webapp_root>/<descriptor.relative_path>`.
    pub fn from_config(config: &TrellisConfig) -> Self {
        Self::new(Arc::new(WebappDescriptor::from_config(config)))
    }

    pub fn location(&self) -> String {
        self.source.location()
    }

    /// The cached catalogue, if a load has already succeeded.
    pub fn get(&self) -> Option<Arc<Catalogue>> {
        self.cell.get().cloned()
    }

    /// Return the cached catalogue, loading it first if needed.
    ///
    /// Only one load is in flight at a time. Parsing runs on the blocking pool.
    pub async fn get_or_init(&self) -> Result<Arc<Catalogue>, TrellisError> {
        self.cell
            .get_or_try_init(|| async {
                let source = Arc::clone(&self.source);
                let catalogue = tokio::task::spawn_blocking(move || load_catalogue(source.as_ref()))
                    .await
                    .map_err(|e| TrellisError::Internal(format!("catalogue load task failed: {e}")))??;
                Ok(Arc::new(catalogue))
            })
            .await
            .cloned()
    }
}

impl std::fmt::Debug for StaticCatalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCatalogue")
            .field("location", &self.source.location())
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}
