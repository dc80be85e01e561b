//! Device directory
//!
//! Read-only list of device descriptors exposed to the platform at SYNC.
//! Two sources: a static JSON file loaded once at startup, or a remote
//! device API fetched on cold start and refreshed wholesale on every SYNC.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::traits::StateObject;
use crate::upstream::DeviceApiClient;
use crate::{Error, Result};

/// A device as listed in the directory and echoed back to the platform
/// at SYNC. Unknown fields (type, name, roomHint, deviceInfo, ...) are
/// preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Device id, the state-store key
    pub id: String,

    /// Fully-qualified trait identifiers
    #[serde(default)]
    pub traits: Vec<String>,

    /// Trait attributes (step sizes, available modes, zones, ...)
    #[serde(default)]
    pub attributes: StateObject,

    /// Whether the device reports state out-of-band
    #[serde(default, rename = "willReportState")]
    pub will_report_state: bool,

    /// Remaining descriptor fields, passed through untouched
    #[serde(flatten)]
    pub extra: StateObject,
}

/// Where the directory comes from
#[derive(Clone)]
pub enum DirectorySource {
    /// Static JSON file, loaded once
    Static(PathBuf),
    /// Remote device API, refreshed on every SYNC
    Remote(DeviceApiClient),
}

/// Device directory with an explicit not-yet-loaded state
pub struct DeviceDirectory {
    source: DirectorySource,
    devices: RwLock<Option<Arc<Vec<DeviceDescriptor>>>>,
}

impl DeviceDirectory {
    /// Create a directory for the given source; nothing is loaded yet
    #[must_use]
    pub fn new(source: DirectorySource) -> Self {
        Self {
            source,
            devices: RwLock::new(None),
        }
    }

    /// Create a directory pre-populated with descriptors (tests)
    #[must_use]
    pub fn with_devices(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            source: DirectorySource::Static(PathBuf::new()),
            devices: RwLock::new(Some(Arc::new(devices))),
        }
    }

    /// Current snapshot, `None` until the first successful load
    pub async fn snapshot(&self) -> Option<Arc<Vec<DeviceDescriptor>>> {
        self.devices.read().await.clone()
    }

    /// Load or refresh the directory from its source.
    ///
    /// The snapshot is replaced wholesale on success. On failure the
    /// previous snapshot (if any) stays in place.
    ///
    /// # Errors
    ///
    /// Returns error if the file read/parse or the remote fetch fails
    pub async fn refresh(&self) -> Result<()> {
        let devices = match &self.source {
            DirectorySource::Static(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Directory(format!("failed to read {}: {e}", path.display()))
                })?;
                serde_json::from_str::<Vec<DeviceDescriptor>>(&content)?
            }
            DirectorySource::Remote(api) => api.list_devices().await?,
        };

        tracing::info!(count = devices.len(), "device directory loaded");
        *self.devices.write().await = Some(Arc::new(devices));
        Ok(())
    }

    /// Refresh before SYNC. Only the remote source re-fetches per call; a
    /// static directory already loaded is left alone. Failures are logged
    /// and the stale (possibly unloaded) snapshot is served.
    pub async fn refresh_for_sync(&self) {
        let loaded = self.devices.read().await.is_some();
        let should_refresh = matches!(self.source, DirectorySource::Remote(_)) || !loaded;
        if !should_refresh {
            return;
        }
        if let Err(e) = self.refresh().await {
            tracing::error!(error = %e, "directory refresh failed, keeping previous snapshot");
        }
    }
}
