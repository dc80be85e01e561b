//! Configuration management for Hearth gateway
//!
//! Settings come from an optional TOML file with `HEARTH_*` environment
//! variables layered on top.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Default port the gateway listens on
pub const DEFAULT_PORT: u16 = 8089;

/// Hardcoded single-user model: the agent user id reported to the platform
pub const DEFAULT_AGENT_USER_ID: &str = "123";

/// Hearth gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Agent user id for SYNC responses, report-state pushes and
    /// request-sync calls
    pub agent_user_id: String,

    /// Path to the static device directory JSON file
    pub devices_file: PathBuf,

    /// Base URL of a remote device API. When set, the directory is fetched
    /// from `<base>/device/google` on startup and on every SYNC instead of
    /// being read from `devices_file`.
    pub device_api_base: Option<String>,

    /// Fixed URL hit whenever a StartStop command is applied, for device
    /// services (sprinkler controllers) that toggle via a plain GET instead
    /// of the device API. Only used together with `device_api_base`.
    pub sprinkler_url: Option<String>,

    /// HomeGraph platform configuration
    pub homegraph: HomeGraphConfig,
}

/// HomeGraph platform configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HomeGraphConfig {
    /// Platform credential (bearer token). Absent means report-state and
    /// request-sync are unavailable; the gateway still serves intents.
    pub token: Option<String>,

    /// HomeGraph API base URL (overridable for tests)
    pub base_url: String,
}

impl Default for HomeGraphConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: "https://homegraph.googleapis.com/v1".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            agent_user_id: DEFAULT_AGENT_USER_ID.to_string(),
            devices_file: PathBuf::from("devices.json"),
            device_api_base: None,
            sprinkler_url: None,
            homegraph: HomeGraphConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then apply
    /// environment overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p).map_err(|e| {
                    Error::Config(format!("failed to read {}: {e}", p.display()))
                })?;
                toml::from_str(&content)?
            }
            None => Self::default(),
        };

        config.apply_env();
        Ok(config)
    }

    /// Apply `HEARTH_*` environment variable overrides
    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("HEARTH_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(id) = std::env::var("HEARTH_AGENT_USER_ID") {
            self.agent_user_id = id;
        }
        if let Ok(path) = std::env::var("HEARTH_DEVICES_FILE") {
            self.devices_file = PathBuf::from(path);
        }
        if let Ok(base) = std::env::var("HEARTH_DEVICE_API_BASE") {
            self.device_api_base = Some(base);
        }
        if let Ok(url) = std::env::var("HEARTH_SPRINKLER_URL") {
            self.sprinkler_url = Some(url);
        }
        if let Ok(token) = std::env::var("HEARTH_HOMEGRAPH_TOKEN") {
            self.homegraph.token = Some(token);
        }
        if let Ok(url) = std::env::var("HEARTH_HOMEGRAPH_URL") {
            self.homegraph.base_url = url;
        }
    }
}
