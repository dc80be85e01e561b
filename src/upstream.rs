//! Remote device API client
//!
//! Used when the gateway fronts a third-party device REST service instead
//! of holding its own static directory: descriptor listing for SYNC and
//! command forwarding for EXECUTE.

use reqwest::Client;
use serde_json::json;

use crate::directory::DeviceDescriptor;
use crate::traits::{DeviceTrait, StateObject};
use crate::{Error, Result};

/// Client for the remote device REST API
#[derive(Clone)]
pub struct DeviceApiClient {
    client: Client,
    base_url: String,
    sprinkler_url: Option<String>,
}

impl DeviceApiClient {
    /// Create a client for the given API base URL
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            sprinkler_url: None,
        }
    }

    /// Set the fixed toggle URL hit alongside StartStop commands
    #[must_use]
    pub fn with_sprinkler_url(mut self, url: &str) -> Self {
        self.sprinkler_url = Some(url.to_string());
        self
    }

    /// Fetch the assistant-facing device descriptor list
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or responds non-2xx
    pub async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let url = format!("{}/device/google", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Directory(format!(
                "device list fetch failed: {status} - {body}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Forward an applied command patch to the device service.
    ///
    /// Failures surface as the typed command error so the EXECUTE response
    /// can report the device under `status: "ERROR"`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the request fails or responds non-2xx
    pub async fn execute(
        &self,
        device_id: &str,
        trait_key: &str,
        patch: &StateObject,
    ) -> Result<()> {
        let url = format!("{}/device", self.base_url);
        let body = json!({
            "id": device_id,
            "states": {trait_key: patch}
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(device = %device_id, error = %e, "device API unreachable");
                Error::Command {
                    code: "hardError".to_string(),
                }
            })?;

        if !response.status().is_success() {
            tracing::error!(
                device = %device_id,
                status = %response.status(),
                "device API rejected command"
            );
            return Err(Error::Command {
                code: "hardError".to_string(),
            });
        }

        // Sprinkler controllers toggle via a plain GET on a fixed URL
        if trait_key == DeviceTrait::StartStop.key() {
            if let Some(url) = &self.sprinkler_url {
                self.toggle_sprinkler(device_id, url).await?;
            }
        }

        Ok(())
    }

    async fn toggle_sprinkler(&self, device_id: &str, url: &str) -> Result<()> {
        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::error!(device = %device_id, error = %e, "sprinkler toggle unreachable");
            Error::Command {
                code: "hardError".to_string(),
            }
        })?;

        if !response.status().is_success() {
            tracing::error!(
                device = %device_id,
                status = %response.status(),
                "sprinkler toggle rejected"
            );
            return Err(Error::Command {
                code: "hardError".to_string(),
            });
        }

        Ok(())
    }
}
