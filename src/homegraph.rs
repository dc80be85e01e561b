//! HomeGraph platform client
//!
//! Outbound calls to the assistant platform: report-state pushes and
//! request-sync triggers. Constructed only when a platform credential is
//! configured; callers hold an `Option<HomeGraphClient>` and degrade
//! gracefully without one.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::HomeGraphConfig;
use crate::traits::StateObject;
use crate::{Error, Result};

/// Fixed request id placeholder on report-state pushes
pub const REPORT_REQUEST_ID: &str = "ff36a3cc";

/// Report-state push payload
#[derive(Debug, Serialize)]
pub struct ReportStatePayload {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "agentUserId")]
    pub agent_user_id: String,
    pub payload: ReportStateBody,
}

/// `payload` envelope of a report-state push
#[derive(Debug, Serialize)]
pub struct ReportStateBody {
    pub devices: ReportStateDevices,
}

/// `devices` envelope of a report-state push
#[derive(Debug, Serialize)]
pub struct ReportStateDevices {
    /// Device id to flattened state
    pub states: StateObject,
}

impl ReportStatePayload {
    /// Build a push reporting one device's flattened state
    #[must_use]
    pub fn for_device(agent_user_id: &str, device_id: &str, state: StateObject) -> Self {
        let mut states = StateObject::new();
        states.insert(device_id.to_string(), Value::Object(state));
        Self {
            request_id: REPORT_REQUEST_ID.to_string(),
            agent_user_id: agent_user_id.to_string(),
            payload: ReportStateBody {
                devices: ReportStateDevices { states },
            },
        }
    }
}

/// HomeGraph API client
#[derive(Clone)]
pub struct HomeGraphClient {
    client: Client,
    token: String,
    base_url: String,
}

impl HomeGraphClient {
    /// Create a client when a credential is configured
    #[must_use]
    pub fn from_config(config: &HomeGraphConfig) -> Option<Self> {
        let token = config.token.clone()?;
        Some(Self {
            client: Client::new(),
            token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Push a report-state notification
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or responds non-2xx
    pub async fn report_state(&self, payload: &ReportStatePayload) -> Result<Value> {
        self.post("devices:reportStateAndNotification", payload)
            .await
    }

    /// Ask the platform to re-SYNC the user's devices
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or responds non-2xx
    pub async fn request_sync(&self, agent_user_id: &str) -> Result<Value> {
        self.post(
            "devices:requestSync",
            &serde_json::json!({"agentUserId": agent_user_id}),
        )
        .await
    }

    async fn post<T: Serialize + ?Sized>(&self, method: &str, body: &T) -> Result<Value> {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::HomeGraph(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HomeGraph(format!("{method}: {status} - {body}")));
        }

        Ok(response.json().await.unwrap_or(Value::Null))
    }
}
