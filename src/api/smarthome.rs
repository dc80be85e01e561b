//! Smart home fulfillment endpoint
//!
//! `POST /smarthome` receives the platform's intent envelope and dispatches
//! on `inputs[0].intent`. Per-device work within one request fans out
//! concurrently and the response waits for every device; one device's
//! failure never cancels its siblings.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiState;
use crate::traits::{self, CommandPlan, DeviceTrait, StateObject};

/// SYNC intent identifier
pub const INTENT_SYNC: &str = "action.devices.SYNC";
/// QUERY intent identifier
pub const INTENT_QUERY: &str = "action.devices.QUERY";
/// EXECUTE intent identifier
pub const INTENT_EXECUTE: &str = "action.devices.EXECUTE";
/// DISCONNECT intent identifier
pub const INTENT_DISCONNECT: &str = "action.devices.DISCONNECT";

/// Platform intent envelope
#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(default)]
    pub inputs: Vec<IntentInput>,
}

/// One intent within the envelope; only `inputs[0]` is ever consulted
#[derive(Debug, Deserialize)]
pub struct IntentInput {
    pub intent: String,
    #[serde(default)]
    pub payload: Value,
}

/// Device reference in QUERY and EXECUTE payloads
#[derive(Debug, Clone, Deserialize)]
struct DeviceRef {
    id: String,
}

/// QUERY payload
#[derive(Debug, Deserialize)]
struct QueryPayload {
    devices: Vec<DeviceRef>,
}

/// EXECUTE payload
#[derive(Debug, Deserialize)]
struct ExecutePayload {
    commands: Vec<CommandBatch>,
}

/// One command batch: every execution applies to every listed device
#[derive(Debug, Deserialize)]
struct CommandBatch {
    devices: Vec<DeviceRef>,
    execution: Vec<CommandExecution>,
}

/// A single command with its parameters
#[derive(Debug, Clone, Deserialize)]
struct CommandExecution {
    command: String,
    #[serde(default)]
    params: StateObject,
}

/// Outcome of one (device, execution) pair
enum Outcome {
    /// Patch applied; fields merge into the shared response state
    Applied(StateObject),
    /// Unrecognized command, deliberately dropped from the response
    Skipped,
    /// Typed failure with a platform error code
    Failed(String),
}

/// Dispatch an intent envelope
async fn fulfill(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<IntentRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(input) = request.inputs.first() else {
        return bad_request("missing inputs");
    };

    tracing::info!(intent = %input.intent, request_id = %request.request_id, "intent received");

    match input.intent.as_str() {
        INTENT_SYNC => handle_sync(&state, &request.request_id).await,
        INTENT_QUERY => handle_query(&state, &request.request_id, &input.payload).await,
        INTENT_EXECUTE => handle_execute(&state, &request.request_id, &input.payload).await,
        INTENT_DISCONNECT => (
            StatusCode::OK,
            Json(json!({"requestId": request.request_id, "payload": {}})),
        ),
        other => {
            tracing::warn!(intent = other, "unknown intent");
            bad_request("unknown intent")
        }
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message})))
}

/// SYNC: list the directory and seed default state for every trait of
/// every device. Seeding is non-destructive; re-linking never resets state.
async fn handle_sync(state: &Arc<ApiState>, request_id: &str) -> (StatusCode, Json<Value>) {
    state.directory.refresh_for_sync().await;

    let devices = match state.directory.snapshot().await {
        Some(snapshot) => (*snapshot).clone(),
        None => {
            tracing::error!("device directory unavailable, responding with empty device list");
            Vec::new()
        }
    };

    let seeds = devices.iter().map(|device| {
        let store = state.store.clone();
        async move {
            for trait_name in &device.traits {
                let Some(device_trait) = DeviceTrait::from_fully_qualified(trait_name) else {
                    tracing::warn!(device = %device.id, %trait_name, "unsupported trait");
                    continue;
                };
                store
                    .seed_missing(
                        &device.id,
                        device_trait.key(),
                        device_trait.default_state(&device.attributes),
                    )
                    .await;
            }
        }
    });
    join_all(seeds).await;

    (
        StatusCode::OK,
        Json(json!({
            "requestId": request_id,
            "payload": {
                "agentUserId": state.agent_user_id,
                "devices": devices,
            },
        })),
    )
}

/// QUERY: scatter-gather point reads, flattened per the trait table.
/// Devices missing from the store yield an empty state object.
async fn handle_query(
    state: &Arc<ApiState>,
    request_id: &str,
    payload: &Value,
) -> (StatusCode, Json<Value>) {
    let payload: QueryPayload = match serde_json::from_value(payload.clone()) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "malformed QUERY payload");
            return bad_request("malformed QUERY payload");
        }
    };

    let reads = payload.devices.into_iter().map(|device| {
        let store = state.store.clone();
        async move {
            let flat = store
                .record(&device.id)
                .await
                .map(|record| traits::flatten_query(&record))
                .unwrap_or_default();
            (device.id, flat)
        }
    });

    let mut devices = StateObject::new();
    for (id, flat) in join_all(reads).await {
        devices.insert(id, Value::Object(flat));
    }

    (
        StatusCode::OK,
        Json(json!({
            "requestId": request_id,
            "payload": {"devices": devices},
        })),
    )
}

/// EXECUTE: apply every (device, execution) pair of every batch
/// concurrently. Succeeding devices share one merged `states` object;
/// failures are grouped by error code under `status: "ERROR"`.
async fn handle_execute(
    state: &Arc<ApiState>,
    request_id: &str,
    payload: &Value,
) -> (StatusCode, Json<Value>) {
    let payload: ExecutePayload = match serde_json::from_value(payload.clone()) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "malformed EXECUTE payload");
            return bad_request("malformed EXECUTE payload");
        }
    };

    let mut tasks = Vec::new();
    for batch in &payload.commands {
        for device in &batch.devices {
            for execution in &batch.execution {
                tasks.push(apply_execution(
                    state.clone(),
                    device.id.clone(),
                    execution.clone(),
                ));
            }
        }
    }

    let mut ids = Vec::new();
    let mut states = StateObject::new();
    states.insert("online".to_string(), json!(true));
    let mut failures: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (device_id, outcome) in join_all(tasks).await {
        match outcome {
            Outcome::Applied(patch) => {
                ids.push(device_id);
                for (field, value) in patch {
                    states.insert(field, value);
                }
            }
            Outcome::Skipped => {}
            Outcome::Failed(code) => {
                failures.entry(code).or_default().push(device_id);
            }
        }
    }

    let mut commands = vec![json!({
        "ids": ids,
        "status": "SUCCESS",
        "states": states,
    })];
    for (code, ids) in failures {
        commands.push(json!({
            "ids": ids,
            "status": "ERROR",
            "errorCode": code,
        }));
    }

    (
        StatusCode::OK,
        Json(json!({
            "requestId": request_id,
            "payload": {"commands": commands},
        })),
    )
}

/// Apply one execution to one device: plan the patch, write it to the
/// store (atomically for relative adjustments), and forward it to the
/// remote device service when one is configured.
async fn apply_execution(
    state: Arc<ApiState>,
    device_id: String,
    execution: CommandExecution,
) -> (String, Outcome) {
    let Some(plan) = traits::plan_command(&execution.command, &execution.params) else {
        tracing::warn!(command = %execution.command, device = %device_id, "unrecognized command");
        return (device_id, Outcome::Skipped);
    };

    let (trait_key, patch) = match plan {
        CommandPlan::Set { device_trait, patch } => {
            state
                .store
                .merge(&device_id, device_trait.key(), patch.clone())
                .await;
            (device_trait.key(), patch)
        }
        CommandPlan::VolumeRelative { relative_steps } => {
            let patch = state
                .store
                .transform(&device_id, DeviceTrait::Volume.key(), |current| {
                    traits::apply_volume_relative(current, relative_steps)
                })
                .await;
            (DeviceTrait::Volume.key(), patch)
        }
    };

    if let Some(api) = &state.device_api {
        if let Err(e) = api.execute(&device_id, trait_key, &patch).await {
            tracing::error!(device = %device_id, error = %e, "unable to update device");
            return (device_id, Outcome::Failed(e.command_code().to_string()));
        }
    }

    (device_id, Outcome::Applied(patch))
}

/// `GET /requestsync`: trigger a platform re-SYNC for the configured user
async fn requestsync(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Value>, (StatusCode, String)> {
    tracing::info!(user = %state.agent_user_id, "request sync");

    let Some(homegraph) = &state.homegraph else {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error requesting sync: no platform credential configured".to_string(),
        ));
    };

    match homegraph.request_sync(&state.agent_user_id).await {
        Ok(response) => {
            tracing::debug!("request sync completed");
            Ok(Json(response))
        }
        Err(e) => {
            tracing::error!(error = %e, "request sync failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error requesting sync: {e}"),
            ))
        }
    }
}

/// Build the fulfillment router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/smarthome", post(fulfill))
        .route("/requestsync", get(requestsync))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_intent_envelope() {
        let request: IntentRequest = serde_json::from_value(json!({
            "requestId": "r1",
            "inputs": [{
                "intent": "action.devices.EXECUTE",
                "payload": {
                    "commands": [{
                        "devices": [{"id": "washer"}],
                        "execution": [{
                            "command": "action.devices.commands.OnOff",
                            "params": {"on": true}
                        }]
                    }]
                }
            }]
        }))
        .unwrap();

        assert_eq!(request.request_id, "r1");
        assert_eq!(request.inputs[0].intent, INTENT_EXECUTE);

        let payload: ExecutePayload =
            serde_json::from_value(request.inputs[0].payload.clone()).unwrap();
        assert_eq!(payload.commands[0].devices[0].id, "washer");
        assert_eq!(
            payload.commands[0].execution[0].command,
            "action.devices.commands.OnOff"
        );
    }

    #[test]
    fn execution_params_default_to_empty() {
        let execution: CommandExecution = serde_json::from_value(json!({
            "command": "action.devices.commands.OnOff"
        }))
        .unwrap();
        assert!(execution.params.is_empty());
    }
}
