//! Shared test helpers

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use hearth_gateway::api::{self, ApiState};
use hearth_gateway::{DeviceDescriptor, DeviceDirectory, StateStore};

/// Fixture directory: one device per interesting trait combination
pub fn sample_devices() -> Vec<DeviceDescriptor> {
    serde_json::from_value(json!([
        {
            "id": "plug",
            "type": "action.devices.types.OUTLET",
            "traits": ["action.devices.traits.OnOff"],
            "name": {"name": "Plug"},
            "willReportState": true
        },
        {
            "id": "speaker",
            "type": "action.devices.types.SPEAKER",
            "traits": [
                "action.devices.traits.OnOff",
                "action.devices.traits.Volume"
            ],
            "name": {"name": "Speaker"},
            "willReportState": true,
            "attributes": {"levelStepSize": 2}
        },
        {
            "id": "thermostat",
            "type": "action.devices.types.THERMOSTAT",
            "traits": ["action.devices.traits.TemperatureSetting"],
            "name": {"name": "Thermostat"},
            "willReportState": true,
            "attributes": {"queryOnlyTemperatureSetting": false}
        },
        {
            "id": "washer",
            "type": "action.devices.types.WASHER",
            "traits": [
                "action.devices.traits.OnOff",
                "action.devices.traits.StartStop",
                "action.devices.traits.Modes"
            ],
            "name": {"name": "Washer"},
            "willReportState": true,
            "attributes": {
                "pausable": true,
                "availableModes": [{
                    "name": "load",
                    "settings": [
                        {"setting_name": "small"},
                        {"setting_name": "large"}
                    ]
                }]
            }
        }
    ]))
    .unwrap()
}

/// Build the gateway router over the fixture directory and the given store
pub fn build_router(store: StateStore) -> Router {
    let state = Arc::new(ApiState {
        directory: DeviceDirectory::with_devices(sample_devices()),
        store,
        homegraph: None,
        device_api: None,
        agent_user_id: "123".to_string(),
    });
    api::router(state)
}

/// POST a JSON body and decode the JSON response
pub async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Send an intent envelope to `/smarthome`
pub async fn send_intent(router: Router, intent: &str, payload: Value) -> (StatusCode, Value) {
    post_json(
        router,
        "/smarthome",
        json!({
            "requestId": "test-request",
            "inputs": [{"intent": intent, "payload": payload}]
        }),
    )
    .await
}
