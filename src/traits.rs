//! Device trait mapping table
//!
//! One declarative table covering the three directions the intent handlers
//! need, keyed by trait:
//! - default state objects seeded into the store at SYNC
//! - per-trait field lists flattened into QUERY responses and report-state
//!   pushes (the report subset is smaller)
//! - command-name to state-patch translation for EXECUTE

use serde_json::{json, Map, Value};

/// A per-trait state object (or a flattened device state)
pub type StateObject = Map<String, Value>;

/// Namespace prefix for fully-qualified trait identifiers
pub const TRAIT_PREFIX: &str = "action.devices.traits.";

/// Namespace prefix for fully-qualified command names
pub const COMMAND_PREFIX: &str = "action.devices.commands.";

/// Device traits this gateway understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceTrait {
    OnOff,
    Brightness,
    ColorSetting,
    Volume,
    Timer,
    StartStop,
    FanSpeed,
    Modes,
    TemperatureSetting,
}

impl DeviceTrait {
    /// All supported traits, in flatten order
    pub const ALL: [Self; 9] = [
        Self::OnOff,
        Self::Brightness,
        Self::ColorSetting,
        Self::Volume,
        Self::Timer,
        Self::StartStop,
        Self::FanSpeed,
        Self::Modes,
        Self::TemperatureSetting,
    ];

    /// Storage key for this trait (also its unqualified name)
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::OnOff => "OnOff",
            Self::Brightness => "Brightness",
            Self::ColorSetting => "ColorSetting",
            Self::Volume => "Volume",
            Self::Timer => "Timer",
            Self::StartStop => "StartStop",
            Self::FanSpeed => "FanSpeed",
            Self::Modes => "Modes",
            Self::TemperatureSetting => "TemperatureSetting",
        }
    }

    /// Resolve a fully-qualified trait identifier
    /// (`action.devices.traits.OnOff`)
    #[must_use]
    pub fn from_fully_qualified(name: &str) -> Option<Self> {
        let short = name.strip_prefix(TRAIT_PREFIX)?;
        Self::ALL.into_iter().find(|t| t.key() == short)
    }

    /// Baseline state seeded at SYNC for a device exposing this trait.
    ///
    /// Defaults that depend on the device's directory attributes
    /// (step size, zones, available modes, query-only thermostats) are
    /// derived from `attributes`.
    #[must_use]
    pub fn default_state(self, attributes: &StateObject) -> StateObject {
        let value = match self {
            Self::OnOff => json!({"on": false, "remote": false}),
            Self::Brightness => json!({"brightness": 10}),
            Self::ColorSetting => json!({
                "color": {"name": "deep sky blue", "spectrumRGB": 49151}
            }),
            Self::Volume => {
                let mut state = json!({
                    "currentVolume": 10,
                    "isMuted": false,
                    "remote": false
                });
                if let Some(step) = attributes.get("levelStepSize") {
                    state["stepSize"] = step.clone();
                }
                state
            }
            Self::Timer => json!({"timerRemainingSec": 0, "timerTimeSec": 0}),
            Self::StartStop => {
                let mut state = json!({
                    "isRunning": false,
                    "activeZones": ["none"]
                });
                if let Some(zones) = attributes.get("availableZones") {
                    state["availableZones"] = zones.clone();
                }
                state
            }
            Self::FanSpeed => json!({"currentFanSpeedSetting": 20.0}),
            Self::Modes => {
                // First available mode set to its first setting
                let current = attributes
                    .get("availableModes")
                    .and_then(|m| m.as_array())
                    .and_then(|modes| modes.first())
                    .and_then(|mode| {
                        let name = mode.get("name")?.as_str()?;
                        let setting = mode
                            .get("settings")?
                            .as_array()?
                            .first()?
                            .get("setting_name")?
                            .clone();
                        Some((name.to_string(), setting))
                    });
                let mut settings = StateObject::new();
                if let Some((name, setting)) = current {
                    settings.insert(name, setting);
                }
                json!({"currentModeSettings": settings})
            }
            Self::TemperatureSetting => {
                let query_only = attributes
                    .get("queryOnlyTemperatureSetting")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if query_only {
                    json!({
                        "thermostatMode": "off",
                        "thermostatTemperatureAmbient": 20,
                        "thermostatHumidityAmbient": 90
                    })
                } else {
                    json!({
                        "thermostatMode": "off",
                        "thermostatTemperatureSetpoint": 25.5,
                        "thermostatTemperatureAmbient": 20,
                        "thermostatHumidityAmbient": 90,
                        "thermostatTemperatureSetpointLow": 15,
                        "thermostatTemperatureSetpointHigh": 30
                    })
                }
            }
        };
        match value {
            Value::Object(map) => map,
            _ => unreachable!("trait defaults are objects"),
        }
    }

    /// Fields surfaced in QUERY responses
    fn query_fields(self) -> &'static [&'static str] {
        match self {
            Self::OnOff => &["on"],
            Self::Brightness => &["brightness"],
            Self::ColorSetting => &["color"],
            Self::Volume => &["currentVolume", "isMuted"],
            Self::Timer => &["timerRemainingSec", "timerTimeSec"],
            Self::StartStop => &["isRunning", "availableZones", "activeZones"],
            Self::FanSpeed => &["currentFanSpeedSetting"],
            Self::Modes => &["currentModeSettings"],
            Self::TemperatureSetting => &[
                "thermostatMode",
                "thermostatTemperatureSetpoint",
                "thermostatTemperatureAmbient",
                "thermostatHumidityAmbient",
                "thermostatTemperatureSetpointLow",
                "thermostatTemperatureSetpointHigh",
            ],
        }
    }

    /// Fields surfaced in report-state pushes; a subset of the QUERY fields
    /// (no ColorSetting, Timer restricted to `timerTimeSec`)
    fn report_fields(self) -> &'static [&'static str] {
        match self {
            Self::ColorSetting => &[],
            Self::Timer => &["timerTimeSec"],
            other => other.query_fields(),
        }
    }
}

/// Copy listed fields actually present under each stored trait into a flat
/// state object. Absent fields are never defaulted.
fn flatten(record: &StateObject, fields: fn(DeviceTrait) -> &'static [&'static str]) -> StateObject {
    let mut flat = StateObject::new();
    for device_trait in DeviceTrait::ALL {
        let Some(state) = record.get(device_trait.key()).and_then(Value::as_object) else {
            continue;
        };
        for field in fields(device_trait) {
            if let Some(value) = state.get(*field) {
                flat.insert((*field).to_string(), value.clone());
            }
        }
    }
    flat
}

/// Flatten a stored device record for a QUERY response
#[must_use]
pub fn flatten_query(record: &StateObject) -> StateObject {
    let mut flat = flatten(record, DeviceTrait::query_fields);
    // Alias kept for callers that expect the command-side field name
    if let Some(volume) = flat.get("currentVolume").cloned() {
        flat.insert("volumeLevel".to_string(), volume);
    }
    flat
}

/// Flatten a stored device record for a report-state push
#[must_use]
pub fn flatten_report(record: &StateObject) -> StateObject {
    flatten(record, DeviceTrait::report_fields)
}

/// Planned effect of one EXECUTE command against one device
#[derive(Debug)]
pub enum CommandPlan {
    /// Merge a fixed patch under the trait key
    Set {
        device_trait: DeviceTrait,
        patch: StateObject,
    },
    /// Adjust the stored volume by `relative_steps * stepSize`, clamped at
    /// zero. Computed atomically against the stored Volume object.
    VolumeRelative { relative_steps: i64 },
}

/// Translate a fully-qualified command name and its parameters into the
/// state patch to apply. Unrecognized commands yield `None` and are skipped
/// by the EXECUTE handler without an error.
#[must_use]
pub fn plan_command(command: &str, params: &StateObject) -> Option<CommandPlan> {
    let short = command.strip_prefix(COMMAND_PREFIX)?;
    let param = |key: &str| params.get(key).cloned().unwrap_or(Value::Null);

    let (device_trait, patch) = match short {
        "OnOff" => (
            DeviceTrait::OnOff,
            json!({"on": param("on"), "remote": true}),
        ),
        "BrightnessAbsolute" => (
            DeviceTrait::Brightness,
            json!({"brightness": param("brightness")}),
        ),
        "ColorAbsolute" => (DeviceTrait::ColorSetting, json!({"color": param("color")})),
        "setVolume" => (
            DeviceTrait::Volume,
            json!({"currentVolume": param("volumeLevel")}),
        ),
        "volumeRelative" => {
            let relative_steps = params
                .get("relativeSteps")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            return Some(CommandPlan::VolumeRelative { relative_steps });
        }
        "mute" => (DeviceTrait::Volume, json!({"isMuted": param("mute")})),
        "TimerStart" | "TimerAdjust" => (
            DeviceTrait::Timer,
            json!({"timerTimeSec": param("timerTimeSec")}),
        ),
        "StartStop" => (
            DeviceTrait::StartStop,
            json!({"isRunning": param("start")}),
        ),
        "SetFanSpeed" => (
            DeviceTrait::FanSpeed,
            json!({"currentFanSpeedSetting": param("fanSpeed")}),
        ),
        "SetModes" => (
            DeviceTrait::Modes,
            json!({"currentModeSettings": param("updateModeSettings")}),
        ),
        "ThermostatTemperatureSetpoint" => (
            DeviceTrait::TemperatureSetting,
            json!({"thermostatTemperatureSetpoint": param("thermostatTemperatureSetpoint")}),
        ),
        "ThermostatSetMode" => (
            DeviceTrait::TemperatureSetting,
            json!({"thermostatMode": param("thermostatMode")}),
        ),
        "ThermostatTemperatureSetRange" => (
            DeviceTrait::TemperatureSetting,
            json!({
                "thermostatTemperatureSetpointLow": param("thermostatTemperatureSetpointLow"),
                "thermostatTemperatureSetpointHigh": param("thermostatTemperatureSetpointHigh")
            }),
        ),
        _ => return None,
    };

    match patch {
        Value::Object(patch) => Some(CommandPlan::Set { device_trait, patch }),
        _ => None,
    }
}

/// Compute the volumeRelative patch from the stored Volume object.
///
/// Step size defaults to 1 when the device never stored one; the result is
/// clamped at zero, never negative.
#[must_use]
pub fn apply_volume_relative(current: Option<&StateObject>, relative_steps: i64) -> StateObject {
    let volume = current
        .and_then(|s| s.get("currentVolume"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let step = current
        .and_then(|s| s.get("stepSize"))
        .and_then(Value::as_i64)
        .unwrap_or(1);

    let new_volume = (volume + relative_steps * step).max(0);

    let mut patch = StateObject::new();
    patch.insert("currentVolume".to_string(), json!(new_volume));
    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(value: Value) -> StateObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn resolves_fully_qualified_traits() {
        assert_eq!(
            DeviceTrait::from_fully_qualified("action.devices.traits.OnOff"),
            Some(DeviceTrait::OnOff)
        );
        assert_eq!(
            DeviceTrait::from_fully_qualified("action.devices.traits.Unknown"),
            None
        );
        assert_eq!(DeviceTrait::from_fully_qualified("OnOff"), None);
    }

    #[test]
    fn onoff_defaults() {
        let state = DeviceTrait::OnOff.default_state(&StateObject::new());
        assert_eq!(
            Value::Object(state),
            json!({"on": false, "remote": false})
        );
    }

    #[test]
    fn volume_defaults_pick_up_step_size() {
        let attrs = obj(json!({"levelStepSize": 2}));
        let state = DeviceTrait::Volume.default_state(&attrs);
        assert_eq!(state["stepSize"], json!(2));
        assert_eq!(state["currentVolume"], json!(10));
    }

    #[test]
    fn thermostat_defaults_split_on_query_only() {
        let query_only = obj(json!({"queryOnlyTemperatureSetting": true}));
        let state = DeviceTrait::TemperatureSetting.default_state(&query_only);
        assert!(state.contains_key("thermostatTemperatureAmbient"));
        assert!(!state.contains_key("thermostatTemperatureSetpoint"));

        let settable = obj(json!({"queryOnlyTemperatureSetting": false}));
        let state = DeviceTrait::TemperatureSetting.default_state(&settable);
        assert_eq!(state["thermostatTemperatureSetpoint"], json!(25.5));
        assert_eq!(state["thermostatTemperatureSetpointHigh"], json!(30));
    }

    #[test]
    fn modes_default_uses_first_available_mode() {
        let attrs = obj(json!({
            "availableModes": [{
                "name": "load",
                "settings": [
                    {"setting_name": "small"},
                    {"setting_name": "large"}
                ]
            }]
        }));
        let state = DeviceTrait::Modes.default_state(&attrs);
        assert_eq!(
            state["currentModeSettings"],
            json!({"load": "small"})
        );
    }

    #[test]
    fn query_flatten_copies_only_stored_fields() {
        let record = obj(json!({
            "OnOff": {"on": true, "remote": false},
            "Volume": {"currentVolume": 7}
        }));
        let flat = flatten_query(&record);
        assert_eq!(flat["on"], json!(true));
        assert_eq!(flat["currentVolume"], json!(7));
        assert_eq!(flat["volumeLevel"], json!(7));
        // isMuted never stored, never synthesized
        assert!(!flat.contains_key("isMuted"));
        assert!(!flat.contains_key("brightness"));
        // remote is storage-internal, not a query field
        assert!(!flat.contains_key("remote"));
    }

    #[test]
    fn report_flatten_excludes_color_and_remaining_timer() {
        let record = obj(json!({
            "ColorSetting": {"color": {"spectrumRGB": 1}},
            "Timer": {"timerRemainingSec": 30, "timerTimeSec": 60},
            "OnOff": {"on": false}
        }));
        let flat = flatten_report(&record);
        assert!(!flat.contains_key("color"));
        assert!(!flat.contains_key("timerRemainingSec"));
        assert_eq!(flat["timerTimeSec"], json!(60));
        assert_eq!(flat["on"], json!(false));
    }

    #[test]
    fn plans_onoff_command() {
        let params = obj(json!({"on": true}));
        match plan_command("action.devices.commands.OnOff", &params) {
            Some(CommandPlan::Set { device_trait, patch }) => {
                assert_eq!(device_trait, DeviceTrait::OnOff);
                assert_eq!(patch["on"], json!(true));
                assert_eq!(patch["remote"], json!(true));
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn plans_set_range_command() {
        let params = obj(json!({
            "thermostatTemperatureSetpointLow": 18,
            "thermostatTemperatureSetpointHigh": 24
        }));
        match plan_command(
            "action.devices.commands.ThermostatTemperatureSetRange",
            &params,
        ) {
            Some(CommandPlan::Set { device_trait, patch }) => {
                assert_eq!(device_trait, DeviceTrait::TemperatureSetting);
                assert_eq!(patch.len(), 2);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn unknown_commands_are_skipped() {
        assert!(plan_command("action.devices.commands.Defrost", &StateObject::new()).is_none());
        assert!(plan_command("OnOff", &StateObject::new()).is_none());
    }

    #[test]
    fn volume_relative_clamps_at_zero() {
        let current = obj(json!({"currentVolume": 5, "stepSize": 2}));
        let patch = apply_volume_relative(Some(&current), -10);
        assert_eq!(patch["currentVolume"], json!(0));
    }

    #[test]
    fn volume_relative_steps_up() {
        let current = obj(json!({"currentVolume": 10, "stepSize": 3}));
        let patch = apply_volume_relative(Some(&current), 2);
        assert_eq!(patch["currentVolume"], json!(16));
    }

    #[test]
    fn volume_relative_defaults_when_unseeded() {
        let patch = apply_volume_relative(None, 4);
        assert_eq!(patch["currentVolume"], json!(4));
    }
}
