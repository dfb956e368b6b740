// Hub data model
//
// Wire types for the Wiser REST API and push channel. Every REST response is
// wrapped in the JSend `{ status, data, message }` envelope. Load state is
// deliberately opaque: its keys differ per load type and firmware, so it is
// carried as a raw JSON object.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::Error;

// ── Identifiers ──────────────────────────────────────────────────────

/// Numeric identifier of a load or smart button.
///
/// Used both for REST addressing (`/loads/{id}`) and as the routing key of
/// the [`EventDistributor`](crate::events::EventDistributor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DeviceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ── Response Envelope ────────────────────────────────────────────────

/// JSend status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JSendStatus {
    Success,
    Fail,
    Error,
}

/// JSend response envelope used by every REST endpoint.
///
/// ```json
/// { "status": "success", "data": { ... } }
/// { "status": "error", "message": "load not found" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSendResponse<T> {
    pub status: JSendStatus,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> JSendResponse<T> {
    /// Unwrap `data` on success, or turn the envelope into an [`Error::Api`].
    pub fn into_result(self) -> Result<T, Error> {
        match self.status {
            JSendStatus::Success => self.data.ok_or_else(|| Error::Decode {
                message: "success envelope without data".into(),
                body: String::new(),
            }),
            status => Err(Error::Api {
                status,
                message: self.message.unwrap_or_else(|| status.to_string()),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JSendStatus::Success
    }
}

// ── Load ─────────────────────────────────────────────────────────────

/// Kind of actuator behind a load.
///
/// Unknown types are kept as [`LoadType::Other`] so that discovery never
/// fails on newer hub firmware; consumers decide what they support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LoadType {
    /// On/off switch.
    Onoff,
    /// Dimmer.
    Dim,
    /// Blind / shutter motor.
    Motor,
    /// DALI dimmable lighting bus.
    Dali,
    #[serde(other)]
    Other,
}

impl LoadType {
    /// Whether the load accepts a brightness value.
    pub fn is_dimmable(self) -> bool {
        matches!(self, Self::Dim | Self::Dali)
    }
}

/// A controllable actuator channel, as returned by `GET /loads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: DeviceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unused: bool,
    #[serde(rename = "type")]
    pub load_type: LoadType,
    /// Physical device address (hex string).
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub channel: u32,
    #[serde(default)]
    pub room: u32,
    #[serde(default)]
    pub kind: u32,
}

impl Load {
    /// The configured name, or `{device}_{channel}` when the name is blank.
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            format!("{}_{}", self.device, self.channel)
        } else {
            name.to_owned()
        }
    }
}

/// Opaque actuation state of a load (`{"bri": 10000, "flags": {...}}`).
///
/// The schema depends on the load type and is never validated here; the
/// accessors below are conveniences that return `None` on absent or
/// differently-typed keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadState(pub serde_json::Map<String, serde_json::Value>);

impl LoadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Brightness (0..=10000 on dimmers, 0 or 10000 on switches).
    pub fn bri(&self) -> Option<u64> {
        self.get("bri").and_then(serde_json::Value::as_u64)
    }

    /// Motor position (0..=10000).
    pub fn level(&self) -> Option<u64> {
        self.get("level").and_then(serde_json::Value::as_u64)
    }

    /// Motor slat tilt.
    pub fn tilt(&self) -> Option<u64> {
        self.get("tilt").and_then(serde_json::Value::as_u64)
    }

    /// Motor movement direction (`"up"`, `"down"`, `"stop"`).
    pub fn moving(&self) -> Option<&str> {
        self.get("moving").and_then(serde_json::Value::as_str)
    }

    pub fn flags(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.get("flags").and_then(serde_json::Value::as_object)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for LoadState {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// `data` of `GET /loads/{id}/state` and `PUT /loads/{id}/target_state`.
///
/// The target-state echo names its payload `target_state`; both are
/// accepted.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoadStateRecord {
    #[allow(dead_code)]
    #[serde(default)]
    pub id: Option<DeviceId>,
    #[serde(alias = "target_state")]
    pub state: LoadState,
}

/// Button of a `PUT /loads/{id}/ctrl` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CtrlButton {
    On,
    Off,
    Up,
    Down,
    Toggle,
    Stop,
}

/// Press type of a `PUT /loads/{id}/ctrl` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CtrlEvent {
    #[default]
    Click,
    Press,
    Release,
}

/// Body of `PUT /loads/{id}/ctrl`: emulate a button press on the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadCommand {
    pub button: CtrlButton,
    pub event: CtrlEvent,
}

impl LoadCommand {
    pub fn click(button: CtrlButton) -> Self {
        Self {
            button,
            event: CtrlEvent::Click,
        }
    }
}

// ── Smart buttons ────────────────────────────────────────────────────

/// A physical input button, as returned by `GET /smartbuttons`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartButton {
    pub id: DeviceId,
    pub device_addr: u32,
    #[serde(default)]
    pub input_channel: u32,
    /// Configured behaviour/script code.
    #[serde(default)]
    pub job: u32,
}

impl SmartButton {
    /// Stable label derived from the physical address: `smb-{hex}-{channel}`.
    pub fn label(&self) -> String {
        format!("smb-{:x}-{}", self.device_addr, self.input_channel)
    }
}

/// Press type reported for a smart button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ButtonAction {
    Click,
    Double,
    Long,
    Single,
    #[serde(other)]
    Unknown,
}

/// A smart-button press delivered over the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub id: DeviceId,
    pub action: ButtonAction,
}

// ── Push channel ─────────────────────────────────────────────────────

/// `load` member of a push message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadUpdate {
    pub id: DeviceId,
    pub state: LoadState,
}

/// A decoded push-channel message.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    Load(LoadUpdate),
    Button(ButtonEvent),
}

impl PushMessage {
    /// Routing key of the message.
    pub fn id(&self) -> DeviceId {
        match self {
            Self::Load(update) => update.id,
            Self::Button(event) => event.id,
        }
    }
}

/// Outbound push-channel command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HubCommand {
    /// Ask the hub to replay the state of every load.
    DumpLoads,
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_load() {
        let load: Load = serde_json::from_value(json!({
            "id": 7,
            "name": "Kitchen",
            "unused": false,
            "type": "dim",
            "device": "00012a3b",
            "channel": 1,
            "room": 3,
            "kind": 1
        }))
        .unwrap();

        assert_eq!(load.id, DeviceId(7));
        assert_eq!(load.load_type, LoadType::Dim);
        assert!(load.load_type.is_dimmable());
        assert_eq!(load.display_name(), "Kitchen");
    }

    #[test]
    fn unknown_load_type_is_kept() {
        let load: Load = serde_json::from_value(json!({
            "id": 1, "type": "hvac", "device": "ab", "channel": 0
        }))
        .unwrap();
        assert_eq!(load.load_type, LoadType::Other);
    }

    #[test]
    fn blank_name_falls_back_to_address() {
        let load: Load = serde_json::from_value(json!({
            "id": 2, "name": "   ", "type": "onoff", "device": "00ab12", "channel": 2
        }))
        .unwrap();
        assert_eq!(load.display_name(), "00ab12_2");
    }

    #[test]
    fn smart_button_label_uses_hex_address() {
        let smb: SmartButton = serde_json::from_value(json!({
            "id": 3, "device_addr": 1_193_046, "input_channel": 1, "job": 34
        }))
        .unwrap();
        assert_eq!(smb.label(), "smb-123456-1");
    }

    #[test]
    fn load_state_accessors() {
        let state: LoadState = serde_json::from_value(json!({
            "level": 5000, "tilt": 3, "moving": "up", "flags": { "fuse": 0 }
        }))
        .unwrap();
        assert_eq!(state.level(), Some(5000));
        assert_eq!(state.tilt(), Some(3));
        assert_eq!(state.moving(), Some("up"));
        assert!(state.flags().is_some());
        assert_eq!(state.bri(), None);
    }

    #[test]
    fn state_record_accepts_target_state() {
        let rec: LoadStateRecord =
            serde_json::from_value(json!({ "id": 7, "target_state": { "bri": 10 } })).unwrap();
        assert_eq!(rec.state.bri(), Some(10));
    }

    #[test]
    fn unknown_button_action() {
        let ev: ButtonEvent =
            serde_json::from_value(json!({ "id": 3, "action": "triple" })).unwrap();
        assert_eq!(ev.action, ButtonAction::Unknown);
    }

    #[test]
    fn error_envelope_without_message_uses_status() {
        let env: JSendResponse<serde_json::Value> =
            serde_json::from_value(json!({ "status": "fail", "data": null })).unwrap();
        let err = env.into_result().unwrap_err();
        assert_eq!(err.api_message(), Some("fail"));
    }

    #[test]
    fn load_command_serialization() {
        let cmd = LoadCommand::click(CtrlButton::Toggle);
        assert_eq!(
            serde_json::to_value(cmd).unwrap(),
            json!({ "button": "toggle", "event": "click" })
        );
    }
}
