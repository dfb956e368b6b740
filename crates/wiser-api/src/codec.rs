// Push-channel wire codec
//
// Decodes inbound push frames into `PushMessage`s and encodes outbound
// commands. A frame is a JSON object carrying exactly one of `load` or `smb`;
// objects with neither are hub chatter and are ignored.

use serde::Deserialize;

use crate::error::Error;
use crate::models::{ButtonEvent, HubCommand, LoadUpdate, PushMessage};

/// Raw push frame before the `load`/`smb` exclusivity check.
#[derive(Debug, Deserialize)]
struct RawPush {
    #[serde(default)]
    load: Option<LoadUpdate>,
    #[serde(default)]
    smb: Option<ButtonEvent>,
}

/// Decode one push-channel text frame.
///
/// Returns `Ok(None)` for a well-formed object that carries neither a load
/// update nor a button event.
pub fn decode_push(text: &str) -> Result<Option<PushMessage>, Error> {
    let raw: RawPush = serde_json::from_str(text).map_err(|e| Error::decode(&e, text))?;

    match (raw.load, raw.smb) {
        (Some(load), None) => Ok(Some(PushMessage::Load(load))),
        (None, Some(smb)) => Ok(Some(PushMessage::Button(smb))),
        (None, None) => Ok(None),
        (Some(_), Some(_)) => Err(Error::Decode {
            message: "push message carries both `load` and `smb`".into(),
            body: text.to_owned(),
        }),
    }
}

/// Encode an outbound push-channel command.
pub fn encode_command(command: HubCommand) -> String {
    serde_json::to_string(&command).expect("hub command serialization should not fail")
}
