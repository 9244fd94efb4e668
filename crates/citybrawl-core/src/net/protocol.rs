use serde::de::DeserializeOwned;
use serde_json::Value;

use super::messages::{ClientMessage, PassthroughMsg, RawPlayerHitMsg, ServerMessage, kind};

/// Hard ceiling on a single inbound frame.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    PayloadTooLarge(usize),
    InvalidJson(String),
    MissingType,
    InvalidPayload { kind: &'static str, reason: String },
    SerializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::InvalidJson(e) => write!(f, "invalid json: {e}"),
            Self::MissingType => write!(f, "message has no string `type` field"),
            Self::InvalidPayload { kind, reason } => {
                write!(f, "invalid `{kind}` payload: {reason}")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Decode one inbound frame into a [`ClientMessage`].
///
/// The frame must be a JSON object with a string `type`. Known kinds are
/// checked for their required fields here, once; unknown kinds keep the
/// original frame text so relays do not reorder keys or reformat numbers.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }

    let value: Value =
        serde_json::from_slice(data).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
    let msg_kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    match msg_kind {
        kind::INIT => Ok(ClientMessage::Init(decode_payload(kind::INIT, value)?)),
        kind::POSITION => Ok(ClientMessage::Position(decode_payload(
            kind::POSITION,
            value,
        )?)),
        kind::PLAYER_HIT => {
            let raw: RawPlayerHitMsg = decode_payload(kind::PLAYER_HIT, value)?;
            raw.resolve()
                .map(ClientMessage::PlayerHit)
                .ok_or_else(|| ProtocolError::InvalidPayload {
                    kind: kind::PLAYER_HIT,
                    reason: "missing `targetId` or `hitPlayerId`".to_string(),
                })
        },
        kind::PLAYER_EXPLODED => Ok(ClientMessage::PlayerExploded(decode_payload(
            kind::PLAYER_EXPLODED,
            value,
        )?)),
        other => {
            let text = std::str::from_utf8(data)
                .map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
            Ok(ClientMessage::Passthrough(PassthroughMsg {
                kind: other.to_string(),
                text: text.to_string(),
            }))
        },
    }
}

fn decode_payload<T: DeserializeOwned>(
    kind: &'static str,
    value: Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidPayload {
        kind,
        reason: e.to_string(),
    })
}

/// Encode a [`ServerMessage`] as the JSON text sent in one frame.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}
