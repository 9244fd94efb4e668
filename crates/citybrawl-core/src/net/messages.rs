use serde::{Deserialize, Serialize};

use crate::player::{PlayerId, PlayerState, Vec3};

/// Wire name of each message kind the server understands.
pub mod kind {
    pub const INIT: &str = "init";
    pub const POSITION: &str = "position";
    pub const PLAYER_HIT: &str = "playerHit";
    pub const PLAYER_EXPLODED: &str = "playerExploded";
}

// ============================================================================
// Client -> Server
// ============================================================================

/// A decoded inbound frame. Anything with a `type` the server does not
/// interpret is kept as the exact text the client sent and relayed untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Init(InitMsg),
    Position(PositionMsg),
    PlayerHit(PlayerHitMsg),
    PlayerExploded(PlayerExplodedMsg),
    Passthrough(PassthroughMsg),
}

impl ClientMessage {
    /// The `type` discriminator this message arrived with.
    pub fn kind(&self) -> &str {
        match self {
            Self::Init(_) => kind::INIT,
            Self::Position(_) => kind::POSITION,
            Self::PlayerHit(_) => kind::PLAYER_HIT,
            Self::PlayerExploded(_) => kind::PLAYER_EXPLODED,
            Self::Passthrough(msg) => &msg.kind,
        }
    }
}

/// A well-formed record of a kind the server does not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughMsg {
    pub kind: String,
    /// The frame as received, byte for byte.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitMsg {
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionMsg {
    pub position: Vec3,
}

/// A client reporting that it landed a hit on another player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHitMsg {
    pub target_id: PlayerId,
}

/// Older clients name the target `hitPlayerId`; both spellings are accepted
/// and `targetId` takes precedence when a client sends both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPlayerHitMsg {
    pub target_id: Option<PlayerId>,
    pub hit_player_id: Option<PlayerId>,
}

impl RawPlayerHitMsg {
    pub(crate) fn resolve(self) -> Option<PlayerHitMsg> {
        self.target_id
            .or(self.hit_player_id)
            .map(|target_id| PlayerHitMsg { target_id })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerExplodedMsg {
    pub player_id: PlayerId,
}

// ============================================================================
// Server -> Client
// ============================================================================

/// Every event the server originates, tagged on the wire by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Init(InitResponseMsg),
    PlayerJoined(PlayerJoinedMsg),
    PlayerMoved(PlayerMovedMsg),
    PlayerHit(PlayerHitEventMsg),
    PlayerExploded(PlayerExplodedMsg),
    PlayerLeft(PlayerLeftMsg),
}

/// Private reply to `init`: the joiner's id plus everyone currently online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitResponseMsg {
    pub id: PlayerId,
    pub players: Vec<PlayerState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinedMsg {
    pub player: PlayerState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMovedMsg {
    pub id: PlayerId,
    pub position: Vec3,
    pub nickname: String,
}

/// `new_stamina` is the raw stamina count (0..=5), not a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHitEventMsg {
    pub target_id: PlayerId,
    pub new_stamina: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeftMsg {
    pub id: PlayerId,
    pub nickname: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_messages_use_camel_case_tags() {
        let hit = ServerMessage::PlayerHit(PlayerHitEventMsg {
            target_id: 4,
            new_stamina: 2,
        });
        assert_eq!(
            serde_json::to_value(&hit).unwrap(),
            serde_json::json!({ "type": "playerHit", "targetId": 4, "newStamina": 2 })
        );

        let exploded = ServerMessage::PlayerExploded(PlayerExplodedMsg { player_id: 4 });
        assert_eq!(
            serde_json::to_value(&exploded).unwrap(),
            serde_json::json!({ "type": "playerExploded", "playerId": 4 })
        );
    }

    #[test]
    fn init_reply_embeds_player_list() {
        let msg = ServerMessage::Init(InitResponseMsg {
            id: 1,
            players: vec![PlayerState::new(1)],
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "init");
        assert_eq!(json["id"], 1);
        assert_eq!(json["players"][0]["stamina"], 5);
    }

    #[test]
    fn passthrough_kind_reads_type_field() {
        let msg = ClientMessage::Passthrough(PassthroughMsg {
            kind: "punch".to_string(),
            text: r#"{"type":"punch"}"#.to_string(),
        });
        assert_eq!(msg.kind(), "punch");
        assert_eq!(
            ClientMessage::PlayerHit(PlayerHitMsg { target_id: 1 }).kind(),
            "playerHit"
        );
    }

    #[test]
    fn raw_hit_prefers_target_id() {
        let raw = RawPlayerHitMsg {
            target_id: Some(2),
            hit_player_id: Some(9),
        };
        assert_eq!(raw.resolve(), Some(PlayerHitMsg { target_id: 2 }));

        let legacy = RawPlayerHitMsg {
            target_id: None,
            hit_player_id: Some(9),
        };
        assert_eq!(legacy.resolve(), Some(PlayerHitMsg { target_id: 9 }));

        let empty = RawPlayerHitMsg {
            target_id: None,
            hit_player_id: None,
        };
        assert_eq!(empty.resolve(), None);
    }
}
