//! Routes decoded client messages to registry mutations and broadcasts.
//!
//! The server only owns identity and stamina. Movement and explosions are
//! client-authoritative and are relayed as reported.

use axum::extract::ws::Utf8Bytes;

use citybrawl_core::net::messages::{
    ClientMessage, InitResponseMsg, PassthroughMsg, PlayerExplodedMsg, PlayerHitEventMsg,
    PlayerJoinedMsg, PlayerLeftMsg, PlayerMovedMsg, ServerMessage,
};
use citybrawl_core::net::protocol::decode_client_message;
use citybrawl_core::player::{PlayerId, PlayerState, Vec3};

use crate::broadcast::{broadcast, broadcast_text, send_to};
use crate::registry::{ConnectionId, Registry, SharedRegistry};

/// Decode one inbound frame from `conn` and apply it.
///
/// Malformed frames are logged and dropped; the connection stays usable.
pub async fn on_message(registry: &SharedRegistry, conn: ConnectionId, data: &[u8]) {
    let msg = match decode_client_message(data) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(connection = %conn, error = %e, "Dropping malformed message");
            return;
        },
    };

    let mut registry = registry.write().await;
    dispatch(&mut registry, conn, msg);
}

/// Tear down a closed connection: drop its entry and tell everyone left.
///
/// Returns the departed player the first time; later calls for the same
/// connection find nothing and broadcast nothing.
pub async fn on_close(registry: &SharedRegistry, conn: ConnectionId) -> Option<PlayerState> {
    let mut registry = registry.write().await;
    let player = registry.remove(conn)?;

    tracing::info!(
        connection = %conn,
        player_id = player.id,
        nickname = %player.nickname,
        "Player disconnected"
    );

    let msg = ServerMessage::PlayerLeft(PlayerLeftMsg {
        id: player.id,
        nickname: player.nickname.clone(),
    });
    broadcast(&registry, &msg, None);
    Some(player)
}

/// Apply a decoded message from `conn`. The caller must hold the registry
/// exclusively for the whole call.
pub fn dispatch(registry: &mut Registry, conn: ConnectionId, msg: ClientMessage) {
    let Some(sender_id) = registry.get(conn).map(|p| p.id) else {
        tracing::debug!(
            connection = %conn,
            kind = msg.kind(),
            "Ignoring message from unregistered connection"
        );
        return;
    };

    match msg {
        ClientMessage::Init(init) => handle_init(registry, conn, init.nickname),
        ClientMessage::Position(pos) => handle_position(registry, conn, pos.position),
        ClientMessage::PlayerHit(hit) => handle_player_hit(registry, sender_id, hit.target_id),
        ClientMessage::PlayerExploded(PlayerExplodedMsg { player_id }) => {
            let msg = ServerMessage::PlayerExploded(PlayerExplodedMsg { player_id });
            broadcast(registry, &msg, None);
        },
        ClientMessage::Passthrough(PassthroughMsg { text, .. }) => {
            broadcast_text(registry, Utf8Bytes::from(text), Some(conn));
        },
    }
}

fn handle_init(registry: &mut Registry, conn: ConnectionId, nickname: String) {
    let Some(player) = registry.set_nickname(conn, nickname).cloned() else {
        return;
    };

    tracing::info!(
        connection = %conn,
        player_id = player.id,
        nickname = %player.nickname,
        "Player joined"
    );

    let reply = ServerMessage::Init(InitResponseMsg {
        id: player.id,
        players: registry.all(),
    });
    send_to(registry, conn, &reply);

    let joined = ServerMessage::PlayerJoined(PlayerJoinedMsg { player });
    broadcast(registry, &joined, Some(conn));
}

fn handle_position(registry: &mut Registry, conn: ConnectionId, position: Vec3) {
    let Some(player) = registry.set_position(conn, position) else {
        return;
    };

    let moved = ServerMessage::PlayerMoved(PlayerMovedMsg {
        id: player.id,
        position,
        nickname: player.nickname.clone(),
    });
    broadcast(registry, &moved, Some(conn));
}

fn handle_player_hit(registry: &mut Registry, attacker: PlayerId, target: PlayerId) {
    let Some(outcome) = registry.apply_hit(target) else {
        tracing::debug!(attacker, target, "Hit on unknown player ignored");
        return;
    };

    let hit = ServerMessage::PlayerHit(PlayerHitEventMsg {
        target_id: target,
        new_stamina: outcome.new_stamina,
    });
    broadcast(registry, &hit, None);

    if outcome.exploded {
        tracing::info!(attacker, target, "Player exploded");
        let exploded = ServerMessage::PlayerExploded(PlayerExplodedMsg { player_id: target });
        broadcast(registry, &exploded, None);
    }
}
