use axum::extract::ws::Utf8Bytes;

use citybrawl_core::net::messages::ServerMessage;
use citybrawl_core::net::protocol::encode_server_message;

use crate::registry::{ConnectionId, PlayerSender, Registry};

/// Encode `msg` once and fan it out to every registered connection except
/// `exclude`. Returns how many connections accepted the frame.
pub fn broadcast(
    registry: &Registry,
    msg: &ServerMessage,
    exclude: Option<ConnectionId>,
) -> usize {
    match encode_server_message(msg) {
        Ok(text) => broadcast_text(registry, Utf8Bytes::from(text), exclude),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode broadcast");
            0
        },
    }
}

/// Fan an already-encoded frame out to every connection except `exclude`.
///
/// Closed or backed-up channels are skipped; one bad recipient never stops
/// delivery to the rest.
pub fn broadcast_text(
    registry: &Registry,
    text: Utf8Bytes,
    exclude: Option<ConnectionId>,
) -> usize {
    let mut delivered = 0;
    for (conn, player_id, sender) in registry.recipients() {
        if Some(conn) == exclude {
            continue;
        }
        if deliver(sender, text.clone()) {
            delivered += 1;
        } else {
            tracing::debug!(
                connection = %conn,
                player_id,
                "Skipping broadcast to closed or slow client"
            );
        }
    }
    delivered
}

/// Send one message to a single connection. Returns false if the connection
/// is gone or its outbound buffer is full.
pub fn send_to(registry: &Registry, conn: ConnectionId, msg: &ServerMessage) -> bool {
    let Some(sender) = registry.sender(conn) else {
        return false;
    };
    let text = match encode_server_message(msg) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(connection = %conn, error = %e, "Failed to encode message");
            return false;
        },
    };
    let sent = deliver(sender, Utf8Bytes::from(text));
    if !sent {
        tracing::debug!(connection = %conn, "Failed to send to closed or slow client");
    }
    sent
}

fn deliver(sender: &PlayerSender, text: Utf8Bytes) -> bool {
    if sender.is_closed() {
        return false;
    }
    sender.try_send(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use citybrawl_core::net::messages::PlayerExplodedMsg;
    use tokio::sync::mpsc;

    fn exploded(player_id: u64) -> ServerMessage {
        ServerMessage::PlayerExploded(PlayerExplodedMsg { player_id })
    }

    #[test]
    fn broadcast_reaches_everyone_but_excluded() {
        let mut reg = Registry::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        let (tx3, mut rx3) = mpsc::channel(8);
        let (a, _) = reg.register(tx1);
        reg.register(tx2);
        reg.register(tx3);

        let delivered = broadcast(&reg, &exploded(1), Some(a));
        assert_eq!(delivered, 2);
        assert!(rx1.try_recv().is_err());
        let text = rx2.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["type"], "playerExploded");
        assert!(rx3.try_recv().is_ok());
    }

    #[test]
    fn closed_recipient_does_not_stop_delivery() {
        let mut reg = Registry::new();
        let (tx1, rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        reg.register(tx1);
        reg.register(tx2);
        drop(rx1);

        let delivered = broadcast(&reg, &exploded(2), None);
        assert_eq!(delivered, 1);
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn full_recipient_is_skipped() {
        let mut reg = Registry::new();
        let (tx1, mut rx1) = mpsc::channel(1);
        let (tx2, mut rx2) = mpsc::channel(8);
        reg.register(tx1);
        reg.register(tx2);

        assert_eq!(broadcast(&reg, &exploded(1), None), 2);
        // First channel is now full
        assert_eq!(broadcast(&reg, &exploded(1), None), 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn send_to_targets_one_connection() {
        let mut reg = Registry::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        let (a, _) = reg.register(tx1);
        reg.register(tx2);

        assert!(send_to(&reg, a, &exploded(1)));
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());

        reg.remove(a);
        assert!(!send_to(&reg, a, &exploded(1)));
    }
}
