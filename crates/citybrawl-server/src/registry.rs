use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{RwLock, mpsc};

use citybrawl_core::player::{PlayerId, PlayerState, Vec3};

/// Per-connection sender for outbound text frames.
/// Bounded so a slow client cannot grow server memory without limit.
pub type PlayerSender = mpsc::Sender<Utf8Bytes>;

/// Opaque handle for one open WebSocket. Minted by the registry when the
/// connection is accepted; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A live connection: its outbound channel plus the player it controls.
struct ConnectedPlayer {
    sender: PlayerSender,
    state: PlayerState,
}

/// Result of resolving one hit against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    /// Stamina right after the hit, before any explosion reset.
    pub new_stamina: u8,
    /// The hit drained the target; stamina has already been restored.
    pub exploded: bool,
}

/// Tracks every open connection and the player state it owns.
///
/// Connection ids are handed out in accept order, so iterating the map
/// yields players in join order.
pub struct Registry {
    connections: BTreeMap<ConnectionId, ConnectedPlayer>,
    next_connection_id: u64,
    next_player_id: PlayerId,
}

/// The registry shared between all connection tasks.
pub type SharedRegistry = Arc<RwLock<Registry>>;

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            connections: BTreeMap::new(),
            next_connection_id: 1,
            next_player_id: 1,
        }
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    fn alloc_player_id(&mut self) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }

    fn alloc_connection_id(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        id
    }

    /// Register a freshly accepted connection with default player state.
    pub fn register(&mut self, sender: PlayerSender) -> (ConnectionId, PlayerState) {
        let conn = self.alloc_connection_id();
        let state = PlayerState::new(self.alloc_player_id());
        self.connections.insert(
            conn,
            ConnectedPlayer {
                sender,
                state: state.clone(),
            },
        );
        (conn, state)
    }

    pub fn get(&self, conn: ConnectionId) -> Option<&PlayerState> {
        self.connections.get(&conn).map(|c| &c.state)
    }

    /// Remove a connection. Returns its last state the first time, `None`
    /// on every later call.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<PlayerState> {
        self.connections.remove(&conn).map(|c| c.state)
    }

    /// Snapshot of every registered player, in join order.
    pub fn all(&self) -> Vec<PlayerState> {
        self.connections.values().map(|c| c.state.clone()).collect()
    }

    /// Reverse lookup from player id to its connection.
    pub fn find_by_id(&self, id: PlayerId) -> Option<ConnectionId> {
        self.connections
            .iter()
            .find(|(_, c)| c.state.id == id)
            .map(|(&conn, _)| conn)
    }

    /// Set the player's nickname. Returns the updated state.
    pub fn set_nickname(&mut self, conn: ConnectionId, nickname: String) -> Option<&PlayerState> {
        let entry = self.connections.get_mut(&conn)?;
        entry.state.nickname = nickname;
        Some(&entry.state)
    }

    /// Overwrite the player's position. Returns the updated state.
    pub fn set_position(&mut self, conn: ConnectionId, position: Vec3) -> Option<&PlayerState> {
        let entry = self.connections.get_mut(&conn)?;
        entry.state.position = position;
        Some(&entry.state)
    }

    /// Apply one hit to the player with the given id.
    ///
    /// Decrement, exhaustion check and reset happen under the same `&mut`
    /// borrow, so callers holding the write lock see them as one step.
    pub fn apply_hit(&mut self, target: PlayerId) -> Option<HitOutcome> {
        let state = self
            .connections
            .values_mut()
            .map(|c| &mut c.state)
            .find(|s| s.id == target)?;

        let new_stamina = state.take_hit();
        let exploded = state.is_exhausted();
        if exploded {
            state.restore_stamina();
        }
        Some(HitOutcome {
            new_stamina,
            exploded,
        })
    }

    pub(crate) fn sender(&self, conn: ConnectionId) -> Option<&PlayerSender> {
        self.connections.get(&conn).map(|c| &c.sender)
    }

    /// Every connection with its player id and outbound channel.
    pub(crate) fn recipients(
        &self,
    ) -> impl Iterator<Item = (ConnectionId, PlayerId, &PlayerSender)> {
        self.connections
            .iter()
            .map(|(&conn, c)| (conn, c.state.id, &c.sender))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
