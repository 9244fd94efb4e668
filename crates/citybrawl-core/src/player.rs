use serde::{Deserialize, Serialize};

/// Process-unique player identifier, handed out in connection order.
pub type PlayerId = u64;

/// Stamina a player spawns with and is restored to after exploding.
pub const MAX_STAMINA: u8 = 5;

/// Where every player spawns before their first position update.
pub const SPAWN_POSITION: Vec3 = Vec3 {
    x: -50.0,
    y: 2.0,
    z: -45.0,
};

/// World-space position as sent by the browser client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Vec3 {
    fn default() -> Self {
        SPAWN_POSITION
    }
}

/// Authoritative state the server keeps for one connected player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub position: Vec3,
    pub nickname: String,
    pub stamina: u8,
}

impl PlayerState {
    /// Fresh state for a just-accepted connection: spawn point, no nickname,
    /// full stamina.
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            position: SPAWN_POSITION,
            nickname: String::new(),
            stamina: MAX_STAMINA,
        }
    }

    /// Take one hit. Returns the stamina left, floored at zero.
    pub fn take_hit(&mut self) -> u8 {
        self.stamina = self.stamina.saturating_sub(1);
        self.stamina
    }

    pub fn is_exhausted(&self) -> bool {
        self.stamina == 0
    }

    pub fn restore_stamina(&mut self) {
        self.stamina = MAX_STAMINA;
    }
}
