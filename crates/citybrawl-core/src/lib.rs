pub mod net;
pub mod player;
