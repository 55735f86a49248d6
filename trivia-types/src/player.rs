use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Players are identified by their connection-scoped client id; the id is not
/// stable across reconnects.
pub type PlayerId = Uuid;

/// Client-visible view of a player within a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub username: String,
    pub score: u32,
}
