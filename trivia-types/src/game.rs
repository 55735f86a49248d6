use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::player::PlayerInfo;

/// One round's worth of puzzle material: three images that share a single
/// linking word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ImageSet {
    pub id: u32,
    pub images: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Lifecycle of a room. `Cooldown` is the short pause between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Cooldown,
    Finished,
}

/// What clients are allowed to see of the current round. The correct answer
/// stays server-side until the round resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoundView {
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&ImageSet> for RoundView {
    fn from(set: &ImageSet) -> Self {
        RoundView {
            images: set.images.clone(),
            hint: set.hint.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GameOverSummary {
    pub winner: Option<PlayerInfo>,
    pub is_tie: bool,
    pub final_scores: Vec<PlayerInfo>,
}

/// Full room state as broadcast to every member after any membership or
/// lifecycle change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_code: String,
    pub round: u32,
    pub max_rounds: u32,
    pub time_left: u32,
    pub status: RoomStatus,
    pub players: Vec<PlayerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_round: Option<RoundView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_over: Option<GameOverSummary>,
}
