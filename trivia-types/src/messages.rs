use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{GameOverSummary, PlayerId, RoomSnapshot};

/// Intents a client may send. The `type` field discriminates on the wire,
/// e.g. `{"type":"joinRoom","roomCode":"ABC123","username":"alice"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    CreateRoom {
        username: String,
    },
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_code: String,
        username: String,
    },
    SubmitGuess {
        guess: String,
    },
    ResetGame,
    LeaveRoom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Pushed once immediately after the websocket upgrade.
    #[serde(rename_all = "camelCase")]
    Connection { client_id: Uuid },
    /// Private reply to the creator of a room.
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_code: String, username: String },
    /// Full state broadcast; sent after any membership or lifecycle change.
    GameState(RoomSnapshot),
    #[serde(rename_all = "camelCase")]
    RoundStart {
        round: u32,
        max_rounds: u32,
        time_left: u32,
        images: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TimeUpdate { time_left: u32 },
    /// Broadcast when a player ends the round by guessing the link.
    #[serde(rename_all = "camelCase")]
    CorrectGuess {
        player_id: PlayerId,
        username: String,
        score_for_round: u32,
        total_score: u32,
        correct_link: String,
        attempts: u32,
    },
    /// Private notice to the guessing player only, never broadcast.
    IncorrectGuess { guess: String, message: String },
    #[serde(rename_all = "camelCase")]
    GameOver {
        #[serde(flatten)]
        summary: GameOverSummary,
    },
    /// Private failure report to the originating connection.
    Error { message: String },
}
