use thiserror::Error;

/// Room membership and protocol failures reported back to a single client.
/// The `Display` strings are what end up in `ServerMessage::Error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Room is full")]
    RoomFull,
    #[error("Username is already taken")]
    UsernameTaken { username: String },
    #[error("Room not found")]
    RoomNotFound,
    #[error("Could not allocate a room code ({code} already taken)")]
    RoomCodeCollision { code: String },
    #[error("Invalid message format")]
    MalformedMessage,
    #[error("Unknown message type")]
    UnknownMessageType,
}

/// Why a guess was refused before it was ever compared against the answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuessRejection {
    #[error("Guess must be at least 2 characters long")]
    TooShort,
    #[error("Guess must be less than 50 characters")]
    TooLong,
    #[error("Please wait {} seconds before guessing again", (.retry_after_ms + 999) / 1000)]
    Cooldown { retry_after_ms: u64 },
    #[error("Maximum guesses reached for this round")]
    MaxAttemptsReached,
    #[error("You already tried this guess")]
    DuplicateGuess,
}
