use std::env;
use std::time::Duration;

use trivia_core::{GuessPolicy, RoomConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_players_per_room: usize,
    pub round_timer_seconds: u32,
    pub cooldown_seconds: u32,
    pub max_rounds: u32,
    pub max_guesses_per_round: u32,
    pub guess_cooldown_ms: u64,
    pub room_idle_minutes: u64,
    pub image_sets_path: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("Invalid PORT"),
            max_players_per_room: env::var("MAX_PLAYERS_PER_ROOM")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .expect("Invalid MAX_PLAYERS_PER_ROOM"),
            round_timer_seconds: env::var("ROUND_TIMER_SECONDS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .expect("Invalid ROUND_TIMER_SECONDS"),
            cooldown_seconds: env::var("COOLDOWN_SECONDS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("Invalid COOLDOWN_SECONDS"),
            max_rounds: env::var("MAX_ROUNDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("Invalid MAX_ROUNDS"),
            max_guesses_per_round: env::var("MAX_GUESSES_PER_ROUND")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("Invalid MAX_GUESSES_PER_ROUND"),
            guess_cooldown_ms: env::var("GUESS_COOLDOWN_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .expect("Invalid GUESS_COOLDOWN_MS"),
            room_idle_minutes: env::var("ROOM_IDLE_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("Invalid ROOM_IDLE_MINUTES"),
            image_sets_path: env::var("IMAGE_SETS_PATH").ok(),
        }
    }

    /// The per-room rules derived from this process configuration.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            max_players: self.max_players_per_room,
            round_timer_seconds: self.round_timer_seconds,
            cooldown_seconds: self.cooldown_seconds,
            max_rounds: self.max_rounds,
            guess_policy: GuessPolicy {
                cooldown: Duration::from_millis(self.guess_cooldown_ms),
                max_guesses_per_round: self.max_guesses_per_round,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
