use std::time::Instant;

use tracing::{debug, info};
use trivia_types::{
    GameError, GameOverSummary, ImageSet, PlayerId, PlayerInfo, RoomSnapshot, RoomStatus,
    RoundView, ServerMessage,
};

use crate::catalog::RoundCatalog;
use crate::guess::{normalize, GuessPolicy, GuessRecord, GuessValidator};
use crate::scoring::round_score;

/// Tunable per-room rules. Defaults mirror the two-player game the server
/// ships with.
#[derive(Debug, Clone, Copy)]
pub struct RoomConfig {
    pub max_players: usize,
    pub round_timer_seconds: u32,
    pub cooldown_seconds: u32,
    pub max_rounds: u32,
    pub guess_policy: GuessPolicy,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 2,
            round_timer_seconds: 20,
            cooldown_seconds: 3,
            max_rounds: 5,
            guess_policy: GuessPolicy::default(),
        }
    }
}

/// A message the room wants delivered, either to everyone in the room or to
/// one player privately. The transport layer decides how to get it there.
#[derive(Debug, Clone)]
pub enum Outbound {
    Broadcast {
        message: ServerMessage,
        exclude: Option<PlayerId>,
    },
    Notify {
        player: PlayerId,
        message: ServerMessage,
    },
}

/// What should happen to the room's single scheduled task after an operation.
/// `StartRound` and `StartCooldown` imply cancelling whatever ran before;
/// there is never more than one live timer per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDirective {
    Keep,
    StartRound,
    StartCooldown,
    Cancel,
}

/// Result of a room operation: messages to deliver plus the timer change the
/// caller must apply.
#[derive(Debug)]
pub struct RoomUpdate {
    pub messages: Vec<Outbound>,
    pub timer: TimerDirective,
}

impl RoomUpdate {
    fn none() -> Self {
        Self {
            messages: Vec::new(),
            timer: TimerDirective::Keep,
        }
    }
}

#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub score: u32,
    record: GuessRecord,
}

impl Player {
    fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            username: self.username.clone(),
            score: self.score,
        }
    }
}

/// State machine for one game session. Purely synchronous: every operation
/// returns a [`RoomUpdate`] describing the side effects, and the caller owns
/// delivery and timer scheduling.
pub struct Room {
    code: String,
    config: RoomConfig,
    validator: GuessValidator,
    catalog: RoundCatalog,
    players: Vec<Player>,
    status: RoomStatus,
    round: u32,
    time_left: u32,
    current_set: Option<ImageSet>,
    game_over: Option<GameOverSummary>,
}

impl Room {
    pub fn new(code: String, catalog: RoundCatalog, config: RoomConfig) -> Self {
        Self {
            code,
            validator: GuessValidator::new(config.guess_policy),
            config,
            catalog,
            players: Vec::new(),
            status: RoomStatus::Waiting,
            round: 0,
            time_left: 0,
            current_set: None,
            game_over: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn contains_player(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// Add a player; starts the game once the room fills to capacity.
    pub fn add_player(&mut self, id: PlayerId, username: String) -> Result<RoomUpdate, GameError> {
        if self.players.len() >= self.config.max_players {
            return Err(GameError::RoomFull);
        }
        if self.players.iter().any(|p| p.username == username) {
            return Err(GameError::UsernameTaken { username });
        }

        info!(room = %self.code, %username, "player joined");
        self.players.push(Player {
            id,
            username,
            score: 0,
            record: GuessRecord::default(),
        });

        let mut update = RoomUpdate::none();
        update.messages.push(self.broadcast_state());
        if self.players.len() == self.config.max_players && self.status == RoomStatus::Waiting {
            self.begin_round(1, &mut update);
        }
        Ok(update)
    }

    /// Remove a player. Any in-flight round halts rather than continuing
    /// against a reduced roster.
    pub fn remove_player(&mut self, id: PlayerId) -> RoomUpdate {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        if self.players.len() == before {
            return RoomUpdate::none();
        }

        info!(room = %self.code, "player left");
        self.status = RoomStatus::Waiting;
        self.current_set = None;
        self.time_left = 0;
        self.game_over = None;

        let mut update = RoomUpdate {
            messages: Vec::new(),
            timer: TimerDirective::Cancel,
        };
        if !self.players.is_empty() {
            update.messages.push(self.broadcast_state());
        }
        update
    }

    /// Handle one guess. Rejections and misses go back to the guesser alone;
    /// a correct guess scores, reveals the answer to the room and ends the
    /// round immediately.
    pub fn submit_guess(&mut self, player_id: PlayerId, raw: &str, now: Instant) -> RoomUpdate {
        if self.status != RoomStatus::Playing || !self.contains_player(player_id) {
            return RoomUpdate::none();
        }

        let normalized = match self.validator.validate(raw) {
            Ok(n) => n,
            Err(rejection) => {
                return self.incorrect_notice(player_id, raw, rejection.to_string());
            }
        };

        let record = self
            .players
            .iter()
            .find(|p| p.id == player_id)
            .map(|p| p.record.clone())
            .unwrap_or_default();
        if let Err(rejection) = self.validator.check_rate_limit(&record, &normalized, now) {
            return self.incorrect_notice(player_id, raw, rejection.to_string());
        }

        let answer = self
            .current_set
            .as_ref()
            .map(|set| normalize(&set.correct_answer))
            .unwrap_or_default();
        let correct = normalized == answer;

        let max_guesses = self.config.guess_policy.max_guesses_per_round;
        let time_left = self.time_left;
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .expect("membership checked above");
        player.record.commit(normalized, now);
        let attempts = player.record.guess_count;

        if !correct {
            debug!(room = %self.code, username = %player.username, "incorrect guess");
            let remaining = max_guesses.saturating_sub(attempts);
            return self.incorrect_notice(
                player_id,
                raw,
                format!("Try again! ({} attempts remaining)", remaining),
            );
        }

        let score_for_round = round_score(time_left, attempts);
        player.score += score_for_round;
        let username = player.username.clone();
        let total_score = player.score;
        info!(room = %self.code, %username, score_for_round, "correct guess, round over");

        let correct_link = self
            .current_set
            .as_ref()
            .map(|set| set.correct_answer.clone())
            .unwrap_or_default();

        let mut update = RoomUpdate::none();
        update.messages.push(Outbound::Broadcast {
            message: ServerMessage::CorrectGuess {
                player_id,
                username,
                score_for_round,
                total_score,
                correct_link,
                attempts,
            },
            exclude: None,
        });
        self.end_round(&mut update);
        update
    }

    /// One second of round clock. Ends the round when the clock hits zero.
    pub fn tick(&mut self) -> RoomUpdate {
        if self.status != RoomStatus::Playing {
            return RoomUpdate::none();
        }
        self.time_left = self.time_left.saturating_sub(1);

        let mut update = RoomUpdate::none();
        update.messages.push(Outbound::Broadcast {
            message: ServerMessage::TimeUpdate {
                time_left: self.time_left,
            },
            exclude: None,
        });
        if self.time_left == 0 {
            debug!(room = %self.code, round = self.round, "round timed out");
            self.end_round(&mut update);
        }
        update
    }

    /// Called when the between-rounds pause elapses.
    pub fn finish_cooldown(&mut self) -> RoomUpdate {
        if self.status != RoomStatus::Cooldown {
            return RoomUpdate::none();
        }
        let mut update = RoomUpdate::none();
        let next = self.round + 1;
        self.begin_round(next, &mut update);
        update
    }

    /// Restart from round 1 with zeroed scores. Falls back to `waiting` if
    /// the room is below capacity.
    pub fn reset_game(&mut self) -> RoomUpdate {
        info!(room = %self.code, "game reset");
        for player in &mut self.players {
            player.score = 0;
            player.record.reset();
        }
        self.game_over = None;
        self.round = 0;
        self.time_left = 0;
        self.current_set = None;

        let mut update = RoomUpdate {
            messages: Vec::new(),
            timer: TimerDirective::Cancel,
        };
        if self.players.len() == self.config.max_players {
            self.begin_round(1, &mut update);
        } else {
            self.status = RoomStatus::Waiting;
            update.messages.push(self.broadcast_state());
        }
        update
    }

    /// Client-visible view of the whole room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_code: self.code.clone(),
            round: self.round,
            max_rounds: self.config.max_rounds,
            time_left: self.time_left,
            status: self.status,
            players: self.players.iter().map(Player::info).collect(),
            current_round: match self.status {
                RoomStatus::Playing => self.current_set.as_ref().map(RoundView::from),
                _ => None,
            },
            game_over: self.game_over.clone(),
        }
    }

    fn begin_round(&mut self, round: u32, update: &mut RoomUpdate) {
        // round 1 means a new game: nothing from the previous one carries over
        if round == 1 {
            self.game_over = None;
            for player in &mut self.players {
                player.score = 0;
                player.record.reset();
            }
        }
        let set = self.catalog.next();
        self.round = round;
        self.status = RoomStatus::Playing;
        self.time_left = self.config.round_timer_seconds;
        for player in &mut self.players {
            player.record.reset();
        }
        info!(room = %self.code, round, "round started");

        update.messages.push(Outbound::Broadcast {
            message: ServerMessage::RoundStart {
                round,
                max_rounds: self.config.max_rounds,
                time_left: self.time_left,
                images: set.images.clone(),
                hint: set.hint.clone(),
            },
            exclude: None,
        });
        self.current_set = Some(set);
        update.timer = TimerDirective::StartRound;
    }

    fn end_round(&mut self, update: &mut RoomUpdate) {
        self.current_set = None;
        self.time_left = 0;
        if self.round >= self.config.max_rounds {
            self.finish_game(update);
        } else {
            self.status = RoomStatus::Cooldown;
            update.timer = TimerDirective::StartCooldown;
        }
    }

    fn finish_game(&mut self, update: &mut RoomUpdate) {
        self.status = RoomStatus::Finished;
        let summary = self.final_summary();
        info!(room = %self.code, is_tie = summary.is_tie, "game over");
        self.game_over = Some(summary.clone());
        update.messages.push(Outbound::Broadcast {
            message: ServerMessage::GameOver { summary },
            exclude: None,
        });
        update.messages.push(self.broadcast_state());
        update.timer = TimerDirective::Cancel;
    }

    /// Strictly highest score wins; a shared top score is a tie with no
    /// winner.
    fn final_summary(&self) -> GameOverSummary {
        let final_scores: Vec<PlayerInfo> = self.players.iter().map(Player::info).collect();
        let top = final_scores.iter().map(|p| p.score).max().unwrap_or(0);
        let leaders: Vec<&PlayerInfo> =
            final_scores.iter().filter(|p| p.score == top).collect();
        let is_tie = leaders.len() > 1;
        let winner = if is_tie { None } else { leaders.first().map(|p| (*p).clone()) };
        GameOverSummary {
            winner,
            is_tie,
            final_scores,
        }
    }

    fn broadcast_state(&self) -> Outbound {
        Outbound::Broadcast {
            message: ServerMessage::GameState(self.snapshot()),
            exclude: None,
        }
    }

    fn incorrect_notice(&self, player: PlayerId, raw: &str, message: String) -> RoomUpdate {
        RoomUpdate {
            messages: vec![Outbound::Notify {
                player,
                message: ServerMessage::IncorrectGuess {
                    guess: raw.to_string(),
                    message,
                },
            }],
            timer: TimerDirective::Keep,
        }
    }

    pub fn round_time_left(&self) -> u32 {
        self.time_left
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_room() -> Room {
        let catalog =
            RoundCatalog::with_seed(RoundCatalog::default_sets(), 99).expect("non-empty catalog");
        Room::new("ABC123".to_string(), catalog, RoomConfig::default())
    }

    fn filled_room() -> (Room, PlayerId, PlayerId) {
        let mut room = test_room();
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        room.add_player(p1, "alice".to_string()).unwrap();
        room.add_player(p2, "bob".to_string()).unwrap();
        (room, p1, p2)
    }

    fn current_answer(room: &Room) -> String {
        room.current_set
            .as_ref()
            .map(|s| s.correct_answer.clone())
            .expect("round in progress")
    }

    #[test]
    fn test_single_player_stays_waiting() {
        let mut room = test_room();
        let update = room.add_player(Uuid::new_v4(), "alice".to_string()).unwrap();
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert_eq!(update.timer, TimerDirective::Keep);
    }

    #[test]
    fn test_second_join_starts_round() {
        let (room, _, _) = filled_room();
        assert_eq!(room.status(), RoomStatus::Playing);
        assert_eq!(room.round_time_left(), 20);
        assert_eq!(room.snapshot().round, 1);
    }

    #[test]
    fn test_room_capacity_enforced() {
        let (mut room, _, _) = filled_room();
        let err = room
            .add_player(Uuid::new_v4(), "carol".to_string())
            .unwrap_err();
        assert_eq!(err, GameError::RoomFull);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let mut room = test_room();
        room.add_player(Uuid::new_v4(), "alice".to_string()).unwrap();
        let err = room
            .add_player(Uuid::new_v4(), "alice".to_string())
            .unwrap_err();
        assert!(matches!(err, GameError::UsernameTaken { .. }));
    }

    #[test]
    fn test_correct_guess_scores_and_ends_round() {
        let (mut room, p1, _) = filled_room();
        let answer = current_answer(&room);

        // burn 5 seconds off the clock
        for _ in 0..5 {
            room.tick();
        }
        assert_eq!(room.round_time_left(), 15);

        let update = room.submit_guess(p1, &answer, Instant::now());
        let correct = update.messages.iter().find_map(|m| match m {
            Outbound::Broadcast {
                message: ServerMessage::CorrectGuess { score_for_round, .. },
                ..
            } => Some(*score_for_round),
            _ => None,
        });
        assert_eq!(correct, Some(75));
        assert_eq!(room.status(), RoomStatus::Cooldown);
        assert_eq!(update.timer, TimerDirective::StartCooldown);
    }

    #[test]
    fn test_second_attempt_pays_penalty() {
        let (mut room, p1, _) = filled_room();
        let answer = current_answer(&room);
        for _ in 0..5 {
            room.tick();
        }

        let now = Instant::now();
        room.submit_guess(p1, "definitely wrong", now);
        let update = room.submit_guess(p1, &answer, now + std::time::Duration::from_secs(3));
        let score = update.messages.iter().find_map(|m| match m {
            Outbound::Broadcast {
                message: ServerMessage::CorrectGuess { score_for_round, .. },
                ..
            } => Some(*score_for_round),
            _ => None,
        });
        assert_eq!(score, Some(65));
    }

    #[test]
    fn test_wrong_guess_is_private() {
        let (mut room, p1, _) = filled_room();
        let update = room.submit_guess(p1, "not the answer", Instant::now());
        assert_eq!(update.messages.len(), 1);
        match &update.messages[0] {
            Outbound::Notify {
                player,
                message: ServerMessage::IncorrectGuess { message, .. },
            } => {
                assert_eq!(*player, p1);
                assert!(message.contains("attempts remaining"));
            }
            other => panic!("expected private notice, got {:?}", other),
        }
        assert_eq!(room.status(), RoomStatus::Playing);
    }

    #[test]
    fn test_guess_ignored_outside_playing() {
        let mut room = test_room();
        let p1 = Uuid::new_v4();
        room.add_player(p1, "alice".to_string()).unwrap();
        let update = room.submit_guess(p1, "nature", Instant::now());
        assert!(update.messages.is_empty());
        assert_eq!(update.timer, TimerDirective::Keep);
    }

    #[test]
    fn test_timeout_advances_round_without_scoring() {
        let (mut room, _, _) = filled_room();
        for _ in 0..20 {
            room.tick();
        }
        assert_eq!(room.status(), RoomStatus::Cooldown);
        let snapshot = room.snapshot();
        assert!(snapshot.players.iter().all(|p| p.score == 0));

        let update = room.finish_cooldown();
        assert_eq!(room.status(), RoomStatus::Playing);
        assert_eq!(room.snapshot().round, 2);
        assert_eq!(update.timer, TimerDirective::StartRound);
    }

    #[test]
    fn test_final_round_timeout_finishes_game() {
        let (mut room, _, _) = filled_room();
        for round in 1..=5 {
            assert_eq!(room.snapshot().round, round);
            for _ in 0..20 {
                room.tick();
            }
            if round < 5 {
                room.finish_cooldown();
            }
        }
        assert_eq!(room.status(), RoomStatus::Finished);
        let summary = room.snapshot().game_over.expect("summary present");
        assert!(summary.is_tie);
        assert!(summary.winner.is_none());
    }

    #[test]
    fn test_winner_has_strictly_highest_score() {
        let (mut room, p1, _) = filled_room();
        let answer = current_answer(&room);
        room.submit_guess(p1, &answer, Instant::now());

        // run out the remaining rounds with no more scoring
        while room.status() != RoomStatus::Finished {
            room.finish_cooldown();
            for _ in 0..20 {
                room.tick();
            }
        }
        let summary = room.snapshot().game_over.expect("summary present");
        assert!(!summary.is_tie);
        assert_eq!(summary.winner.expect("winner").id, p1);
    }

    #[test]
    fn test_leave_halts_round() {
        let (mut room, p1, _) = filled_room();
        assert_eq!(room.status(), RoomStatus::Playing);
        let update = room.remove_player(p1);
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert_eq!(update.timer, TimerDirective::Cancel);
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn test_last_leave_empties_quietly() {
        let mut room = test_room();
        let p1 = Uuid::new_v4();
        room.add_player(p1, "alice".to_string()).unwrap();
        let update = room.remove_player(p1);
        assert!(room.is_empty());
        assert!(update.messages.is_empty());
        assert_eq!(update.timer, TimerDirective::Cancel);
    }

    #[test]
    fn test_reset_restarts_from_round_one() {
        let (mut room, p1, _) = filled_room();
        let answer = current_answer(&room);
        room.submit_guess(p1, &answer, Instant::now());
        room.finish_cooldown();
        assert_eq!(room.snapshot().round, 2);

        let update = room.reset_game();
        let snapshot = room.snapshot();
        assert_eq!(snapshot.round, 1);
        assert_eq!(snapshot.status, RoomStatus::Playing);
        assert!(snapshot.players.iter().all(|p| p.score == 0));
        assert!(snapshot.game_over.is_none());
        assert_eq!(update.timer, TimerDirective::StartRound);
    }

    #[test]
    fn test_reset_below_capacity_waits() {
        let (mut room, p1, _) = filled_room();
        room.remove_player(p1);
        let update = room.reset_game();
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert_eq!(update.timer, TimerDirective::Cancel);
    }

    #[test]
    fn test_leaving_finished_room_clears_summary() {
        let (mut room, p1, _) = filled_room();
        for round in 1..=5 {
            for _ in 0..20 {
                room.tick();
            }
            if round < 5 {
                room.finish_cooldown();
            }
        }
        assert_eq!(room.status(), RoomStatus::Finished);
        assert!(room.snapshot().game_over.is_some());

        room.remove_player(p1);
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert!(room.snapshot().game_over.is_none());
    }

    #[test]
    fn test_rejoin_after_game_over_starts_fresh() {
        let (mut room, p1, p2) = filled_room();
        let answer = current_answer(&room);
        room.submit_guess(p1, &answer, Instant::now());
        while room.status() != RoomStatus::Finished {
            room.finish_cooldown();
            for _ in 0..20 {
                room.tick();
            }
        }

        room.remove_player(p2);
        room.add_player(Uuid::new_v4(), "carol".to_string()).unwrap();
        assert_eq!(room.status(), RoomStatus::Playing);

        let snapshot = room.snapshot();
        assert_eq!(snapshot.round, 1);
        assert!(snapshot.game_over.is_none());
        assert!(snapshot.players.iter().all(|p| p.score == 0));
    }

    #[test]
    fn test_snapshot_hides_answer() {
        let (room, _, _) = filled_room();
        let snapshot = room.snapshot();
        let view = snapshot.current_round.as_ref().expect("round in progress");
        assert_eq!(view.images.len(), 3);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains(&current_answer(&room)));
    }
}
