use std::time::{Duration, Instant};

use trivia_types::GuessRejection;

pub const MIN_GUESS_LEN: usize = 2;
pub const MAX_GUESS_LEN: usize = 50;

/// Canonicalize a guess or answer for comparison: lowercase, trimmed, with
/// everything outside ascii letters, digits and spaces stripped.
pub fn normalize(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Per-round guess limits for a single player.
#[derive(Debug, Clone, Copy)]
pub struct GuessPolicy {
    pub cooldown: Duration,
    pub max_guesses_per_round: u32,
}

impl Default for GuessPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(2000),
            max_guesses_per_round: 5,
        }
    }
}

/// What a player has spent so far in the current round. Reset when a new
/// round starts.
#[derive(Debug, Clone, Default)]
pub struct GuessRecord {
    pub last_guess: Option<String>,
    pub last_guess_at: Option<Instant>,
    pub guess_count: u32,
}

impl GuessRecord {
    /// Commit an accepted guess. Callers run [`GuessValidator::check_rate_limit`]
    /// first; this only records what was spent.
    pub fn commit(&mut self, normalized: String, now: Instant) {
        self.last_guess = Some(normalized);
        self.last_guess_at = Some(now);
        self.guess_count += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Stateless checks applied to every guess before it is compared against the
/// answer. Nothing here mutates the record; the caller commits after all
/// checks pass.
pub struct GuessValidator {
    policy: GuessPolicy,
}

impl GuessValidator {
    pub fn new(policy: GuessPolicy) -> Self {
        Self { policy }
    }

    /// Normalize the raw input and bounds-check the result.
    pub fn validate(&self, raw: &str) -> Result<String, GuessRejection> {
        let normalized = normalize(raw);
        if normalized.len() < MIN_GUESS_LEN {
            return Err(GuessRejection::TooShort);
        }
        if normalized.len() > MAX_GUESS_LEN {
            return Err(GuessRejection::TooLong);
        }
        Ok(normalized)
    }

    /// Cooldown, attempt-budget and duplicate checks against the player's
    /// record for the current round.
    pub fn check_rate_limit(
        &self,
        record: &GuessRecord,
        normalized: &str,
        now: Instant,
    ) -> Result<(), GuessRejection> {
        if let Some(at) = record.last_guess_at {
            let elapsed = now.saturating_duration_since(at);
            if elapsed < self.policy.cooldown {
                let retry_after_ms = (self.policy.cooldown - elapsed).as_millis() as u64;
                return Err(GuessRejection::Cooldown { retry_after_ms });
            }
        }
        if record.guess_count >= self.policy.max_guesses_per_round {
            return Err(GuessRejection::MaxAttemptsReached);
        }
        if record.last_guess.as_deref() == Some(normalized) {
            return Err(GuessRejection::DuplicateGuess);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> GuessValidator {
        GuessValidator::new(GuessPolicy::default())
    }

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Na-ture!!"), "nature");
        assert_eq!(normalize("  Hot Dog  "), "hot dog");
        assert_eq!(normalize("café"), "caf");
        assert_eq!(normalize("route 66"), "route 66");
    }

    #[test]
    fn test_length_bounds_apply_after_normalization() {
        let v = validator();
        assert_eq!(v.validate("a"), Err(GuessRejection::TooShort));
        assert_eq!(v.validate("  a!!  "), Err(GuessRejection::TooShort));
        assert_eq!(v.validate("Na-ture!!"), Ok("nature".to_string()));
        assert_eq!(v.validate(&"x".repeat(51)), Err(GuessRejection::TooLong));
        assert!(v.validate(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn test_cooldown_applies_between_guesses() {
        let v = validator();
        let mut record = GuessRecord::default();
        let start = Instant::now();
        record.commit("first".to_string(), start);

        let soon = start + Duration::from_millis(500);
        match v.check_rate_limit(&record, "second", soon) {
            Err(GuessRejection::Cooldown { retry_after_ms }) => {
                assert!(retry_after_ms > 0 && retry_after_ms <= 1500);
            }
            other => panic!("expected cooldown rejection, got {:?}", other),
        }

        let later = start + Duration::from_millis(2100);
        assert!(v.check_rate_limit(&record, "second", later).is_ok());
    }

    #[test]
    fn test_attempt_budget_exhausts() {
        let v = validator();
        let mut record = GuessRecord::default();
        let mut now = Instant::now();
        for i in 0..5 {
            assert!(v.check_rate_limit(&record, &format!("guess{}", i), now).is_ok());
            record.commit(format!("guess{}", i), now);
            now += Duration::from_secs(3);
        }
        assert_eq!(
            v.check_rate_limit(&record, "one more", now),
            Err(GuessRejection::MaxAttemptsReached)
        );
    }

    #[test]
    fn test_immediate_repeat_rejected() {
        let v = validator();
        let mut record = GuessRecord::default();
        let start = Instant::now();
        record.commit("nature".to_string(), start);

        let later = start + Duration::from_secs(3);
        assert_eq!(
            v.check_rate_limit(&record, "nature", later),
            Err(GuessRejection::DuplicateGuess)
        );
        // A different guess in between clears the repeat check
        assert!(v.check_rate_limit(&record, "forest", later).is_ok());
    }

    #[test]
    fn test_reset_clears_round_spend() {
        let mut record = GuessRecord::default();
        record.commit("nature".to_string(), Instant::now());
        record.reset();
        assert_eq!(record.guess_count, 0);
        assert!(record.last_guess.is_none());
        assert!(record.last_guess_at.is_none());
    }
}
