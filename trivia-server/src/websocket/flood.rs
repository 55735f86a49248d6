use std::time::{Duration, Instant};

/// Per-socket token bucket guarding against message floods. This sits in
/// front of the game-level guess cooldown, which has its own rules.
#[derive(Debug, Clone)]
pub struct FloodGuard {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration,
    last_refill: Instant,
}

impl FloodGuard {
    pub fn new() -> Self {
        // 30 messages burst, one token back every 2 seconds
        Self::with_limits(30, Duration::from_secs(2))
    }

    pub fn with_limits(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    /// Spend one token if available.
    pub fn allow(&mut self) -> bool {
        self.refill_tokens();
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self) {
        let now = Instant::now();
        let time_passed = now.duration_since(self.last_refill);
        if time_passed >= self.refill_rate {
            let tokens_to_add =
                (time_passed.as_millis() / self.refill_rate.as_millis().max(1)) as u32;
            self.tokens = (self.tokens + tokens_to_add).min(self.max_tokens);
            self.last_refill = now;
        }
    }

    pub fn remaining(&mut self) -> u32 {
        self.refill_tokens();
        self.tokens
    }
}

impl Default for FloodGuard {
    fn default() -> Self {
        Self::new()
    }
}
