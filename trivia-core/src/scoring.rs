/// Every solved round is worth at least this much, no matter how late or how
/// many attempts it took.
pub const MIN_ROUND_SCORE: u32 = 10;

/// Points per second remaining on the round clock.
pub const POINTS_PER_SECOND: u32 = 5;

/// Penalty per failed attempt before the correct one.
pub const ATTEMPT_PENALTY: u32 = 10;

/// Calculate the points awarded for solving a round.
///
/// Faster answers score higher, and each incorrect attempt before the correct
/// one shaves points off, but a solve never pays less than [`MIN_ROUND_SCORE`].
pub fn round_score(time_left: u32, attempts: u32) -> u32 {
    let base = (time_left * POINTS_PER_SECOND).max(MIN_ROUND_SCORE);
    let penalty = attempts.saturating_sub(1) * ATTEMPT_PENALTY;
    base.saturating_sub(penalty).max(MIN_ROUND_SCORE)
}
