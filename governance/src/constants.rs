//! Constants shared across the governance engine.

/// Fixed-point scale.  All weight ratios are integers scaled by `UNIT`.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Basis points denominator (10_000 bps = 100%).
pub const BPS_DENOMINATOR: u128 = 10_000;

// ---------------------------------------------------------------------------
// Epoch cadence (seconds)
// ---------------------------------------------------------------------------

/// One day.
pub const DAY_LENGTH: u64 = 24 * 60 * 60;

/// One week.
pub const WEEK_LENGTH: u64 = 7 * DAY_LENGTH;

/// Epoch length: four weeks.
pub const EPOCH_LENGTH: u64 = 4 * WEEK_LENGTH;

/// Voting opens three weeks into the epoch, leaving one week of voting.
pub const VOTE_START_OFFSET: u64 = 3 * WEEK_LENGTH;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default fraction of pool target weight put up for redistribution each
/// epoch: 10%.
pub const DEFAULT_REDISTRIBUTE_WEIGHT: u128 = UNIT / 10;

/// Default pass threshold for generic proposals: simple majority.
pub const DEFAULT_MAJORITY_BPS: u128 = 5_000;

/// Upper bound on choices in a single multi-choice ballot, blank included.
/// Matches the on-chain ballot array bound.
pub const MAX_CHOICES: usize = 33;
