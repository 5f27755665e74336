//! Multi-choice ballot normalization and aggregation.
//!
//! Ballots arrive in two forms.  Off-chain point sheets carry arbitrary
//! non-negative floating "points" per choice which are normalized into
//! integer weight allocations.  On-line votes carry basis points per choice
//! summing to exactly 10_000, applied to the voter's frozen weight.  In both
//! cases per-choice division floors and the dust is **not** redistributed —
//! a documented under-allocation of at most `num_choices - 1` weight units.

use crate::{
    constants::BPS_DENOMINATOR,
    error::{GovernanceError, Result},
    math::mul_div,
};

/// Normalize a raw point sheet into integer vote-weight allocations.
///
/// Per choice: `floor(total_weight * points[i] / sum(points))`.  The floor
/// remainder stays unallocated.  Rejects empty, negative, non-finite, and
/// all-zero point sets.
pub fn normalize_points(points: &[f64], total_weight: u128) -> Result<Vec<u128>> {
    if points.is_empty() {
        return Err(GovernanceError::InvalidAllocation);
    }
    let mut sum = 0f64;
    for &p in points {
        if !p.is_finite() || p < 0.0 {
            return Err(GovernanceError::InvalidAllocation);
        }
        sum += p;
    }
    if sum <= 0.0 {
        return Err(GovernanceError::InvalidAllocation);
    }
    Ok(points
        .iter()
        .map(|&p| (total_weight as f64 * p / sum) as u128)
        .collect())
}

/// Element-wise sum of per-choice allocations across accounts.  Ballots
/// shorter than `num_choices` contribute zeros for their missing tail.
pub fn aggregate<'a>(
    ballots: impl IntoIterator<Item = &'a [u128]>,
    num_choices: usize,
) -> Vec<u128> {
    let mut totals = vec![0u128; num_choices];
    for ballot in ballots {
        for (total, weight) in totals.iter_mut().zip(ballot.iter()) {
            *total += weight;
        }
    }
    totals
}

/// Apply a basis-point allocation to a voter's weight.
///
/// The bps entries must sum to exactly [`BPS_DENOMINATOR`] — not less, not
/// more.  Each recorded per-choice weight is `weight * bps[i] / 10_000`,
/// floored; the voter's recorded total is the full `weight`.
pub fn allocate_bps(weight: u128, bps: &[u128]) -> Result<Vec<u128>> {
    let sum: u128 = bps.iter().try_fold(0u128, |acc, &b| {
        acc.checked_add(b).ok_or(GovernanceError::ArithmeticOverflow)
    })?;
    if sum != BPS_DENOMINATOR {
        return Err(GovernanceError::InvalidAllocation);
    }
    bps.iter()
        .map(|&b| mul_div(weight, b, BPS_DENOMINATOR).ok_or(GovernanceError::ArithmeticOverflow))
        .collect()
}
