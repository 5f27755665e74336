//! Pool weight redistribution.
//!
//! Once an epoch's weight vote closes, the governor turns the vote totals
//! into a new target-weight table for the pool.  A configured fraction of
//! total weight is put up for redistribution, scaled down by the blank
//! share of the vote; what remains of each asset's previous weight is
//! topped up with its share of the non-blank vote:
//!
//! ```text
//! redistribute = redistribute_weight * (UNIT - blank * UNIT / total) / UNIT
//! w'[i] = prev[i] * (UNIT - redistribute) / UNIT
//!       + votes[i] * redistribute / (total - blank)
//! ```
//!
//! Results are clamped to a configurable `[min, max]` band per asset; any
//! clamping shortfall or excess is re-spread proportionally over the
//! unclamped assets, iterating until stable.  The final table is quantized
//! to basis points; the historical per-epoch manual rounding corrections
//! are an explicit input recorded with the result, never a silent formula
//! adjustment.

use {
    crate::{
        constants::{BPS_DENOMINATOR, DEFAULT_REDISTRIBUTE_WEIGHT, UNIT},
        epoch::{Epoch, EpochSchedule},
        error::{GovernanceError, Result},
        math::mul_div,
    },
    log::info,
    serde::Serialize,
    solana_pubkey::Pubkey,
};

/// Outcome of one redistribution execution, published alongside the new
/// weight table for auditability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redistribution {
    pub epoch: Epoch,
    /// The redistribution fraction actually applied, UNIT-scaled.
    pub redistribute: u128,
    /// New target weights, UNIT-scaled, pre-quantization.
    pub target_weights: Vec<u128>,
    /// Quantized table in basis points, corrections applied; sums to 10_000.
    pub weights_bps: Vec<u32>,
    /// Manual rounding corrections (bps deltas) supplied by the caller.
    pub corrections: Vec<i64>,
}

/// The redistribution governor.
#[derive(Debug, Clone)]
pub struct PoolGovernor {
    schedule: EpochSchedule,
    management: Pubkey,
    redistribute_weight: u128,
    min_weight: u128,
    max_weight: u128,
}

impl PoolGovernor {
    pub fn new(schedule: EpochSchedule, management: Pubkey) -> Self {
        Self {
            schedule,
            management,
            redistribute_weight: DEFAULT_REDISTRIBUTE_WEIGHT,
            min_weight: 0,
            max_weight: UNIT,
        }
    }

    pub fn redistribute_weight(&self) -> u128 {
        self.redistribute_weight
    }

    pub fn weight_clamp(&self) -> (u128, u128) {
        (self.min_weight, self.max_weight)
    }

    fn require_management(&self, caller: &Pubkey) -> Result<()> {
        if *caller != self.management {
            return Err(GovernanceError::Unauthorized);
        }
        Ok(())
    }

    pub fn set_redistribute_weight(&mut self, caller: &Pubkey, weight: u128) -> Result<()> {
        self.require_management(caller)?;
        if weight > UNIT {
            return Err(GovernanceError::InvalidAllocation);
        }
        self.redistribute_weight = weight;
        Ok(())
    }

    pub fn set_weight_clamp(&mut self, caller: &Pubkey, min: u128, max: u128) -> Result<()> {
        self.require_management(caller)?;
        if min > max || max > UNIT {
            return Err(GovernanceError::InfeasibleClamp);
        }
        self.min_weight = min;
        self.max_weight = max;
        Ok(())
    }

    /// Execute the redistribution for `epoch`.
    ///
    /// `prev_weights` are the pool's current target weights (UNIT-scaled,
    /// summing to UNIT); `results` are the epoch's weight-vote totals with
    /// blank at index 0, `results.len() == prev_weights.len() + 1` (a
    /// short result vector is treated as zero-filled).  `corrections` are
    /// per-asset bps deltas applied after quantization; the corrected table
    /// must sum to exactly 10_000.  Management only, and only once the
    /// epoch has closed.
    pub fn execute(
        &self,
        caller: &Pubkey,
        epoch: Epoch,
        prev_weights: &[u128],
        results: &[u128],
        corrections: &[i64],
        now: u64,
    ) -> Result<Redistribution> {
        self.require_management(caller)?;
        if !self.schedule.closed(epoch, now) {
            return Err(GovernanceError::EpochNotOver);
        }
        let num_assets = prev_weights.len();
        if corrections.len() > num_assets || results.len() > num_assets + 1 {
            return Err(GovernanceError::InvalidAllocation);
        }

        let blank = results.first().copied().unwrap_or(0);
        let total: u128 = results.iter().try_fold(0u128, |acc, &v| {
            acc.checked_add(v).ok_or(GovernanceError::ArithmeticOverflow)
        })?;

        let redistribute = if total == 0 {
            0
        } else {
            let blank_fraction = mul_div(blank, UNIT, total)
                .ok_or(GovernanceError::ArithmeticOverflow)?;
            mul_div(self.redistribute_weight, UNIT - blank_fraction, UNIT)
                .ok_or(GovernanceError::ArithmeticOverflow)?
        };
        let non_blank = total - blank;

        let mut weights = Vec::with_capacity(num_assets);
        for (i, &prev) in prev_weights.iter().enumerate() {
            let mut w = mul_div(prev, UNIT - redistribute, UNIT)
                .ok_or(GovernanceError::ArithmeticOverflow)?;
            if non_blank > 0 {
                let votes = results.get(i + 1).copied().unwrap_or(0);
                w += mul_div(votes, redistribute, non_blank)
                    .ok_or(GovernanceError::ArithmeticOverflow)?;
            }
            weights.push(w);
        }

        self.clamp(&mut weights)?;
        let weights_bps = quantize(&weights, corrections)?;

        info!(
            "redistribution: epoch {epoch}, redistribute {redistribute}, table {weights_bps:?}"
        );
        Ok(Redistribution {
            epoch,
            redistribute,
            target_weights: weights,
            weights_bps,
            corrections: corrections.to_vec(),
        })
    }

    /// Clamp every weight into `[min, max]`, re-spreading the shortfall or
    /// excess proportionally over the not-yet-clamped assets.  A clamped
    /// asset stays pinned in later rounds.
    fn clamp(&self, weights: &mut [u128]) -> Result<()> {
        let (min, max) = (self.min_weight, self.max_weight);
        if min == 0 && max == UNIT {
            return Ok(());
        }
        let n = weights.len() as u128;
        if n * min > UNIT || n * max < UNIT {
            return Err(GovernanceError::InfeasibleClamp);
        }

        let mut pinned = vec![false; weights.len()];
        loop {
            // One clamp pass: collect how much was cut and how much added.
            let mut surplus = 0u128;
            let mut deficit = 0u128;
            for (w, pin) in weights.iter_mut().zip(pinned.iter_mut()) {
                if *pin {
                    continue;
                }
                if *w > max {
                    surplus += *w - max;
                    *w = max;
                    *pin = true;
                } else if *w < min {
                    deficit += min - *w;
                    *w = min;
                    *pin = true;
                }
            }
            if surplus == deficit {
                // Covers the all-zero fixed point.
                return Ok(());
            }

            let free_total: u128 = weights
                .iter()
                .zip(pinned.iter())
                .filter(|(_, pin)| !**pin)
                .map(|(w, _)| *w)
                .sum();
            if free_total == 0 {
                return Err(GovernanceError::InfeasibleClamp);
            }
            for (w, pin) in weights.iter_mut().zip(pinned.iter()) {
                if *pin {
                    continue;
                }
                if surplus > deficit {
                    *w += mul_div(surplus - deficit, *w, free_total)
                        .ok_or(GovernanceError::ArithmeticOverflow)?;
                } else {
                    *w -= mul_div(deficit - surplus, *w, free_total)
                        .ok_or(GovernanceError::ArithmeticOverflow)?;
                }
            }
        }
    }
}

/// Quantize UNIT-scaled weights to basis points (round-half-up) and apply
/// the manual corrections.  The corrected table must sum to 10_000.
fn quantize(weights: &[u128], corrections: &[i64]) -> Result<Vec<u32>> {
    let mut bps = Vec::with_capacity(weights.len());
    for (i, &w) in weights.iter().enumerate() {
        let rounded = (w * BPS_DENOMINATOR + UNIT / 2) / UNIT;
        let correction = corrections.get(i).copied().unwrap_or(0);
        let corrected = i64::try_from(rounded)
            .ok()
            .and_then(|r| r.checked_add(correction))
            .ok_or(GovernanceError::ArithmeticOverflow)?;
        let corrected =
            u32::try_from(corrected).map_err(|_| GovernanceError::CorrectionMismatch)?;
        bps.push(corrected);
    }
    let sum: u64 = bps.iter().map(|&b| b as u64).sum();
    if sum != BPS_DENOMINATOR as u64 {
        return Err(GovernanceError::CorrectionMismatch);
    }
    Ok(bps)
}
