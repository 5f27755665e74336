//! Voting weight measures.
//!
//! A [`Measure`] turns an account into its voting power at a point in time.
//! Weights derive from staked balances read through the [`StakeSource`]
//! collaborator interface, always at the **end of the previous week** — a
//! deposit made inside the current voting window can never move voting
//! power for that window.
//!
//! [`DelegateMeasure`] adds an optional delegation redirect: an account may
//! point its entire weight at exactly one recipient, and a recipient may
//! have at most one inbound delegator.  A global multiplier in basis points
//! controls how much of the delegator's weight counts for the delegate
//! (the remainder stays self-counted).  [`DecayMeasure`] wraps any measure
//! with a linear ramp-down to zero over the final 24 hours of each epoch.

use {
    crate::{
        constants::{BPS_DENOMINATOR, DAY_LENGTH, WEEK_LENGTH},
        epoch::EpochSchedule,
        error::{GovernanceError, Result},
        math::mul_div,
    },
    solana_pubkey::Pubkey,
    std::collections::HashMap,
};

/// Snapshot-capable staked balance reads.  Collaborator interface; the
/// engine never mutates it and assumes reads are cached at call time.
pub trait StakeSource {
    /// Staked balance of `account` at timestamp `at`.
    fn balance_of(&self, account: &Pubkey, at: u64) -> u128;

    /// Total staked supply at timestamp `at`.
    fn total_supply(&self, at: u64) -> u128;
}

/// An account's voting power at a point in time.
pub trait Measure {
    fn vote_weight(&self, account: &Pubkey, now: u64) -> Result<u128>;
}

/// Snapshot timestamp used for all balance reads at `now`: the most recent
/// week boundary.  Deposits after it are invisible until the next week.
pub fn snapshot_time(now: u64) -> u64 {
    now / WEEK_LENGTH * WEEK_LENGTH
}

// ---------------------------------------------------------------------------
// DelegateMeasure
// ---------------------------------------------------------------------------

/// Stake-derived weight with an optional 1:1 delegation redirect.
#[derive(Debug, Clone)]
pub struct DelegateMeasure<S> {
    source: S,
    management: Pubkey,
    /// Outbound edge: delegator → recipient.
    delegate_of: HashMap<Pubkey, Pubkey>,
    /// Inbound edge: recipient → delegator.  Mirror of `delegate_of`.
    delegator_of: HashMap<Pubkey, Pubkey>,
    /// Fraction of a delegator's weight counted for the delegate, in bps.
    multiplier_bps: u128,
}

impl<S: StakeSource> DelegateMeasure<S> {
    pub fn new(source: S, management: Pubkey) -> Self {
        Self {
            source,
            management,
            delegate_of: HashMap::new(),
            delegator_of: HashMap::new(),
            multiplier_bps: 0,
        }
    }

    /// Recipient `account` currently delegates to, if any.
    pub fn delegate_of(&self, account: &Pubkey) -> Option<Pubkey> {
        self.delegate_of.get(account).copied()
    }

    /// Delegator currently pointing at `recipient`, if any.
    pub fn delegator_of(&self, recipient: &Pubkey) -> Option<Pubkey> {
        self.delegator_of.get(recipient).copied()
    }

    pub fn multiplier_bps(&self) -> u128 {
        self.multiplier_bps
    }

    /// Point `source_account`'s weight at `recipient`, or clear the edge
    /// with `None`.  Management only.
    ///
    /// Re-delegating overwrites the previous edge and clears its reverse
    /// mapping.  A recipient can have at most one inbound delegator, and
    /// cannot itself be delegating onward — delegation edges never chain.
    pub fn delegate(
        &mut self,
        caller: &Pubkey,
        source_account: &Pubkey,
        recipient: Option<Pubkey>,
    ) -> Result<()> {
        if *caller != self.management {
            return Err(GovernanceError::Unauthorized);
        }
        if let Some(to) = recipient {
            if let Some(existing) = self.delegator_of.get(&to) {
                if existing != source_account {
                    return Err(GovernanceError::DelegationConflict);
                }
            }
            if self.delegate_of.contains_key(&to) {
                return Err(GovernanceError::DelegationConflict);
            }
        }
        // Clear the old reverse edge before writing the new one.
        if let Some(previous) = self.delegate_of.remove(source_account) {
            self.delegator_of.remove(&previous);
        }
        if let Some(to) = recipient {
            self.delegate_of.insert(*source_account, to);
            self.delegator_of.insert(to, *source_account);
        }
        Ok(())
    }

    /// Set the global delegate multiplier.  Management only; takes effect on
    /// the next read — weights already frozen into submitted votes never
    /// change.
    pub fn set_delegate_multiplier(&mut self, caller: &Pubkey, bps: u128) -> Result<()> {
        if *caller != self.management {
            return Err(GovernanceError::Unauthorized);
        }
        if bps > BPS_DENOMINATOR {
            return Err(GovernanceError::InvalidMultiplier);
        }
        self.multiplier_bps = bps;
        Ok(())
    }
}

impl<S: StakeSource> Measure for DelegateMeasure<S> {
    fn vote_weight(&self, account: &Pubkey, now: u64) -> Result<u128> {
        let at = snapshot_time(now);
        let own = self.source.balance_of(account, at);

        // Delegating away reduces the self-counted share.
        let mut weight = if self.delegate_of.contains_key(account) {
            let redirected = mul_div(own, self.multiplier_bps, BPS_DENOMINATOR)
                .ok_or(GovernanceError::ArithmeticOverflow)?;
            own - redirected
        } else {
            own
        };

        // An inbound delegator adds its redirected share.
        if let Some(delegator) = self.delegator_of.get(account) {
            let delegated = self.source.balance_of(delegator, at);
            weight += mul_div(delegated, self.multiplier_bps, BPS_DENOMINATOR)
                .ok_or(GovernanceError::ArithmeticOverflow)?;
        }
        Ok(weight)
    }
}

// ---------------------------------------------------------------------------
// DecayMeasure
// ---------------------------------------------------------------------------

/// Linear voting-power decay over the final day of each epoch.
///
/// Full weight until `epoch_end - DAY_LENGTH`, then
/// `weight * (epoch_end - now) / DAY_LENGTH`, reaching zero at the epoch
/// boundary.
#[derive(Debug, Clone)]
pub struct DecayMeasure<M> {
    schedule: EpochSchedule,
    inner: M,
}

impl<M: Measure> DecayMeasure<M> {
    pub fn new(schedule: EpochSchedule, inner: M) -> Self {
        Self { schedule, inner }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

impl<M: Measure> Measure for DecayMeasure<M> {
    fn vote_weight(&self, account: &Pubkey, now: u64) -> Result<u128> {
        let weight = self.inner.vote_weight(account, now)?;
        let epoch = self.schedule.epoch_at(now)?;
        let remaining = self.schedule.epoch_end(epoch) - now;
        if remaining >= DAY_LENGTH {
            return Ok(weight);
        }
        mul_div(weight, remaining as u128, DAY_LENGTH as u128)
            .ok_or(GovernanceError::ArithmeticOverflow)
    }
}
