//! Shared deposit bookkeeping.
//!
//! Both epoch ledgers track deposits per `(epoch, choice, token)` with a
//! per-depositor breakdown and an aggregate total, plus an `unclaimed`
//! balance per `(epoch, token)` covering everything not yet paid out.
//! Invariant: for every key, the per-depositor amounts sum to the total,
//! and `unclaimed` equals deposits minus payouts (claims net of fees stay
//! counted until swept).

use {
    crate::error::{IncentiveError, Result},
    solana_pubkey::Pubkey,
    std::{collections::HashMap, hash::Hash},
    tally_governance::epoch::Epoch,
};

/// Deposit book keyed by a ledger-specific choice type: the candidate
/// address for inclusion incentives, the asset index for weight incentives.
#[derive(Debug, Clone)]
pub struct DepositBook<K> {
    /// (epoch, choice, token) → depositor → amount.
    deposits: HashMap<(Epoch, K, Pubkey), HashMap<Pubkey, u128>>,
    /// (epoch, choice, token) → aggregate total.
    totals: HashMap<(Epoch, K, Pubkey), u128>,
    /// (epoch, token) → not-yet-paid-out balance.
    unclaimed: HashMap<(Epoch, Pubkey), u128>,
}

impl<K> Default for DepositBook<K> {
    fn default() -> Self {
        Self {
            deposits: HashMap::new(),
            totals: HashMap::new(),
            unclaimed: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> DepositBook<K> {
    /// Record a deposit.  Rejects zero amounts; overflow-checked so a
    /// poisoned total can never diverge from its per-depositor parts.
    pub fn deposit(
        &mut self,
        epoch: Epoch,
        choice: K,
        token: Pubkey,
        depositor: Pubkey,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 {
            return Err(IncentiveError::ZeroAmount);
        }
        let total = self.totals.entry((epoch, choice, token)).or_default();
        let new_total = total
            .checked_add(amount)
            .ok_or(IncentiveError::ArithmeticOverflow)?;
        *total = new_total;
        *self
            .deposits
            .entry((epoch, choice, token))
            .or_default()
            .entry(depositor)
            .or_default() += amount;
        *self.unclaimed.entry((epoch, token)).or_default() += amount;
        Ok(())
    }

    /// Aggregate deposited on `(epoch, choice, token)`.
    pub fn total(&self, epoch: Epoch, choice: K, token: &Pubkey) -> u128 {
        self.totals
            .get(&(epoch, choice, *token))
            .copied()
            .unwrap_or(0)
    }

    /// What `depositor` put on `(epoch, choice, token)`.
    pub fn deposited_by(
        &self,
        epoch: Epoch,
        choice: K,
        token: &Pubkey,
        depositor: &Pubkey,
    ) -> u128 {
        self.deposits
            .get(&(epoch, choice, *token))
            .and_then(|by| by.get(depositor))
            .copied()
            .unwrap_or(0)
    }

    pub fn unclaimed(&self, epoch: Epoch, token: &Pubkey) -> u128 {
        self.unclaimed.get(&(epoch, *token)).copied().unwrap_or(0)
    }

    /// Deduct a payout from the unclaimed balance.
    pub fn pay_out(&mut self, epoch: Epoch, token: &Pubkey, amount: u128) -> Result<()> {
        let balance = self
            .unclaimed
            .get_mut(&(epoch, *token))
            .ok_or(IncentiveError::ArithmeticOverflow)?;
        *balance = balance
            .checked_sub(amount)
            .ok_or(IncentiveError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Zero the unclaimed balance, returning what was left (sweep).
    pub fn drain_unclaimed(&mut self, epoch: Epoch, token: &Pubkey) -> u128 {
        self.unclaimed.remove(&(epoch, *token)).unwrap_or(0)
    }
}
