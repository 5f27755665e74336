//! Shared test harness.
//!
//! Mock collaborators for the governance and incentive engines: a fixed
//! weight table, a week-granular staking balance book, and timeline helpers
//! anchored at a common genesis.  Wall-clock control is just arithmetic —
//! every engine entry point takes an explicit `now`.

use {
    solana_pubkey::Pubkey,
    std::{cell::RefCell, collections::HashMap, rc::Rc},
    tally_governance::{
        constants::{EPOCH_LENGTH, VOTE_START_OFFSET, WEEK_LENGTH},
        epoch::{Epoch, EpochSchedule},
        error::Result as GovResult,
        measure::{snapshot_time, Measure, StakeSource},
        weight::Pool,
    },
};

pub use tally_governance::constants::UNIT;

/// Common genesis for every scenario, aligned to a week boundary so the
/// snapshot arithmetic is easy to reason about.
pub const GENESIS: u64 = 1_700_000_000 / WEEK_LENGTH * WEEK_LENGTH;

/// Initialize test logging; respects `RUST_LOG`, safe to call repeatedly.
pub fn setup_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn schedule() -> EpochSchedule {
    EpochSchedule::new(GENESIS)
}

/// Start of `epoch` on the shared timeline.
pub fn epoch_start(epoch: Epoch) -> u64 {
    schedule().epoch_start(epoch)
}

/// A timestamp inside `epoch`'s voting week.
pub fn vote_time(epoch: Epoch) -> u64 {
    schedule().epoch_start(epoch) + VOTE_START_OFFSET
}

/// A timestamp just after `epoch` has closed.
pub fn after_epoch(epoch: Epoch) -> u64 {
    schedule().epoch_end(epoch)
}

/// A timestamp one further epoch later (sweep eligibility).
pub fn sweep_time(epoch: Epoch) -> u64 {
    schedule().epoch_end(epoch) + EPOCH_LENGTH
}

// ---------------------------------------------------------------------------
// Measures and stake sources
// ---------------------------------------------------------------------------

/// Fixed account → weight table.
///
/// Clones share the underlying table, so a scenario can hand one handle to
/// an engine and keep another to adjust weights mid-test.
#[derive(Debug, Clone, Default)]
pub struct FixedMeasure {
    weights: Rc<RefCell<HashMap<Pubkey, u128>>>,
}

impl FixedMeasure {
    pub fn set(&self, account: Pubkey, weight: u128) {
        self.weights.borrow_mut().insert(account, weight);
    }
}

impl Measure for FixedMeasure {
    fn vote_weight(&self, account: &Pubkey, _now: u64) -> GovResult<u128> {
        Ok(*self.weights.borrow().get(account).unwrap_or(&0))
    }
}

/// Week-granular staked balance book standing in for the staking vault.
#[derive(Debug, Clone, Default)]
pub struct WeekStake {
    balances: HashMap<(Pubkey, u64), u128>,
}

impl WeekStake {
    /// Record `balance` for `account` from `from`'s week onward.
    pub fn set_from(&mut self, account: Pubkey, from: u64, balance: u128) {
        for week in 0..32 {
            let at = snapshot_time(from) + week * WEEK_LENGTH;
            self.balances.insert((account, at), balance);
        }
    }
}

impl StakeSource for WeekStake {
    fn balance_of(&self, account: &Pubkey, at: u64) -> u128 {
        *self.balances.get(&(*account, at)).unwrap_or(&0)
    }

    fn total_supply(&self, at: u64) -> u128 {
        self.balances
            .iter()
            .filter(|((_, t), _)| *t == at)
            .map(|(_, balance)| *balance)
            .sum()
    }
}

/// Fixed-size pool.
#[derive(Debug, Clone)]
pub struct FixedPool(pub usize);

impl Pool for FixedPool {
    fn num_assets(&self) -> usize {
        self.0
    }
}
