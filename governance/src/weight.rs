//! Pool weight voting.
//!
//! Each epoch, holders vote on how the pool's target weights should shift.
//! Choices are the pool's assets in index order, offset by one: choice 0 is
//! blank (keep weights as they are), choice `i` is asset `i-1`.  The choice
//! count snapshots `pool.num_assets() + 1` at the epoch's first ballot so a
//! mid-epoch asset addition cannot skew an open vote.
//!
//! There is no finalization step of its own — the redistribution governor
//! consumes the totals once the epoch has closed.

use {
    crate::{
        ballot::allocate_bps,
        epoch::{Epoch, EpochSchedule},
        error::{GovernanceError, Result},
        measure::Measure,
    },
    log::debug,
    solana_pubkey::Pubkey,
    std::collections::HashMap,
};

/// Read-side view of the governed pool.  Collaborator interface.
pub trait Pool {
    fn num_assets(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UserVote {
    allocations: Vec<u128>,
    weight: u128,
}

#[derive(Debug, Clone, Default)]
struct EpochState {
    /// Snapshot of `pool.num_assets()` at the first ballot; zero until then.
    num_assets: usize,
    votes: Vec<u128>,
    total_votes: u128,
    user_votes: HashMap<Pubkey, UserVote>,
}

/// The weight-vote engine.
#[derive(Debug, Clone)]
pub struct WeightVote<M, P> {
    schedule: EpochSchedule,
    measure: M,
    pool: P,
    management: Pubkey,
    pending_management: Option<Pubkey>,
    epochs: HashMap<Epoch, EpochState>,
}

impl<M: Measure, P: Pool> WeightVote<M, P> {
    pub fn new(schedule: EpochSchedule, measure: M, pool: P, management: Pubkey) -> Self {
        Self {
            schedule,
            measure,
            pool,
            management,
            pending_management: None,
            epochs: HashMap::new(),
        }
    }

    pub fn schedule(&self) -> &EpochSchedule {
        &self.schedule
    }

    /// Cast a ballot for the epoch containing `now`.  Same allocation rules
    /// as inclusion voting: bps per choice summing to exactly 10_000, one
    /// ballot per account per epoch, weight read once and frozen.
    pub fn vote(&mut self, account: &Pubkey, bps: &[u128], now: u64) -> Result<()> {
        if !self.schedule.vote_open(now) {
            return Err(GovernanceError::VoteClosed);
        }
        let epoch = self.schedule.epoch_at(now)?;
        let weight = self.measure.vote_weight(account, now)?;
        if weight == 0 {
            return Err(GovernanceError::NoVotingPower);
        }

        // The first ballot of the epoch pins the choice count; later ballots
        // see the snapshot, not the live pool.
        let num_assets = match self.epochs.get(&epoch) {
            Some(state) if state.num_assets > 0 => state.num_assets,
            _ => self.pool.num_assets(),
        };
        if bps.is_empty() || bps.len() > num_assets + 1 {
            return Err(GovernanceError::UnknownChoice);
        }
        if self
            .epochs
            .get(&epoch)
            .is_some_and(|state| state.user_votes.contains_key(account))
        {
            return Err(GovernanceError::AlreadyVoted);
        }
        let allocations = allocate_bps(weight, bps)?;

        let state = self.epochs.entry(epoch).or_default();
        if state.num_assets == 0 {
            state.num_assets = num_assets;
            state.votes = vec![0; num_assets + 1];
        }
        for (total, allocation) in state.votes.iter_mut().zip(allocations.iter()) {
            *total += allocation;
        }
        state.total_votes += weight;
        state
            .user_votes
            .insert(*account, UserVote { allocations, weight });
        debug!("weight vote: epoch {epoch}, account {account}, weight {weight}");
        Ok(())
    }

    /// Asset count snapshotted for `epoch`; zero before the first ballot.
    pub fn num_assets(&self, epoch: Epoch) -> usize {
        self.epochs.get(&epoch).map_or(0, |state| state.num_assets)
    }

    /// Total votes for `choice` (0 = blank, `i` = asset `i-1`).
    pub fn votes(&self, epoch: Epoch, choice: usize) -> u128 {
        self.epochs
            .get(&epoch)
            .and_then(|state| state.votes.get(choice))
            .copied()
            .unwrap_or(0)
    }

    /// All per-choice totals for `epoch`.
    pub fn results(&self, epoch: Epoch) -> Vec<u128> {
        self.epochs
            .get(&epoch)
            .map(|state| state.votes.clone())
            .unwrap_or_default()
    }

    pub fn total_votes(&self, epoch: Epoch) -> u128 {
        self.epochs.get(&epoch).map_or(0, |state| state.total_votes)
    }

    pub fn has_voted(&self, account: &Pubkey, epoch: Epoch) -> bool {
        self.epochs
            .get(&epoch)
            .is_some_and(|state| state.user_votes.contains_key(account))
    }

    /// Full weight `account` voted with in `epoch`.
    pub fn votes_user(&self, account: &Pubkey, epoch: Epoch) -> u128 {
        self.epochs
            .get(&epoch)
            .and_then(|state| state.user_votes.get(account))
            .map_or(0, |vote| vote.weight)
    }

    /// Weight `account` allocated to `choice` in `epoch`.
    pub fn votes_user_choice(&self, account: &Pubkey, epoch: Epoch, choice: usize) -> u128 {
        self.epochs
            .get(&epoch)
            .and_then(|state| state.user_votes.get(account))
            .and_then(|vote| vote.allocations.get(choice))
            .copied()
            .unwrap_or(0)
    }

    pub fn management(&self) -> Pubkey {
        self.management
    }

    pub fn set_management(&mut self, caller: &Pubkey, new_management: Pubkey) -> Result<()> {
        if *caller != self.management {
            return Err(GovernanceError::Unauthorized);
        }
        self.pending_management = Some(new_management);
        Ok(())
    }

    pub fn accept_management(&mut self, caller: &Pubkey) -> Result<()> {
        if self.pending_management != Some(*caller) {
            return Err(GovernanceError::Unauthorized);
        }
        self.management = *caller;
        self.pending_management = None;
        Ok(())
    }
}
