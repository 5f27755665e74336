//! Pro-rata incentives for weight votes.
//!
//! Deposits ride on a pool asset (choice indices are 1-based, matching the
//! weight-vote ballot where 0 is blank).  There is no winner: once the
//! epoch closes, everyone who put weight on the asset splits its pot
//! pro-rata.  A choice nobody voted for cannot distribute — those deposits
//! become refundable instead.  Fee and sweep mechanics match the inclusion
//! ledger.

use {
    crate::{
        error::{IncentiveError, Result},
        ledger::DepositBook,
        sink::TokenSink,
    },
    log::{debug, info},
    solana_pubkey::Pubkey,
    std::collections::{HashMap, HashSet},
    tally_governance::{
        constants::{BPS_DENOMINATOR, EPOCH_LENGTH},
        epoch::{Epoch, EpochSchedule},
        math::mul_div,
        measure::Measure,
        weight::{Pool, WeightVote},
    },
};

/// The weight-incentive ledger.
#[derive(Debug, Clone)]
pub struct WeightIncentives {
    schedule: EpochSchedule,
    management: Pubkey,
    pending_management: Option<Pubkey>,
    /// Number of pool assets deposits may target.
    num_assets: usize,
    fee_rate: u128,
    deposit_deadline: u64,
    book: DepositBook<usize>,
    /// (epoch, choice, token, account) → net amount paid.
    claimed: HashMap<(Epoch, usize, Pubkey, Pubkey), u128>,
    refunded: HashSet<(Epoch, usize, Pubkey, Pubkey)>,
}

impl WeightIncentives {
    pub fn new(schedule: EpochSchedule, management: Pubkey, num_assets: usize) -> Self {
        Self {
            schedule,
            management,
            pending_management: None,
            num_assets,
            fee_rate: 0,
            deposit_deadline: EPOCH_LENGTH,
            book: DepositBook::default(),
            claimed: HashMap::new(),
            refunded: HashSet::new(),
        }
    }

    /// Track a pool asset addition so deposits can target it.
    pub fn set_num_assets(&mut self, caller: &Pubkey, num_assets: usize) -> Result<()> {
        self.require_management(caller)?;
        self.num_assets = num_assets;
        Ok(())
    }

    /// Deposit on asset `choice` (1-based) for the epoch containing `now`.
    pub fn deposit(
        &mut self,
        depositor: &Pubkey,
        choice: usize,
        token: &Pubkey,
        amount: u128,
        now: u64,
    ) -> Result<()> {
        if choice == 0 || choice > self.num_assets {
            return Err(IncentiveError::InvalidChoice);
        }
        let epoch = self
            .schedule
            .epoch_at(now)
            .map_err(|_| IncentiveError::BeforeGenesis)?;
        if now - self.schedule.epoch_start(epoch) >= self.deposit_deadline {
            return Err(IncentiveError::DepositClosed);
        }
        self.book.deposit(epoch, choice, *token, *depositor, amount)?;
        debug!("weight incentive deposit: epoch {epoch}, choice {choice}, {amount}");
        Ok(())
    }

    pub fn incentives(&self, epoch: Epoch, choice: usize, token: &Pubkey) -> u128 {
        self.book.total(epoch, choice, token)
    }

    pub fn incentives_depositor(
        &self,
        epoch: Epoch,
        choice: usize,
        token: &Pubkey,
        depositor: &Pubkey,
    ) -> u128 {
        self.book.deposited_by(epoch, choice, token, depositor)
    }

    pub fn unclaimed(&self, epoch: Epoch, token: &Pubkey) -> u128 {
        self.book.unclaimed(epoch, token)
    }

    /// Net amount `account` can claim from `(epoch, choice, token)` once
    /// the epoch is over: `deposits * weight_on_choice / total_on_choice`
    /// minus the fee cut.
    pub fn claimable<M: Measure, P: Pool>(
        &self,
        epoch: Epoch,
        choice: usize,
        token: &Pubkey,
        account: &Pubkey,
        voting: &WeightVote<M, P>,
        now: u64,
    ) -> u128 {
        if !self.schedule.closed(epoch, now) {
            return 0;
        }
        if self.claimed.contains_key(&(epoch, choice, *token, *account)) {
            return 0;
        }
        let total_deposit = self.book.total(epoch, choice, token);
        let choice_votes = voting.votes(epoch, choice);
        if total_deposit == 0 || choice_votes == 0 {
            return 0;
        }
        let user_votes = voting.votes_user_choice(account, epoch, choice);
        let Some(gross) = mul_div(total_deposit, user_votes, choice_votes) else {
            return 0;
        };
        let fee = mul_div(gross, self.fee_rate, BPS_DENOMINATOR).unwrap_or(0);
        gross - fee
    }

    /// Pay out `account`'s claim.  Idempotent, like the inclusion ledger.
    pub fn claim<M: Measure, P: Pool, S: TokenSink>(
        &mut self,
        epoch: Epoch,
        choice: usize,
        token: &Pubkey,
        account: &Pubkey,
        voting: &WeightVote<M, P>,
        sink: &mut S,
        now: u64,
    ) -> Result<u128> {
        let amount = self.claimable(epoch, choice, token, account, voting, now);
        if amount == 0 {
            return Ok(0);
        }
        sink.transfer(token, account, amount)?;
        self.book.pay_out(epoch, token, amount)?;
        self.claimed.insert((epoch, choice, *token, *account), amount);
        info!("weight incentive claim: epoch {epoch}, choice {choice}, {amount} to {account}");
        Ok(amount)
    }

    /// Deposits on a choice nobody voted for are refundable after the
    /// epoch closes.
    pub fn refundable<M: Measure, P: Pool>(
        &self,
        epoch: Epoch,
        choice: usize,
        token: &Pubkey,
        depositor: &Pubkey,
        voting: &WeightVote<M, P>,
        now: u64,
    ) -> u128 {
        if !self.schedule.closed(epoch, now) {
            return 0;
        }
        if voting.votes(epoch, choice) > 0 {
            return 0;
        }
        if self.refunded.contains(&(epoch, choice, *token, *depositor)) {
            return 0;
        }
        self.book.deposited_by(epoch, choice, token, depositor)
    }

    pub fn refund<M: Measure, P: Pool, S: TokenSink>(
        &mut self,
        epoch: Epoch,
        choice: usize,
        token: &Pubkey,
        depositor: &Pubkey,
        voting: &WeightVote<M, P>,
        sink: &mut S,
        now: u64,
    ) -> Result<u128> {
        let amount = self.refundable(epoch, choice, token, depositor, voting, now);
        if amount == 0 {
            return Err(IncentiveError::NotRefundable);
        }
        sink.transfer(token, depositor, amount)?;
        self.book.pay_out(epoch, token, amount)?;
        self.refunded.insert((epoch, choice, *token, *depositor));
        info!("weight incentive refund: epoch {epoch}, choice {choice}, {amount}");
        Ok(amount)
    }

    pub fn sweepable(&self, epoch: Epoch, token: &Pubkey, now: u64) -> u128 {
        if now < self.schedule.epoch_end(epoch) + EPOCH_LENGTH {
            return 0;
        }
        self.book.unclaimed(epoch, token)
    }

    /// Sweep the leftover balance to `recipient`.  Management only.
    pub fn sweep<S: TokenSink>(
        &mut self,
        caller: &Pubkey,
        epoch: Epoch,
        token: &Pubkey,
        recipient: &Pubkey,
        sink: &mut S,
        now: u64,
    ) -> Result<u128> {
        if *caller != self.management {
            return Err(IncentiveError::Unauthorized);
        }
        let amount = self.sweepable(epoch, token, now);
        if amount == 0 {
            return Err(IncentiveError::NotYetSweepable);
        }
        sink.transfer(token, recipient, amount)?;
        self.book.drain_unclaimed(epoch, token);
        info!("weight incentive sweep: epoch {epoch}, {amount} to {recipient}");
        Ok(amount)
    }

    pub fn management(&self) -> Pubkey {
        self.management
    }

    fn require_management(&self, caller: &Pubkey) -> Result<()> {
        if *caller != self.management {
            return Err(IncentiveError::Unauthorized);
        }
        Ok(())
    }

    pub fn set_fee_rate(&mut self, caller: &Pubkey, fee_rate: u128) -> Result<()> {
        self.require_management(caller)?;
        if fee_rate > BPS_DENOMINATOR {
            return Err(IncentiveError::InvalidDistribution);
        }
        self.fee_rate = fee_rate;
        Ok(())
    }

    pub fn set_deposit_deadline(&mut self, caller: &Pubkey, deadline: u64) -> Result<()> {
        self.require_management(caller)?;
        if deadline > EPOCH_LENGTH {
            return Err(IncentiveError::InvalidDistribution);
        }
        self.deposit_deadline = deadline;
        Ok(())
    }

    pub fn set_management(&mut self, caller: &Pubkey, new_management: Pubkey) -> Result<()> {
        self.require_management(caller)?;
        self.pending_management = Some(new_management);
        Ok(())
    }

    pub fn accept_management(&mut self, caller: &Pubkey) -> Result<()> {
        if self.pending_management != Some(*caller) {
            return Err(IncentiveError::Unauthorized);
        }
        self.management = *caller;
        self.pending_management = None;
        Ok(())
    }
}
