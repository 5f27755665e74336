//! Candidate inclusion voting.
//!
//! Each epoch, prospective assets apply for inclusion during the first
//! three weeks and token holders vote during the final week.  Choice 0 is
//! always "blank" (abstain/none-of-these); candidates occupy 1-indexed
//! slots in application order.  A candidate is only votable once it has a
//! registered rate provider — applying with one registered whitelists the
//! candidate immediately, and registering a provider for a candidate that
//! already applied this epoch whitelists it retroactively.
//!
//! Finalization is permissionless, idempotent, and strictly sequential:
//! epoch `N` is only finalized after `N-1`, and finalizing picks the
//! candidate with the strictly highest total.  The comparison bar starts at
//! the blank total, so a blank majority (or a tie with blank) produces no
//! winner; among tied candidates the lowest index wins since later
//! candidates must strictly exceed the running best.  A winner's rate
//! provider is disabled so it can never reapply.

use {
    crate::{
        ballot::allocate_bps,
        constants::MAX_CHOICES,
        epoch::{Epoch, EpochSchedule},
        error::{GovernanceError, Result},
        measure::Measure,
    },
    log::{debug, info},
    solana_pubkey::Pubkey,
    std::collections::{HashMap, HashSet},
};

/// Registration state of a candidate's rate provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Provider registered; candidate is votable.
    Registered(Pubkey),
    /// Candidate won a past epoch and is permanently barred from reapplying.
    Disabled,
}

/// A submitted ballot, frozen at vote time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UserVote {
    /// Per-choice weights (index 0 = blank).  Sums to at most `weight`.
    allocations: Vec<u128>,
    /// The voter's full weight at vote time.
    weight: u128,
}

/// Per-epoch voting state.
#[derive(Debug, Clone, Default)]
struct EpochState {
    /// Whitelisted candidates in application order; slot `i` is choice `i+1`.
    candidates: Vec<Pubkey>,
    /// Candidate → 1-based choice index.
    candidate_index: HashMap<Pubkey, usize>,
    /// Candidates that applied this epoch (whitelisted or not).
    applied: HashSet<Pubkey>,
    /// Per-choice totals; index 0 = blank.
    votes: Vec<u128>,
    /// Sum of all voters' full weights.
    total_votes: u128,
    user_votes: HashMap<Pubkey, UserVote>,
}

impl EpochState {
    fn ensure_choices(&mut self, len: usize) {
        if self.votes.len() < len {
            self.votes.resize(len, 0);
        }
    }
}

/// Outcome of a finalized epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochResult {
    /// Winning candidate, if any choice strictly beat blank and the field.
    pub winner: Option<Pubkey>,
    /// The winner's rate provider at finalization time.
    pub winner_rate_provider: Option<Pubkey>,
}

/// The inclusion-vote engine.
///
/// All mutations take `&mut self`; a deployment serializes writers per
/// engine (one exclusive lock per epoch-keyed store).
#[derive(Debug, Clone)]
pub struct InclusionVote<M> {
    schedule: EpochSchedule,
    measure: M,

    management: Pubkey,
    pending_management: Option<Pubkey>,
    operator: Pubkey,
    treasury: Pubkey,

    /// First epoch in which voting is enabled.
    enable_epoch: Epoch,

    /// Application fee configuration.  `fee_token == None` disables fees.
    fee_token: Option<Pubkey>,
    initial_fee: u128,
    subsequent_fee: u128,
    /// Collected fees awaiting a treasury sweep.
    fee_balance: u128,

    providers: HashMap<Pubkey, ProviderStatus>,
    /// Candidates that have applied in any past or present epoch; decides
    /// the initial-vs-subsequent fee tier.
    ever_applied: HashSet<Pubkey>,

    epochs: HashMap<Epoch, EpochState>,
    results: HashMap<Epoch, EpochResult>,
    /// Next epoch to finalize; everything below is final.
    next_to_finalize: Epoch,
}

impl<M: Measure> InclusionVote<M> {
    /// `now` anchors sequential finalization: epochs before the current one
    /// at construction are considered settled.
    pub fn new(
        schedule: EpochSchedule,
        measure: M,
        management: Pubkey,
        now: u64,
    ) -> Result<Self> {
        let current = schedule.epoch_at(now)?;
        Ok(Self {
            schedule,
            measure,
            management,
            pending_management: None,
            operator: management,
            treasury: management,
            enable_epoch: current,
            fee_token: None,
            initial_fee: 0,
            subsequent_fee: 0,
            fee_balance: 0,
            providers: HashMap::new(),
            ever_applied: HashSet::new(),
            epochs: HashMap::new(),
            results: HashMap::new(),
            next_to_finalize: current,
        })
    }

    pub fn schedule(&self) -> &EpochSchedule {
        &self.schedule
    }

    pub fn measure(&self) -> &M {
        &self.measure
    }

    // -----------------------------------------------------------------------
    // Applications
    // -----------------------------------------------------------------------

    pub fn rate_provider(&self, candidate: &Pubkey) -> Option<ProviderStatus> {
        self.providers.get(candidate).copied()
    }

    /// Whether `candidate` has applied in the epoch containing `now`.
    pub fn has_applied(&self, candidate: &Pubkey, now: u64) -> bool {
        let Ok(epoch) = self.schedule.epoch_at(now) else {
            return false;
        };
        self.epochs
            .get(&epoch)
            .is_some_and(|state| state.applied.contains(candidate))
    }

    /// Fee the next application for `candidate` must pay.
    pub fn application_fee(&self, candidate: &Pubkey) -> u128 {
        if self.fee_token.is_none() {
            return 0;
        }
        if self.ever_applied.contains(candidate) {
            self.subsequent_fee
        } else {
            self.initial_fee
        }
    }

    /// Register a candidate for the current epoch.
    ///
    /// Valid during the apply phase only, once per candidate per epoch.
    /// `fee_payment` must equal [`Self::application_fee`] exactly; fees
    /// accrue to the sweepable treasury balance.  If the candidate's rate
    /// provider is already registered the candidate is whitelisted
    /// immediately; otherwise it waits for `set_rate_provider`.
    pub fn apply(&mut self, candidate: &Pubkey, fee_payment: u128, now: u64) -> Result<()> {
        if !self.schedule.apply_open(now) {
            return Err(GovernanceError::ApplyClosed);
        }
        let epoch = self.schedule.epoch_at(now)?;
        if matches!(self.providers.get(candidate), Some(ProviderStatus::Disabled)) {
            return Err(GovernanceError::ProviderDisabled);
        }
        let required = self.application_fee(candidate);
        if fee_payment != required {
            return Err(GovernanceError::FeeNotPaid);
        }

        let has_provider =
            matches!(self.providers.get(candidate), Some(ProviderStatus::Registered(_)));
        let state = self.epochs.entry(epoch).or_default();
        if state.applied.contains(candidate) {
            return Err(GovernanceError::AlreadyApplied);
        }
        if has_provider && !Self::has_capacity(state) {
            return Err(GovernanceError::UnknownChoice);
        }
        state.applied.insert(*candidate);
        self.ever_applied.insert(*candidate);
        self.fee_balance += fee_payment;

        if has_provider {
            Self::whitelist(state, candidate);
        }
        debug!("inclusion apply: epoch {epoch}, candidate {candidate}, fee {fee_payment}");
        Ok(())
    }

    /// Register (or replace) a candidate's rate provider.  Operator or
    /// management only.  Whitelists the candidate if it already applied in
    /// the current epoch.
    pub fn set_rate_provider(
        &mut self,
        caller: &Pubkey,
        candidate: &Pubkey,
        provider: Pubkey,
        now: u64,
    ) -> Result<()> {
        if *caller != self.operator && *caller != self.management {
            return Err(GovernanceError::Unauthorized);
        }
        if matches!(self.providers.get(candidate), Some(ProviderStatus::Disabled)) {
            return Err(GovernanceError::ProviderDisabled);
        }
        // Whitelist-on-registration must be able to seat the candidate
        // before the provider write happens.
        if let Ok(epoch) = self.schedule.epoch_at(now) {
            if let Some(state) = self.epochs.get_mut(&epoch) {
                if state.applied.contains(candidate)
                    && !state.candidate_index.contains_key(candidate)
                {
                    if !Self::has_capacity(state) {
                        return Err(GovernanceError::UnknownChoice);
                    }
                    Self::whitelist(state, candidate);
                }
            }
        }
        self.providers
            .insert(*candidate, ProviderStatus::Registered(provider));
        Ok(())
    }

    fn has_capacity(state: &EpochState) -> bool {
        state.candidates.len() + 1 < MAX_CHOICES
    }

    fn whitelist(state: &mut EpochState, candidate: &Pubkey) {
        state.candidates.push(*candidate);
        let index = state.candidates.len();
        state.candidate_index.insert(*candidate, index);
        state.ensure_choices(index + 1);
    }

    pub fn num_candidates(&self, epoch: Epoch) -> usize {
        self.epochs
            .get(&epoch)
            .map_or(0, |state| state.candidates.len())
    }

    /// Candidate occupying 1-based choice `index` in `epoch`.
    pub fn candidate(&self, epoch: Epoch, index: usize) -> Option<Pubkey> {
        if index == 0 {
            return None;
        }
        self.epochs
            .get(&epoch)
            .and_then(|state| state.candidates.get(index - 1))
            .copied()
    }

    /// 1-based choice index of `candidate` in `epoch`, if whitelisted.
    pub fn candidate_index(&self, epoch: Epoch, candidate: &Pubkey) -> Option<usize> {
        self.epochs
            .get(&epoch)
            .and_then(|state| state.candidate_index.get(candidate))
            .copied()
    }

    // -----------------------------------------------------------------------
    // Voting
    // -----------------------------------------------------------------------

    /// Cast a ballot for the epoch containing `now`.
    ///
    /// `bps` allocates the voter's weight across choices — index 0 is blank
    /// and always valid, indices beyond the whitelisted candidate count are
    /// rejected — and must sum to exactly 10_000.  The voter's weight is
    /// read once, here, and frozen; one ballot per account per epoch.
    pub fn vote(&mut self, account: &Pubkey, bps: &[u128], now: u64) -> Result<()> {
        if !self.schedule.vote_open(now) {
            return Err(GovernanceError::VoteClosed);
        }
        let epoch = self.schedule.epoch_at(now)?;
        if epoch < self.enable_epoch {
            return Err(GovernanceError::VoteClosed);
        }
        let num_candidates = self.num_candidates(epoch);
        if bps.is_empty() || bps.len() > num_candidates + 1 {
            return Err(GovernanceError::UnknownChoice);
        }
        let weight = self.measure.vote_weight(account, now)?;
        if weight == 0 {
            return Err(GovernanceError::NoVotingPower);
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
        state.ensure_choices(allocations.len());
        for (total, allocation) in state.votes.iter_mut().zip(allocations.iter()) {
            *total += allocation;
        }
        state.total_votes += weight;
        state
            .user_votes
            .insert(*account, UserVote { allocations, weight });
        debug!("inclusion vote: epoch {epoch}, account {account}, weight {weight}");
        Ok(())
    }

    /// Total votes for `choice` (0 = blank) in `epoch`.
    pub fn votes(&self, epoch: Epoch, choice: usize) -> u128 {
        self.epochs
            .get(&epoch)
            .and_then(|state| state.votes.get(choice))
            .copied()
            .unwrap_or(0)
    }

    /// Full weight `account` voted with in `epoch`, zero if it did not vote.
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

    pub fn total_votes(&self, epoch: Epoch) -> u128 {
        self.epochs.get(&epoch).map_or(0, |state| state.total_votes)
    }

    pub fn has_voted(&self, account: &Pubkey, epoch: Epoch) -> bool {
        self.epochs
            .get(&epoch)
            .is_some_and(|state| state.user_votes.contains_key(account))
    }

    // -----------------------------------------------------------------------
    // Finalization
    // -----------------------------------------------------------------------

    /// Finalize every closed, unfinalized epoch in order.
    ///
    /// Permissionless and idempotent: calling before the current epoch has
    /// closed (or again afterwards) is a benign no-op.  Epochs finalize
    /// strictly sequentially.
    pub fn finalize_epochs(&mut self, now: u64) -> Result<()> {
        while self.schedule.closed(self.next_to_finalize, now) {
            let epoch = self.next_to_finalize;
            let result = self.decide(epoch);
            if let Some(winner) = result.winner {
                // Winners can never reapply.
                self.providers.insert(winner, ProviderStatus::Disabled);
            }
            self.results.insert(epoch, result);
            self.next_to_finalize = epoch + 1;
            info!(
                "inclusion finalize: epoch {epoch}, winner {:?}",
                result.winner
            );
        }
        Ok(())
    }

    /// Winner scan.  The bar starts at the blank total and each candidate
    /// must strictly exceed the running best, so ties resolve to the lowest
    /// index and blank ties produce no winner.
    fn decide(&self, epoch: Epoch) -> EpochResult {
        let Some(state) = self.epochs.get(&epoch) else {
            return EpochResult {
                winner: None,
                winner_rate_provider: None,
            };
        };
        let mut best = state.votes.first().copied().unwrap_or(0);
        let mut winner = None;
        for (slot, candidate) in state.candidates.iter().enumerate() {
            let total = state.votes.get(slot + 1).copied().unwrap_or(0);
            if total > best {
                best = total;
                winner = Some(*candidate);
            }
        }
        let winner_rate_provider = winner.and_then(|candidate| {
            match self.providers.get(&candidate) {
                Some(ProviderStatus::Registered(provider)) => Some(*provider),
                _ => None,
            }
        });
        EpochResult {
            winner,
            winner_rate_provider,
        }
    }

    pub fn is_finalized(&self, epoch: Epoch) -> bool {
        epoch < self.next_to_finalize
    }

    pub fn latest_finalized_epoch(&self) -> Option<Epoch> {
        self.next_to_finalize.checked_sub(1)
    }

    /// Winning candidate of a finalized epoch.  `None` both for "no winner"
    /// and "not finalized yet" — use [`Self::is_finalized`] to distinguish.
    pub fn winner(&self, epoch: Epoch) -> Option<Pubkey> {
        self.results.get(&epoch).and_then(|result| result.winner)
    }

    pub fn winner_rate_provider(&self, epoch: Epoch) -> Option<Pubkey> {
        self.results
            .get(&epoch)
            .and_then(|result| result.winner_rate_provider)
    }

    // -----------------------------------------------------------------------
    // Roles and configuration
    // -----------------------------------------------------------------------

    pub fn management(&self) -> Pubkey {
        self.management
    }

    pub fn pending_management(&self) -> Option<Pubkey> {
        self.pending_management
    }

    pub fn operator(&self) -> Pubkey {
        self.operator
    }

    pub fn treasury(&self) -> Pubkey {
        self.treasury
    }

    pub fn fee_balance(&self) -> u128 {
        self.fee_balance
    }

    fn require_management(&self, caller: &Pubkey) -> Result<()> {
        if *caller != self.management {
            return Err(GovernanceError::Unauthorized);
        }
        Ok(())
    }

    /// Two-step management transfer, step one.
    pub fn set_management(&mut self, caller: &Pubkey, new_management: Pubkey) -> Result<()> {
        self.require_management(caller)?;
        self.pending_management = Some(new_management);
        Ok(())
    }

    /// Two-step management transfer, step two — only the pending key.
    pub fn accept_management(&mut self, caller: &Pubkey) -> Result<()> {
        if self.pending_management != Some(*caller) {
            return Err(GovernanceError::Unauthorized);
        }
        self.management = *caller;
        self.pending_management = None;
        Ok(())
    }

    pub fn set_operator(&mut self, caller: &Pubkey, operator: Pubkey) -> Result<()> {
        self.require_management(caller)?;
        self.operator = operator;
        Ok(())
    }

    pub fn set_treasury(&mut self, caller: &Pubkey, treasury: Pubkey) -> Result<()> {
        self.require_management(caller)?;
        self.treasury = treasury;
        Ok(())
    }

    pub fn set_enable_epoch(&mut self, caller: &Pubkey, epoch: Epoch) -> Result<()> {
        self.require_management(caller)?;
        self.enable_epoch = epoch;
        Ok(())
    }

    pub fn set_application_fees(
        &mut self,
        caller: &Pubkey,
        fee_token: Pubkey,
        initial_fee: u128,
        subsequent_fee: u128,
    ) -> Result<()> {
        self.require_management(caller)?;
        self.fee_token = Some(fee_token);
        self.initial_fee = initial_fee;
        self.subsequent_fee = subsequent_fee;
        Ok(())
    }

    /// Withdraw the accrued application fees.  Treasury role only.  Returns
    /// the swept amount; the actual token transfer is the caller's.
    pub fn sweep_fees(&mut self, caller: &Pubkey) -> Result<u128> {
        if *caller != self.treasury {
            return Err(GovernanceError::Unauthorized);
        }
        let amount = self.fee_balance;
        self.fee_balance = 0;
        info!("inclusion sweep fees: {amount}");
        Ok(amount)
    }
}
