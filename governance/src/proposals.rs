//! Generic weighted yea/nay proposals.
//!
//! Shares the epoch cadence with the rest of the engine: proposals are
//! opened during the first three weeks of an epoch, voted on during the
//! final week, and executed during the following epoch (optionally behind a
//! delay).  Votes are weighted by the same [`Measure`] the multi-choice
//! engines use, and a ballot may split its weight between yea and nay.
//!
//! The proposal body itself lives off-engine; only its 32-byte script hash
//! is committed here and re-checked at execution time.

use {
    crate::{
        ballot::allocate_bps,
        constants::{BPS_DENOMINATOR, DEFAULT_MAJORITY_BPS},
        epoch::{Epoch, EpochSchedule},
        error::{GovernanceError, Result},
        measure::Measure,
    },
    borsh::{BorshDeserialize, BorshSerialize},
    log::{debug, info},
    serde::Serialize,
    solana_hash::Hash,
    solana_pubkey::Pubkey,
    std::collections::{HashMap, HashSet},
};

/// Lifecycle state of a proposal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize,
)]
#[borsh(use_discriminant = true)]
pub enum ProposalState {
    /// Open — proposed, and voting has not concluded against it yet.
    Proposed = 1,
    /// Vote closed in favour; executable during the next epoch.
    Passed = 2,
    /// Vote closed against, or the execution window elapsed unused.
    Rejected = 3,
    /// Withdrawn by its author before the vote closed.
    Retracted = 4,
    /// Cancelled by management.
    Cancelled = 5,
    /// Executed.
    Enacted = 6,
}

/// A single proposal record.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct Proposal {
    pub idx: u64,
    pub author: Pubkey,
    /// Hash of the execution script; re-checked at execution.
    pub script_hash: Hash,
    /// Epoch the proposal was opened (and is voted) in.
    pub epoch: Epoch,
    /// Weighted yea votes.
    pub yea: u128,
    /// Weighted nay votes.
    pub nay: u128,
}

#[derive(Debug, Clone)]
struct ProposalEntry {
    proposal: Proposal,
    /// Terminal state override; `None` while the lifecycle is time-driven.
    settled: Option<ProposalState>,
    voters: HashSet<Pubkey>,
}

/// The proposal governor.
#[derive(Debug, Clone)]
pub struct GenericGovernor<M> {
    schedule: EpochSchedule,
    measure: M,
    management: Pubkey,
    pending_management: Option<Pubkey>,
    /// Minimum weight required to open a proposal.
    propose_min_weight: u128,
    /// Pass threshold in bps of (yea + nay); must be strictly exceeded.
    majority: u128,
    /// Seconds after the vote closes before execution is allowed.
    delay: u64,
    proposals: Vec<ProposalEntry>,
}

impl<M: Measure> GenericGovernor<M> {
    pub fn new(schedule: EpochSchedule, measure: M, management: Pubkey) -> Self {
        Self {
            schedule,
            measure,
            management,
            pending_management: None,
            propose_min_weight: 0,
            majority: DEFAULT_MAJORITY_BPS,
            delay: 0,
            proposals: Vec::new(),
        }
    }

    pub fn num_proposals(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn proposal(&self, idx: u64) -> Option<&Proposal> {
        self.proposals.get(idx as usize).map(|entry| &entry.proposal)
    }

    /// Whether new proposals can be opened at `now` (apply phase).
    pub fn propose_open(&self, now: u64) -> bool {
        self.schedule.apply_open(now)
    }

    /// Whether proposal voting is open at `now` (final week).
    pub fn vote_open(&self, now: u64) -> bool {
        self.schedule.vote_open(now)
    }

    /// Open a proposal.  Requires `propose_min_weight` voting power when
    /// configured.  Returns the new proposal index.
    pub fn propose(&mut self, author: &Pubkey, script_hash: Hash, now: u64) -> Result<u64> {
        if !self.propose_open(now) {
            return Err(GovernanceError::VoteClosed);
        }
        if self.propose_min_weight > 0 {
            let weight = self.measure.vote_weight(author, now)?;
            if weight < self.propose_min_weight {
                return Err(GovernanceError::NoVotingPower);
            }
        }
        let epoch = self.schedule.epoch_at(now)?;
        let idx = self.proposals.len() as u64;
        self.proposals.push(ProposalEntry {
            proposal: Proposal {
                idx,
                author: *author,
                script_hash,
                epoch,
                yea: 0,
                nay: 0,
            },
            settled: None,
            voters: HashSet::new(),
        });
        debug!("proposal {idx} opened by {author} in epoch {epoch}");
        Ok(idx)
    }

    /// Current state of proposal `idx` at `now`.
    ///
    /// Terminal states are sticky; otherwise the state is derived from the
    /// proposal's epoch: open until the vote closes, then passed exactly
    /// while its execution window (the following epoch) is live, rejected
    /// after that or when the vote failed.
    pub fn proposal_state(&self, idx: u64, now: u64) -> Result<ProposalState> {
        let entry = self
            .proposals
            .get(idx as usize)
            .ok_or(GovernanceError::UnknownProposal)?;
        if let Some(settled) = entry.settled {
            return Ok(settled);
        }
        let proposal = &entry.proposal;
        if !self.schedule.closed(proposal.epoch, now) {
            return Ok(ProposalState::Proposed);
        }
        if !self.vote_passed(proposal) {
            return Ok(ProposalState::Rejected);
        }
        // Executable only during the epoch after the vote.
        if self.schedule.closed(proposal.epoch + 1, now) {
            return Ok(ProposalState::Rejected);
        }
        Ok(ProposalState::Passed)
    }

    fn vote_passed(&self, proposal: &Proposal) -> bool {
        let participation = proposal.yea + proposal.nay;
        if participation == 0 {
            return false;
        }
        // Strict: an exact majority split does not pass.
        proposal.yea * BPS_DENOMINATOR > participation * self.majority
    }

    /// Withdraw an open proposal.  Author only, before the vote closes.
    pub fn retract(&mut self, caller: &Pubkey, idx: u64, now: u64) -> Result<()> {
        let state = self.proposal_state(idx, now)?;
        let entry = &mut self.proposals[idx as usize];
        if *caller != entry.proposal.author {
            return Err(GovernanceError::Unauthorized);
        }
        if state != ProposalState::Proposed || self.schedule.closed(entry.proposal.epoch, now) {
            return Err(GovernanceError::InvalidProposalState);
        }
        entry.settled = Some(ProposalState::Retracted);
        Ok(())
    }

    /// Cancel a proposal.  Management only; allowed any time before
    /// enactment.
    pub fn cancel(&mut self, caller: &Pubkey, idx: u64, now: u64) -> Result<()> {
        if *caller != self.management {
            return Err(GovernanceError::Unauthorized);
        }
        let state = self.proposal_state(idx, now)?;
        if !matches!(state, ProposalState::Proposed | ProposalState::Passed) {
            return Err(GovernanceError::InvalidProposalState);
        }
        self.proposals[idx as usize].settled = Some(ProposalState::Cancelled);
        Ok(())
    }

    pub fn vote_yea(&mut self, account: &Pubkey, idx: u64, now: u64) -> Result<()> {
        self.vote(account, idx, 10_000, 0, now)
    }

    pub fn vote_nay(&mut self, account: &Pubkey, idx: u64, now: u64) -> Result<()> {
        self.vote(account, idx, 0, 10_000, now)
    }

    /// Cast a split ballot: `yea_bps + nay_bps` must equal 10_000.  One
    /// ballot per account per proposal; weight is read once and frozen.
    pub fn vote(
        &mut self,
        account: &Pubkey,
        idx: u64,
        yea_bps: u128,
        nay_bps: u128,
        now: u64,
    ) -> Result<()> {
        if !self.vote_open(now) {
            return Err(GovernanceError::VoteClosed);
        }
        if self.proposal_state(idx, now)? != ProposalState::Proposed {
            return Err(GovernanceError::InvalidProposalState);
        }
        let weight = self.measure.vote_weight(account, now)?;
        if weight == 0 {
            return Err(GovernanceError::NoVotingPower);
        }
        let entry = &mut self.proposals[idx as usize];
        if entry.voters.contains(account) {
            return Err(GovernanceError::AlreadyVoted);
        }
        let split = allocate_bps(weight, &[yea_bps, nay_bps])?;
        entry.proposal.yea += split[0];
        entry.proposal.nay += split[1];
        entry.voters.insert(*account);
        debug!("proposal {idx}: {account} voted {yea_bps}/{nay_bps} with weight {weight}");
        Ok(())
    }

    pub fn has_voted(&self, account: &Pubkey, idx: u64) -> bool {
        self.proposals
            .get(idx as usize)
            .is_some_and(|entry| entry.voters.contains(account))
    }

    /// Execute a passed proposal.  Permissionless; `script_hash` must match
    /// the committed hash and the configured delay must have elapsed since
    /// the vote closed.  Single execution.
    pub fn execute(&mut self, idx: u64, script_hash: Hash, now: u64) -> Result<()> {
        if self.proposal_state(idx, now)? != ProposalState::Passed {
            return Err(GovernanceError::InvalidProposalState);
        }
        let entry = &mut self.proposals[idx as usize];
        if script_hash != entry.proposal.script_hash {
            return Err(GovernanceError::ScriptMismatch);
        }
        let executable_from = self.schedule.epoch_end(entry.proposal.epoch) + self.delay;
        if now < executable_from {
            return Err(GovernanceError::DelayNotElapsed);
        }
        entry.settled = Some(ProposalState::Enacted);
        info!("proposal {idx} enacted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn management(&self) -> Pubkey {
        self.management
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    fn require_management(&self, caller: &Pubkey) -> Result<()> {
        if *caller != self.management {
            return Err(GovernanceError::Unauthorized);
        }
        Ok(())
    }

    pub fn set_propose_min_weight(&mut self, caller: &Pubkey, weight: u128) -> Result<()> {
        self.require_management(caller)?;
        self.propose_min_weight = weight;
        Ok(())
    }

    /// Majority threshold in bps of cast votes, in `[5_000, 10_000]`.
    pub fn set_majority(&mut self, caller: &Pubkey, majority: u128) -> Result<()> {
        self.require_management(caller)?;
        if !(DEFAULT_MAJORITY_BPS..=BPS_DENOMINATOR).contains(&majority) {
            return Err(GovernanceError::InvalidAllocation);
        }
        self.majority = majority;
        Ok(())
    }

    pub fn set_delay(&mut self, caller: &Pubkey, delay: u64) -> Result<()> {
        self.require_management(caller)?;
        self.delay = delay;
        Ok(())
    }

    pub fn set_management(&mut self, caller: &Pubkey, new_management: Pubkey) -> Result<()> {
        self.require_management(caller)?;
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
