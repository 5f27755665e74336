//! Winner-take-all incentives for inclusion votes.
//!
//! Anyone can deposit incentive tokens on a candidate during its epoch.
//! If the candidate wins, every account that voted for it splits the pot
//! pro-rata by the weight it put on the winning choice, minus an optional
//! fee.  If the candidate loses (or the epoch ends with no winner), each
//! depositor reclaims its own deposit in full.  Whatever is never claimed
//! — dust, abandoned entitlements, accrued fees — becomes sweepable by
//! management one full epoch after the deposit epoch.

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
        inclusion::InclusionVote,
        math::mul_div,
        measure::Measure,
    },
};

/// The inclusion-incentive ledger.  Vote outcomes are read from the
/// [`InclusionVote`] engine passed into each query; money state lives here.
#[derive(Debug, Clone)]
pub struct InclusionIncentives {
    schedule: EpochSchedule,
    management: Pubkey,
    pending_management: Option<Pubkey>,
    /// Claim fee in bps; the cut stays in `unclaimed` until swept.
    fee_rate: u128,
    /// Seconds into an epoch after which deposits close.
    deposit_deadline: u64,
    book: DepositBook<Pubkey>,
    /// (epoch, token, account) → net amount paid.
    claimed: HashMap<(Epoch, Pubkey, Pubkey), u128>,
    refunded: HashSet<(Epoch, Pubkey, Pubkey, Pubkey)>,
}

impl InclusionIncentives {
    pub fn new(schedule: EpochSchedule, management: Pubkey) -> Self {
        Self {
            schedule,
            management,
            pending_management: None,
            fee_rate: 0,
            deposit_deadline: EPOCH_LENGTH,
            book: DepositBook::default(),
            claimed: HashMap::new(),
            refunded: HashSet::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Deposits
    // -----------------------------------------------------------------------

    /// Deposit `amount` of `token` on `candidate` for the epoch containing
    /// `now`.  Permissionless, before the configured deposit deadline.
    pub fn deposit(
        &mut self,
        depositor: &Pubkey,
        candidate: &Pubkey,
        token: &Pubkey,
        amount: u128,
        now: u64,
    ) -> Result<()> {
        let epoch = self
            .schedule
            .epoch_at(now)
            .map_err(|_| IncentiveError::BeforeGenesis)?;
        if now - self.schedule.epoch_start(epoch) >= self.deposit_deadline {
            return Err(IncentiveError::DepositClosed);
        }
        self.book
            .deposit(epoch, *candidate, *token, *depositor, amount)?;
        debug!("inclusion incentive deposit: epoch {epoch}, candidate {candidate}, {amount}");
        Ok(())
    }

    /// Aggregate deposited on `(epoch, candidate, token)`.
    pub fn incentives(&self, epoch: Epoch, candidate: &Pubkey, token: &Pubkey) -> u128 {
        self.book.total(epoch, *candidate, token)
    }

    /// A single depositor's share of `(epoch, candidate, token)`.
    pub fn incentives_depositor(
        &self,
        epoch: Epoch,
        candidate: &Pubkey,
        token: &Pubkey,
        depositor: &Pubkey,
    ) -> u128 {
        self.book.deposited_by(epoch, *candidate, token, depositor)
    }

    /// Balance of `(epoch, token)` not yet claimed, refunded, or swept.
    pub fn unclaimed(&self, epoch: Epoch, token: &Pubkey) -> u128 {
        self.book.unclaimed(epoch, token)
    }

    // -----------------------------------------------------------------------
    // Claims
    // -----------------------------------------------------------------------

    /// Net amount `account` can claim from `(epoch, token)`.
    ///
    /// Zero unless the epoch is finalized with a winner the account voted
    /// for: `deposits_on_winner * weight_on_winner / total_weight_on_winner`
    /// minus the fee cut.  Zero again once claimed.
    pub fn claimable<M: Measure>(
        &self,
        epoch: Epoch,
        token: &Pubkey,
        account: &Pubkey,
        voting: &InclusionVote<M>,
    ) -> u128 {
        if !voting.is_finalized(epoch) {
            return 0;
        }
        let Some(winner) = voting.winner(epoch) else {
            return 0;
        };
        if self.claimed.contains_key(&(epoch, *token, *account)) {
            return 0;
        }
        let Some(choice) = voting.candidate_index(epoch, &winner) else {
            return 0;
        };
        let total_deposit = self.book.total(epoch, winner, token);
        let winner_votes = voting.votes(epoch, choice);
        if total_deposit == 0 || winner_votes == 0 {
            return 0;
        }
        let user_votes = voting.votes_user_choice(account, epoch, choice);
        let Some(gross) = mul_div(total_deposit, user_votes, winner_votes) else {
            return 0;
        };
        let fee = mul_div(gross, self.fee_rate, BPS_DENOMINATOR).unwrap_or(0);
        gross - fee
    }

    /// Pay out `account`'s claim.  Idempotent: pays the full claimable
    /// amount once; repeat calls (and claims with no entitlement) succeed
    /// with a zero payout and move no tokens.
    pub fn claim<M: Measure, S: TokenSink>(
        &mut self,
        epoch: Epoch,
        token: &Pubkey,
        account: &Pubkey,
        voting: &InclusionVote<M>,
        sink: &mut S,
    ) -> Result<u128> {
        let amount = self.claimable(epoch, token, account, voting);
        if amount == 0 {
            return Ok(0);
        }
        sink.transfer(token, account, amount)?;
        self.book.pay_out(epoch, token, amount)?;
        self.claimed.insert((epoch, *token, *account), amount);
        info!("inclusion incentive claim: epoch {epoch}, account {account}, {amount}");
        Ok(amount)
    }

    // -----------------------------------------------------------------------
    // Refunds
    // -----------------------------------------------------------------------

    /// A depositor's refund for a losing candidate: the full original
    /// deposit, once, only after finalization and only if `candidate` did
    /// not win.
    pub fn refundable<M: Measure>(
        &self,
        epoch: Epoch,
        candidate: &Pubkey,
        token: &Pubkey,
        depositor: &Pubkey,
        voting: &InclusionVote<M>,
    ) -> u128 {
        if !voting.is_finalized(epoch) {
            return 0;
        }
        if voting.winner(epoch) == Some(*candidate) {
            return 0;
        }
        if self
            .refunded
            .contains(&(epoch, *candidate, *token, *depositor))
        {
            return 0;
        }
        self.book.deposited_by(epoch, *candidate, token, depositor)
    }

    /// Pay out a refund.  Rejects when nothing is refundable (not a
    /// loser's deposit, already refunded, or not finalized).
    pub fn refund<M: Measure, S: TokenSink>(
        &mut self,
        epoch: Epoch,
        candidate: &Pubkey,
        token: &Pubkey,
        depositor: &Pubkey,
        voting: &InclusionVote<M>,
        sink: &mut S,
    ) -> Result<u128> {
        let amount = self.refundable(epoch, candidate, token, depositor, voting);
        if amount == 0 {
            return Err(IncentiveError::NotRefundable);
        }
        sink.transfer(token, depositor, amount)?;
        self.book.pay_out(epoch, token, amount)?;
        self.refunded.insert((epoch, *candidate, *token, *depositor));
        info!("inclusion incentive refund: epoch {epoch}, depositor {depositor}, {amount}");
        Ok(amount)
    }

    // -----------------------------------------------------------------------
    // Sweep
    // -----------------------------------------------------------------------

    /// What management could sweep from `(epoch, token)` at `now`: the
    /// remaining unclaimed balance, but only once one full epoch has
    /// elapsed after the deposit epoch.
    pub fn sweepable(&self, epoch: Epoch, token: &Pubkey, now: u64) -> u128 {
        if now < self.schedule.epoch_end(epoch) + EPOCH_LENGTH {
            return 0;
        }
        self.book.unclaimed(epoch, token)
    }

    /// Sweep the remaining balance to `recipient`.  Management only.
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
        info!("inclusion incentive sweep: epoch {epoch}, {amount} to {recipient}");
        Ok(amount)
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn management(&self) -> Pubkey {
        self.management
    }

    pub fn fee_rate(&self) -> u128 {
        self.fee_rate
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

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::sink::MemoryTokenLedger,
        std::collections::HashMap,
        tally_governance::{
            constants::{UNIT, VOTE_START_OFFSET, WEEK_LENGTH},
            error::Result as GovResult,
        },
    };

    const GENESIS: u64 = 1_700_000_000 / WEEK_LENGTH * WEEK_LENGTH;

    #[derive(Default)]
    struct FixedMeasure {
        weights: HashMap<Pubkey, u128>,
    }

    impl Measure for FixedMeasure {
        fn vote_weight(&self, account: &Pubkey, _now: u64) -> GovResult<u128> {
            Ok(*self.weights.get(account).unwrap_or(&0))
        }
    }

    struct Fixture {
        voting: InclusionVote<FixedMeasure>,
        incentives: InclusionIncentives,
        ledger: MemoryTokenLedger,
        management: Pubkey,
        alice: Pubkey,
        bob: Pubkey,
        candidate: Pubkey,
        token: Pubkey,
        epoch: Epoch,
        now: u64,
    }

    /// One whitelisted candidate, alice at 1 UNIT and bob at 2 UNIT.
    fn setup() -> Fixture {
        let schedule = EpochSchedule::new(GENESIS);
        let management = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let candidate = Pubkey::new_unique();
        let token = Pubkey::new_unique();
        let now = GENESIS + EPOCH_LENGTH;

        let mut measure = FixedMeasure::default();
        measure.weights.insert(alice, UNIT);
        measure.weights.insert(bob, 2 * UNIT);
        let mut voting = InclusionVote::new(schedule, measure, management, now).unwrap();
        voting
            .set_rate_provider(&management, &candidate, Pubkey::new_unique(), now)
            .unwrap();
        voting.apply(&candidate, 0, now).unwrap();

        let incentives = InclusionIncentives::new(schedule, management);
        let ledger = MemoryTokenLedger::new(Pubkey::new_unique());
        let epoch = schedule.epoch_at(now).unwrap();
        Fixture {
            voting,
            incentives,
            ledger,
            management,
            alice,
            bob,
            candidate,
            token,
            epoch,
            now,
        }
    }

    #[test]
    fn test_deposit_bookkeeping() {
        let mut f = setup();
        assert_eq!(f.incentives.incentives(f.epoch, &f.candidate, &f.token), 0);
        f.incentives
            .deposit(&f.alice, &f.candidate, &f.token, UNIT, f.now)
            .unwrap();
        assert_eq!(
            f.incentives.incentives(f.epoch, &f.candidate, &f.token),
            UNIT
        );
        assert_eq!(
            f.incentives
                .incentives_depositor(f.epoch, &f.candidate, &f.token, &f.alice),
            UNIT
        );
        assert_eq!(f.incentives.unclaimed(f.epoch, &f.token), UNIT);
    }

    #[test]
    fn test_deposit_deadline() {
        let mut f = setup();
        f.incentives
            .set_deposit_deadline(&f.management, VOTE_START_OFFSET)
            .unwrap();
        f.incentives
            .deposit(&f.alice, &f.candidate, &f.token, UNIT, f.now)
            .unwrap();
        assert_eq!(
            f.incentives.deposit(
                &f.alice,
                &f.candidate,
                &f.token,
                UNIT,
                f.now + VOTE_START_OFFSET
            ),
            Err(IncentiveError::DepositClosed)
        );
    }

    #[test]
    fn test_winner_take_all_claims() {
        let mut f = setup();
        f.incentives
            .deposit(&f.alice, &f.candidate, &f.token, 6 * UNIT, f.now)
            .unwrap();
        f.ledger.mint(&f.token, &f.ledger.vault(), 6 * UNIT);

        // A votes 1 UNIT on the candidate, B votes 2 UNIT on it.
        let vote_time = f.now + VOTE_START_OFFSET;
        f.voting.vote(&f.alice, &[0, 10_000], vote_time).unwrap();
        f.voting.vote(&f.bob, &[0, 10_000], vote_time).unwrap();
        f.voting.finalize_epochs(vote_time + WEEK_LENGTH).unwrap();
        assert_eq!(f.voting.winner(f.epoch), Some(f.candidate));

        assert_eq!(
            f.incentives
                .claimable(f.epoch, &f.token, &f.alice, &f.voting),
            2 * UNIT
        );
        let paid = f
            .incentives
            .claim(f.epoch, &f.token, &f.alice, &f.voting, &mut f.ledger)
            .unwrap();
        assert_eq!(paid, 2 * UNIT);
        assert_eq!(f.ledger.balance_of(&f.token, &f.alice), 2 * UNIT);
        assert_eq!(f.incentives.unclaimed(f.epoch, &f.token), 4 * UNIT);

        // Claiming a second time does nothing.
        assert_eq!(
            f.incentives
                .claim(f.epoch, &f.token, &f.alice, &f.voting, &mut f.ledger),
            Ok(0)
        );
        assert_eq!(f.ledger.balance_of(&f.token, &f.alice), 2 * UNIT);

        assert_eq!(
            f.incentives
                .claim(f.epoch, &f.token, &f.bob, &f.voting, &mut f.ledger),
            Ok(4 * UNIT)
        );
        assert_eq!(f.incentives.unclaimed(f.epoch, &f.token), 0);
    }

    #[test]
    fn test_loser_voter_claims_nothing() {
        let mut f = setup();
        f.incentives
            .deposit(&f.alice, &f.candidate, &f.token, 6 * UNIT, f.now)
            .unwrap();
        f.ledger.mint(&f.token, &f.ledger.vault(), 6 * UNIT);

        // A votes blank, B votes for the candidate; the candidate wins.
        let vote_time = f.now + VOTE_START_OFFSET;
        f.voting.vote(&f.alice, &[10_000, 0], vote_time).unwrap();
        f.voting.vote(&f.bob, &[0, 10_000], vote_time).unwrap();
        f.voting.finalize_epochs(vote_time + WEEK_LENGTH).unwrap();
        assert_eq!(f.voting.winner(f.epoch), Some(f.candidate));

        // Only weight on the winning choice counts.
        assert_eq!(
            f.incentives
                .claimable(f.epoch, &f.token, &f.alice, &f.voting),
            0
        );
        assert_eq!(
            f.incentives.claimable(f.epoch, &f.token, &f.bob, &f.voting),
            6 * UNIT
        );
    }

    #[test]
    fn test_claim_fee_and_fee_sweep() {
        let mut f = setup();
        f.incentives.set_fee_rate(&f.management, 1_000).unwrap();
        f.incentives
            .deposit(&f.alice, &f.candidate, &f.token, 10 * UNIT, f.now)
            .unwrap();
        f.ledger.mint(&f.token, &f.ledger.vault(), 10 * UNIT);

        let vote_time = f.now + VOTE_START_OFFSET;
        f.voting.vote(&f.alice, &[0, 10_000], vote_time).unwrap();
        f.voting.finalize_epochs(vote_time + WEEK_LENGTH).unwrap();

        assert_eq!(
            f.incentives
                .claimable(f.epoch, &f.token, &f.alice, &f.voting),
            9 * UNIT
        );
        f.incentives
            .claim(f.epoch, &f.token, &f.alice, &f.voting, &mut f.ledger)
            .unwrap();
        assert_eq!(f.ledger.balance_of(&f.token, &f.alice), 9 * UNIT);
        assert_eq!(f.incentives.unclaimed(f.epoch, &f.token), UNIT);

        // The fee comes out through a sweep one epoch later.
        let sweep_time = f.now + 2 * EPOCH_LENGTH;
        assert_eq!(f.incentives.sweepable(f.epoch, &f.token, sweep_time), UNIT);
        let recipient = Pubkey::new_unique();
        f.incentives
            .sweep(
                &f.management,
                f.epoch,
                &f.token,
                &recipient,
                &mut f.ledger,
                sweep_time,
            )
            .unwrap();
        assert_eq!(f.ledger.balance_of(&f.token, &recipient), UNIT);
    }

    #[test]
    fn test_refund_on_no_winner() {
        let mut f = setup();
        f.incentives
            .deposit(&f.alice, &f.candidate, &f.token, UNIT, f.now)
            .unwrap();
        f.ledger.mint(&f.token, &f.ledger.vault(), UNIT);

        // 100% blank: no winner.
        let vote_time = f.now + VOTE_START_OFFSET;
        f.voting.vote(&f.alice, &[10_000], vote_time).unwrap();
        f.voting.finalize_epochs(vote_time + WEEK_LENGTH).unwrap();
        assert_eq!(f.voting.winner(f.epoch), None);

        assert_eq!(
            f.incentives
                .claimable(f.epoch, &f.token, &f.alice, &f.voting),
            0
        );
        assert_eq!(
            f.incentives
                .refundable(f.epoch, &f.candidate, &f.token, &f.alice, &f.voting),
            UNIT
        );
        let refunded = f
            .incentives
            .refund(
                f.epoch,
                &f.candidate,
                &f.token,
                &f.alice,
                &f.voting,
                &mut f.ledger,
            )
            .unwrap();
        assert_eq!(refunded, UNIT);
        assert_eq!(f.ledger.balance_of(&f.token, &f.alice), UNIT);
        assert_eq!(f.incentives.unclaimed(f.epoch, &f.token), 0);

        // A second refund is a hard rejection.
        assert_eq!(
            f.incentives.refund(
                f.epoch,
                &f.candidate,
                &f.token,
                &f.alice,
                &f.voting,
                &mut f.ledger,
            ),
            Err(IncentiveError::NotRefundable)
        );
    }

    #[test]
    fn test_sweep_gating() {
        let mut f = setup();
        f.incentives
            .deposit(&f.alice, &f.candidate, &f.token, 6 * UNIT, f.now)
            .unwrap();
        f.ledger.mint(&f.token, &f.ledger.vault(), 6 * UNIT);

        let vote_time = f.now + VOTE_START_OFFSET;
        f.voting.vote(&f.alice, &[0, 10_000], vote_time).unwrap();
        f.voting.vote(&f.bob, &[0, 10_000], vote_time).unwrap();
        f.voting.finalize_epochs(vote_time + WEEK_LENGTH).unwrap();
        f.incentives
            .claim(f.epoch, &f.token, &f.alice, &f.voting, &mut f.ledger)
            .unwrap();

        // Not sweepable during the following epoch.
        let early = f.now + EPOCH_LENGTH;
        let recipient = Pubkey::new_unique();
        assert_eq!(f.incentives.sweepable(f.epoch, &f.token, early), 0);
        assert_eq!(
            f.incentives.sweep(
                &f.management,
                f.epoch,
                &f.token,
                &recipient,
                &mut f.ledger,
                early,
            ),
            Err(IncentiveError::NotYetSweepable)
        );

        // Unauthorized sweeps are rejected regardless of timing.
        let late = f.now + 2 * EPOCH_LENGTH;
        assert_eq!(f.incentives.sweepable(f.epoch, &f.token, late), 4 * UNIT);
        assert_eq!(
            f.incentives.sweep(
                &f.alice,
                f.epoch,
                &f.token,
                &recipient,
                &mut f.ledger,
                late,
            ),
            Err(IncentiveError::Unauthorized)
        );
    }

    #[test]
    fn test_unclaimed_entitlement_sweepable() {
        let mut f = setup();
        f.incentives
            .deposit(&f.alice, &f.candidate, &f.token, 6 * UNIT, f.now)
            .unwrap();
        f.ledger.mint(&f.token, &f.ledger.vault(), 6 * UNIT);

        let vote_time = f.now + VOTE_START_OFFSET;
        f.voting.vote(&f.alice, &[0, 10_000], vote_time).unwrap();
        f.voting.vote(&f.bob, &[0, 10_000], vote_time).unwrap();
        f.voting.finalize_epochs(vote_time + WEEK_LENGTH).unwrap();

        // Alice claims her third; bob never does.
        f.incentives
            .claim(f.epoch, &f.token, &f.alice, &f.voting, &mut f.ledger)
            .unwrap();
        let late = f.now + 2 * EPOCH_LENGTH;
        assert_eq!(f.incentives.sweepable(f.epoch, &f.token, late), 4 * UNIT);
        let recipient = Pubkey::new_unique();
        assert_eq!(
            f.incentives.sweep(
                &f.management,
                f.epoch,
                &f.token,
                &recipient,
                &mut f.ledger,
                late,
            ),
            Ok(4 * UNIT)
        );
        assert_eq!(f.incentives.sweepable(f.epoch, &f.token, late), 0);
        assert_eq!(f.ledger.balance_of(&f.token, &recipient), 4 * UNIT);
    }

    #[test]
    fn test_management_transfer() {
        let mut f = setup();
        let new_management = Pubkey::new_unique();
        assert_eq!(
            f.incentives.set_management(&f.alice, new_management),
            Err(IncentiveError::Unauthorized)
        );
        f.incentives
            .set_management(&f.management, new_management)
            .unwrap();
        assert_eq!(
            f.incentives.accept_management(&f.alice),
            Err(IncentiveError::Unauthorized)
        );
        f.incentives.accept_management(&new_management).unwrap();
        assert_eq!(f.incentives.management(), new_management);
    }
}
