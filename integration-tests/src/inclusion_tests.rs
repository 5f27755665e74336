//! End-to-end inclusion voting + winner-take-all incentives.

use {
    crate::harness::{
        after_epoch, epoch_start, schedule, sweep_time, vote_time, FixedMeasure, UNIT,
    },
    solana_pubkey::Pubkey,
    tally_governance::{epoch::Epoch, inclusion::InclusionVote, GovernanceError},
    tally_incentives::{
        sink::MemoryTokenLedger, InclusionIncentives, IncentiveError,
    },
};

struct Scenario {
    voting: InclusionVote<FixedMeasure>,
    incentives: InclusionIncentives,
    ledger: MemoryTokenLedger,
    measure: FixedMeasure,
    management: Pubkey,
    epoch: Epoch,
}

/// Epoch 1, with `candidates` whitelisted and `accounts` given weights.
fn scenario(candidates: &[Pubkey], accounts: &[(Pubkey, u128)]) -> Scenario {
    crate::harness::setup_logging();
    let management = Pubkey::new_unique();
    let epoch = 1;
    let now = epoch_start(epoch);

    let measure = FixedMeasure::default();
    for (account, weight) in accounts {
        measure.set(*account, *weight);
    }
    let mut voting =
        InclusionVote::new(schedule(), measure.clone(), management, now).unwrap();
    for candidate in candidates {
        voting
            .set_rate_provider(&management, candidate, Pubkey::new_unique(), now)
            .unwrap();
        voting.apply(candidate, 0, now).unwrap();
    }
    Scenario {
        voting,
        incentives: InclusionIncentives::new(schedule(), management),
        ledger: MemoryTokenLedger::new(Pubkey::new_unique()),
        measure,
        management,
        epoch,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  1. Blank majority: refunds, no claims
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_full_blank_vote_refunds_deposit() {
    // One candidate, alice holds 1 UNIT of weight and votes 100% blank with
    // 1 UNIT of incentives deposited on the candidate.
    let alice = Pubkey::new_unique();
    let candidate = Pubkey::new_unique();
    let token = Pubkey::new_unique();
    let mut s = scenario(&[candidate], &[(alice, UNIT)]);

    s.incentives
        .deposit(&alice, &candidate, &token, UNIT, epoch_start(s.epoch))
        .unwrap();
    s.ledger.mint(&token, &s.ledger.vault(), UNIT);

    s.voting.vote(&alice, &[10_000], vote_time(s.epoch)).unwrap();
    s.voting.finalize_epochs(after_epoch(s.epoch)).unwrap();

    // No winner, nothing claimable, full refund.
    assert_eq!(s.voting.winner(s.epoch), None);
    assert_eq!(
        s.incentives
            .claimable(s.epoch, &token, &alice, &s.voting),
        0
    );
    assert_eq!(
        s.incentives
            .refundable(s.epoch, &candidate, &token, &alice, &s.voting),
        UNIT
    );
    s.incentives
        .refund(s.epoch, &candidate, &token, &alice, &s.voting, &mut s.ledger)
        .unwrap();
    assert_eq!(s.ledger.balance_of(&token, &alice), UNIT);
}

// ═══════════════════════════════════════════════════════════════════════════
//  2. Winner-take-all split
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_winning_choice_voters_split_the_pot() {
    // A (1 UNIT) votes candidate 1, B (2 UNIT) votes candidate 2; 6 UNIT
    // rides on candidate 2, which wins.  B claims all 6, A claims nothing.
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let candidate1 = Pubkey::new_unique();
    let candidate2 = Pubkey::new_unique();
    let token = Pubkey::new_unique();
    let mut s = scenario(&[candidate1, candidate2], &[(alice, UNIT), (bob, 2 * UNIT)]);

    s.incentives
        .deposit(&bob, &candidate2, &token, 6 * UNIT, epoch_start(s.epoch))
        .unwrap();
    s.ledger.mint(&token, &s.ledger.vault(), 6 * UNIT);

    let t = vote_time(s.epoch);
    s.voting.vote(&alice, &[0, 10_000], t).unwrap();
    s.voting.vote(&bob, &[0, 0, 10_000], t).unwrap();
    s.voting.finalize_epochs(after_epoch(s.epoch)).unwrap();
    assert_eq!(s.voting.winner(s.epoch), Some(candidate2));

    assert_eq!(
        s.incentives.claimable(s.epoch, &token, &bob, &s.voting),
        6 * UNIT
    );
    assert_eq!(
        s.incentives
            .claim(s.epoch, &token, &bob, &s.voting, &mut s.ledger),
        Ok(6 * UNIT)
    );
    assert_eq!(s.ledger.balance_of(&token, &bob), 6 * UNIT);

    // A voted the losing choice.
    assert_eq!(
        s.incentives.claimable(s.epoch, &token, &alice, &s.voting),
        0
    );
    assert_eq!(
        s.incentives
            .claim(s.epoch, &token, &alice, &s.voting, &mut s.ledger),
        Ok(0)
    );
    assert_eq!(s.ledger.balance_of(&token, &alice), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
//  3. Claim idempotence
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_claim_twice_transfers_zero() {
    let alice = Pubkey::new_unique();
    let candidate = Pubkey::new_unique();
    let token = Pubkey::new_unique();
    let mut s = scenario(&[candidate], &[(alice, UNIT)]);

    s.incentives
        .deposit(&alice, &candidate, &token, 4 * UNIT, epoch_start(s.epoch))
        .unwrap();
    s.ledger.mint(&token, &s.ledger.vault(), 4 * UNIT);

    s.voting
        .vote(&alice, &[0, 10_000], vote_time(s.epoch))
        .unwrap();
    s.voting.finalize_epochs(after_epoch(s.epoch)).unwrap();

    assert_eq!(
        s.incentives
            .claim(s.epoch, &token, &alice, &s.voting, &mut s.ledger),
        Ok(4 * UNIT)
    );
    let balance_after_first = s.ledger.balance_of(&token, &alice);
    // The second call is a benign no-op, not an error.
    assert_eq!(
        s.incentives
            .claim(s.epoch, &token, &alice, &s.voting, &mut s.ledger),
        Ok(0)
    );
    assert_eq!(s.ledger.balance_of(&token, &alice), balance_after_first);
}

// ═══════════════════════════════════════════════════════════════════════════
//  4. Vote immutability
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_votes_survive_later_weight_changes() {
    let alice = Pubkey::new_unique();
    let candidate = Pubkey::new_unique();
    let mut s = scenario(&[candidate], &[(alice, UNIT)]);

    let t = vote_time(s.epoch);
    s.voting.vote(&alice, &[0, 10_000], t).unwrap();
    assert_eq!(s.voting.votes_user(&alice, s.epoch), UNIT);

    // More stake arriving mid-window must not move the recorded ballot,
    // and re-voting with the new weight is rejected.
    s.measure.set(alice, 5 * UNIT);
    assert_eq!(s.voting.votes_user(&alice, s.epoch), UNIT);
    assert_eq!(s.voting.votes(s.epoch, 1), UNIT);
    assert_eq!(
        s.voting.vote(&alice, &[0, 10_000], t),
        Err(GovernanceError::AlreadyVoted)
    );
}

// ═══════════════════════════════════════════════════════════════════════════
//  5. Sweep lifecycle
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_abandoned_claims_swept_after_one_epoch() {
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let candidate = Pubkey::new_unique();
    let token = Pubkey::new_unique();
    let mut s = scenario(&[candidate], &[(alice, UNIT), (bob, 2 * UNIT)]);

    s.incentives
        .deposit(&alice, &candidate, &token, 6 * UNIT, epoch_start(s.epoch))
        .unwrap();
    s.ledger.mint(&token, &s.ledger.vault(), 6 * UNIT);

    let t = vote_time(s.epoch);
    s.voting.vote(&alice, &[0, 10_000], t).unwrap();
    s.voting.vote(&bob, &[0, 10_000], t).unwrap();
    s.voting.finalize_epochs(after_epoch(s.epoch)).unwrap();

    // Alice claims her 2 UNIT; bob abandons his 4.
    s.incentives
        .claim(s.epoch, &token, &alice, &s.voting, &mut s.ledger)
        .unwrap();
    assert_eq!(
        s.incentives
            .sweepable(s.epoch, &token, after_epoch(s.epoch)),
        0
    );

    let treasury = Pubkey::new_unique();
    let late = sweep_time(s.epoch);
    assert_eq!(s.incentives.sweepable(s.epoch, &token, late), 4 * UNIT);
    assert_eq!(
        s.incentives
            .sweep(&s.management, s.epoch, &token, &treasury, &mut s.ledger, late),
        Ok(4 * UNIT)
    );
    assert_eq!(s.ledger.balance_of(&token, &treasury), 4 * UNIT);
    assert_eq!(
        s.incentives
            .sweep(&s.management, s.epoch, &token, &treasury, &mut s.ledger, late),
        Err(IncentiveError::NotYetSweepable)
    );
}
