//! Weight voting wired to the redistribution governor and the pro-rata
//! incentive ledger.

use {
    crate::harness::{
        after_epoch, epoch_start, schedule, sweep_time, vote_time, FixedMeasure, FixedPool, UNIT,
    },
    solana_pubkey::Pubkey,
    tally_governance::{governor::PoolGovernor, weight::WeightVote},
    tally_incentives::{sink::MemoryTokenLedger, WeightIncentives},
};

const HALF: u128 = UNIT / 2;
const PCT: u128 = UNIT / 100;

struct Scenario {
    voting: WeightVote<FixedMeasure, FixedPool>,
    governor: PoolGovernor,
    incentives: WeightIncentives,
    ledger: MemoryTokenLedger,
    management: Pubkey,
}

fn scenario(accounts: &[(Pubkey, u128)]) -> Scenario {
    let management = Pubkey::new_unique();
    let measure = FixedMeasure::default();
    for (account, weight) in accounts {
        measure.set(*account, *weight);
    }
    Scenario {
        voting: WeightVote::new(schedule(), measure, FixedPool(2), management),
        governor: PoolGovernor::new(schedule(), management),
        incentives: WeightIncentives::new(schedule(), management, 2),
        ledger: MemoryTokenLedger::new(Pubkey::new_unique()),
        management,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  1. Vote results drive redistribution
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_vote_to_redistribution() {
    let alice = Pubkey::new_unique();
    let mut s = scenario(&[(alice, UNIT)]);

    // 20% on asset 1, 80% on asset 2, nothing blank.
    s.voting.vote(&alice, &[0, 2_000, 8_000], vote_time(0)).unwrap();

    let result = s
        .governor
        .execute(
            &s.management,
            0,
            &[HALF, HALF],
            &s.voting.results(0),
            &[],
            after_epoch(0),
        )
        .unwrap();
    assert_eq!(result.target_weights, vec![47 * PCT, 53 * PCT]);
    assert_eq!(result.weights_bps, vec![4_700, 5_300]);
}

#[test]
fn test_blank_share_dampens_redistribution() {
    let alice = Pubkey::new_unique();
    let mut s = scenario(&[(alice, UNIT)]);
    s.voting
        .vote(&alice, &[4_000, 2_000, 4_000], vote_time(0))
        .unwrap();

    let result = s
        .governor
        .execute(
            &s.management,
            0,
            &[HALF, HALF],
            &s.voting.results(0),
            &[],
            after_epoch(0),
        )
        .unwrap();
    assert_eq!(result.target_weights, vec![49 * PCT, 51 * PCT]);
}

#[test]
fn test_full_blank_keeps_previous_weights() {
    let alice = Pubkey::new_unique();
    let mut s = scenario(&[(alice, UNIT)]);
    s.voting.vote(&alice, &[10_000], vote_time(0)).unwrap();

    let result = s
        .governor
        .execute(
            &s.management,
            0,
            &[HALF, HALF],
            &s.voting.results(0),
            &[],
            after_epoch(0),
        )
        .unwrap();
    assert_eq!(result.redistribute, 0);
    assert_eq!(result.target_weights, vec![HALF, HALF]);
}

// ═══════════════════════════════════════════════════════════════════════════
//  2. Pro-rata incentives among choice voters
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_choice_voters_share_incentives() {
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let token = Pubkey::new_unique();
    let mut s = scenario(&[(alice, UNIT), (bob, UNIT)]);

    s.incentives
        .deposit(&alice, 2, &token, 6 * UNIT, epoch_start(0))
        .unwrap();
    s.ledger.mint(&token, &s.ledger.vault(), 6 * UNIT);

    s.voting
        .vote(&alice, &[5_000, 0, 5_000], vote_time(0))
        .unwrap();
    s.voting.vote(&bob, &[0, 0, 10_000], vote_time(0)).unwrap();

    let after = after_epoch(0);
    assert_eq!(
        s.incentives
            .claimable(0, 2, &token, &alice, &s.voting, after),
        2 * UNIT
    );
    assert_eq!(
        s.incentives
            .claim(0, 2, &token, &alice, &s.voting, &mut s.ledger, after),
        Ok(2 * UNIT)
    );
    assert_eq!(
        s.incentives
            .claim(0, 2, &token, &bob, &s.voting, &mut s.ledger, after),
        Ok(4 * UNIT)
    );
    assert_eq!(s.incentives.unclaimed(0, &token), 0);
}

#[test]
fn test_fee_accrues_and_sweeps() {
    let alice = Pubkey::new_unique();
    let token = Pubkey::new_unique();
    let mut s = scenario(&[(alice, UNIT)]);
    s.incentives.set_fee_rate(&s.management, 1_000).unwrap();

    s.incentives
        .deposit(&alice, 2, &token, 10 * UNIT, epoch_start(0))
        .unwrap();
    s.ledger.mint(&token, &s.ledger.vault(), 10 * UNIT);
    s.voting
        .vote(&alice, &[5_000, 0, 5_000], vote_time(0))
        .unwrap();

    let after = after_epoch(0);
    assert_eq!(
        s.incentives
            .claim(0, 2, &token, &alice, &s.voting, &mut s.ledger, after),
        Ok(9 * UNIT)
    );

    let late = sweep_time(0);
    let treasury = Pubkey::new_unique();
    assert_eq!(s.incentives.sweepable(0, &token, late), UNIT);
    s.incentives
        .sweep(&s.management, 0, &token, &treasury, &mut s.ledger, late)
        .unwrap();
    assert_eq!(s.ledger.balance_of(&token, &treasury), UNIT);
}
