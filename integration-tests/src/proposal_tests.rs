//! Generic yea/nay proposal lifecycle on the shared epoch cadence.

use {
    crate::harness::{after_epoch, epoch_start, vote_time, FixedMeasure, schedule, UNIT},
    solana_hash::Hash,
    solana_pubkey::Pubkey,
    tally_governance::{
        proposals::{GenericGovernor, ProposalState},
        GovernanceError,
    },
};

fn governor(accounts: &[(Pubkey, u128)]) -> (GenericGovernor<FixedMeasure>, Pubkey) {
    let management = Pubkey::new_unique();
    let measure = FixedMeasure::default();
    for (account, weight) in accounts {
        measure.set(*account, *weight);
    }
    (
        GenericGovernor::new(schedule(), measure, management),
        management,
    )
}

#[test]
fn test_full_lifecycle() {
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let (mut governor, _mgmt) = governor(&[(alice, 2 * UNIT), (bob, UNIT)]);
    let script = Hash::new_from_array([42; 32]);

    let idx = governor.propose(&alice, script, epoch_start(0)).unwrap();
    governor.vote_yea(&alice, idx, vote_time(0)).unwrap();
    governor.vote_nay(&bob, idx, vote_time(0)).unwrap();

    let after = after_epoch(0);
    assert_eq!(
        governor.proposal_state(idx, after),
        Ok(ProposalState::Passed)
    );
    governor.execute(idx, script, after).unwrap();
    assert_eq!(
        governor.proposal_state(idx, after),
        Ok(ProposalState::Enacted)
    );

    // Enactment is single-shot.
    assert_eq!(
        governor.execute(idx, script, after),
        Err(GovernanceError::InvalidProposalState)
    );
}

#[test]
fn test_nay_majority_rejects() {
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let (mut governor, _mgmt) = governor(&[(alice, 2 * UNIT), (bob, UNIT)]);
    let script = Hash::new_from_array([42; 32]);

    let idx = governor.propose(&alice, script, epoch_start(0)).unwrap();
    governor.vote_nay(&alice, idx, vote_time(0)).unwrap();
    governor.vote_yea(&bob, idx, vote_time(0)).unwrap();

    assert_eq!(
        governor.proposal_state(idx, after_epoch(0)),
        Ok(ProposalState::Rejected)
    );
    assert_eq!(
        governor.execute(idx, script, after_epoch(0)),
        Err(GovernanceError::InvalidProposalState)
    );
}

#[test]
fn test_supermajority_threshold() {
    let alice = Pubkey::new_unique();
    let (mut governor, mgmt) = governor(&[(alice, UNIT)]);
    governor.set_majority(&mgmt, 6_666).unwrap();
    let script = Hash::new_from_array([42; 32]);

    let idx = governor.propose(&alice, script, epoch_start(0)).unwrap();
    governor.vote(&alice, idx, 7_000, 3_000, vote_time(0)).unwrap();
    assert_eq!(
        governor.proposal_state(idx, after_epoch(0)),
        Ok(ProposalState::Passed)
    );
}

#[test]
fn test_execution_window_expires() {
    let alice = Pubkey::new_unique();
    let (mut governor, _mgmt) = governor(&[(alice, UNIT)]);
    let script = Hash::new_from_array([42; 32]);

    let idx = governor.propose(&alice, script, epoch_start(0)).unwrap();
    governor.vote_yea(&alice, idx, vote_time(0)).unwrap();

    // Passed during epoch 1, rejected once epoch 1 has closed unused.
    assert_eq!(
        governor.proposal_state(idx, after_epoch(0)),
        Ok(ProposalState::Passed)
    );
    assert_eq!(
        governor.proposal_state(idx, after_epoch(1)),
        Ok(ProposalState::Rejected)
    );
}
