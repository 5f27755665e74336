//! Custom errors for the Tally governance engine.

use {
    num_derive::{FromPrimitive, ToPrimitive},
    thiserror::Error,
};

/// Every rejection the engine can produce.  All failures are full no-ops:
/// no operation leaves partial state behind.  Benign idempotent repeats
/// (an early `finalize_epoch` crank, a repeat incentive claim) do *not*
/// surface as errors — callers can tell "try again differently" from
/// "already satisfied".
#[derive(Error, Debug, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum GovernanceError {
    #[error("Timestamp precedes the genesis of the epoch schedule")]
    BeforeGenesis = 0,

    #[error("Application phase is closed for this epoch")]
    ApplyClosed,

    #[error("Voting is not open")]
    VoteClosed,

    #[error("Epoch has not ended yet")]
    EpochNotOver,

    #[error("Candidate has already applied this epoch")]
    AlreadyApplied,

    #[error("Account has already voted this epoch")]
    AlreadyVoted,

    #[error("Caller is not authorized for this operation")]
    Unauthorized,

    #[error("Vote allocation does not sum to the required total")]
    InvalidAllocation,

    #[error("Vote references a choice that does not exist")]
    UnknownChoice,

    #[error("Account has no voting power")]
    NoVotingPower,

    #[error("Candidate's rate provider is disabled — winners cannot reapply")]
    ProviderDisabled,

    #[error("Application fee could not be collected")]
    FeeNotPaid,

    #[error("Recipient already has a delegator")]
    DelegationConflict,

    #[error("Delegate multiplier exceeds 10_000 basis points")]
    InvalidMultiplier,

    #[error("Proposal does not exist")]
    UnknownProposal,

    #[error("Proposal is not in the expected state for this operation")]
    InvalidProposalState,

    #[error("Execution payload does not match the proposed script hash")]
    ScriptMismatch,

    #[error("Execution delay has not elapsed")]
    DelayNotElapsed,

    #[error("Weight clamp band is infeasible for the number of assets")]
    InfeasibleClamp,

    #[error("Corrected weights do not sum to 10_000 basis points")]
    CorrectionMismatch,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
