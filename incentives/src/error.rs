//! Custom errors for the Tally incentive ledgers.

use {
    num_derive::{FromPrimitive, ToPrimitive},
    thiserror::Error,
};

/// Incentive-side rejections.  As on the governance side, every failure is
/// a full no-op.  The one deliberate non-error: a repeat `claim` on the
/// epoch ledgers succeeds with a zero payout so claim bots can distinguish
/// "already satisfied" from "rejected".
#[derive(Error, Debug, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum IncentiveError {
    #[error("Deposit window for this epoch has closed")]
    DepositClosed = 0,

    #[error("Deposit amount must be nonzero")]
    ZeroAmount,

    #[error("Choice index is invalid (choices are 1-indexed)")]
    InvalidChoice,

    #[error("Nothing to refund for this deposit")]
    NotRefundable,

    #[error("Unclaimed balance is not sweepable yet")]
    NotYetSweepable,

    #[error("Caller is not authorized for this operation")]
    Unauthorized,

    #[error("Vote id is malformed")]
    InvalidVoteId,

    #[error("Vote has concluded — its Merkle root is already published")]
    VoteConcluded,

    #[error("A root is already published for this vote id")]
    RootAlreadySet,

    #[error("No root published for this vote id")]
    UnknownRoot,

    #[error("Merkle proof does not verify against the published root")]
    InvalidProof,

    #[error("Recipient has already claimed this (vote, token) entitlement")]
    AlreadyClaimed,

    #[error("Token transfer failed")]
    TransferFailed,

    #[error("Timestamp precedes the genesis of the epoch schedule")]
    BeforeGenesis,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Distribution input is empty or inconsistent")]
    InvalidDistribution,
}

impl From<tally_governance::GovernanceError> for IncentiveError {
    fn from(err: tally_governance::GovernanceError) -> Self {
        match err {
            tally_governance::GovernanceError::BeforeGenesis => Self::BeforeGenesis,
            tally_governance::GovernanceError::ArithmeticOverflow => Self::ArithmeticOverflow,
            _ => Self::InvalidDistribution,
        }
    }
}

pub type Result<T> = std::result::Result<T, IncentiveError>;
