//! Tally Governance Engine
//!
//! Off-chain-reproducible core of Tally's epoch governance: voting weights,
//! multi-choice ballots, candidate inclusion votes, pool weight votes, and
//! the redistribution governor that turns vote results into new pool target
//! weights.  Every computation is integer-exact so that results can be
//! replayed bit-for-bit against the on-chain reference.
//!
//! # Epoch cadence
//!
//! Epochs are four weeks long, measured from a fixed genesis timestamp:
//!
//! ```text
//! |-------------- apply (3 weeks) --------------|---- vote (1 week) ----|
//! epoch start                               vote start          epoch end
//! ```
//!
//! Candidates register during the apply phase, ballots are cast during the
//! final week, and an epoch can be finalized by anyone once it has closed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 InclusionVote                    │
//! │  candidates, fees, per-choice totals, winners    │
//! └───────▲──────────────────────────────▲──────────┘
//!         │ weight at vote time          │ results
//! ┌───────┴────────┐            ┌────────┴──────────┐
//! │    Measure     │            │   PoolGovernor    │
//! │ stake snapshot │            │ redistribute +    │
//! │ + delegation   │            │ clamp to band     │
//! │ + decay        │            └────────▲──────────┘
//! └───────▲────────┘                     │ results
//! ┌───────┴────────┐            ┌────────┴──────────┐
//! │  StakeSource   │            │    WeightVote     │
//! │ (collaborator) │            │ per-asset ballots │
//! └────────────────┘            └───────────────────┘
//! ```
//!
//! Incentive accounting and Merkle claim publication live in the sibling
//! `tally-incentives` crate.

#![allow(clippy::arithmetic_side_effects)]

pub mod ballot;
pub mod constants;
pub mod epoch;
pub mod error;
pub mod governor;
pub mod inclusion;
pub mod math;
pub mod measure;
pub mod proposals;
pub mod weight;

pub use {
    epoch::EpochSchedule,
    error::GovernanceError,
    governor::PoolGovernor,
    inclusion::InclusionVote,
    measure::{DecayMeasure, DelegateMeasure, Measure, StakeSource},
    proposals::GenericGovernor,
    weight::WeightVote,
};
