//! Tally Incentive Ledgers
//!
//! Tracks incentive deposits per `(epoch, choice, token)` and pays them out
//! under two policies, mirroring the two vote engines in
//! `tally-governance`:
//!
//! - **Inclusion** (winner-take-all): deposits ride on a candidate; if the
//!   candidate wins its epoch, voters for it split the pot pro-rata by
//!   their weight on the winning choice.  Deposits on losing candidates are
//!   refunded to their depositors in full.
//! - **Weight** (pro-rata among choice voters): deposits ride on a pool
//!   asset; once the epoch closes, voters for that asset split the pot.
//!
//! Both ledgers take an optional fee cut on claims, keep an `unclaimed`
//! balance per `(epoch, token)`, and let management sweep whatever remains
//! once a full extra epoch has elapsed.
//!
//! Large or retroactive distributions go through the **Merkle claim
//! facility** instead: amounts are computed off-line by the
//! [`distribution`] builder, published as one 32-byte root per vote id, and
//! claimed with per-leaf inclusion proofs.
//!
//! # Claim flow
//!
//! ```text
//! ballots ─► distribution::filter_votes ─► pro-rata amounts
//!                                            │
//!                                            ▼
//!                       tally-merkle-tree  (root per vote id)
//!                                            │
//!              set_root ─► MerkleIncentives ◄┘
//!                             │ claim(proof)
//!                             ▼
//!                         TokenSink
//! ```

#![allow(clippy::arithmetic_side_effects)]

pub mod distribution;
pub mod error;
pub mod inclusion;
pub mod ledger;
pub mod merkle_claims;
pub mod sink;
pub mod weight;

pub use {
    error::IncentiveError,
    inclusion::InclusionIncentives,
    merkle_claims::{MerkleIncentives, VoteId, VotePurpose},
    sink::TokenSink,
    weight::WeightIncentives,
};
