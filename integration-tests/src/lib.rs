//! Tally Integration Tests
//!
//! Cross-crate scenario suite for the epoch governance and incentive
//! engines.
//!
//! # Subsystems Tested
//!
//! 1. **Merkle claims** — tree construction against an independent
//!    reference implementation, proof round-trips, refund trees
//! 2. **Inclusion voting** — apply/whitelist/vote/finalize lifecycle wired
//!    to the winner-take-all incentive ledger
//! 3. **Weight voting** — per-asset ballots feeding the redistribution
//!    governor and the pro-rata incentive ledger
//! 4. **Vote weight measures** — delegated staking with snapshot balances
//!    and the final-day linear decay
//! 5. **Distribution pipeline** — ballots → pro-rata amounts → published
//!    root → proof-gated claims, end to end
//! 6. **Generic proposals** — weighted yea/nay lifecycle against the shared
//!    epoch cadence

#![allow(clippy::arithmetic_side_effects)]

pub mod harness;


#[cfg(test)]
mod inclusion_tests;

#[cfg(test)]
mod weight_tests;



#[cfg(test)]
mod proposal_tests;
