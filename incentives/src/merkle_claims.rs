//! Merkle-root claim facility.
//!
//! The generic incentive pot: deposits accumulate per `(vote id, choice,
//! token)` while a vote runs, the off-line [`distribution`] builder turns
//! the outcome into per-account amounts, and management publishes a single
//! Merkle root per vote id.  From then on the vote is concluded — no more
//! deposits — and claimants withdraw with per-leaf proofs.
//!
//! A root is set **once**.  Replacing a root out from under processed
//! claims would let entitlements be double-issued, so replacement is
//! rejected outright rather than gated on "no claims yet".
//!
//! [`distribution`]: crate::distribution

use {
    crate::{
        error::{IncentiveError, Result},
        sink::TokenSink,
    },
    borsh::{BorshDeserialize, BorshSerialize},
    log::{debug, info},
    serde::{Serialize, Serializer},
    solana_hash::Hash,
    solana_pubkey::Pubkey,
    std::{collections::HashMap, fmt},
    tally_merkle_tree::{leaf_hash, verify_proof},
};

// ---------------------------------------------------------------------------
// Vote ids
// ---------------------------------------------------------------------------

/// What a vote id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VotePurpose {
    /// Candidate inclusion vote.
    Inclusion = 1,
    /// Pool weight vote.
    Weight = 2,
}

/// Fixed-width identifier for one incentive round.
///
/// Wire layout (32 bytes): byte 0 is the epoch, byte 1 the purpose, byte
/// 31 a sub-index distinguishing parallel distributions of the same round
/// (several incentive tokens, a refund tree).  Everything else is zero, so
/// a valid id is never the zero id.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct VoteId([u8; 32]);

impl VoteId {
    /// Build an id.  The wire format allots a single epoch byte; epochs
    /// past 255 are rejected rather than truncated.
    pub fn new(epoch: u64, purpose: VotePurpose, sub_index: u8) -> Result<Self> {
        let epoch: u8 = epoch.try_into().map_err(|_| IncentiveError::InvalidVoteId)?;
        let mut bytes = [0u8; 32];
        bytes[0] = epoch;
        bytes[1] = purpose as u8;
        bytes[31] = sub_index;
        Ok(Self(bytes))
    }

    /// Reconstruct an id from its wire bytes.  The zero id is invalid.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self> {
        if bytes == [0u8; 32] {
            return Err(IncentiveError::InvalidVoteId);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn epoch(&self) -> u64 {
        self.0[0] as u64
    }

    pub fn sub_index(&self) -> u8 {
        self.0[31]
    }
}

impl fmt::Display for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for VoteId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Claim facility
// ---------------------------------------------------------------------------

/// Proof-gated incentive claims, one root per vote id.
#[derive(Debug, Clone)]
pub struct MerkleIncentives {
    management: Pubkey,
    pending_management: Option<Pubkey>,
    /// (vote, choice, token) → depositor → amount.  Audit trail; payouts
    /// are governed by the published root, not these records.
    deposits: HashMap<(VoteId, u8, Pubkey), HashMap<Pubkey, u128>>,
    totals: HashMap<(VoteId, u8, Pubkey), u128>,
    roots: HashMap<VoteId, Hash>,
    /// (vote, token, recipient) → amount paid.
    claimed: HashMap<(VoteId, Pubkey, Pubkey), u128>,
}

impl MerkleIncentives {
    pub fn new(management: Pubkey) -> Self {
        Self {
            management,
            pending_management: None,
            deposits: HashMap::new(),
            totals: HashMap::new(),
            roots: HashMap::new(),
            claimed: HashMap::new(),
        }
    }

    /// Deposit on `choice` (1-indexed; blank carries no incentives) of an
    /// open vote.  Rejected once the vote's root is published.
    pub fn deposit(
        &mut self,
        depositor: &Pubkey,
        vote: VoteId,
        choice: u8,
        token: &Pubkey,
        amount: u128,
    ) -> Result<()> {
        if choice == 0 {
            return Err(IncentiveError::InvalidChoice);
        }
        if amount == 0 {
            return Err(IncentiveError::ZeroAmount);
        }
        if self.roots.contains_key(&vote) {
            return Err(IncentiveError::VoteConcluded);
        }
        let total = self.totals.entry((vote, choice, *token)).or_default();
        *total = total
            .checked_add(amount)
            .ok_or(IncentiveError::ArithmeticOverflow)?;
        *self
            .deposits
            .entry((vote, choice, *token))
            .or_default()
            .entry(*depositor)
            .or_default() += amount;
        debug!("merkle incentive deposit: vote {vote}, choice {choice}, {amount}");
        Ok(())
    }

    pub fn deposited(&self, vote: VoteId, choice: u8, token: &Pubkey) -> u128 {
        self.totals.get(&(vote, choice, *token)).copied().unwrap_or(0)
    }

    pub fn deposited_by(
        &self,
        vote: VoteId,
        choice: u8,
        token: &Pubkey,
        depositor: &Pubkey,
    ) -> u128 {
        self.deposits
            .get(&(vote, choice, *token))
            .and_then(|by| by.get(depositor))
            .copied()
            .unwrap_or(0)
    }

    /// Publish the distribution root for `vote`, concluding it.
    /// Management only; a vote id's root can never be replaced.
    pub fn set_root(&mut self, caller: &Pubkey, vote: VoteId, root: Hash) -> Result<()> {
        if *caller != self.management {
            return Err(IncentiveError::Unauthorized);
        }
        if self.roots.contains_key(&vote) {
            return Err(IncentiveError::RootAlreadySet);
        }
        self.roots.insert(vote, root);
        info!("merkle incentive root published: vote {vote}, root {root}");
        Ok(())
    }

    pub fn root(&self, vote: VoteId) -> Option<Hash> {
        self.roots.get(&vote).copied()
    }

    /// Whether `(vote, token)` has been claimed by `recipient`.
    pub fn claimed(&self, vote: VoteId, token: &Pubkey, recipient: &Pubkey) -> Option<u128> {
        self.claimed.get(&(vote, *token, *recipient)).copied()
    }

    /// Withdraw an entitlement.
    ///
    /// `proof` and `leaf_index` must open the leaf
    /// `(recipient, token, amount)` against the published root.  Each
    /// `(vote, token, recipient)` pays at most once; a repeat claim is a
    /// hard rejection so malformed bots surface instead of looping.
    pub fn claim<S: TokenSink>(
        &mut self,
        vote: VoteId,
        token: &Pubkey,
        amount: u128,
        proof: &[Hash],
        leaf_index: usize,
        recipient: &Pubkey,
        sink: &mut S,
    ) -> Result<u128> {
        let root = self.roots.get(&vote).ok_or(IncentiveError::UnknownRoot)?;
        if self.claimed.contains_key(&(vote, *token, *recipient)) {
            return Err(IncentiveError::AlreadyClaimed);
        }
        let leaf = leaf_hash(recipient, token, amount);
        if !verify_proof(&leaf, leaf_index, proof, root) {
            return Err(IncentiveError::InvalidProof);
        }
        sink.transfer(token, recipient, amount)?;
        self.claimed.insert((vote, *token, *recipient), amount);
        info!("merkle incentive claim: vote {vote}, {amount} to {recipient}");
        Ok(amount)
    }

    pub fn management(&self) -> Pubkey {
        self.management
    }

    pub fn set_management(&mut self, caller: &Pubkey, new_management: Pubkey) -> Result<()> {
        if *caller != self.management {
            return Err(IncentiveError::Unauthorized);
        }
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
