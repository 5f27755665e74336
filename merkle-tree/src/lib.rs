//! Tally claim-entitlement Merkle tree.
//!
//! Incentive distributions are published as a single 32-byte root per vote
//! id; claimants submit a per-leaf inclusion proof.  A leaf commits to a
//! `(recipient, incentive_token, amount)` triple.  The tree shape is pinned
//! by the on-chain verifier and must be reproduced exactly:
//!
//! - a single leaf is duplicated once, so every tree has at least one
//!   two-node level and the root is always `hash_siblings(h, h)` of
//!   *something*;
//! - any level with an odd node count is padded by duplicating its **last**
//!   node before pairing;
//! - pairing is order-sensitive — `hash_siblings` is not commutative, so
//!   leaf order is significant and proofs carry no sibling-side flags.
//!   Verification recovers left/right placement from the leaf index parity
//!   at each level.
//!
//! ## Hash domains
//!
//! | Input                | Preimage                                        |
//! |----------------------|-------------------------------------------------|
//! | leaf                 | `"tally:leaf" ‖ recipient ‖ token ‖ amount_le`  |
//! | interior node        | `"tally:node" ‖ left ‖ right`                   |
//!
//! Both are SHA-256.  The domain prefixes keep a leaf from ever being
//! reinterpretable as an interior node (and vice versa).

#![allow(clippy::arithmetic_side_effects)]

use {solana_hash::Hash, solana_pubkey::Pubkey, solana_sha256_hasher::hashv, thiserror::Error};

/// Domain prefix for leaf hashes.
const LEAF_DOMAIN: &[u8] = b"tally:leaf";

/// Domain prefix for interior node hashes.
const NODE_DOMAIN: &[u8] = b"tally:node";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a tree over zero leaves")]
    EmptyLeaves,

    #[error("leaf index {index} out of range for {leaves} leaves")]
    LeafIndexOutOfRange { index: usize, leaves: usize },
}

// ---------------------------------------------------------------------------
// Leaves
// ---------------------------------------------------------------------------

/// A single claim entitlement: `recipient` may withdraw `amount` of `token`.
///
/// Identical leaves are permitted; refund distributions for a single
/// recipient are published as a two-leaf tree of the same entitlement twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimLeaf {
    pub recipient: Pubkey,
    pub token: Pubkey,
    pub amount: u128,
}

impl ClaimLeaf {
    /// Hash this leaf into its tree node.
    pub fn hash(&self) -> Hash {
        leaf_hash(&self.recipient, &self.token, self.amount)
    }
}

/// Domain-separated hash of a `(recipient, token, amount)` triple.
///
/// The amount is committed as 16 little-endian bytes.  This preimage layout
/// is the verifier contract; changing it invalidates every published root.
pub fn leaf_hash(recipient: &Pubkey, token: &Pubkey, amount: u128) -> Hash {
    hashv(&[
        LEAF_DOMAIN,
        recipient.as_ref(),
        token.as_ref(),
        &amount.to_le_bytes(),
    ])
}

/// Combine two child hashes into their parent.  Order-sensitive.
pub fn hash_siblings(left: &Hash, right: &Hash) -> Hash {
    hashv(&[NODE_DOMAIN, left.as_ref(), right.as_ref()])
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A fully materialized Merkle tree.
///
/// `levels[0]` is the (padded) leaf level; each subsequent entry is the
/// next level up, also recorded post-padding.  The root is kept separately
/// since the topmost single node is never padded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// Number of leaves the tree was built over, pre-duplication.
    leaf_count: usize,
    /// Every non-root level, recorded after odd-padding.
    levels: Vec<Vec<Hash>>,
    root: Hash,
}

impl MerkleTree {
    /// Build a tree over an ordered leaf sequence.
    ///
    /// The order of `leaves` is significant: it fixes every leaf index and
    /// therefore every proof.  Rejects an empty sequence.
    pub fn build(leaves: &[ClaimLeaf]) -> Result<Self, MerkleError> {
        Self::build_from_hashes(leaves.iter().map(ClaimLeaf::hash).collect())
    }

    /// Build a tree over pre-hashed leaves.
    pub fn build_from_hashes(hashes: Vec<Hash>) -> Result<Self, MerkleError> {
        if hashes.is_empty() {
            return Err(MerkleError::EmptyLeaves);
        }
        let leaf_count = hashes.len();

        let mut current = hashes;
        // Degenerate single-leaf case: duplicate once so the root is a real
        // two-child node rather than the leaf itself.
        if current.len() == 1 {
            current.push(current[0]);
        }

        let mut levels = Vec::new();
        while current.len() > 1 {
            if current.len() % 2 == 1 {
                // Odd level: duplicate the last node before pairing.
                let last = *current.last().expect("level is non-empty");
                current.push(last);
            }
            let next: Vec<Hash> = current
                .chunks_exact(2)
                .map(|pair| hash_siblings(&pair[0], &pair[1]))
                .collect();
            levels.push(current);
            current = next;
        }

        let root = current[0];
        Ok(Self {
            leaf_count,
            levels,
            root,
        })
    }

    pub fn root(&self) -> Hash {
        self.root
    }

    /// Number of leaves the tree commits to (excluding padding duplicates).
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Number of recorded (non-root) levels.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Inclusion proof for the leaf at `index`, ordered leaf-to-root.
    ///
    /// At each level the sibling of node `i` is `i + 1` when `i` is even and
    /// `i - 1` when odd; the index then halves for the next level up.
    pub fn proof(&self, index: usize) -> Result<Vec<Hash>, MerkleError> {
        if index >= self.leaf_count {
            return Err(MerkleError::LeafIndexOutOfRange {
                index,
                leaves: self.leaf_count,
            });
        }
        let mut proof = Vec::with_capacity(self.levels.len());
        let mut i = index;
        for level in &self.levels {
            let sibling = if i % 2 == 0 { i + 1 } else { i - 1 };
            proof.push(level[sibling]);
            i /= 2;
        }
        Ok(proof)
    }
}

/// Fold a proof from leaf to root and compare against the expected root.
///
/// `index` must be the leaf's original position; its bit pattern decides at
/// each level whether the running hash is the left or the right input.
pub fn verify_proof(leaf: &Hash, index: usize, proof: &[Hash], root: &Hash) -> bool {
    let mut node = *leaf;
    let mut i = index;
    for sibling in proof {
        node = if i % 2 == 0 {
            hash_siblings(&node, sibling)
        } else {
            hash_siblings(sibling, &node)
        };
        i /= 2;
    }
    node == *root
}
