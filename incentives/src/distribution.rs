//! Off-chain distribution builder.
//!
//! Reproduces the published claims artifact for one incentive round:
//! filter the epoch's ballots down to a choice, split the pot pro-rata
//! over the filtered weights (flooring; the dust is never distributed),
//! commit the entitlements to a Merkle tree per `(vote id, token)`, and
//! emit the canonical JSON payload handed to claimants —
//! `account → [{vote, incentive, amount, proof}]`.
//!
//! Everything here is pure and deterministic: ballot order fixes leaf
//! order, which fixes every proof.

use {
    crate::{
        error::{IncentiveError, Result},
        merkle_claims::VoteId,
    },
    serde::{Serialize, Serializer},
    solana_hash::Hash,
    solana_pubkey::Pubkey,
    std::collections::BTreeMap,
    tally_governance::math::mul_div,
    tally_merkle_tree::{ClaimLeaf, MerkleTree},
};

/// Keep only the accounts with weight on `choice`, preserving ballot
/// order.  Returns the filtered total and the per-account weights.
pub fn filter_votes<'a>(
    ballots: impl IntoIterator<Item = (&'a Pubkey, &'a [u128])>,
    choice: usize,
) -> (u128, Vec<(Pubkey, u128)>) {
    let mut total = 0u128;
    let mut filtered = Vec::new();
    for (account, allocations) in ballots {
        let weight = allocations.get(choice).copied().unwrap_or(0);
        if weight > 0 {
            total += weight;
            filtered.push((*account, weight));
        }
    }
    (total, filtered)
}

/// One finished distribution: the entitlements and their Merkle tree.
#[derive(Debug, Clone)]
pub struct Distribution {
    pub vote: VoteId,
    pub token: Pubkey,
    pub leaves: Vec<ClaimLeaf>,
    tree: MerkleTree,
}

impl Distribution {
    /// Split `pot` over `votes` pro-rata: `pot * vote / total`, floored.
    /// The flooring dust stays in the pot (sweepable later); it is never
    /// redistributed.
    pub fn pro_rata(
        vote: VoteId,
        token: Pubkey,
        pot: u128,
        votes: &[(Pubkey, u128)],
    ) -> Result<Self> {
        let total: u128 = votes.iter().map(|(_, weight)| *weight).sum();
        if votes.is_empty() || total == 0 {
            return Err(IncentiveError::InvalidDistribution);
        }
        let leaves: Vec<ClaimLeaf> = votes
            .iter()
            .map(|(account, weight)| {
                let amount = mul_div(pot, *weight, total)
                    .ok_or(IncentiveError::ArithmeticOverflow)?;
                Ok(ClaimLeaf {
                    recipient: *account,
                    token,
                    amount,
                })
            })
            .collect::<Result<_>>()?;
        let tree = MerkleTree::build(&leaves).map_err(|_| IncentiveError::InvalidDistribution)?;
        Ok(Self {
            vote,
            token,
            leaves,
            tree,
        })
    }

    /// A single-recipient refund, published as the same entitlement twice
    /// so the tree has a conventional two-leaf shape.
    pub fn refund(vote: VoteId, token: Pubkey, recipient: Pubkey, amount: u128) -> Result<Self> {
        if amount == 0 {
            return Err(IncentiveError::ZeroAmount);
        }
        let leaf = ClaimLeaf {
            recipient,
            token,
            amount,
        };
        let leaves = vec![leaf, leaf];
        let tree = MerkleTree::build(&leaves).map_err(|_| IncentiveError::InvalidDistribution)?;
        Ok(Self {
            vote,
            token,
            leaves,
            tree,
        })
    }

    pub fn root(&self) -> Hash {
        self.tree.root()
    }

    pub fn proof(&self, leaf_index: usize) -> Result<Vec<Hash>> {
        self.tree
            .proof(leaf_index)
            .map_err(|_| IncentiveError::InvalidDistribution)
    }
}

// ---------------------------------------------------------------------------
// Published artifact
// ---------------------------------------------------------------------------

fn ser_pubkey<S: Serializer>(pubkey: &Pubkey, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&pubkey.to_string())
}

// Amounts can exceed u64; JSON numbers cannot, so they go out as decimal
// strings.
fn ser_amount<S: Serializer>(amount: &u128, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&amount.to_string())
}

fn ser_proof<S: Serializer>(proof: &[Hash], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(
        proof
            .iter()
            .map(|hash| format!("0x{}", hex::encode(hash.as_ref()))),
    )
}

/// One claimable entitlement inside the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimEntry {
    pub vote: VoteId,
    #[serde(serialize_with = "ser_pubkey")]
    pub incentive: Pubkey,
    #[serde(serialize_with = "ser_amount")]
    pub amount: u128,
    /// Leaf position; claimants pass it with the proof.
    pub index: usize,
    #[serde(serialize_with = "ser_proof")]
    pub proof: Vec<Hash>,
}

/// The canonical claim-submission payload:
/// `account → [{vote, incentive, amount, index, proof}]`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ClaimArtifact(pub BTreeMap<String, Vec<ClaimEntry>>);

impl ClaimArtifact {
    /// Collate entitlements and proofs across distributions.
    pub fn build(distributions: &[Distribution]) -> Result<Self> {
        let mut by_account: BTreeMap<String, Vec<ClaimEntry>> = BTreeMap::new();
        for distribution in distributions {
            for (index, leaf) in distribution.leaves.iter().enumerate() {
                // Refund trees duplicate their leaf; publish it once.
                if distribution.leaves[..index].contains(leaf) {
                    continue;
                }
                let proof = distribution.proof(index)?;
                by_account
                    .entry(leaf.recipient.to_string())
                    .or_default()
                    .push(ClaimEntry {
                        vote: distribution.vote,
                        incentive: distribution.token,
                        amount: leaf.amount,
                        index,
                        proof,
                    });
            }
        }
        Ok(Self(by_account))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|_| IncentiveError::InvalidDistribution)
    }
}
