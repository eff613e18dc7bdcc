use super::tree::MerkleHash;
use crate::maybestd::vec::Vec;

/// A proof that a canonical merkle tree commits to a particular leaf.
///
/// Siblings are ordered from the leaf level up to just below the root. A
/// leaf promoted past an odd-sized level has no sibling there and
/// contributes no element for it, so proof lengths vary per leaf when the
/// leaf count is not a power of two. Verification folds the siblings into
/// the leaf hash with the same order-independent pair rule the builder
/// uses; proofs carry no left/right position data.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proof<M: MerkleHash> {
    /// The sibling hashes on the path from the leaf to the root.
    pub siblings: Vec<M::Output>,
}

impl<M: MerkleHash> Default for Proof<M> {
    fn default() -> Self {
        Self {
            siblings: Default::default(),
        }
    }
}

impl<M> Proof<M>
where
    M: MerkleHash + Default,
{
    /// Verify that `root` commits to `leaf_hash`, using a default-constructed
    /// hasher. An invalid proof is an expected input here, not an error, so
    /// the outcome is a plain boolean.
    pub fn verify(&self, leaf_hash: &M::Output, root: &M::Output) -> bool {
        self.verify_with_hasher(leaf_hash, root, M::default())
    }
}

impl<M> Proof<M>
where
    M: MerkleHash,
{
    /// Creates a proof from the given siblings, ordered leaf to root
    pub fn from_siblings(siblings: Vec<M::Output>) -> Self {
        Self { siblings }
    }

    /// Verify that `root` commits to `leaf_hash` with the given hasher.
    ///
    /// The accumulator starts at the leaf hash and absorbs one sibling per
    /// step; the pair rule sorts the two hashes itself, so replaying the
    /// siblings in order is all a verifier has to do. An empty proof
    /// verifies exactly when the leaf hash is the root, which is the
    /// single-leaf tree.
    pub fn verify_with_hasher(&self, leaf_hash: &M::Output, root: &M::Output, hasher: M) -> bool {
        let mut acc = leaf_hash.clone();
        for sibling in self.siblings.iter() {
            acc = hasher.hash_nodes(&acc, sibling);
        }
        acc == *root
    }

    /// Returns the siblings provided as part of the proof
    pub fn siblings(&self) -> &Vec<M::Output> {
        &self.siblings
    }

    /// Returns the number of siblings in the proof
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    /// Returns true if the proof carries no siblings, as for a single-leaf
    /// tree
    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_hash::CanonicalSha2Hasher;

    fn sample_proof() -> Proof<CanonicalSha2Hasher> {
        Proof::from_siblings(vec![[0x11u8; 32], [0x22u8; 32], [0x33u8; 32]])
    }

    #[test]
    fn test_empty_proof_verifies_only_the_root_itself() {
        let hasher = CanonicalSha2Hasher::new();
        let leaf = hasher.hash_leaf(b"only");
        let other = hasher.hash_leaf(b"other");
        let proof = Proof::<CanonicalSha2Hasher>::default();
        assert!(proof.is_empty());
        assert!(proof.verify(&leaf, &leaf));
        assert!(!proof.verify(&leaf, &other));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_proof_serde_json() {
        let proof = sample_proof();

        let serialized = serde_json::to_vec(&proof).expect("Serialization to vec must succeed");
        let got: Proof<CanonicalSha2Hasher> =
            serde_json::from_slice(&serialized[..]).expect("serialized proof is correct");

        assert_eq!(got, proof);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_proof_serde_postcard() {
        let proof = sample_proof();

        let serialized = postcard::to_allocvec(&proof).expect("Serialization to vec must succeed");
        let got: Proof<CanonicalSha2Hasher> =
            postcard::from_bytes(&serialized[..]).expect("serialized proof is correct");

        assert_eq!(got, proof);
    }

    #[cfg(feature = "borsh")]
    #[test]
    fn test_proof_borsh_round_trip() {
        let proof = sample_proof();

        let serialized = borsh::to_vec(&proof).expect("Serialization to vec must succeed");
        let got: Proof<CanonicalSha2Hasher> =
            borsh::from_slice(&serialized[..]).expect("serialized proof is correct");

        assert_eq!(got, proof);
    }
}
