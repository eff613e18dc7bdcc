use super::error::TreeError;
use super::proof::Proof;
use super::utils::{num_levels, parent_index, sibling_index};
use crate::maybestd::fmt::Debug;
use crate::maybestd::vec::Vec;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A trait for hashing data into a canonical merkle tree. Implementations
/// are `Send + Sync` so construction can hash leaves and combine levels in
/// parallel.
pub trait MerkleHash: Send + Sync {
    /// The output of this hasher.
    #[cfg(all(not(feature = "serde"), not(feature = "borsh")))]
    type Output: Debug + PartialEq + Eq + Clone + Ord + Send + Sync;

    /// The output of this hasher.
    #[cfg(all(feature = "serde", not(feature = "borsh")))]
    type Output: Debug
        + PartialEq
        + Eq
        + Clone
        + Ord
        + Send
        + Sync
        + serde::Serialize
        + serde::de::DeserializeOwned;

    /// The output of this hasher.
    #[cfg(all(feature = "borsh", not(feature = "serde")))]
    type Output: Debug
        + PartialEq
        + Eq
        + Clone
        + Ord
        + Send
        + Sync
        + borsh::BorshSerialize
        + borsh::BorshDeserialize;

    /// The output of this hasher.
    #[cfg(all(feature = "serde", feature = "borsh"))]
    type Output: Debug
        + PartialEq
        + Eq
        + Clone
        + Ord
        + Send
        + Sync
        + serde::Serialize
        + serde::de::DeserializeOwned
        + borsh::BorshSerialize
        + borsh::BorshDeserialize;

    /// Hashes data as a "leaf" of the tree. This operation *should* be
    /// domain separated from `hash_nodes`.
    fn hash_leaf(&self, data: &[u8]) -> Self::Output;
    /// Hashes two sibling digests into their parent. This operation *must*
    /// be commutative; verifiers replay siblings with no position
    /// information.
    fn hash_nodes(&self, a: &Self::Output, b: &Self::Output) -> Self::Output;
}

/// Implements a canonical merkle tree over an in-memory level structure.
///
/// Leaf hashes are sorted into ascending byte order before any nodes are
/// combined, so the root depends only on the leaf *set*. Levels are built
/// strictly bottom-up; an odd-sized level promotes its unpaired last node to
/// the next level unchanged, with no duplication or zero padding:
///
/// ```ascii
///          root = hash(F, e)
///             /        \
///            F          |
///          /   \        |
///         D     E       |
///        / \   / \      |
///       a   b c   d     e
/// ```
///
/// Here `e` is promoted twice and its proof is the single element `[F]`,
/// while the proof for `a` is `[b, E, e]`. Once built, the tree is
/// immutable; proofs are read-only queries and may be issued concurrently.
pub struct CanonicalMerkleTree<M>
where
    M: MerkleHash,
{
    /// The hash structure, bottom-up: `levels[0]` holds the leaf hashes in
    /// canonical order and each subsequent level halves (rounding up) until
    /// the root level of exactly one hash.
    levels: Vec<Vec<M::Output>>,
    /// Maps the input position of each leaf to its position in the canonical
    /// order. Input positions are the public handle for proof queries.
    sorted_positions: Vec<usize>,
    hasher: M,
}

impl<M> CanonicalMerkleTree<M>
where
    M: MerkleHash + Default,
{
    /// Builds a tree over the given encoded leaves with a default hasher
    pub fn from_leaves<I, L>(leaves: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        Self::from_leaves_with_hasher(Default::default(), leaves)
    }
}

impl<M> CanonicalMerkleTree<M>
where
    M: MerkleHash,
{
    /// Builds a tree over the given encoded leaves with the given hasher.
    ///
    /// Every leaf is hashed with the domain-separated leaf rule, the hashes
    /// are sorted, and the levels are combined up to the root. Fails with
    /// [`TreeError::EmptyTree`] when no leaves are supplied and
    /// [`TreeError::DuplicateLeaf`] when two leaves hash identically.
    pub fn from_leaves_with_hasher<I, L>(hasher: M, leaves: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let leaves: Vec<L> = leaves.into_iter().collect();
        let hashes = {
            let slices: Vec<&[u8]> = leaves.iter().map(|leaf| leaf.as_ref()).collect();
            Self::hash_leaf_slices(&hasher, &slices)
        };
        Self::from_leaf_hashes_with_hasher(hasher, hashes)
    }

    /// Builds a tree over leaves that were already hashed with a rule
    /// compatible with the given hasher's `hash_leaf`
    pub fn from_leaf_hashes_with_hasher(
        hasher: M,
        hashes: Vec<M::Output>,
    ) -> Result<Self, TreeError> {
        if hashes.is_empty() {
            return Err(TreeError::EmptyTree);
        }

        // Canonical order is ascending by hash bytes. The sort is stable, so
        // equal hashes stay in input order and a duplicate reports the
        // earlier input index first.
        let mut order: Vec<usize> = (0..hashes.len()).collect();
        order.sort_by(|&a, &b| hashes[a].cmp(&hashes[b]));

        let mut sorted_positions = order.clone();
        for (position, &input_index) in order.iter().enumerate() {
            sorted_positions[input_index] = position;
        }

        let sorted: Vec<M::Output> = order.iter().map(|&i| hashes[i].clone()).collect();
        for (position, pair) in sorted.windows(2).enumerate() {
            if pair[0] == pair[1] {
                return Err(TreeError::DuplicateLeaf {
                    first: order[position],
                    second: order[position + 1],
                });
            }
        }

        let levels = Self::build_levels(&hasher, sorted);
        Ok(Self {
            levels,
            sorted_positions,
            hasher,
        })
    }

    fn hash_leaf_slices(hasher: &M, leaves: &[&[u8]]) -> Vec<M::Output> {
        // The parallel path preserves leaf order through the indexed
        // iterator, so both paths produce identical hash sequences.
        #[cfg(feature = "parallel")]
        let hashes = leaves.par_iter().map(|leaf| hasher.hash_leaf(leaf)).collect();
        #[cfg(not(feature = "parallel"))]
        let hashes = leaves.iter().map(|leaf| hasher.hash_leaf(leaf)).collect();
        hashes
    }

    /// Computes a level's parent level: adjacent pairs combine under the
    /// node rule and an unpaired trailing node is promoted unchanged.
    fn combine_level(hasher: &M, nodes: &[M::Output]) -> Vec<M::Output> {
        #[cfg(feature = "parallel")]
        let next = nodes
            .par_chunks(2)
            .map(|pair| Self::combine_pair(hasher, pair))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let next = nodes
            .chunks(2)
            .map(|pair| Self::combine_pair(hasher, pair))
            .collect();
        next
    }

    fn combine_pair(hasher: &M, pair: &[M::Output]) -> M::Output {
        if pair.len() == 2 {
            hasher.hash_nodes(&pair[0], &pair[1])
        } else {
            // The odd node out is carried up without a sibling.
            pair[0].clone()
        }
    }

    fn build_levels(hasher: &M, sorted_leaf_hashes: Vec<M::Output>) -> Vec<Vec<M::Output>> {
        let mut levels = Vec::with_capacity(num_levels(sorted_leaf_hashes.len()));
        levels.push(sorted_leaf_hashes);
        while levels[levels.len() - 1].len() > 1 {
            let next = Self::combine_level(hasher, &levels[levels.len() - 1]);
            levels.push(next);
        }
        levels
    }

    /// Returns the root committing to the entire leaf set. For a single-leaf
    /// tree this is that leaf's hash.
    pub fn root(&self) -> M::Output {
        self.levels[self.levels.len() - 1][0].clone()
    }

    /// Returns the number of leaves the tree commits to
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Returns the leaf hashes in canonical (ascending) order
    pub fn leaf_hashes(&self) -> &[M::Output] {
        &self.levels[0]
    }

    /// Returns the number of levels, counting the leaf level and the root
    pub fn height(&self) -> usize {
        self.levels.len()
    }

    /// Returns the hasher this tree was built with
    pub fn hasher(&self) -> &M {
        &self.hasher
    }

    /// Returns the canonical position of the leaf supplied at `input_index`
    pub fn sorted_position(&self, input_index: usize) -> Result<usize, TreeError> {
        self.sorted_positions
            .get(input_index)
            .copied()
            .ok_or(TreeError::IndexOutOfRange {
                index: input_index,
                leaf_count: self.leaf_count(),
            })
    }

    /// Builds an inclusion proof for the leaf supplied at `input_index`,
    /// which refers to the order leaves were supplied in, not the canonical
    /// order. The proof's siblings run from the leaf level to just below the
    /// root; that ordering is part of the proof format.
    pub fn proof(&self, input_index: usize) -> Result<Proof<M>, TreeError> {
        let position = self.sorted_position(input_index)?;
        Ok(self.proof_at_position(position))
    }

    /// Builds an inclusion proof for the given leaf hash, or
    /// [`TreeError::LeafNotFound`] if the tree does not commit to it
    pub fn proof_of_leaf(&self, leaf_hash: &M::Output) -> Result<Proof<M>, TreeError> {
        let position = self.levels[0]
            .binary_search(leaf_hash)
            .map_err(|_| TreeError::LeafNotFound)?;
        Ok(self.proof_at_position(position))
    }

    fn proof_at_position(&self, position: usize) -> Proof<M> {
        let mut siblings = Vec::with_capacity(self.levels.len() - 1);
        let mut index = position;
        for level in self.levels[..self.levels.len() - 1].iter() {
            let sibling = sibling_index(index);
            // A promoted node has no sibling at this level and contributes
            // no proof element for it.
            if sibling < level.len() {
                siblings.push(level[sibling].clone());
            }
            index = parent_index(index);
        }
        Proof::from_siblings(siblings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_hash::CanonicalSha2Hasher;

    fn single_byte_leaves(count: u8) -> Vec<[u8; 1]> {
        (0..count).map(|i| [i]).collect()
    }

    fn build(count: u8) -> CanonicalMerkleTree<CanonicalSha2Hasher> {
        CanonicalMerkleTree::from_leaves(single_byte_leaves(count)).expect("tree must build")
    }

    #[test]
    fn test_golden_roots() {
        assert_eq!(
            hex::encode(build(5).root()),
            "f767c8a8a9e01ca25d28cb16489ebb86689c955c8b19e3536c553ca75e656b71"
        );
        assert_eq!(
            hex::encode(build(16).root()),
            "257e832cdab0c4f5f9deefffee32666278c37f61e8a0ca8f0bfca22bd94e49c3"
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let result = CanonicalMerkleTree::<CanonicalSha2Hasher>::from_leaves(Vec::<&[u8]>::new());
        assert_eq!(result.err(), Some(TreeError::EmptyTree));
    }

    #[test]
    fn test_single_leaf_root_is_the_leaf_hash() {
        let hasher = CanonicalSha2Hasher::new();
        let tree =
            CanonicalMerkleTree::<CanonicalSha2Hasher>::from_leaves([b"lone leaf".as_ref()])
                .unwrap();
        assert_eq!(tree.root(), hasher.hash_leaf(b"lone leaf"));
        assert_eq!(tree.height(), 1);

        let proof = tree.proof(0).unwrap();
        assert!(proof.is_empty());
        assert!(proof.verify(&hasher.hash_leaf(b"lone leaf"), &tree.root()));
    }

    #[test]
    fn test_duplicate_leaves_are_rejected() {
        let leaves: Vec<&[u8]> = vec![b"a", b"b", b"a"];
        let result = CanonicalMerkleTree::<CanonicalSha2Hasher>::from_leaves(leaves);
        assert_eq!(
            result.err(),
            Some(TreeError::DuplicateLeaf {
                first: 0,
                second: 2
            })
        );
    }

    #[test]
    fn test_root_is_independent_of_input_order() {
        let forward: Vec<&[u8]> = vec![b"alpha", b"beta", b"gamma", b"delta", b"epsilon"];
        let mut shuffled = forward.clone();
        shuffled.swap(0, 4);
        shuffled.swap(1, 3);

        let a = CanonicalMerkleTree::<CanonicalSha2Hasher>::from_leaves(forward).unwrap();
        let b = CanonicalMerkleTree::<CanonicalSha2Hasher>::from_leaves(shuffled).unwrap();
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn test_every_proof_verifies_for_small_trees() {
        let hasher = CanonicalSha2Hasher::new();
        for count in 1..=8u8 {
            let tree = build(count);
            let root = tree.root();
            assert_eq!(tree.height(), super::num_levels(count as usize));
            for index in 0..count {
                let proof = tree.proof(index as usize).unwrap();
                let leaf_hash = hasher.hash_leaf(&[index]);
                assert!(
                    proof.verify(&leaf_hash, &root),
                    "proof for leaf {} of {} must verify",
                    index,
                    count
                );
            }
        }
    }

    #[test]
    fn test_promotion_shortens_proofs_of_unpaired_leaves() {
        // With three leaves the last canonical position is promoted once;
        // with five it is promoted twice.
        for (count, expected) in [(3u8, vec![2, 2, 1]), (5u8, vec![3, 3, 3, 3, 1])] {
            let tree = build(count);
            let mut lengths_by_position = vec![0usize; count as usize];
            for index in 0..count as usize {
                let position = tree.sorted_position(index).unwrap();
                lengths_by_position[position] = tree.proof(index).unwrap().len();
            }
            assert_eq!(lengths_by_position, expected, "leaf count = {}", count);
        }
    }

    #[test]
    fn test_proof_for_unknown_index_is_rejected() {
        let tree = build(3);
        assert_eq!(
            tree.proof(3).err(),
            Some(TreeError::IndexOutOfRange {
                index: 3,
                leaf_count: 3
            })
        );
    }

    #[test]
    fn test_proof_lookup_by_leaf_hash() {
        let hasher = CanonicalSha2Hasher::new();
        let tree = build(6);
        for index in 0..6u8 {
            let leaf_hash = hasher.hash_leaf(&[index]);
            let by_hash = tree.proof_of_leaf(&leaf_hash).unwrap();
            let by_index = tree.proof(index as usize).unwrap();
            assert_eq!(by_hash, by_index);
        }
        let absent = hasher.hash_leaf(b"absent");
        assert_eq!(tree.proof_of_leaf(&absent).err(), Some(TreeError::LeafNotFound));
    }

    #[test]
    fn test_tampering_breaks_verification() {
        let hasher = CanonicalSha2Hasher::new();
        let tree = build(5);
        let root = tree.root();
        let leaf_hash = hasher.hash_leaf(&[2]);
        let proof = tree.proof(2).unwrap();
        assert!(proof.verify(&leaf_hash, &root));

        // Flipping a single bit of any sibling must break the proof.
        for position in 0..proof.len() {
            let mut tampered = proof.clone();
            tampered.siblings[position][0] ^= 1;
            assert!(!tampered.verify(&leaf_hash, &root));
        }

        // A different committed leaf's hash must not verify against this
        // proof either.
        let other_leaf = hasher.hash_leaf(&[3]);
        assert!(!proof.verify(&other_leaf, &root));
    }

    #[test]
    fn test_no_leaf_hash_collides_with_an_internal_node() {
        let hasher = CanonicalSha2Hasher::new();
        let tree = build(16);
        let root = tree.root();
        let leaf_hashes = tree.leaf_hashes().to_vec();

        // Recompute every internal node by replaying each proof and collect
        // the intermediate accumulators.
        let mut internal = vec![root];
        for index in 0..16u8 {
            let mut acc = hasher.hash_leaf(&[index]);
            for sibling in tree.proof(index as usize).unwrap().siblings() {
                acc = hasher.hash_nodes(&acc, sibling);
                internal.push(acc);
            }
        }
        for node in internal.iter() {
            assert!(!leaf_hashes.contains(node));
        }
    }
}
