use sha2::{Digest, Sha256};

use crate::canonical_merkle::tree::MerkleHash;

/// A domain separator indicating that a hash commits to a leaf
pub const LEAF_DOMAIN_SEPARATOR: [u8; 1] = [0u8];

fn leaf_hash(bytes: &[u8]) -> [u8; 32] {
    // Leaves are tagged and hashed twice. Internal nodes hash exactly 64
    // bytes of input, so no tagged-and-rehashed leaf preimage can be
    // reinterpreted as an internal node.
    let mut hasher = Sha256::new_with_prefix(LEAF_DOMAIN_SEPARATOR);
    hasher.update(bytes);
    let tagged: [u8; 32] = hasher.finalize().into();
    Sha256::digest(tagged).into()
}

fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    // Children are hashed in ascending byte order, so the combination is
    // commutative.
    let (lo, hi) = if left <= right {
        (left, right)
    } else {
        (right, left)
    };
    let mut hasher = Sha256::new();
    hasher.update(lo);
    hasher.update(hi);
    hasher.finalize().into()
}

/// A sha256 hasher for canonical merkle trees: leaves are domain-tagged and
/// double-hashed, and sibling nodes combine in sorted byte order so the pair
/// hash is independent of tree position.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanonicalSha2Hasher;

impl CanonicalSha2Hasher {
    /// Create a new instance of the hasher
    pub fn new() -> Self {
        CanonicalSha2Hasher
    }
}

impl MerkleHash for CanonicalSha2Hasher {
    type Output = [u8; 32];

    fn hash_leaf(&self, data: &[u8]) -> Self::Output {
        leaf_hash(data)
    }

    fn hash_nodes(&self, left: &Self::Output, right: &Self::Output) -> Self::Output {
        node_hash(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_hash_golden_vectors() {
        let hasher = CanonicalSha2Hasher::new();
        assert_eq!(
            hex::encode(hasher.hash_leaf(b"")),
            "1406e05881e299367766d313e26c05564ec91bf721d31726bd6e46e60689539a"
        );
        assert_eq!(
            hex::encode(hasher.hash_leaf(b"hello")),
            "9c3c2362be503f68dadedf00fb90549b988da4f7db6f3e4caf2c2dee8558e0f9"
        );
    }

    #[test]
    fn test_leaf_hash_is_domain_separated() {
        let hasher = CanonicalSha2Hasher::new();
        // A plain untagged digest of the same input must not collide with
        // the leaf rule.
        let plain: [u8; 32] = Sha256::digest(b"hello").into();
        assert_eq!(
            hex::encode(plain),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_ne!(hasher.hash_leaf(b"hello"), plain);
    }

    #[test]
    fn test_node_hash_commutes() {
        let hasher = CanonicalSha2Hasher::new();
        let a = [0x11u8; 32];
        let b = [0x22u8; 32];
        let forward = hasher.hash_nodes(&a, &b);
        assert_eq!(forward, hasher.hash_nodes(&b, &a));
        assert_eq!(
            hex::encode(forward),
            "5189c77d29fe5d546a045ec46986852785fea5c13ac7da9c115ff5fb6edf817c"
        );
    }

    #[test]
    fn test_node_hash_differs_from_leaf_hash_of_concatenation() {
        let hasher = CanonicalSha2Hasher::new();
        let a = [0x11u8; 32];
        let b = [0x22u8; 32];
        let mut concatenated = [0u8; 64];
        concatenated[..32].copy_from_slice(&a);
        concatenated[32..].copy_from_slice(&b);
        assert_ne!(hasher.hash_nodes(&a, &b), hasher.hash_leaf(&concatenated));
    }
}
