//! A serializable interchange form of a built tree: the root and every
//! record's inclusion proof as `0x`-prefixed hex, keyed by one field of the
//! record. This is the shape downstream tooling consumes (typically as
//! JSON), so the hex rendering here is part of the external contract.

use crate::canonical_merkle::error::TreeError;
use crate::canonical_merkle::tree::MerkleHash;
use crate::maybestd::collections::BTreeMap;
use crate::maybestd::fmt;
use crate::maybestd::format;
use crate::maybestd::string::{String, ToString};
use crate::maybestd::vec::Vec;
use crate::RecordMerkleTree;

/// The root and proofs of a [`RecordMerkleTree`] rendered to hex strings.
///
/// Proofs are keyed by the `Display` form of one field chosen from each
/// record (addresses as `0x` hex, integers in decimal), so the keying field
/// must be unique across records. A `BTreeMap` keeps serialization
/// deterministic.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProofArtifact {
    /// The tree root, `0x`-prefixed lowercase hex
    pub root: String,
    /// Each record's proof, leaf to root, every element `0x`-prefixed
    /// lowercase hex
    pub proofs: BTreeMap<String, Vec<String>>,
}

impl ProofArtifact {
    /// Renders a built tree, keying each record's proof by the field at
    /// `key_field`. Fails if `key_field` is not a valid schema index or if
    /// two records render identical keys.
    pub fn from_tree<M>(
        tree: &RecordMerkleTree<M>,
        key_field: usize,
    ) -> Result<Self, ArtifactError>
    where
        M: MerkleHash,
        M::Output: AsRef<[u8]>,
    {
        let fields = tree.schema().fields().len();
        if key_field >= fields {
            return Err(ArtifactError::KeyFieldOutOfRange {
                index: key_field,
                fields,
            });
        }

        let mut proofs = BTreeMap::new();
        for (index, record) in tree.records().iter().enumerate() {
            let key = record[key_field].to_string();
            let siblings: Vec<String> = tree
                .proof(index)?
                .siblings()
                .iter()
                .map(|sibling| hex_0x(sibling.as_ref()))
                .collect();
            if proofs.insert(key.clone(), siblings).is_some() {
                return Err(ArtifactError::DuplicateKey { key });
            }
        }

        Ok(Self {
            root: hex_0x(tree.root().as_ref()),
            proofs,
        })
    }
}

fn hex_0x(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// An error that occurred while rendering a tree to a [`ProofArtifact`]
#[derive(Debug, PartialEq, Clone)]
pub enum ArtifactError {
    /// The chosen key field index exceeds the schema
    KeyFieldOutOfRange {
        /// The requested field index
        index: usize,
        /// The schema's field count
        fields: usize,
    },
    /// Two records render the same key, so their proofs would collide
    DuplicateKey {
        /// The rendered key both records produced
        key: String,
    },
    /// A proof query failed
    Tree(TreeError),
}

impl From<TreeError> for ArtifactError {
    fn from(value: TreeError) -> Self {
        ArtifactError::Tree(value)
    }
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactError::KeyFieldOutOfRange { index, fields } => {
                write!(
                    f,
                    "key field {} is out of range for a schema of {} fields",
                    index, fields
                )
            }
            ArtifactError::DuplicateKey { key } => {
                write!(f, "two records render the same key {}", key)
            }
            ArtifactError::Tree(err) => err.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ArtifactError {}
