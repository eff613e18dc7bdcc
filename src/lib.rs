#![cfg_attr(not(feature = "std"), no_std)]
//! This crate implements a canonical merkle tree over typed records. Leaf
//! hashes are sorted before the tree is built and sibling pairs are hashed
//! in sorted order, so the root commits to the record *set*: two parties
//! holding the same records in different orders compute the same root, and
//! either can hand out compact inclusion proofs that verify without any
//! positional bookkeeping.
//!
//! Records are tuples of typed fields (20-byte addresses and fixed-width
//! unsigned integers) encoded to a canonical byte form before hashing, so
//! roots and proofs are reproducible bit-for-bit across platforms.
//!
//! ```
//! use cmt_rs::{FieldType, FieldValue, RecordMerkleTree, RecordTreeBuilder, Schema, Uint};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::new(vec![FieldType::Address, FieldType::UINT256])?;
//! let mut builder = RecordTreeBuilder::new(schema.clone());
//! builder.add_record(vec![
//!     FieldValue::Address("0x88c0e901bd1fd1a77bda342f0d2210fdc71cef6b".parse()?),
//!     FieldValue::Uint(Uint::from(1u64)),
//! ])?;
//! builder.add_record(vec![
//!     FieldValue::Address("0x7231c364597f3bfdb72cf52b197cc59111e71794".parse()?),
//!     FieldValue::Uint(Uint::from(6u64)),
//! ])?;
//!
//! let tree: RecordMerkleTree = builder.build()?;
//! let proof = tree.proof(0)?;
//! let record = tree.record(0).expect("record 0 was added");
//! assert!(cmt_rs::verify_record(&schema, record, &proof, &tree.root())?);
//! # Ok(())
//! # }
//! ```

#[cfg(not(feature = "std"))]
extern crate alloc;

/// Renders a built tree and its proofs to a serializable hex artifact.
#[cfg(feature = "serde")]
pub mod artifact;
/// Implements the SHA-256 leaf and node hash rules.
pub mod canonical_hash;
/// Implements the order-independent merkle tree engine.
pub mod canonical_merkle;
/// A facade over items from `std` or `core`/`alloc`, depending on features.
pub mod maybestd;
/// Defines typed records and their canonical byte encoding.
pub mod record;

#[cfg(feature = "serde")]
pub use crate::artifact::{ArtifactError, ProofArtifact};
pub use crate::canonical_hash::CanonicalSha2Hasher;
pub use crate::canonical_merkle::error::TreeError;
pub use crate::canonical_merkle::proof::Proof;
pub use crate::canonical_merkle::tree::{CanonicalMerkleTree, MerkleHash};
pub use crate::record::{
    Address, EncodeError, FieldKind, FieldType, FieldValue, Schema, Uint,
};

use crate::maybestd::fmt;
use crate::maybestd::vec::Vec;
use bytes::Bytes;

/// Accumulates records against a fixed schema, then builds the tree.
///
/// Each record is validated and canonically encoded as it is added, so
/// encoding failures surface at the offending `add_record` call and
/// [`build`](Self::build) only reports tree-level failures. The order of
/// `add_record` calls assigns each record the index used for later proof
/// queries.
#[derive(Debug, Clone)]
pub struct RecordTreeBuilder {
    schema: Schema,
    records: Vec<Vec<FieldValue>>,
    encoded: Vec<Bytes>,
}

impl RecordTreeBuilder {
    /// Creates an empty builder over the given schema
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
            encoded: Vec::new(),
        }
    }

    /// Returns the schema records are checked against
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the number of records added so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records have been added
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Validates a record against the schema and queues it for the tree
    pub fn add_record(&mut self, values: Vec<FieldValue>) -> Result<(), EncodeError> {
        let encoded = self.schema.encode(&values)?;
        self.records.push(values);
        self.encoded.push(encoded);
        Ok(())
    }

    /// Builds the tree with a default hasher, consuming the builder
    pub fn build<M>(self) -> Result<RecordMerkleTree<M>, RecordTreeError>
    where
        M: MerkleHash + Default,
    {
        self.build_with_hasher(Default::default())
    }

    /// Builds the tree with the given hasher, consuming the builder
    pub fn build_with_hasher<M>(self, hasher: M) -> Result<RecordMerkleTree<M>, RecordTreeError>
    where
        M: MerkleHash,
    {
        let tree = CanonicalMerkleTree::from_leaves_with_hasher(hasher, self.encoded)?;
        Ok(RecordMerkleTree {
            schema: self.schema,
            records: self.records,
            tree,
        })
    }
}

/// A built tree over typed records: the hash engine together with the schema
/// and records it commits to.
///
/// The tree is immutable once built. Proof queries take `&self` and may run
/// concurrently; record indices refer to the order records were added to the
/// builder.
pub struct RecordMerkleTree<M = CanonicalSha2Hasher>
where
    M: MerkleHash,
{
    schema: Schema,
    records: Vec<Vec<FieldValue>>,
    tree: CanonicalMerkleTree<M>,
}

impl<M> RecordMerkleTree<M>
where
    M: MerkleHash,
{
    /// Returns the root committing to every record
    pub fn root(&self) -> M::Output {
        self.tree.root()
    }

    /// Returns the schema the records were encoded with
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the committed records in the order they were added
    pub fn records(&self) -> &[Vec<FieldValue>] {
        &self.records
    }

    /// Returns the record added at `index`, if any
    pub fn record(&self, index: usize) -> Option<&[FieldValue]> {
        self.records.get(index).map(Vec::as_slice)
    }

    /// Returns the number of committed records
    pub fn leaf_count(&self) -> usize {
        self.tree.leaf_count()
    }

    /// Returns the underlying hash engine
    pub fn merkle_tree(&self) -> &CanonicalMerkleTree<M> {
        &self.tree
    }

    /// Builds an inclusion proof for the record added at `index`
    pub fn proof(&self, index: usize) -> Result<Proof<M>, TreeError> {
        self.tree.proof(index)
    }

    /// Builds an inclusion proof for a record by value, for callers that
    /// hold records rather than insertion indices
    pub fn proof_for_record(&self, values: &[FieldValue]) -> Result<Proof<M>, RecordTreeError> {
        let leaf = hash_record(self.tree.hasher(), &self.schema, values)?;
        Ok(self.tree.proof_of_leaf(&leaf)?)
    }
}

/// Encodes a record against a schema and hashes it under the leaf rule
pub fn hash_record<M>(
    hasher: &M,
    schema: &Schema,
    values: &[FieldValue],
) -> Result<M::Output, EncodeError>
where
    M: MerkleHash,
{
    let encoded = schema.encode(values)?;
    Ok(hasher.hash_leaf(&encoded))
}

/// Verifies that `proof` commits the given record to `root` under a default
/// hasher. A record that fails to encode is an error; a proof that does not
/// check out is `Ok(false)`.
pub fn verify_record<M>(
    schema: &Schema,
    values: &[FieldValue],
    proof: &Proof<M>,
    root: &M::Output,
) -> Result<bool, EncodeError>
where
    M: MerkleHash + Default,
{
    verify_record_with_hasher(schema, values, proof, root, M::default())
}

/// Verifies that `proof` commits the given record to `root` under the given
/// hasher
pub fn verify_record_with_hasher<M>(
    schema: &Schema,
    values: &[FieldValue],
    proof: &Proof<M>,
    root: &M::Output,
    hasher: M,
) -> Result<bool, EncodeError>
where
    M: MerkleHash,
{
    let leaf = hash_record(&hasher, schema, values)?;
    Ok(proof.verify_with_hasher(&leaf, root, hasher))
}

/// An error from the record layer: a record failed to encode, or building
/// or querying the tree failed
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum RecordTreeError {
    /// A record does not conform to the schema
    Encode(EncodeError),
    /// The tree could not be built or the query was invalid
    Tree(TreeError),
}

impl From<EncodeError> for RecordTreeError {
    fn from(value: EncodeError) -> Self {
        RecordTreeError::Encode(value)
    }
}

impl From<TreeError> for RecordTreeError {
    fn from(value: TreeError) -> Self {
        RecordTreeError::Tree(value)
    }
}

impl fmt::Display for RecordTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordTreeError::Encode(err) => err.fmt(f),
            RecordTreeError::Tree(err) => err.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RecordTreeError {}
