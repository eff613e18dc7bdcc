//! Implements a canonical merkle tree: leaf hashes are sorted into ascending
//! byte order before the tree is built, and sibling pairs are hashed in
//! sorted order, so the root commits to the leaf *set* irrespective of the
//! order leaves were supplied in.

/// Defines errors that might arise while building a tree or querying proofs.
pub mod error;
/// Defines single-leaf inclusion proofs and their verification.
pub mod proof;
/// Defines the canonical merkle tree itself.
pub mod tree;
/// Utilities for index arithmetic within and across tree levels.
pub mod utils;
