use crate::maybestd::fmt;

/// An error that occurred while building a canonical merkle tree or
/// requesting a proof from one.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum TreeError {
    /// A tree must commit to at least one leaf
    EmptyTree,
    /// Two leaves at distinct input positions hashed identically. The tree
    /// rejects the input rather than deduplicating.
    DuplicateLeaf {
        /// The input index of the earlier of the two colliding leaves
        first: usize,
        /// The input index of the later of the two colliding leaves
        second: usize,
    },
    /// A proof was requested for an input index outside the committed leaf
    /// set
    IndexOutOfRange {
        /// The requested index
        index: usize,
        /// The number of leaves the tree commits to
        leaf_count: usize,
    },
    /// A proof was requested for a leaf hash the tree does not commit to
    LeafNotFound,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::EmptyTree => f.write_str("cannot build a merkle tree over zero leaves"),
            TreeError::DuplicateLeaf { first, second } => {
                write!(f, "leaves {} and {} produce identical hashes", first, second)
            }
            TreeError::IndexOutOfRange { index, leaf_count } => {
                write!(
                    f,
                    "no leaf at index {} in a tree of {} leaves",
                    index, leaf_count
                )
            }
            TreeError::LeafNotFound => f.write_str("the tree does not commit to the given leaf"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TreeError {}
