/// Compute the index of the sibling of the node at the provided index within
/// its level. The sibling may not exist if the node is the unpaired last
/// entry of an odd-sized level.
pub fn sibling_index(node_idx: usize) -> usize {
    node_idx ^ 1
}

/// Compute the index of the parent, in the next level up, of the node at the
/// provided index. Holds for promoted nodes as well as combined pairs.
pub fn parent_index(node_idx: usize) -> usize {
    node_idx >> 1
}

/// Compute the number of levels in a canonical tree over the given number of
/// leaves, counting both the leaf level and the root. A level of `k` nodes
/// produces `ceil(k / 2)` parents, so the count is
/// `ceil(log2(leaf_count)) + 1`.
pub fn num_levels(leaf_count: usize) -> usize {
    if leaf_count == 0 {
        return 0;
    }
    leaf_count.next_power_of_two().trailing_zeros() as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_index_pairs_adjacent_nodes() {
        assert_eq!(sibling_index(0), 1);
        assert_eq!(sibling_index(1), 0);
        assert_eq!(sibling_index(6), 7);
        assert_eq!(sibling_index(7), 6);
    }

    #[test]
    fn test_parent_index_halves() {
        assert_eq!(parent_index(0), 0);
        assert_eq!(parent_index(1), 0);
        assert_eq!(parent_index(6), 3);
        assert_eq!(parent_index(7), 3);
    }

    #[test]
    fn test_num_levels() {
        let expected = [0, 1, 2, 3, 3, 4, 4, 4, 4, 5];
        for (leaf_count, want) in expected.iter().enumerate() {
            assert_eq!(num_levels(leaf_count), *want, "leaf_count = {}", leaf_count);
        }
    }
}
