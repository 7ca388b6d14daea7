//! Bulk construction from sorted input.
//!
//! The builder lays leaves down left to right and grows a rightmost spine of
//! inner nodes above them, so the whole tree is produced in one pass over
//! the input. Per-level fan-outs are paced: each new block receives
//! `remaining / remaining_blocks` entries, which spreads the inevitable
//! rounding slack over the whole level instead of leaving the rightmost
//! blocks near-empty.
//!
//! Construction is all-or-nothing: on extent exhaustion the arena is reset
//! and the tree is back in its pristine empty state.

use eyre::{bail, ensure, Result};

use crate::alloc::ExtentAllocator;
use crate::cmp::Comparator;
use crate::tree::block::{InnerViewMut, LeafViewMut, INVALID_ID, MAX_DEPTH};
use crate::tree::btree::BTree;

impl<C: Comparator, A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize>
    BTree<C, A, BLOCK_SIZE, EXTENT_SIZE>
{
    /// Bulk-load a sorted slice into an empty tree. The input is not checked
    /// for order.
    pub fn build(&mut self, sorted: &[C::Elem]) -> Result<()> {
        ensure!(self.size == 0 && self.root_id == INVALID_ID, "tree is not empty");
        debug_assert_eq!(self.garbage_head, INVALID_ID);
        if sorted.is_empty() {
            return Ok(());
        }

        let leaf_total = sorted.len().div_ceil(Self::LEAF_CAP) as u32;

        let mut depth = 1usize;
        let mut level_total = leaf_total;
        while level_total > 1 {
            level_total = level_total.div_ceil(Self::INNER_CAP as u32);
            depth += 1;
        }
        ensure!(depth <= MAX_DEPTH, "input of {} elements exceeds the height bound", sorted.len());

        // Pacing state per inner level: how many children and blocks the
        // level still has to absorb, and the id of its currently open block.
        let mut level_child_left = [0u32; MAX_DEPTH];
        let mut level_block_left = [0u32; MAX_DEPTH];
        let mut open_inner: [Option<u32>; MAX_DEPTH] = [None; MAX_DEPTH];
        let mut level_total = leaf_total;
        for level in 0..depth - 1 {
            level_child_left[level] = level_total;
            level_total = level_total.div_ceil(Self::INNER_CAP as u32);
            level_block_left[level] = level_total;
        }

        let mut leaf_left = leaf_total;
        let mut rest = sorted;
        let mut prev_leaf_id = INVALID_ID;
        let mut first_leaf_id = INVALID_ID;
        let mut inner_total = 0u32;
        let mut root_if_inner = INVALID_ID;

        loop {
            let leaf_id = match self.arena.alloc_block() {
                Some(id) => id,
                None => {
                    self.arena.reset();
                    bail!("extent allocator exhausted during bulk build");
                }
            };
            if first_leaf_id == INVALID_ID {
                first_leaf_id = leaf_id;
            }

            let take = rest.len() / leaf_left as usize;
            {
                let mut leaf = LeafViewMut::<C::Elem>::init(
                    self.arena.block_mut(leaf_id),
                    prev_leaf_id,
                    INVALID_ID,
                );
                for (i, elem) in rest[..take].iter().enumerate() {
                    leaf.set_elem(i, elem);
                }
                leaf.set_count(take);
            }
            if prev_leaf_id != INVALID_ID {
                let mut prev = LeafViewMut::<C::Elem>::new(self.arena.block_mut(prev_leaf_id));
                prev.set_next_id(leaf_id);
            }
            prev_leaf_id = leaf_id;

            // Append the new leaf (and any inner blocks opened on the way)
            // to the rightmost spine.
            let mut insert_id = leaf_id;
            for level in 0..depth - 1 {
                let mut opened = None;
                let inner_id = match open_inner[level] {
                    Some(id) => id,
                    None => {
                        let id = match self.arena.alloc_block() {
                            Some(id) => id,
                            None => {
                                self.arena.reset();
                                bail!("extent allocator exhausted during bulk build");
                            }
                        };
                        InnerViewMut::<C::Elem, BLOCK_SIZE>::init(self.arena.block_mut(id));
                        open_inner[level] = Some(id);
                        inner_total += 1;
                        opened = Some(id);
                        id
                    }
                };
                {
                    let mut inner =
                        InnerViewMut::<C::Elem, BLOCK_SIZE>::new(self.arena.block_mut(inner_id));
                    let n = inner.count();
                    inner.set_child(n, insert_id);
                }
                let Some(new_id) = opened else { break };
                if level == depth - 2 {
                    root_if_inner = new_id;
                } else {
                    insert_id = new_id;
                }
            }

            // Close out paced blocks and record the leaf's max as a
            // separator at the right level.
            let sep = rest[take - 1];
            for level in 0..depth - 1 {
                let Some(inner_id) = open_inner[level] else { break };
                let paced = level_child_left[level] / level_block_left[level];
                let n = {
                    let mut inner =
                        InnerViewMut::<C::Elem, BLOCK_SIZE>::new(self.arena.block_mut(inner_id));
                    let n = inner.count() + 1;
                    inner.set_count(n);
                    n
                };
                if n as u32 != paced {
                    let mut inner =
                        InnerViewMut::<C::Elem, BLOCK_SIZE>::new(self.arena.block_mut(inner_id));
                    inner.set_elem(n - 1, &sep);
                    break;
                }
                open_inner[level] = None;
                level_child_left[level] -= paced;
                level_block_left[level] -= 1;
            }

            leaf_left -= 1;
            rest = &rest[take..];
            if leaf_left == 0 {
                break;
            }
        }
        debug_assert!(rest.is_empty());
        debug_assert!(open_inner[..depth.saturating_sub(1)].iter().all(|o| o.is_none()));

        self.first_id = first_leaf_id;
        self.last_id = prev_leaf_id;
        self.leaf_count = leaf_total;
        self.inner_count = inner_total;
        self.depth = depth as u32;
        self.size = sorted.len();
        self.max_elem = sorted[sorted.len() - 1];
        self.root_id = if depth == 1 { first_leaf_id } else { root_if_inner };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{HeapAllocator, QuotaAllocator};
    use crate::cmp::U64Cmp;

    type Tree = BTree<U64Cmp>;

    fn built(n: u64) -> Tree {
        let mut t = Tree::new(U64Cmp, HeapAllocator);
        let input: Vec<u64> = (0..n).collect();
        t.build(&input).unwrap();
        t
    }

    #[test]
    fn build_empty_input_is_a_noop() {
        let mut t = Tree::new(U64Cmp, HeapAllocator);

        t.build(&[]).unwrap();

        assert!(t.is_empty());
        assert_eq!(t.depth, 0);
        assert_eq!(t.mem_used(), 0);
    }

    #[test]
    fn build_single_leaf() {
        let t = built(10);

        assert_eq!(t.len(), 10);
        assert_eq!(t.depth, 1);
        assert_eq!(t.leaf_count, 1);
        assert_eq!(t.inner_count, 0);
        assert_eq!(t.self_check(), 0);
    }

    #[test]
    fn build_exactly_one_full_leaf() {
        let t = built(Tree::LEAF_CAP as u64);

        assert_eq!(t.depth, 1);
        assert_eq!(t.leaf_count, 1);
        assert_eq!(t.self_check(), 0);
    }

    #[test]
    fn build_two_levels() {
        let t = built(1000);

        assert_eq!(t.len(), 1000);
        assert_eq!(t.depth, 2);
        assert_eq!(t.self_check(), 0);
        for probe in [0u64, 1, 500, 998, 999] {
            assert_eq!(t.find(&probe), Some(probe));
        }
        assert_eq!(t.find(&1000), None);
        assert_eq!(t.max_elem, 999);
    }

    #[test]
    fn build_three_levels() {
        let n = 100_000u64;
        let t = built(n);

        assert_eq!(t.len(), n as usize);
        assert!(t.depth >= 3);
        assert_eq!(t.self_check(), 0);
        assert_eq!(t.find(&(n - 1)), Some(n - 1));
    }

    #[test]
    fn build_paces_leaf_fill_evenly() {
        // One element over a full leaf: naive packing would leave the second
        // leaf with a single element; pacing splits the load near evenly.
        let t = built(Tree::LEAF_CAP as u64 + 1);

        assert_eq!(t.leaf_count, 2);
        let first = t.leaf(t.first_id);
        let last = t.leaf(t.last_id);
        assert!(first.count().abs_diff(last.count()) <= 1);
        assert_eq!(t.self_check(), 0);
    }

    #[test]
    fn build_matches_repeated_insert() {
        let n = 5000u64;
        let built_tree = built(n);
        let mut inserted = Tree::new(U64Cmp, HeapAllocator);
        for i in 0..n {
            inserted.insert(i).unwrap();
        }

        let a: Vec<u64> = built_tree.iter().collect();
        let b: Vec<u64> = inserted.iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn build_failure_resets_to_empty() {
        let mut t: BTree<U64Cmp, QuotaAllocator> = BTree::new(U64Cmp, QuotaAllocator::new(3));
        let input: Vec<u64> = (0..100_000).collect();

        assert!(t.build(&input).is_err());

        assert!(t.is_empty());
        assert_eq!(t.depth, 0);
        assert_eq!(t.mem_used(), 0);
        assert_eq!(t.self_check(), 0);

        // The arena is reusable after the reset.
        let small: Vec<u64> = (0..10).collect();
        t.build(&small).unwrap();
        assert_eq!(t.len(), 10);
        assert_eq!(t.self_check(), 0);
    }

    #[test]
    fn build_then_mutate() {
        let mut t = built(1000);

        t.insert(5000).unwrap();
        assert!(t.remove(&500));

        assert_eq!(t.len(), 1000);
        assert_eq!(t.find(&5000), Some(5000));
        assert_eq!(t.find(&500), None);
        assert_eq!(t.self_check(), 0);
    }
}
