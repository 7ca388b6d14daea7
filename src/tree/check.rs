//! Structural self-check.
//!
//! `self_check` recomputes every invariant from the blocks themselves and
//! returns a bitmask with one bit per failure class, 0 for a healthy tree.
//! It walks the whole tree and the garbage list, so it is strictly a test
//! and debugging aid.

use std::cmp::Ordering;

use crate::alloc::ExtentAllocator;
use crate::cmp::Comparator;
use crate::tree::block::{block_kind, free_next, BlockKind, INVALID_ID};
use crate::tree::btree::BTree;

/// Failure classes reported by [`BTree::self_check`].
pub mod check_bits {
    /// Non-empty bookkeeping on an empty tree.
    pub const EMPTY_STATE: u32 = 0x1;
    /// Root id unresolvable or of the wrong kind for the tree depth.
    pub const ROOT: u32 = 0x2;
    /// Element count disagrees with the leaves.
    pub const SIZE: u32 = 0x4;
    /// Tree max disagrees with the rightmost subtree.
    pub const MAX_ELEM: u32 = 0x8;
    /// Block tagged neither leaf nor inner reached through child links.
    pub const BLOCK_KIND: u32 = 0x10;
    /// Garbage list broken (wrong tag or count).
    pub const GARBAGE: u32 = 0x20;
    /// Leaf found at the wrong depth.
    pub const LEAF_LEVEL: u32 = 0x100;
    /// Leaf count out of range.
    pub const LEAF_COUNT: u32 = 0x200;
    /// Leaf elements out of order.
    pub const LEAF_ORDER: u32 = 0x400;
    /// Inner count out of range.
    pub const INNER_COUNT: u32 = 0x1000;
    /// Inner separators out of order.
    pub const INNER_ORDER: u32 = 0x2000;
    /// A separator differs from its child subtree's maximum.
    pub const SEPARATOR: u32 = 0x4000;
    /// The last separator does not precede the subtree maximum.
    pub const LAST_SEPARATOR: u32 = 0x8000;
    /// Leaf chain visits a leaf the child links do not.
    pub const CHAIN_THIS: u32 = 0x10000;
    /// A leaf's prev link disagrees with the chain.
    pub const CHAIN_PREV: u32 = 0x20000;
    /// Leaf chain does not terminate after the last leaf.
    pub const CHAIN_END: u32 = 0x40000;
    /// `last_id` does not point at the rightmost leaf.
    pub const CHAIN_LAST: u32 = 0x80000;
}

impl<C: Comparator, A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize>
    BTree<C, A, BLOCK_SIZE, EXTENT_SIZE>
{
    /// Verify every structural invariant; non-zero names the broken ones
    /// through [`check_bits`].
    pub fn self_check(&self) -> u32 {
        let mut result = 0;

        if self.root_id == INVALID_ID {
            if self.depth != 0 || self.size != 0 {
                result |= check_bits::EMPTY_STATE;
            }
            if self.leaf_count != 0 || self.inner_count != 0 {
                result |= check_bits::EMPTY_STATE;
            }
            result |= self.check_garbage();
            return result;
        }

        if !self.arena.contains(self.root_id) {
            return check_bits::ROOT;
        }
        let root_kind = block_kind(self.arena.block(self.root_id));
        let expected = if self.depth == 1 {
            BlockKind::Leaf
        } else {
            BlockKind::Inner
        };
        if root_kind != expected {
            return check_bits::ROOT;
        }

        match self.subtree_max(self.root_id) {
            Some(max) => {
                if self.cmp.cmp_elem(&self.max_elem, &max) != Ordering::Equal {
                    result |= check_bits::MAX_ELEM;
                }
            }
            None => result |= check_bits::BLOCK_KIND,
        }

        let mut calc_count = 0usize;
        let mut expected_prev = INVALID_ID;
        let mut expected_this = self.first_id;
        result |= self.check_block(
            self.root_id,
            self.depth as usize,
            &mut calc_count,
            &mut expected_prev,
            &mut expected_this,
        );
        if expected_this != INVALID_ID {
            result |= check_bits::CHAIN_END;
        }
        if expected_prev != self.last_id {
            result |= check_bits::CHAIN_LAST;
        }
        if self.size != calc_count {
            result |= check_bits::SIZE;
        }
        result |= self.check_garbage();
        result
    }

    /// Maximum element of a subtree, recomputed by walking to its
    /// rightmost leaf. `None` on a malformed block.
    fn subtree_max(&self, id: u32) -> Option<C::Elem> {
        let data = self.arena.block(id);
        match block_kind(data) {
            BlockKind::Leaf => {
                let leaf = self.leaf(id);
                (leaf.count() > 0).then(|| leaf.elem(leaf.count() - 1))
            }
            BlockKind::Inner => {
                let inner = self.inner(id);
                if inner.count() == 0 {
                    return None;
                }
                self.subtree_max(inner.child(inner.count() - 1))
            }
            _ => None,
        }
    }

    fn check_block(
        &self,
        id: u32,
        level: usize,
        calc_count: &mut usize,
        expected_prev: &mut u32,
        expected_this: &mut u32,
    ) -> u32 {
        let kind = block_kind(self.arena.block(id));
        match kind {
            BlockKind::Leaf => {
                let mut result = 0;
                let leaf = self.leaf(id);
                *calc_count += leaf.count();

                if id != *expected_this {
                    result |= check_bits::CHAIN_THIS;
                }
                if leaf.prev_id() != *expected_prev {
                    result |= check_bits::CHAIN_PREV;
                }
                *expected_prev = id;
                *expected_this = leaf.next_id();

                if level != 1 {
                    result |= check_bits::LEAF_LEVEL;
                }
                if leaf.count() == 0 || leaf.count() > Self::LEAF_CAP {
                    result |= check_bits::LEAF_COUNT;
                }
                for i in 1..leaf.count() {
                    if self.cmp.cmp_elem(&leaf.elem(i - 1), &leaf.elem(i)) != Ordering::Less {
                        result |= check_bits::LEAF_ORDER;
                    }
                }
                result
            }
            BlockKind::Inner => {
                let mut result = 0;
                let inner = self.inner(id);
                let n = inner.count();

                if n == 0 || n > Self::INNER_CAP {
                    result |= check_bits::INNER_COUNT;
                    return result;
                }
                for i in 1..n - 1 {
                    if self.cmp.cmp_elem(&inner.elem(i - 1), &inner.elem(i)) != Ordering::Less {
                        result |= check_bits::INNER_ORDER;
                    }
                }
                for i in 0..n - 1 {
                    match self.subtree_max(inner.child(i)) {
                        Some(max) => {
                            if self.cmp.cmp_elem(&inner.elem(i), &max) != Ordering::Equal {
                                result |= check_bits::SEPARATOR;
                            }
                        }
                        None => result |= check_bits::BLOCK_KIND,
                    }
                }
                if n > 1 {
                    if let Some(max) = self.subtree_max(id) {
                        if self.cmp.cmp_elem(&inner.elem(n - 2), &max) != Ordering::Less {
                            result |= check_bits::LAST_SEPARATOR;
                        }
                    }
                }
                for i in 0..n {
                    result |= self.check_block(
                        inner.child(i),
                        level - 1,
                        calc_count,
                        expected_prev,
                        expected_this,
                    );
                }
                result
            }
            _ => check_bits::BLOCK_KIND,
        }
    }

    fn check_garbage(&self) -> u32 {
        let mut seen = 0u32;
        let mut id = self.garbage_head;
        while id != INVALID_ID {
            if seen > self.free_count || !self.arena.contains(id) {
                return check_bits::GARBAGE;
            }
            let data = self.arena.block(id);
            if block_kind(data) != BlockKind::Free {
                return check_bits::GARBAGE;
            }
            seen += 1;
            id = free_next(data);
        }
        if seen != self.free_count {
            return check_bits::GARBAGE;
        }
        0
    }
}
