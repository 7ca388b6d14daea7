//! Delete rebalancing drivers.
//!
//! After removing an entry the block may fall under the two-thirds fill
//! target. Repair tries, in order:
//!
//! 1. borrow from the direct sibling with the larger surplus
//!    (`1 + surplus/2` entries cross back);
//! 2. with only one direct sibling and it at minimum, a two-hop rebalance
//!    pulls surplus through it from the sibling-of-the-sibling;
//! 3. merge: drain the block into its neighbors, unlink it (leaves also
//!    leave the chain), recycle it through the garbage list and delete its
//!    child slot from the parent — recursing with the same cases per level.
//!
//! An inner root left with a single child is collapsed away; an emptied root
//! leaf returns the tree to the pristine empty state. Deletion never
//! allocates and therefore never fails.
//!
//! A merge is skipped when the combined counts would overflow one block; the
//! block then stays temporarily under target, which later deletions repair.

use crate::alloc::ExtentAllocator;
use crate::cmp::Comparator;
use crate::tree::block::{LeafView, LeafViewMut, INVALID_ID};
use crate::tree::btree::BTree;
use crate::tree::path::{Path, PathElem};

impl<C: Comparator, A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize>
    BTree<C, A, BLOCK_SIZE, EXTENT_SIZE>
{
    pub(crate) fn process_delete_leaf(&mut self, path: &Path, leaf_pe: &PathElem) {
        self.delete_from_leaf(leaf_pe);

        if self.leaf(leaf_pe.id).count() >= Self::LEAF_MIN {
            return;
        }

        let parent = path.last();
        let left = self.collect_left_sibling(parent, leaf_pe);
        let right = self.collect_right_sibling(parent, leaf_pe);
        let mut left_left = None;
        let mut right_right = None;

        match (&left, &right) {
            (Some(l), Some(r)) => {
                let l_over = self.leaf_overmin(l.id);
                let r_over = self.leaf_overmin(r.id);
                if l_over > r_over {
                    let count = 1 + l_over as usize / 2;
                    self.move_to_right_leaf(l, leaf_pe, count);
                    return;
                } else if r_over > 0 {
                    let count = 1 + r_over as usize / 2;
                    self.move_to_left_leaf(leaf_pe, r, count);
                    return;
                }
            }
            (Some(l), None) => {
                let l_over = self.leaf_overmin(l.id);
                if l_over > 0 {
                    let count = 1 + l_over as usize / 2;
                    self.move_to_right_leaf(l, leaf_pe, count);
                    return;
                }
                left_left = self.collect_left_sibling(parent, l);
                if let Some(ll) = &left_left {
                    let ll_over = self.leaf_overmin(ll.id);
                    if ll_over > 0 {
                        let count = 1 + (2 * ll_over as usize - 1) / 3;
                        self.move_to_right_leaf(l, leaf_pe, count);
                        let count = 1 + count / 2;
                        self.move_to_right_leaf(ll, l, count);
                        return;
                    }
                }
            }
            (None, Some(r)) => {
                let r_over = self.leaf_overmin(r.id);
                if r_over > 0 {
                    let count = 1 + r_over as usize / 2;
                    self.move_to_left_leaf(leaf_pe, r, count);
                    return;
                }
                right_right = self.collect_right_sibling(parent, r);
                if let Some(rr) = &right_right {
                    let rr_over = self.leaf_overmin(rr.id);
                    if rr_over > 0 {
                        let count = 1 + (2 * rr_over as usize - 1) / 3;
                        self.move_to_left_leaf(leaf_pe, r, count);
                        let count = 1 + count / 2;
                        self.move_to_left_leaf(r, rr, count);
                        return;
                    }
                }
            }
            (None, None) => {}
        }

        // No sibling has surplus: merge the block away, spreading its
        // remainder over the neighbors.
        match (&left, &right, &left_left, &right_right) {
            (Some(l), Some(r), _, _) => {
                let remaining = self.leaf(leaf_pe.id).count();
                self.move_to_right_leaf(leaf_pe, r, remaining.div_ceil(2));
                let remaining = self.leaf(leaf_pe.id).count();
                self.move_to_left_leaf(l, leaf_pe, remaining);
            }
            (Some(l), None, Some(ll), _) => {
                let remaining = self.leaf(leaf_pe.id).count();
                self.move_to_left_leaf(ll, l, remaining.div_ceil(2));
                let remaining = self.leaf(leaf_pe.id).count();
                self.move_to_left_leaf(l, leaf_pe, remaining);
            }
            (None, Some(r), _, Some(rr)) => {
                let remaining = self.leaf(leaf_pe.id).count();
                self.move_to_right_leaf(r, rr, remaining.div_ceil(2));
                let remaining = self.leaf(leaf_pe.id).count();
                self.move_to_right_leaf(leaf_pe, r, remaining);
            }
            (Some(l), None, None, _) => {
                let count = self.leaf(leaf_pe.id).count();
                if count + self.leaf(l.id).count() > Self::LEAF_CAP {
                    return;
                }
                self.move_to_left_leaf(l, leaf_pe, count);
            }
            (None, Some(r), _, None) => {
                let count = self.leaf(leaf_pe.id).count();
                if count + self.leaf(r.id).count() > Self::LEAF_CAP {
                    return;
                }
                self.move_to_right_leaf(leaf_pe, r, count);
            }
            (None, None, _, _) => {
                // Root leaf: shrink only when it empties out completely.
                if self.leaf(leaf_pe.id).count() > 0 {
                    return;
                }
                debug_assert!(path.is_empty());
                debug_assert_eq!(self.depth, 1);
                debug_assert_eq!(self.size, 0);
                self.root_id = INVALID_ID;
                self.depth = 0;
                self.first_id = INVALID_ID;
                self.last_id = INVALID_ID;
                self.dispose_leaf(leaf_pe.id);
                return;
            }
        }

        debug_assert_eq!(self.leaf(leaf_pe.id).count(), 0);
        self.unlink_leaf(leaf_pe.id);
        self.dispose_leaf(leaf_pe.id);
        debug_assert!(!path.is_empty());
        self.process_delete_inner(path, path.len() - 1);
    }

    fn unlink_leaf(&mut self, id: u32) {
        let (prev, next) = {
            let leaf = LeafView::<C::Elem>::new(self.arena.block(id));
            (leaf.prev_id(), leaf.next_id())
        };
        if prev == INVALID_ID {
            self.first_id = next;
        } else {
            let mut prev_leaf = LeafViewMut::<C::Elem>::new(self.arena.block_mut(prev));
            prev_leaf.set_next_id(next);
        }
        if next == INVALID_ID {
            self.last_id = prev;
        } else {
            let mut next_leaf = LeafViewMut::<C::Elem>::new(self.arena.block_mut(next));
            next_leaf.set_prev_id(prev);
        }
    }

    fn process_delete_inner(&mut self, path: &Path, level: usize) {
        let ie = &path[level];
        self.delete_from_inner(ie);

        if self.inner(ie.id).count() >= Self::INNER_MIN {
            return;
        }

        let parent = if level > 0 { Some(&path[level - 1]) } else { None };
        let left = self.collect_left_sibling(parent, ie);
        let right = self.collect_right_sibling(parent, ie);
        let mut left_left = None;
        let mut right_right = None;

        match (&left, &right) {
            (Some(l), Some(r)) => {
                let l_over = self.inner_overmin(l.id);
                let r_over = self.inner_overmin(r.id);
                if l_over > r_over {
                    let count = 1 + l_over as usize / 2;
                    self.move_to_right_inner(l, ie, count);
                    return;
                } else if r_over > 0 {
                    let count = 1 + r_over as usize / 2;
                    self.move_to_left_inner(ie, r, count);
                    return;
                }
            }
            (Some(l), None) => {
                let l_over = self.inner_overmin(l.id);
                if l_over > 0 {
                    let count = 1 + l_over as usize / 2;
                    self.move_to_right_inner(l, ie, count);
                    return;
                }
                left_left = self.collect_left_sibling(parent, l);
                if let Some(ll) = &left_left {
                    let ll_over = self.inner_overmin(ll.id);
                    if ll_over > 0 {
                        let count = 1 + (2 * ll_over as usize - 1) / 3;
                        self.move_to_right_inner(l, ie, count);
                        let count = 1 + count / 2;
                        self.move_to_right_inner(ll, l, count);
                        return;
                    }
                }
            }
            (None, Some(r)) => {
                let r_over = self.inner_overmin(r.id);
                if r_over > 0 {
                    let count = 1 + r_over as usize / 2;
                    self.move_to_left_inner(ie, r, count);
                    return;
                }
                right_right = self.collect_right_sibling(parent, r);
                if let Some(rr) = &right_right {
                    let rr_over = self.inner_overmin(rr.id);
                    if rr_over > 0 {
                        let count = 1 + (2 * rr_over as usize - 1) / 3;
                        self.move_to_left_inner(ie, r, count);
                        let count = 1 + count / 2;
                        self.move_to_left_inner(r, rr, count);
                        return;
                    }
                }
            }
            (None, None) => {}
        }

        match (&left, &right, &left_left, &right_right) {
            (Some(l), Some(r), _, _) => {
                let remaining = self.inner(ie.id).count();
                self.move_to_right_inner(ie, r, remaining.div_ceil(2));
                let remaining = self.inner(ie.id).count();
                self.move_to_left_inner(l, ie, remaining);
            }
            (Some(l), None, Some(ll), _) => {
                let remaining = self.inner(ie.id).count();
                self.move_to_left_inner(ll, l, remaining.div_ceil(2));
                let remaining = self.inner(ie.id).count();
                self.move_to_left_inner(l, ie, remaining);
            }
            (None, Some(r), _, Some(rr)) => {
                let remaining = self.inner(ie.id).count();
                self.move_to_right_inner(r, rr, remaining.div_ceil(2));
                let remaining = self.inner(ie.id).count();
                self.move_to_right_inner(ie, r, remaining);
            }
            (Some(l), None, None, _) => {
                let count = self.inner(ie.id).count();
                if count + self.inner(l.id).count() > Self::INNER_CAP {
                    return;
                }
                self.move_to_left_inner(l, ie, count);
            }
            (None, Some(r), _, None) => {
                let count = self.inner(ie.id).count();
                if count + self.inner(r.id).count() > Self::INNER_CAP {
                    return;
                }
                self.move_to_right_inner(ie, r, count);
            }
            (None, None, _, _) => {
                // Inner root with a single child collapses into that child.
                if self.inner(ie.id).count() > 1 {
                    return;
                }
                debug_assert!(self.depth > 1);
                debug_assert_eq!(level, 0);
                self.depth -= 1;
                self.root_id = self.inner(ie.id).child(0);
                self.dispose_inner(ie.id);
                return;
            }
        }

        debug_assert_eq!(self.inner(ie.id).count(), 0);
        self.dispose_inner(ie.id);
        debug_assert!(level > 0);
        self.process_delete_inner(path, level - 1);
    }
}
