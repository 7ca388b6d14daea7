//! Insert rebalancing drivers.
//!
//! A structural insert tries, in order:
//!
//! 1. place in the target block when it has room;
//! 2. borrow-insert into a direct sibling with free space, preferring the
//!    emptier one (`1 + free/2` entries cross over);
//! 3. with only one direct sibling and it full, cascade through it into the
//!    sibling-of-the-sibling when that one has room, smearing the load over
//!    three blocks before giving up;
//! 4. split: reserve garbage blocks for the worst-case height growth, create
//!    a new right sibling and redistribute so every participant ends near
//!    balanced, then insert the new child into the parent — recursing with
//!    the same four cases per level. A splitting root gets a new root above
//!    it.
//!
//! The reservation in step 4 happens before the first byte of mutation, so
//! an insert that fails on memory leaves the tree untouched.

use eyre::Result;

use crate::alloc::ExtentAllocator;
use crate::cmp::Comparator;
use crate::tree::block::{InnerViewMut, LeafView, LeafViewMut, INVALID_ID};
use crate::tree::btree::BTree;
use crate::tree::path::{Path, PathElem};

impl<C: Comparator, A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize>
    BTree<C, A, BLOCK_SIZE, EXTENT_SIZE>
{
    /// Overwrite the element at an exact-match position, returning the old
    /// value. Never changes structure, so cursors stay intact.
    pub(crate) fn replace_at(&mut self, le: &PathElem, new_elem: C::Elem) -> C::Elem {
        let old;
        let new_max;
        {
            let mut leaf = LeafViewMut::<C::Elem>::new(self.arena.block_mut(le.id));
            let pos = le.insertion_point as usize;
            debug_assert!(pos < leaf.count());
            old = leaf.elem(pos);
            leaf.set_elem(pos, &new_elem);
            new_max = leaf.elem(leaf.count() - 1);
        }
        self.max_store(le.max_slot, new_max);
        old
    }

    pub(crate) fn process_insert_leaf(
        &mut self,
        path: &Path,
        leaf_pe: &PathElem,
        new_elem: C::Elem,
    ) -> Result<()> {
        if self.leaf_free(leaf_pe.id) > 0 {
            self.insert_into_leaf(leaf_pe, new_elem);
            return Ok(());
        }

        let parent = path.last();
        let left = self.collect_left_sibling(parent, leaf_pe);
        let right = self.collect_right_sibling(parent, leaf_pe);
        let mut left_left = None;
        let mut right_right = None;

        match (&left, &right) {
            (Some(l), Some(r)) => {
                let l_free = self.leaf_free(l.id);
                let r_free = self.leaf_free(r.id);
                if l_free > r_free {
                    let count = 1 + l_free / 2;
                    self.insert_and_move_left_leaf(l, leaf_pe, count, new_elem);
                    return Ok(());
                } else if r_free > 0 {
                    let count = 1 + r_free / 2;
                    self.insert_and_move_right_leaf(leaf_pe, r, count, new_elem);
                    return Ok(());
                }
            }
            (Some(l), None) => {
                let l_free = self.leaf_free(l.id);
                if l_free > 0 {
                    let count = 1 + l_free / 2;
                    self.insert_and_move_left_leaf(l, leaf_pe, count, new_elem);
                    return Ok(());
                }
                left_left = self.collect_left_sibling(parent, l);
                if let Some(ll) = &left_left {
                    let ll_free = self.leaf_free(ll.id);
                    if ll_free > 0 {
                        let count = 1 + (2 * ll_free - 1) / 3;
                        self.move_to_left_leaf(ll, l, count);
                        let count = 1 + count / 2;
                        self.insert_and_move_left_leaf(l, leaf_pe, count, new_elem);
                        return Ok(());
                    }
                }
            }
            (None, Some(r)) => {
                let r_free = self.leaf_free(r.id);
                if r_free > 0 {
                    let count = 1 + r_free / 2;
                    self.insert_and_move_right_leaf(leaf_pe, r, count, new_elem);
                    return Ok(());
                }
                right_right = self.collect_right_sibling(parent, r);
                if let Some(rr) = &right_right {
                    let rr_free = self.leaf_free(rr.id);
                    if rr_free > 0 {
                        let count = 1 + (2 * rr_free - 1) / 3;
                        self.move_to_right_leaf(r, rr, count);
                        let count = 1 + count / 2;
                        self.insert_and_move_right_leaf(leaf_pe, r, count, new_elem);
                        return Ok(());
                    }
                }
            }
            (None, None) => {}
        }

        // No neighbor can absorb: split. Reserve the worst case up front
        // (one leaf, an inner per level, a new root), then nothing below
        // can fail.
        self.reserve_blocks(self.depth + 1)?;
        let new_id = self.create_leaf()?;

        // Splice the new leaf into the chain right of the target.
        let old_next = {
            let leaf = LeafView::<C::Elem>::new(self.arena.block(leaf_pe.id));
            leaf.next_id()
        };
        if old_next != INVALID_ID {
            let mut next = LeafViewMut::<C::Elem>::new(self.arena.block_mut(old_next));
            debug_assert_eq!(next.prev_id(), leaf_pe.id);
            next.set_prev_id(new_id);
        } else {
            self.last_id = new_id;
        }
        LeafViewMut::<C::Elem>::init(self.arena.block_mut(new_id), leaf_pe.id, old_next);
        {
            let mut leaf = LeafViewMut::<C::Elem>::new(self.arena.block_mut(leaf_pe.id));
            leaf.set_next_id(new_id);
        }

        let new_pe = self.prepare_new_sibling(leaf_pe, new_id);
        match (&left, &right, &left_left, &right_right) {
            (Some(l), Some(r), _, _) => {
                let count = Self::LEAF_CAP / 4;
                self.insert_and_move_right_leaf(leaf_pe, &new_pe, count * 2, new_elem);
                self.move_to_left_leaf(&new_pe, r, count);
                self.move_to_right_leaf(l, leaf_pe, count);
            }
            (Some(l), None, Some(ll), _) => {
                let count = Self::LEAF_CAP / 4;
                self.insert_and_move_right_leaf(leaf_pe, &new_pe, count * 3, new_elem);
                self.move_to_right_leaf(l, leaf_pe, count * 2);
                self.move_to_right_leaf(ll, l, count);
            }
            (None, Some(r), _, Some(rr)) => {
                let count = Self::LEAF_CAP / 4;
                self.insert_and_move_right_leaf(leaf_pe, &new_pe, count, new_elem);
                self.move_to_left_leaf(&new_pe, r, count * 2);
                self.move_to_left_leaf(r, rr, count);
            }
            (Some(l), None, None, _) => {
                let count = Self::LEAF_CAP / 3;
                self.insert_and_move_right_leaf(leaf_pe, &new_pe, count * 2, new_elem);
                self.move_to_right_leaf(l, leaf_pe, count);
            }
            (None, Some(r), _, None) => {
                let count = Self::LEAF_CAP / 3;
                self.insert_and_move_right_leaf(leaf_pe, &new_pe, count, new_elem);
                self.move_to_left_leaf(&new_pe, r, count);
            }
            (None, None, _, _) => {
                // Root leaf split: the tree grows a level.
                debug_assert!(path.is_empty());
                let count = Self::LEAF_CAP / 2;
                self.insert_and_move_right_leaf(leaf_pe, &new_pe, count, new_elem);
                self.install_new_root(new_id)?;
                return Ok(());
            }
        }

        debug_assert!(!path.is_empty());
        let max = self.pending_max;
        self.process_insert_inner(
            path,
            path.len() - 1,
            new_id,
            new_pe.pos_in_parent as usize,
            max,
        )
    }

    fn process_insert_inner(
        &mut self,
        path: &Path,
        level: usize,
        child_id: u32,
        pos: usize,
        max_elem: C::Elem,
    ) -> Result<()> {
        let ie = &path[level];
        if self.inner_free(ie.id) > 0 {
            self.insert_into_inner(ie, child_id, pos, max_elem);
            return Ok(());
        }

        let parent = if level > 0 { Some(&path[level - 1]) } else { None };
        let left = self.collect_left_sibling(parent, ie);
        let right = self.collect_right_sibling(parent, ie);
        let mut left_left = None;
        let mut right_right = None;

        match (&left, &right) {
            (Some(l), Some(r)) => {
                let l_free = self.inner_free(l.id);
                let r_free = self.inner_free(r.id);
                if l_free > r_free {
                    let count = 1 + l_free / 2;
                    self.insert_and_move_left_inner(l, ie, count, child_id, pos, max_elem);
                    return Ok(());
                } else if r_free > 0 {
                    let count = 1 + r_free / 2;
                    self.insert_and_move_right_inner(ie, r, count, child_id, pos, max_elem);
                    return Ok(());
                }
            }
            (Some(l), None) => {
                let l_free = self.inner_free(l.id);
                if l_free > 0 {
                    let count = 1 + l_free / 2;
                    self.insert_and_move_left_inner(l, ie, count, child_id, pos, max_elem);
                    return Ok(());
                }
                left_left = self.collect_left_sibling(parent, l);
                if let Some(ll) = &left_left {
                    let ll_free = self.inner_free(ll.id);
                    if ll_free > 0 {
                        let count = 1 + (2 * ll_free - 1) / 3;
                        self.move_to_left_inner(ll, l, count);
                        let count = 1 + count / 2;
                        self.insert_and_move_left_inner(l, ie, count, child_id, pos, max_elem);
                        return Ok(());
                    }
                }
            }
            (None, Some(r)) => {
                let r_free = self.inner_free(r.id);
                if r_free > 0 {
                    let count = 1 + r_free / 2;
                    self.insert_and_move_right_inner(ie, r, count, child_id, pos, max_elem);
                    return Ok(());
                }
                right_right = self.collect_right_sibling(parent, r);
                if let Some(rr) = &right_right {
                    let rr_free = self.inner_free(rr.id);
                    if rr_free > 0 {
                        let count = 1 + (2 * rr_free - 1) / 3;
                        self.move_to_right_inner(r, rr, count);
                        let count = 1 + count / 2;
                        self.insert_and_move_right_inner(ie, r, count, child_id, pos, max_elem);
                        return Ok(());
                    }
                }
            }
            (None, None) => {}
        }

        // Split; the leaf-level reservation already covers this level.
        let new_id = self.create_inner()?;
        InnerViewMut::<C::Elem, BLOCK_SIZE>::init(self.arena.block_mut(new_id));

        let new_pe = self.prepare_new_sibling(ie, new_id);
        match (&left, &right, &left_left, &right_right) {
            (Some(l), Some(r), _, _) => {
                let count = Self::INNER_CAP / 4;
                self.insert_and_move_right_inner(ie, &new_pe, count * 2, child_id, pos, max_elem);
                self.move_to_left_inner(&new_pe, r, count);
                self.move_to_right_inner(l, ie, count);
            }
            (Some(l), None, Some(ll), _) => {
                let count = Self::INNER_CAP / 4;
                self.insert_and_move_right_inner(ie, &new_pe, count * 3, child_id, pos, max_elem);
                self.move_to_right_inner(l, ie, count * 2);
                self.move_to_right_inner(ll, l, count);
            }
            (None, Some(r), _, Some(rr)) => {
                let count = Self::INNER_CAP / 4;
                self.insert_and_move_right_inner(ie, &new_pe, count, child_id, pos, max_elem);
                self.move_to_left_inner(&new_pe, r, count * 2);
                self.move_to_left_inner(r, rr, count);
            }
            (Some(l), None, None, _) => {
                let count = Self::INNER_CAP / 3;
                self.insert_and_move_right_inner(ie, &new_pe, count * 2, child_id, pos, max_elem);
                self.move_to_right_inner(l, ie, count);
            }
            (None, Some(r), _, None) => {
                let count = Self::INNER_CAP / 3;
                self.insert_and_move_right_inner(ie, &new_pe, count, child_id, pos, max_elem);
                self.move_to_left_inner(&new_pe, r, count);
            }
            (None, None, _, _) => {
                // Root split.
                debug_assert_eq!(level, 0);
                let count = Self::INNER_CAP / 2;
                self.insert_and_move_right_inner(ie, &new_pe, count, child_id, pos, max_elem);
                self.install_new_root(new_id)?;
                return Ok(());
            }
        }

        debug_assert!(level > 0);
        let max = self.pending_max;
        self.process_insert_inner(path, level - 1, new_id, new_pe.pos_in_parent as usize, max)
    }

    /// Replace the root with a new inner node over the old root and its
    /// fresh right sibling. The old tree max becomes the single separator;
    /// the staged max of the new sibling becomes the tree max.
    fn install_new_root(&mut self, new_sibling: u32) -> Result<()> {
        let old_root = self.root_id;
        let sep = self.max_elem;
        let new_root = self.create_inner()?;
        {
            let mut root =
                InnerViewMut::<C::Elem, BLOCK_SIZE>::init(self.arena.block_mut(new_root));
            root.set_count(2);
            root.set_child(0, old_root);
            root.set_child(1, new_sibling);
            root.set_elem(0, &sep);
        }
        self.root_id = new_root;
        self.max_elem = self.pending_max;
        self.depth += 1;
        debug_assert!((self.depth as usize) <= crate::tree::block::MAX_DEPTH);
        Ok(())
    }
}
