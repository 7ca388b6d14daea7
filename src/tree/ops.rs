//! In-place structural primitives.
//!
//! Twelve operations, six per block flavor: plain insert/delete within one
//! block, bulk moves of `num` entries between adjacent siblings, and the
//! combined insert-and-move pair. The combined forms treat the source block
//! as if it had room for one extra entry ("virtual insert"), placing the new
//! entry and redistributing in a single pass with no scratch buffer; they are
//! what lets a full block spill into a neighbor while absorbing an insert.
//!
//! Every primitive keeps the separator bookkeeping intact: whenever a block's
//! last entry changes, the copy of its subtree maximum (reachable through the
//! path element's max slot) is rewritten. Inner-block moves additionally
//! rotate separators through those slots, because the separator between two
//! siblings changes ownership when children cross the boundary.
//!
//! Preconditions (counts, capacity room, position bounds) hold by
//! construction in the drivers and are asserted in debug builds only.

use crate::alloc::ExtentAllocator;
use crate::cmp::Comparator;
use crate::tree::block::{InnerViewMut, LeafViewMut};
use crate::tree::btree::BTree;
use crate::tree::path::PathElem;

impl<C: Comparator, A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize>
    BTree<C, A, BLOCK_SIZE, EXTENT_SIZE>
{
    /// Insert `new_elem` at the leaf's recorded insertion point. The leaf
    /// must have room.
    pub(crate) fn insert_into_leaf(&mut self, le: &PathElem, new_elem: C::Elem) {
        let new_max;
        {
            let mut leaf = LeafViewMut::<C::Elem>::new(self.arena.block_mut(le.id));
            let n = leaf.count();
            let pos = le.insertion_point as usize;
            debug_assert!(pos <= n);
            debug_assert!(n < Self::LEAF_CAP);

            leaf.move_elems(pos + 1, pos, n - pos);
            leaf.set_elem(pos, &new_elem);
            leaf.set_count(n + 1);
            new_max = leaf.elem(n);
        }
        self.max_store(le.max_slot, new_max);
        self.size += 1;
    }

    /// Insert child `child_id` with subtree maximum `max_elem` at `pos`. The
    /// inner block must have room.
    pub(crate) fn insert_into_inner(
        &mut self,
        ie: &PathElem,
        child_id: u32,
        pos: usize,
        max_elem: C::Elem,
    ) {
        let own_max = self.max_load(ie.max_slot);
        let mut deferred = None;
        {
            let mut inner =
                InnerViewMut::<C::Elem, BLOCK_SIZE>::new(self.arena.block_mut(ie.id));
            let n = inner.count();
            debug_assert!(pos <= n);
            debug_assert!(n < Self::INNER_CAP);

            if pos < n {
                inner.move_elems(pos + 1, pos, n - pos - 1);
                inner.set_elem(pos, &max_elem);
                inner.move_children(pos + 1, pos, n - pos);
            } else {
                // New rightmost child: the old max becomes an in-block
                // separator and the new max takes the block's max slot.
                if pos > 0 {
                    inner.set_elem(pos - 1, &own_max);
                }
                deferred = Some(max_elem);
            }
            inner.set_child(pos, child_id);
            inner.set_count(n + 1);
        }
        if let Some(max) = deferred {
            self.max_store(ie.max_slot, max);
        }
    }

    /// Remove the element at the leaf's recorded position.
    pub(crate) fn delete_from_leaf(&mut self, le: &PathElem) {
        let mut new_max = None;
        {
            let mut leaf = LeafViewMut::<C::Elem>::new(self.arena.block_mut(le.id));
            let n = leaf.count();
            let pos = le.insertion_point as usize;
            debug_assert!(pos < n);

            leaf.move_elems(pos, pos + 1, n - 1 - pos);
            leaf.set_count(n - 1);
            if n > 1 {
                new_max = Some(leaf.elem(n - 2));
            }
        }
        if let Some(max) = new_max {
            self.max_store(le.max_slot, max);
        }
        self.size -= 1;
    }

    /// Remove the child at the inner block's recorded slot.
    pub(crate) fn delete_from_inner(&mut self, ie: &PathElem) {
        let mut new_max = None;
        {
            let mut inner =
                InnerViewMut::<C::Elem, BLOCK_SIZE>::new(self.arena.block_mut(ie.id));
            let n = inner.count();
            let pos = ie.insertion_point as usize;
            debug_assert!(pos < n);

            if pos < n - 1 {
                inner.move_elems(pos, pos + 1, n - 2 - pos);
                inner.move_children(pos, pos + 1, n - 1 - pos);
            } else if pos > 0 {
                // Dropped the rightmost child: its left neighbor's
                // separator becomes the block's max.
                new_max = Some(inner.elem(pos - 1));
            }
            inner.set_count(n - 1);
        }
        if let Some(max) = new_max {
            self.max_store(ie.max_slot, max);
        }
    }

    /// Move the last `num` elements of leaf `a` to the front of its right
    /// sibling `b`.
    pub(crate) fn move_to_right_leaf(&mut self, a: &PathElem, b: &PathElem, num: usize) {
        let a_new_max;
        let b_new_max;
        {
            let (a_bytes, b_bytes) = self.arena.pair_mut(a.id, b.id);
            let mut av = LeafViewMut::<C::Elem>::new(a_bytes);
            let mut bv = LeafViewMut::<C::Elem>::new(b_bytes);
            let a_n = av.count();
            let b_n = bv.count();
            let move_all = a_n == num;
            debug_assert!(num > 0 && a_n >= num);
            debug_assert!(b_n + num <= Self::LEAF_CAP);

            bv.move_elems(num, 0, b_n);
            bv.copy_elems_from(0, &av, a_n - num, num);
            av.set_count(a_n - num);
            bv.set_count(b_n + num);

            a_new_max = (!move_all).then(|| av.elem(a_n - num - 1));
            b_new_max = bv.elem(b_n + num - 1);
        }
        if let Some(max) = a_new_max {
            self.max_store(a.max_slot, max);
        }
        self.max_store(b.max_slot, b_new_max);
    }

    /// Move the first `num` elements of leaf `b` to the end of its left
    /// sibling `a`.
    pub(crate) fn move_to_left_leaf(&mut self, a: &PathElem, b: &PathElem, num: usize) {
        let a_new_max;
        {
            let (a_bytes, b_bytes) = self.arena.pair_mut(a.id, b.id);
            let mut av = LeafViewMut::<C::Elem>::new(a_bytes);
            let mut bv = LeafViewMut::<C::Elem>::new(b_bytes);
            let a_n = av.count();
            let b_n = bv.count();
            debug_assert!(num > 0 && b_n >= num);
            debug_assert!(a_n + num <= Self::LEAF_CAP);

            av.copy_elems_from(a_n, &bv, 0, num);
            bv.move_elems(0, num, b_n - num);
            av.set_count(a_n + num);
            bv.set_count(b_n - num);

            a_new_max = av.elem(a_n + num - 1);
        }
        self.max_store(a.max_slot, a_new_max);
    }

    /// Move the last `num` children of inner `a` to the front of its right
    /// sibling `b`.
    pub(crate) fn move_to_right_inner(&mut self, a: &PathElem, b: &PathElem, num: usize) {
        let a_max_old = self.max_load(a.max_slot);
        let a_new_max;
        let mut b_new_max = None;
        {
            let (a_bytes, b_bytes) = self.arena.pair_mut(a.id, b.id);
            let mut av = InnerViewMut::<C::Elem, BLOCK_SIZE>::new(a_bytes);
            let mut bv = InnerViewMut::<C::Elem, BLOCK_SIZE>::new(b_bytes);
            let a_n = av.count();
            let b_n = bv.count();
            let move_to_empty = b_n == 0;
            let move_all = a_n == num;
            debug_assert!(num > 0 && a_n >= num);
            debug_assert!(b_n + num <= Self::INNER_CAP);

            bv.move_children(num, 0, b_n);
            bv.copy_children_from(0, &av, a_n - num, num);

            if !move_to_empty {
                bv.move_elems(num, 0, b_n - 1);
            }
            bv.copy_elems_from(0, &av, a_n - num, num - 1);
            if move_to_empty {
                b_new_max = Some(a_max_old);
            } else {
                // a's old max becomes the separator between moved and
                // resident children.
                bv.set_elem(num - 1, &a_max_old);
            }
            a_new_max = (!move_all).then(|| av.elem(a_n - num - 1));

            av.set_count(a_n - num);
            bv.set_count(b_n + num);
        }
        if let Some(max) = a_new_max {
            self.max_store(a.max_slot, max);
        }
        if let Some(max) = b_new_max {
            self.max_store(b.max_slot, max);
        }
    }

    /// Move the first `num` children of inner `b` to the end of its left
    /// sibling `a`.
    pub(crate) fn move_to_left_inner(&mut self, a: &PathElem, b: &PathElem, num: usize) {
        let a_max_old = self.max_load(a.max_slot);
        let b_max_old = self.max_load(b.max_slot);
        let a_new_max;
        {
            let (a_bytes, b_bytes) = self.arena.pair_mut(a.id, b.id);
            let mut av = InnerViewMut::<C::Elem, BLOCK_SIZE>::new(a_bytes);
            let mut bv = InnerViewMut::<C::Elem, BLOCK_SIZE>::new(b_bytes);
            let a_n = av.count();
            let b_n = bv.count();
            let move_to_empty = a_n == 0;
            let move_all = b_n == num;
            debug_assert!(num > 0 && b_n >= num);
            debug_assert!(a_n + num <= Self::INNER_CAP);

            av.copy_children_from(a_n, &bv, 0, num);
            bv.move_children(0, num, b_n - num);

            if !move_to_empty {
                av.set_elem(a_n - 1, &a_max_old);
            }
            av.copy_elems_from(a_n, &bv, 0, num - 1);
            if move_all {
                a_new_max = b_max_old;
            } else {
                a_new_max = bv.elem(num - 1);
                bv.move_elems(0, num, b_n - num - 1);
            }

            av.set_count(a_n + num);
            bv.set_count(b_n - num);
        }
        self.max_store(a.max_slot, a_new_max);
    }

    /// Virtually insert `new_elem` at `a`'s insertion point while moving the
    /// last `num` entries of the enlarged sequence into right sibling `b`.
    pub(crate) fn insert_and_move_right_leaf(
        &mut self,
        a: &PathElem,
        b: &PathElem,
        num: usize,
        new_elem: C::Elem,
    ) {
        let mut a_new_max = None;
        let mut b_new_max = None;
        {
            let (a_bytes, b_bytes) = self.arena.pair_mut(a.id, b.id);
            let mut av = LeafViewMut::<C::Elem>::new(a_bytes);
            let mut bv = LeafViewMut::<C::Elem>::new(b_bytes);
            let a_n = av.count();
            let b_n = bv.count();
            let pos = a.insertion_point as usize;
            let move_to_empty = b_n == 0;
            let move_all = a_n == num - 1;
            debug_assert!(num > 0 && a_n + 1 >= num);
            debug_assert!(b_n + num <= Self::LEAF_CAP);
            debug_assert!(pos <= a_n);

            bv.move_elems(num, 0, b_n);

            let mid = a_n - pos;
            if mid >= num {
                // The insertion lands in a.
                bv.copy_elems_from(0, &av, a_n - num, num);
                av.move_elems(pos + 1, pos, mid - num);
                av.set_elem(pos, &new_elem);
            } else {
                // The insertion lands in b.
                let new_pos = num - mid - 1;
                bv.copy_elems_from(0, &av, a_n - num + 1, new_pos);
                bv.set_elem(new_pos, &new_elem);
                bv.copy_elems_from(new_pos + 1, &av, pos, mid);
            }

            av.set_count(a_n - (num - 1));
            bv.set_count(b_n + num);
            if !move_all {
                a_new_max = Some(av.elem(a_n - num));
            }
            if move_to_empty {
                b_new_max = Some(bv.elem(b_n + num - 1));
            }
        }
        if let Some(max) = a_new_max {
            self.max_store(a.max_slot, max);
        }
        if let Some(max) = b_new_max {
            self.max_store(b.max_slot, max);
        }
        self.size += 1;
    }

    /// Virtually insert `new_elem` at `b`'s insertion point while moving the
    /// first `num` entries of the enlarged sequence into left sibling `a`.
    pub(crate) fn insert_and_move_left_leaf(
        &mut self,
        a: &PathElem,
        b: &PathElem,
        num: usize,
        new_elem: C::Elem,
    ) {
        let a_new_max;
        let mut b_new_max = None;
        {
            let (a_bytes, b_bytes) = self.arena.pair_mut(a.id, b.id);
            let mut av = LeafViewMut::<C::Elem>::new(a_bytes);
            let mut bv = LeafViewMut::<C::Elem>::new(b_bytes);
            let a_n = av.count();
            let b_n = bv.count();
            let pos = b.insertion_point as usize;
            let move_all = b_n == num - 1;
            debug_assert!(num > 0 && b_n + 1 >= num);
            debug_assert!(a_n + num <= Self::LEAF_CAP);
            debug_assert!(pos <= b_n);

            if pos >= num {
                // The insertion stays in b.
                let new_pos = pos - num;
                av.copy_elems_from(a_n, &bv, 0, num);
                bv.move_elems(0, num, new_pos);
                bv.set_elem(new_pos, &new_elem);
                bv.move_elems(new_pos + 1, pos, b_n - pos);
            } else {
                // The insertion lands in a.
                let new_pos = a_n + pos;
                av.copy_elems_from(a_n, &bv, 0, pos);
                av.set_elem(new_pos, &new_elem);
                av.copy_elems_from(new_pos + 1, &bv, pos, num - 1 - pos);
                if !move_all {
                    bv.move_elems(0, num - 1, b_n - num + 1);
                }
            }

            av.set_count(a_n + num);
            bv.set_count(b_n - (num - 1));
            a_new_max = av.elem(a_n + num - 1);
            if !move_all {
                b_new_max = Some(bv.elem(b_n - num));
            }
        }
        self.max_store(a.max_slot, a_new_max);
        if let Some(max) = b_new_max {
            self.max_store(b.max_slot, max);
        }
        self.size += 1;
    }

    /// Inner flavor of [`Self::insert_and_move_right_leaf`]: virtually
    /// insert child `child_id` (subtree max `max_elem`) at `pos` in `a`
    /// while moving the last `num` entries into right sibling `b`.
    pub(crate) fn insert_and_move_right_inner(
        &mut self,
        a: &PathElem,
        b: &PathElem,
        num: usize,
        child_id: u32,
        pos: usize,
        max_elem: C::Elem,
    ) {
        let a_max_old = self.max_load(a.max_slot);
        let mut a_new_max = None;
        let mut b_new_max = None;
        {
            let (a_bytes, b_bytes) = self.arena.pair_mut(a.id, b.id);
            let mut av = InnerViewMut::<C::Elem, BLOCK_SIZE>::new(a_bytes);
            let mut bv = InnerViewMut::<C::Elem, BLOCK_SIZE>::new(b_bytes);
            let a_n = av.count();
            let b_n = bv.count();
            let move_to_empty = b_n == 0;
            let move_all = a_n == num - 1;
            debug_assert!(num > 0 && a_n + 1 >= num);
            debug_assert!(b_n + num <= Self::INNER_CAP);
            debug_assert!(pos <= a_n);

            if !move_to_empty {
                bv.move_children(num, 0, b_n);
                bv.move_elems(num, 0, b_n - 1);
            }

            let mid = a_n - pos;
            if mid > num {
                // Insertion lands inside a.
                bv.copy_children_from(0, &av, a_n - num, num);
                av.move_children(pos + 1, pos, mid - num);
                av.set_child(pos, child_id);

                bv.copy_elems_from(0, &av, a_n - num, num - 1);
                if move_to_empty {
                    b_new_max = Some(a_max_old);
                } else {
                    bv.set_elem(num - 1, &a_max_old);
                }

                a_new_max = Some(av.elem(a_n - num - 1));
                av.move_elems(pos + 1, pos, mid - num - 1);
                av.set_elem(pos, &max_elem);
            } else if mid == num {
                // Insertion lands at a's new last slot.
                bv.copy_children_from(0, &av, a_n - num, num);
                av.set_child(pos, child_id);

                bv.copy_elems_from(0, &av, a_n - num, num - 1);
                if move_to_empty {
                    b_new_max = Some(a_max_old);
                } else {
                    bv.set_elem(num - 1, &a_max_old);
                }

                a_new_max = Some(max_elem);
            } else {
                // Insertion lands in b.
                let new_pos = num - mid - 1;
                bv.copy_children_from(0, &av, a_n - num + 1, new_pos);
                bv.set_child(new_pos, child_id);
                bv.copy_children_from(new_pos + 1, &av, pos, mid);

                if pos == a_n {
                    if move_to_empty {
                        b_new_max = Some(max_elem);
                    } else {
                        bv.set_elem(num - 1, &max_elem);
                    }
                    if num > 1 {
                        bv.copy_elems_from(0, &av, a_n - num + 1, num - 2);
                        bv.set_elem(num - 2, &a_max_old);
                        if !move_all {
                            a_new_max = Some(av.elem(a_n - num));
                        }
                    }
                } else {
                    debug_assert!(num > 1);
                    bv.copy_elems_from(0, &av, a_n - num + 1, num - mid - 1);
                    bv.set_elem(new_pos, &max_elem);
                    bv.copy_elems_from(new_pos + 1, &av, pos, mid - 1);
                    if move_to_empty {
                        b_new_max = Some(a_max_old);
                    } else {
                        bv.set_elem(num - 1, &a_max_old);
                    }
                    if !move_all {
                        a_new_max = Some(av.elem(a_n - num));
                    }
                }
            }

            av.set_count(a_n - (num - 1));
            bv.set_count(b_n + num);
        }
        if let Some(max) = a_new_max {
            self.max_store(a.max_slot, max);
        }
        if let Some(max) = b_new_max {
            self.max_store(b.max_slot, max);
        }
    }

    /// Inner flavor of [`Self::insert_and_move_left_leaf`]: virtually insert
    /// child `child_id` (subtree max `max_elem`) at `pos` in `b` while
    /// moving the first `num` entries into left sibling `a`.
    pub(crate) fn insert_and_move_left_inner(
        &mut self,
        a: &PathElem,
        b: &PathElem,
        num: usize,
        child_id: u32,
        pos: usize,
        max_elem: C::Elem,
    ) {
        let a_max_old = self.max_load(a.max_slot);
        let b_max_old = self.max_load(b.max_slot);
        let mut a_new_max = None;
        let mut b_new_max = None;
        {
            let (a_bytes, b_bytes) = self.arena.pair_mut(a.id, b.id);
            let mut av = InnerViewMut::<C::Elem, BLOCK_SIZE>::new(a_bytes);
            let mut bv = InnerViewMut::<C::Elem, BLOCK_SIZE>::new(b_bytes);
            let a_n = av.count();
            let b_n = bv.count();
            let move_to_empty = a_n == 0;
            let move_all = b_n == num - 1;
            debug_assert!(num > 0 && b_n + 1 >= num);
            debug_assert!(a_n + num <= Self::INNER_CAP);
            debug_assert!(pos <= b_n);

            if pos >= num {
                // Insertion stays in b.
                let new_pos = pos - num;
                av.copy_children_from(a_n, &bv, 0, num);
                bv.move_children(0, num, new_pos);
                bv.set_child(new_pos, child_id);
                bv.move_children(new_pos + 1, pos, b_n - pos);

                if !move_to_empty {
                    av.set_elem(a_n - 1, &a_max_old);
                }
                av.copy_elems_from(a_n, &bv, 0, num - 1);
                a_new_max = Some(if num < b_n { bv.elem(num - 1) } else { b_max_old });

                if pos == b_n {
                    if num < b_n {
                        bv.move_elems(0, num, b_n - num - 1);
                        bv.set_elem(b_n - num - 1, &b_max_old);
                    }
                    b_new_max = Some(max_elem);
                } else {
                    bv.move_elems(0, num, new_pos);
                    bv.set_elem(new_pos, &max_elem);
                    bv.move_elems(new_pos + 1, pos, b_n - pos - 1);
                }
            } else {
                // Insertion lands in a.
                let new_pos = a_n + pos;
                av.copy_children_from(a_n, &bv, 0, pos);
                av.set_child(new_pos, child_id);
                av.copy_children_from(new_pos + 1, &bv, pos, num - 1 - pos);
                if !move_all {
                    bv.move_children(0, num - 1, b_n - num + 1);
                }

                if !move_to_empty {
                    av.set_elem(a_n - 1, &a_max_old);
                }
                if !move_all {
                    av.copy_elems_from(a_n, &bv, 0, pos);
                } else if pos == b_n {
                    if pos > 0 {
                        av.copy_elems_from(a_n, &bv, 0, pos - 1);
                        av.set_elem(new_pos - 1, &b_max_old);
                    }
                } else {
                    av.copy_elems_from(a_n, &bv, 0, pos);
                }

                if new_pos == a_n + num - 1 {
                    a_new_max = Some(max_elem);
                } else {
                    av.set_elem(new_pos, &max_elem);
                    av.copy_elems_from(new_pos + 1, &bv, pos, num - 2 - pos);
                    a_new_max = Some(if move_all { b_max_old } else { bv.elem(num - 2) });
                }
                if !move_all {
                    bv.move_elems(0, num - 1, b_n - num);
                }
            }

            av.set_count(a_n + num);
            bv.set_count(b_n - (num - 1));
        }
        if let Some(max) = a_new_max {
            self.max_store(a.max_slot, max);
        }
        if let Some(max) = b_new_max {
            self.max_store(b.max_slot, max);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Exhaustive micro-checks of the structural primitives over synthetic
    //! two-sibling fixtures, complementing the end-to-end suites in tests/.
    //! Leaves are modeled as value sequences; inner blocks as sequences of
    //! (child id, subtree max) pairs whose last max lives in the parent.

    use super::*;
    use crate::alloc::HeapAllocator;
    use crate::cmp::U64Cmp;
    use crate::tree::block::{InnerView, LeafView, INVALID_ID};
    use crate::tree::path::MaxSlot;

    const BS: usize = 512;
    type Tree = BTree<U64Cmp, HeapAllocator, BS>;

    const LEAF_CAP: usize = Tree::LEAF_CAP;
    const INNER_CAP: usize = Tree::INNER_CAP;

    /// Parent inner block with three child slots; blocks a and b sit at
    /// slots 0 and 1 so both maxima live in parent separators.
    fn fixture() -> (Tree, u32, PathElem, PathElem) {
        let mut tree = Tree::new(U64Cmp, HeapAllocator);
        let parent = tree.arena.alloc_block().unwrap();
        let a_id = tree.arena.alloc_block().unwrap();
        let b_id = tree.arena.alloc_block().unwrap();
        {
            let mut pv = InnerViewMut::<u64, BS>::init(tree.arena.block_mut(parent));
            pv.set_count(3);
            pv.set_child(0, a_id);
            pv.set_child(1, b_id);
            pv.set_child(2, 0xDEAD);
        }
        let pe = |id, slot| PathElem {
            id,
            insertion_point: 0,
            pos_in_parent: slot,
            max_slot: MaxSlot::Node {
                id: parent,
                idx: slot,
            },
        };
        (tree, parent, pe(a_id, 0), pe(b_id, 1))
    }

    fn set_leaf(tree: &mut Tree, pe: &PathElem, vals: &[u64]) {
        {
            let mut lv =
                LeafViewMut::<u64>::init(tree.arena.block_mut(pe.id), INVALID_ID, INVALID_ID);
            for (i, v) in vals.iter().enumerate() {
                lv.set_elem(i, v);
            }
            lv.set_count(vals.len());
        }
        if let Some(last) = vals.last() {
            tree.max_store(pe.max_slot, *last);
        }
    }

    fn leaf_vals(tree: &Tree, pe: &PathElem) -> Vec<u64> {
        let lv = LeafView::<u64>::new(tree.arena.block(pe.id));
        (0..lv.count()).map(|i| lv.elem(i)).collect()
    }

    fn max_of(tree: &Tree, pe: &PathElem) -> u64 {
        tree.max_load(pe.max_slot)
    }

    /// Ascending fixture values spaced by 10 so probes fit between them.
    fn seq(start: usize, n: usize) -> Vec<u64> {
        (0..n).map(|i| 100 + 10 * (start + i) as u64).collect()
    }

    #[test]
    fn insert_into_leaf_all_positions() {
        let (mut tree, _, a, _) = fixture();
        for n in 0..LEAF_CAP {
            for pos in 0..=n {
                let vals = seq(0, n);
                set_leaf(&mut tree, &a, &vals);
                tree.size = 0;

                let mut le = a;
                le.insertion_point = pos as u16;
                let probe = 95 + 10 * pos as u64;
                tree.insert_into_leaf(&le, probe);

                let mut expect = vals.clone();
                expect.insert(pos, probe);
                assert_eq!(leaf_vals(&tree, &a), expect, "n={} pos={}", n, pos);
                assert_eq!(max_of(&tree, &a), *expect.last().unwrap());
                assert_eq!(tree.size, 1);
            }
        }
    }

    #[test]
    fn delete_from_leaf_all_positions() {
        let (mut tree, _, a, _) = fixture();
        for n in 1..=LEAF_CAP {
            for pos in 0..n {
                let vals = seq(0, n);
                set_leaf(&mut tree, &a, &vals);
                tree.size = 1;

                let mut le = a;
                le.insertion_point = pos as u16;
                tree.delete_from_leaf(&le);

                let mut expect = vals.clone();
                expect.remove(pos);
                assert_eq!(leaf_vals(&tree, &a), expect, "n={} pos={}", n, pos);
                if let Some(last) = expect.last() {
                    assert_eq!(max_of(&tree, &a), *last);
                }
                assert_eq!(tree.size, 0);
            }
        }
    }

    #[test]
    fn move_to_right_leaf_all_feasible_counts() {
        let (mut tree, _, a, b) = fixture();
        for i in 1..=LEAF_CAP {
            for j in [0usize, 1, 7, LEAF_CAP / 2] {
                let max_move = i.min(LEAF_CAP - j);
                for k in 1..=max_move {
                    let all = seq(0, i + j);
                    set_leaf(&mut tree, &a, &all[..i]);
                    set_leaf(&mut tree, &b, &all[i..]);

                    tree.move_to_right_leaf(&a, &b, k);

                    assert_eq!(leaf_vals(&tree, &a), &all[..i - k], "i={} j={} k={}", i, j, k);
                    assert_eq!(leaf_vals(&tree, &b), &all[i - k..]);
                    if i > k {
                        assert_eq!(max_of(&tree, &a), all[i - k - 1]);
                    }
                    assert_eq!(max_of(&tree, &b), *all.last().unwrap());
                }
            }
        }
    }

    #[test]
    fn move_to_left_leaf_all_feasible_counts() {
        let (mut tree, _, a, b) = fixture();
        for j in 1..=LEAF_CAP {
            for i in [0usize, 1, 7, LEAF_CAP / 2] {
                let max_move = j.min(LEAF_CAP - i);
                for k in 1..=max_move {
                    let all = seq(0, i + j);
                    set_leaf(&mut tree, &a, &all[..i]);
                    set_leaf(&mut tree, &b, &all[i..]);

                    tree.move_to_left_leaf(&a, &b, k);

                    assert_eq!(leaf_vals(&tree, &a), &all[..i + k], "i={} j={} k={}", i, j, k);
                    assert_eq!(leaf_vals(&tree, &b), &all[i + k..]);
                    assert_eq!(max_of(&tree, &a), all[i + k - 1]);
                }
            }
        }
    }

    #[test]
    fn insert_and_move_right_leaf_lands_in_either_block() {
        let (mut tree, _, a, b) = fixture();
        for i in 0..=LEAF_CAP.min(40) {
            for j in [0usize, 1, 5] {
                for pos in 0..=i {
                    let max_move = (i + 1).min(LEAF_CAP - j);
                    for num in 1..=max_move {
                        let all = seq(0, i + j);
                        set_leaf(&mut tree, &a, &all[..i]);
                        set_leaf(&mut tree, &b, &all[i..]);
                        tree.size = 0;

                        let mut ae = a;
                        ae.insertion_point = pos as u16;
                        let probe = 95 + 10 * pos as u64;
                        tree.insert_and_move_right_leaf(&ae, &b, num, probe);

                        let mut merged = all[..i].to_vec();
                        merged.insert(pos, probe);
                        let split = i + 1 - num;
                        let mut expect_b = merged[split..].to_vec();
                        expect_b.extend_from_slice(&all[i..]);

                        assert_eq!(
                            leaf_vals(&tree, &a),
                            &merged[..split],
                            "i={} j={} pos={} num={}",
                            i,
                            j,
                            pos,
                            num
                        );
                        assert_eq!(leaf_vals(&tree, &b), expect_b);
                        assert_eq!(tree.size, 1);
                        if split > 0 {
                            assert_eq!(max_of(&tree, &a), merged[split - 1]);
                        }
                        if j == 0 {
                            assert_eq!(max_of(&tree, &b), *expect_b.last().unwrap());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn insert_and_move_left_leaf_lands_in_either_block() {
        let (mut tree, _, a, b) = fixture();
        for j in 0..=LEAF_CAP.min(40) {
            for i in [0usize, 1, 5] {
                for pos in 0..=j {
                    let max_move = (j + 1).min(LEAF_CAP - i);
                    for num in 1..=max_move {
                        let all = seq(0, i + j);
                        set_leaf(&mut tree, &a, &all[..i]);
                        set_leaf(&mut tree, &b, &all[i..]);
                        tree.size = 0;

                        let mut be = b;
                        be.insertion_point = pos as u16;
                        let probe = 95 + 10 * (i + pos) as u64;
                        tree.insert_and_move_left_leaf(&a, &be, num, probe);

                        let mut merged = all[i..].to_vec();
                        merged.insert(pos, probe);
                        let mut expect_a = all[..i].to_vec();
                        expect_a.extend_from_slice(&merged[..num]);

                        assert_eq!(
                            leaf_vals(&tree, &a),
                            expect_a,
                            "i={} j={} pos={} num={}",
                            i,
                            j,
                            pos,
                            num
                        );
                        assert_eq!(leaf_vals(&tree, &b), &merged[num..]);
                        assert_eq!(tree.size, 1);
                        assert_eq!(max_of(&tree, &a), *expect_a.last().unwrap());
                        if merged.len() > num {
                            assert_eq!(max_of(&tree, &b), *merged.last().unwrap());
                        }
                    }
                }
            }
        }
    }

    // -- inner-block fixtures ------------------------------------------------

    /// Write (child id, subtree max) pairs; the last pair's max goes through
    /// the block's max slot.
    fn set_inner(tree: &mut Tree, pe: &PathElem, entries: &[(u32, u64)]) {
        {
            let mut iv = InnerViewMut::<u64, BS>::init(tree.arena.block_mut(pe.id));
            for (i, (child, max)) in entries.iter().enumerate() {
                iv.set_child(i, *child);
                if i + 1 < entries.len() {
                    iv.set_elem(i, max);
                }
            }
            iv.set_count(entries.len());
        }
        if let Some((_, last_max)) = entries.last() {
            tree.max_store(pe.max_slot, *last_max);
        }
    }

    fn inner_entries(tree: &Tree, pe: &PathElem) -> Vec<(u32, u64)> {
        let iv = InnerView::<u64, BS>::new(tree.arena.block(pe.id));
        let n = iv.count();
        (0..n)
            .map(|i| {
                let max = if i + 1 < n {
                    iv.elem(i)
                } else {
                    tree.max_load(pe.max_slot)
                };
                (iv.child(i), max)
            })
            .collect()
    }

    fn inner_seq(start: usize, n: usize) -> Vec<(u32, u64)> {
        (0..n)
            .map(|i| (1000 + (start + i) as u32, 100 + 10 * (start + i) as u64))
            .collect()
    }

    #[test]
    fn insert_into_inner_all_positions() {
        let (mut tree, _, a, _) = fixture();
        for n in 1..INNER_CAP {
            for pos in 0..=n {
                let entries = inner_seq(0, n);
                set_inner(&mut tree, &a, &entries);

                let probe = (9000, 95 + 10 * pos as u64);
                tree.insert_into_inner(&a, probe.0, pos, probe.1);

                let mut expect = entries.clone();
                expect.insert(pos, probe);
                assert_eq!(inner_entries(&tree, &a), expect, "n={} pos={}", n, pos);
            }
        }
    }

    #[test]
    fn delete_from_inner_all_positions() {
        let (mut tree, _, a, _) = fixture();
        for n in 1..=INNER_CAP {
            for pos in 0..n {
                let entries = inner_seq(0, n);
                set_inner(&mut tree, &a, &entries);

                let mut ie = a;
                ie.insertion_point = pos as u16;
                tree.delete_from_inner(&ie);

                let mut expect = entries.clone();
                expect.remove(pos);
                if expect.is_empty() {
                    let iv = InnerView::<u64, BS>::new(tree.arena.block(a.id));
                    assert_eq!(iv.count(), 0);
                } else {
                    assert_eq!(inner_entries(&tree, &a), expect, "n={} pos={}", n, pos);
                }
            }
        }
    }

    #[test]
    fn move_to_right_inner_all_feasible_counts() {
        let (mut tree, _, a, b) = fixture();
        for i in 1..=INNER_CAP {
            for j in [0usize, 1, 7, INNER_CAP / 2] {
                let max_move = i.min(INNER_CAP - j);
                for k in 1..=max_move {
                    let all = inner_seq(0, i + j);
                    set_inner(&mut tree, &a, &all[..i]);
                    set_inner(&mut tree, &b, &all[i..]);

                    tree.move_to_right_inner(&a, &b, k);

                    if i > k {
                        assert_eq!(
                            inner_entries(&tree, &a),
                            &all[..i - k],
                            "i={} j={} k={}",
                            i,
                            j,
                            k
                        );
                    }
                    assert_eq!(inner_entries(&tree, &b), &all[i - k..], "i={} j={} k={}", i, j, k);
                }
            }
        }
    }

    #[test]
    fn move_to_left_inner_all_feasible_counts() {
        let (mut tree, _, a, b) = fixture();
        for j in 1..=INNER_CAP {
            for i in [0usize, 1, 7, INNER_CAP / 2] {
                let max_move = j.min(INNER_CAP - i);
                for k in 1..=max_move {
                    let all = inner_seq(0, i + j);
                    set_inner(&mut tree, &a, &all[..i]);
                    set_inner(&mut tree, &b, &all[i..]);

                    tree.move_to_left_inner(&a, &b, k);

                    assert_eq!(inner_entries(&tree, &a), &all[..i + k], "i={} j={} k={}", i, j, k);
                    if j > k {
                        assert_eq!(
                            inner_entries(&tree, &b),
                            &all[i + k..],
                            "i={} j={} k={}",
                            i,
                            j,
                            k
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn insert_and_move_right_inner_lands_in_either_block() {
        let (mut tree, _, a, b) = fixture();
        for i in 0..=INNER_CAP.min(30) {
            for j in [0usize, 1, 5] {
                for pos in 0..=i {
                    let max_move = (i + 1).min(INNER_CAP - j);
                    for num in 1..=max_move {
                        let all = inner_seq(0, i + j);
                        set_inner(&mut tree, &a, &all[..i]);
                        set_inner(&mut tree, &b, &all[i..]);

                        let probe = (9000u32, 95 + 10 * pos as u64);
                        tree.insert_and_move_right_inner(&a, &b, num, probe.0, pos, probe.1);

                        let mut merged = all[..i].to_vec();
                        merged.insert(pos, probe);
                        let split = i + 1 - num;
                        let mut expect_b = merged[split..].to_vec();
                        expect_b.extend_from_slice(&all[i..]);

                        if split > 0 {
                            assert_eq!(
                                inner_entries(&tree, &a),
                                &merged[..split],
                                "i={} j={} pos={} num={}",
                                i,
                                j,
                                pos,
                                num
                            );
                        }
                        assert_eq!(
                            inner_entries(&tree, &b),
                            expect_b,
                            "i={} j={} pos={} num={}",
                            i,
                            j,
                            pos,
                            num
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn insert_and_move_left_inner_lands_in_either_block() {
        let (mut tree, _, a, b) = fixture();
        for j in 0..=INNER_CAP.min(30) {
            for i in [0usize, 1, 5] {
                for pos in 0..=j {
                    let max_move = (j + 1).min(INNER_CAP - i);
                    for num in 1..=max_move {
                        let all = inner_seq(0, i + j);
                        set_inner(&mut tree, &a, &all[..i]);
                        set_inner(&mut tree, &b, &all[i..]);

                        let probe = (9000u32, 95 + 10 * (i + pos) as u64);
                        tree.insert_and_move_left_inner(&a, &b, num, probe.0, pos, probe.1);

                        let mut merged = all[i..].to_vec();
                        merged.insert(pos, probe);
                        let mut expect_a = all[..i].to_vec();
                        expect_a.extend_from_slice(&merged[..num]);

                        assert_eq!(
                            inner_entries(&tree, &a),
                            expect_a,
                            "i={} j={} pos={} num={}",
                            i,
                            j,
                            pos,
                            num
                        );
                        if merged.len() > num {
                            assert_eq!(
                                inner_entries(&tree, &b),
                                &merged[num..],
                                "i={} j={} pos={} num={}",
                                i,
                                j,
                                pos,
                                num
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn parent_untouched_by_child_moves() {
        let (mut tree, parent, a, b) = fixture();
        set_leaf(&mut tree, &a, &seq(0, 10));
        set_leaf(&mut tree, &b, &seq(10, 10));

        tree.move_to_right_leaf(&a, &b, 3);

        let pv = InnerView::<u64, BS>::new(tree.arena.block(parent));
        assert_eq!(pv.count(), 3);
        assert_eq!(pv.child(0), a.id);
        assert_eq!(pv.child(1), b.id);
        assert_eq!(pv.child(2), 0xDEAD);
    }
}
