//! Root-to-leaf path collection.
//!
//! A descent records one [`PathElem`] per inner level plus one for the leaf.
//! Each element carries the chosen child slot, the block's own slot within
//! its parent, and a [`MaxSlot`]: the place where a copy of this subtree's
//! maximum element lives. For a non-rightmost child that is a separator slot
//! in the parent; along the rightmost spine it is an ancestor's slot,
//! bottoming out at the tree-wide max field. Structural operations refresh
//! subtree maxima through these descriptors with O(1) stores.

use smallvec::SmallVec;

use crate::alloc::ExtentAllocator;
use crate::cmp::Comparator;
use crate::tree::block::{InnerViewMut, MAX_DEPTH};
use crate::tree::btree::BTree;
use crate::tree::search;

/// Where a subtree's max-element copy is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MaxSlot {
    /// The tree's own `max_elem` field (rightmost spine of the whole tree).
    Tree,
    /// Separator slot `idx` of inner block `id`.
    Node { id: u32, idx: u16 },
    /// The tree's staging slot for a block split off in the current
    /// operation, before its separator exists in any parent.
    Pending,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PathElem {
    pub id: u32,
    /// Chosen child slot (inner) or element position (leaf).
    pub insertion_point: u16,
    /// This block's slot in its parent's child array.
    pub pos_in_parent: u16,
    pub max_slot: MaxSlot,
}

pub(crate) type Path = SmallVec<[PathElem; MAX_DEPTH]>;

impl<C: Comparator, A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize>
    BTree<C, A, BLOCK_SIZE, EXTENT_SIZE>
{
    pub(crate) fn max_load(&self, slot: MaxSlot) -> C::Elem {
        match slot {
            MaxSlot::Tree => self.max_elem,
            MaxSlot::Pending => self.pending_max,
            MaxSlot::Node { id, idx } => self.inner(id).elem(idx as usize),
        }
    }

    pub(crate) fn max_store(&mut self, slot: MaxSlot, value: C::Elem) {
        match slot {
            MaxSlot::Tree => self.max_elem = value,
            MaxSlot::Pending => self.pending_max = value,
            MaxSlot::Node { id, idx } => {
                let mut inner = InnerViewMut::<C::Elem, BLOCK_SIZE>::new(self.arena.block_mut(id));
                inner.set_elem(idx as usize, &value);
            }
        }
    }

    /// Descend to the leaf where `elem` lives or would be inserted.
    ///
    /// Returns the inner levels root-first, the leaf path element, and
    /// whether an equal element exists. Once a separator compares equal the
    /// element is the maximum of that child's subtree, so the remaining
    /// descent takes the rightmost slot without further searching.
    pub(crate) fn collect_path(&self, elem: &C::Elem) -> (Path, PathElem, bool) {
        let mut exact = false;
        let mut path = Path::new();
        let mut block_id = self.root_id;
        let mut max_slot = MaxSlot::Tree;
        let mut prev_pos: u16 = 0;

        for _ in 1..self.depth {
            let inner = self.inner(block_id);
            let n = inner.count();
            let pos = if exact {
                n - 1
            } else {
                let (pos, eq) =
                    search::lower_bound_elem(&self.cmp, n - 1, |i| inner.elem(i), elem);
                exact = eq;
                pos
            };
            path.push(PathElem {
                id: block_id,
                insertion_point: pos as u16,
                pos_in_parent: prev_pos,
                max_slot,
            });
            if pos < n - 1 {
                max_slot = MaxSlot::Node {
                    id: block_id,
                    idx: pos as u16,
                };
            }
            prev_pos = pos as u16;
            block_id = inner.child(pos);
        }

        let leaf = self.leaf(block_id);
        let n = leaf.count();
        let pos = if exact {
            n - 1
        } else {
            let (pos, eq) = search::lower_bound_elem(&self.cmp, n, |i| leaf.elem(i), elem);
            exact = eq;
            pos
        };
        let leaf_pe = PathElem {
            id: block_id,
            insertion_point: pos as u16,
            pos_in_parent: prev_pos,
            max_slot,
        };
        (path, leaf_pe, exact)
    }

    /// Path element of the sibling immediately left of `pe` under `parent`.
    /// Only siblings under the same parent count.
    pub(crate) fn collect_left_sibling(
        &self,
        parent: Option<&PathElem>,
        pe: &PathElem,
    ) -> Option<PathElem> {
        let parent = parent?;
        if pe.pos_in_parent == 0 {
            return None;
        }
        let pos = pe.pos_in_parent - 1;
        let pv = self.inner(parent.id);
        Some(PathElem {
            id: pv.child(pos as usize),
            insertion_point: 0,
            pos_in_parent: pos,
            max_slot: MaxSlot::Node {
                id: parent.id,
                idx: pos,
            },
        })
    }

    /// Path element of the sibling immediately right of `pe` under `parent`.
    pub(crate) fn collect_right_sibling(
        &self,
        parent: Option<&PathElem>,
        pe: &PathElem,
    ) -> Option<PathElem> {
        let parent = parent?;
        let pv = self.inner(parent.id);
        let n = pv.count() as u16;
        if pe.pos_in_parent + 1 >= n {
            return None;
        }
        let pos = pe.pos_in_parent + 1;
        let max_slot = if pos + 1 >= n {
            // Rightmost child: its max lives wherever the parent's does.
            parent.max_slot
        } else {
            MaxSlot::Node {
                id: parent.id,
                idx: pos,
            }
        };
        Some(PathElem {
            id: pv.child(pos as usize),
            insertion_point: 0,
            pos_in_parent: pos,
            max_slot,
        })
    }

    /// Path element for a block freshly split off to the right of `pe`. Its
    /// maximum has no separator slot yet and goes to the staging slot.
    pub(crate) fn prepare_new_sibling(&self, pe: &PathElem, new_id: u32) -> PathElem {
        PathElem {
            id: new_id,
            insertion_point: 0,
            pos_in_parent: pe.pos_in_parent + 1,
            max_slot: MaxSlot::Pending,
        }
    }
}
