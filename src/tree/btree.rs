//! Tree struct, public API and block lifecycle.
//!
//! The tree owns a [`BlockArena`] and addresses every node by 32-bit block
//! id. Freed blocks go to a garbage list threaded through the blocks
//! themselves and are reused before the arena is asked for fresh memory;
//! `reserve_blocks` tops the list up ahead of a split so that allocation is
//! the *only* fallible step of an insertion and happens before any mutation.
//!
//! Lookup descends through inner nodes comparing against separator copies of
//! subtree maxima; all structural repair happens in the insert/delete drivers
//! (`tree::insert`, `tree::delete`) working over paths collected in
//! `tree::path`.

use eyre::{bail, Result};
use zerocopy::FromZeros;

use crate::alloc::{BlockArena, ExtentAllocator, HeapAllocator};
use crate::cmp::Comparator;
use crate::tree::block::{
    free_next, init_free, inner_cap, leaf_cap, InnerView, LeafView, LeafViewMut, INVALID_ID,
};
use crate::tree::search;

pub const DEFAULT_BLOCK_SIZE: usize = 512;
pub const DEFAULT_EXTENT_SIZE: usize = 16 * 1024;

/// In-memory B+*-tree over fixed-size POD elements.
///
/// Blocks are `BLOCK_SIZE` bytes, memory arrives in `EXTENT_SIZE` extents
/// from the host allocator. Occupancy is kept around two thirds by balancing
/// across up to three sibling blocks before splitting.
pub struct BTree<
    C: Comparator,
    A: ExtentAllocator = HeapAllocator,
    const BLOCK_SIZE: usize = DEFAULT_BLOCK_SIZE,
    const EXTENT_SIZE: usize = DEFAULT_EXTENT_SIZE,
> {
    pub(crate) arena: BlockArena<A, BLOCK_SIZE, EXTENT_SIZE>,
    pub(crate) cmp: C,
    /// Root block id; INVALID_ID when the tree is empty.
    pub(crate) root_id: u32,
    /// First and last leaf of the ordered chain.
    pub(crate) first_id: u32,
    pub(crate) last_id: u32,
    pub(crate) leaf_count: u32,
    pub(crate) inner_count: u32,
    pub(crate) free_count: u32,
    /// Tree height; 0 when empty.
    pub(crate) depth: u32,
    pub(crate) size: usize,
    /// Head of the garbage list; INVALID_ID when empty.
    pub(crate) garbage_head: u32,
    /// Copy of the maximal element in the tree.
    pub(crate) max_elem: C::Elem,
    /// Staging slot for the maximum of a freshly split block, before its
    /// separator is installed in the parent.
    pub(crate) pending_max: C::Elem,
}

impl<C: Comparator, A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize>
    BTree<C, A, BLOCK_SIZE, EXTENT_SIZE>
{
    pub(crate) const LEAF_CAP: usize = leaf_cap::<C::Elem>(BLOCK_SIZE);
    pub(crate) const INNER_CAP: usize = inner_cap::<C::Elem>(BLOCK_SIZE);
    pub(crate) const LEAF_MIN: usize = Self::LEAF_CAP * 2 / 3;
    pub(crate) const INNER_MIN: usize = Self::INNER_CAP * 2 / 3;

    pub fn new(cmp: C, alloc: A) -> Self {
        assert!(
            Self::LEAF_CAP >= 4 && Self::INNER_CAP >= 4,
            "block size {} too small for the element type",
            BLOCK_SIZE
        );
        assert!(Self::LEAF_CAP <= u16::MAX as usize && Self::INNER_CAP <= u16::MAX as usize);

        Self {
            arena: BlockArena::new(alloc),
            cmp,
            root_id: INVALID_ID,
            first_id: INVALID_ID,
            last_id: INVALID_ID,
            leaf_count: 0,
            inner_count: 0,
            free_count: 0,
            depth: 0,
            size: 0,
            garbage_head: INVALID_ID,
            max_elem: C::Elem::new_zeroed(),
            pending_max: C::Elem::new_zeroed(),
        }
    }

    /// Count of elements.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Bytes held from the extent allocator (directory extents included).
    pub fn mem_used(&self) -> usize {
        self.arena.extent_count() as usize * EXTENT_SIZE
    }

    /// Tree height; 0 when empty, 1 for a single root leaf.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Find the element equal to `key`, if any.
    pub fn find(&self, key: &C::Key) -> Option<C::Elem> {
        if self.root_id == INVALID_ID {
            return None;
        }
        let mut block_id = self.root_id;
        for _ in 1..self.depth {
            let inner = self.inner(block_id);
            let (pos, _) =
                search::lower_bound_key(&self.cmp, inner.count() - 1, |i| inner.elem(i), key);
            block_id = inner.child(pos);
        }
        let leaf = self.leaf(block_id);
        let (pos, exact) = search::lower_bound_key(&self.cmp, leaf.count(), |i| leaf.elem(i), key);
        exact.then(|| leaf.elem(pos))
    }

    /// Insert `elem`, or replace the stored element comparing equal to it.
    /// Returns the replaced element on overwrite. Fails only when the extent
    /// allocator is exhausted, in which case the tree is untouched.
    pub fn insert(&mut self, elem: C::Elem) -> Result<Option<C::Elem>> {
        if self.root_id == INVALID_ID {
            self.insert_first(elem)?;
            return Ok(None);
        }
        let (path, leaf_pe, exact) = self.collect_path(&elem);
        if exact {
            Ok(Some(self.replace_at(&leaf_pe, elem)))
        } else {
            self.process_insert_leaf(&path, &leaf_pe, elem)?;
            Ok(None)
        }
    }

    /// Remove the element comparing equal to `elem`. Returns false when
    /// absent. Never allocates.
    pub fn remove(&mut self, elem: &C::Elem) -> bool {
        if self.root_id == INVALID_ID {
            return false;
        }
        let (path, leaf_pe, exact) = self.collect_path(elem);
        if !exact {
            return false;
        }
        self.process_delete_leaf(&path, &leaf_pe);
        true
    }

    /// Sample an element, distribution proportional to leaf fill.
    pub fn random(&self, mut rnd: u64) -> Option<C::Elem> {
        if self.root_id == INVALID_ID {
            return None;
        }
        let mut block_id = self.root_id;
        for _ in 1..self.depth {
            let inner = self.inner(block_id);
            let n = inner.count() as u64;
            block_id = inner.child((rnd % n) as usize);
            rnd /= n;
        }
        let leaf = self.leaf(block_id);
        Some(leaf.elem((rnd % leaf.count() as u64) as usize))
    }

    // -- block views --------------------------------------------------------

    pub(crate) fn leaf(&self, id: u32) -> LeafView<'_, C::Elem> {
        LeafView::new(self.arena.block(id))
    }

    pub(crate) fn inner(&self, id: u32) -> InnerView<'_, C::Elem, BLOCK_SIZE> {
        InnerView::new(self.arena.block(id))
    }

    // -- garbage pool and block lifecycle -----------------------------------

    pub(crate) fn garbage_push(&mut self, id: u32) {
        init_free(self.arena.block_mut(id), self.garbage_head);
        self.garbage_head = id;
        self.free_count += 1;
    }

    pub(crate) fn garbage_pop(&mut self) -> Option<u32> {
        if self.garbage_head == INVALID_ID {
            return None;
        }
        let id = self.garbage_head;
        self.garbage_head = free_next(self.arena.block(id));
        self.free_count -= 1;
        Some(id)
    }

    /// Take a block from the garbage list, or the arena if the list is
    /// empty. Callers initialize the block header.
    fn create_block(&mut self) -> Result<u32> {
        if let Some(id) = self.garbage_pop() {
            return Ok(id);
        }
        match self.arena.alloc_block() {
            Some(id) => Ok(id),
            None => bail!("extent allocator exhausted"),
        }
    }

    pub(crate) fn create_leaf(&mut self) -> Result<u32> {
        let id = self.create_block()?;
        self.leaf_count += 1;
        Ok(id)
    }

    pub(crate) fn create_inner(&mut self) -> Result<u32> {
        let id = self.create_block()?;
        self.inner_count += 1;
        Ok(id)
    }

    pub(crate) fn dispose_leaf(&mut self, id: u32) {
        self.leaf_count -= 1;
        self.garbage_push(id);
    }

    pub(crate) fn dispose_inner(&mut self, id: u32) {
        self.inner_count -= 1;
        self.garbage_push(id);
    }

    /// Ensure at least `count` blocks sit in the garbage list. The sole
    /// fallible step of a structural insert; runs before any mutation so a
    /// failed insert leaves the tree bit-identical.
    pub(crate) fn reserve_blocks(&mut self, count: u32) -> Result<()> {
        while self.free_count < count {
            match self.arena.alloc_block() {
                Some(id) => self.garbage_push(id),
                None => bail!("extent allocator exhausted"),
            }
        }
        Ok(())
    }

    // -- occupancy helpers --------------------------------------------------

    pub(crate) fn leaf_free(&self, id: u32) -> usize {
        Self::LEAF_CAP - self.leaf(id).count()
    }

    pub(crate) fn inner_free(&self, id: u32) -> usize {
        Self::INNER_CAP - self.inner(id).count()
    }

    /// Margin above the minimum fill; negative when underfull.
    pub(crate) fn leaf_overmin(&self, id: u32) -> isize {
        self.leaf(id).count() as isize - Self::LEAF_MIN as isize
    }

    pub(crate) fn inner_overmin(&self, id: u32) -> isize {
        self.inner(id).count() as isize - Self::INNER_MIN as isize
    }

    // -- first element ------------------------------------------------------

    fn insert_first(&mut self, elem: C::Elem) -> Result<()> {
        debug_assert_eq!(self.depth, 0);
        debug_assert_eq!(self.size, 0);
        let id = self.create_leaf()?;
        {
            let mut leaf = LeafViewMut::init(self.arena.block_mut(id), INVALID_ID, INVALID_ID);
            leaf.set_elem(0, &elem);
            leaf.set_count(1);
        }
        self.root_id = id;
        self.first_id = id;
        self.last_id = id;
        self.depth = 1;
        self.size = 1;
        self.max_elem = elem;
        Ok(())
    }
}
