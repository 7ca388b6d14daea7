//! Block arena: a three-level page directory over extents.
//!
//! The arena maps dense 32-bit block ids to `BLOCK_SIZE` byte blocks. Blocks
//! live inside payload extents; payload extents are tracked by second-level
//! directory extents; second-level extents are tracked by a single root
//! extent. Every level is allocated from the same [`ExtentAllocator`], so the
//! directory itself is charged to the host's budget and the first block
//! allocation claims three extents at once (root, one second-level node, one
//! payload extent).
//!
//! ## Id layout
//!
//! Ids are allocated in increasing order and never reused or remapped:
//!
//! ```text
//! extent_no = id / BLOCKS_PER_EXTENT
//! l1_slot   = extent_no / PTRS_PER_EXTENT   (slot in the root extent)
//! l2_slot   = extent_no % PTRS_PER_EXTENT   (slot in the second-level extent)
//! offset    = (id % BLOCKS_PER_EXTENT) * BLOCK_SIZE
//! ```
//!
//! Resolution is two pointer hops and never fails for an id the arena handed
//! out. The addressable maximum is
//! `PTRS_PER_EXTENT^2 * BLOCKS_PER_EXTENT` blocks, which with 16 KiB extents
//! and 512 B blocks is 2^27 blocks (64 GiB of payload).
//!
//! ## Stability
//!
//! Extents are heap allocations that are never resized or moved, so a block's
//! address is stable for the arena's lifetime. The tree still addresses
//! blocks by id and resolves to memory only for the span of one operation;
//! the arena exposes `pair_mut` so a structural operation can mutate two
//! distinct blocks at once without aliasing.

use std::marker::PhantomData;
use std::ptr;
use std::slice;

use super::ExtentAllocator;

const PTR_SIZE: usize = std::mem::size_of::<*mut u8>();

/// Directory of blocks addressed by dense, stable `u32` ids.
pub struct BlockArena<A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize> {
    alloc: A,
    /// Root directory extent: an array of pointers to second-level extents.
    /// Null until the first allocation.
    l1: *mut u8,
    /// Live second-level directory extents.
    l2_count: u32,
    /// Live payload extents.
    payload_count: u32,
    /// Blocks handed out so far; also the next id.
    block_count: u32,
    /// All live extents, directory levels included.
    extent_count: u32,
    _not_sync: PhantomData<*mut u8>,
}

impl<A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize>
    BlockArena<A, BLOCK_SIZE, EXTENT_SIZE>
{
    const PTRS_PER_EXTENT: usize = EXTENT_SIZE / PTR_SIZE;
    const BLOCKS_PER_EXTENT: usize = EXTENT_SIZE / BLOCK_SIZE;

    pub fn new(alloc: A) -> Self {
        assert!(BLOCK_SIZE.is_power_of_two(), "BLOCK_SIZE must be a power of two");
        assert!(EXTENT_SIZE.is_power_of_two(), "EXTENT_SIZE must be a power of two");
        assert!(
            EXTENT_SIZE >= BLOCK_SIZE,
            "EXTENT_SIZE {} smaller than BLOCK_SIZE {}",
            EXTENT_SIZE,
            BLOCK_SIZE
        );

        Self {
            alloc,
            l1: ptr::null_mut(),
            l2_count: 0,
            payload_count: 0,
            block_count: 0,
            extent_count: 0,
            _not_sync: PhantomData,
        }
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn extent_count(&self) -> u32 {
        self.extent_count
    }

    pub fn contains(&self, id: u32) -> bool {
        id < self.block_count
    }

    /// Allocate the next block id. The block's bytes stay zeroed/garbage;
    /// callers initialize the header before use. Returns `None` when the
    /// extent source is exhausted or the id space is full.
    pub fn alloc_block(&mut self) -> Option<u32> {
        if self.block_count as usize % Self::BLOCKS_PER_EXTENT == 0 {
            self.grow_one_extent()?;
        }
        let id = self.block_count;
        self.block_count += 1;
        Some(id)
    }

    fn grow_one_extent(&mut self) -> Option<()> {
        let extent_no = self.payload_count as usize;
        let l1_slot = extent_no / Self::PTRS_PER_EXTENT;
        let l2_slot = extent_no % Self::PTRS_PER_EXTENT;
        if l1_slot >= Self::PTRS_PER_EXTENT {
            return None;
        }

        if self.l1.is_null() {
            self.l1 = self.alloc_extent_raw()?;
        }
        if l2_slot == 0 && l1_slot as u32 == self.l2_count {
            let l2 = self.alloc_extent_raw()?;
            // SAFETY: l1 is a live EXTENT_SIZE extent and l1_slot is in range.
            unsafe { *self.l1_slots().add(l1_slot) = l2 };
            self.l2_count += 1;
        }

        let payload = self.alloc_extent_raw()?;
        // SAFETY: the l2 extent for l1_slot exists (allocated above or on a
        // previous call) and l2_slot is in range.
        unsafe {
            let l2 = *self.l1_slots().add(l1_slot);
            *(l2 as *mut *mut u8).add(l2_slot) = payload;
        }
        self.payload_count += 1;
        Some(())
    }

    fn alloc_extent_raw(&mut self) -> Option<*mut u8> {
        let extent = self.alloc.alloc_extent(EXTENT_SIZE)?;
        assert_eq!(
            extent.len(),
            EXTENT_SIZE,
            "extent allocator returned {} bytes, expected {}",
            extent.len(),
            EXTENT_SIZE
        );
        self.extent_count += 1;
        Some(Box::into_raw(extent) as *mut u8)
    }

    /// SAFETY: `p` must have come from `alloc_extent_raw` and must not be
    /// referenced afterwards.
    unsafe fn free_extent_raw(&mut self, p: *mut u8) {
        let extent = Box::from_raw(ptr::slice_from_raw_parts_mut(p, EXTENT_SIZE));
        self.extent_count -= 1;
        self.alloc.free_extent(extent);
    }

    fn l1_slots(&self) -> *mut *mut u8 {
        self.l1 as *mut *mut u8
    }

    fn block_ptr(&self, id: u32) -> *mut u8 {
        assert!(id < self.block_count, "block id {} out of range", id);
        let extent_no = id as usize / Self::BLOCKS_PER_EXTENT;
        // SAFETY: every directory slot on the path to a handed-out id was
        // populated by grow_one_extent before the id was returned.
        unsafe {
            let l2 = *self.l1_slots().add(extent_no / Self::PTRS_PER_EXTENT);
            let payload = *(l2 as *const *mut u8).add(extent_no % Self::PTRS_PER_EXTENT);
            payload.add(id as usize % Self::BLOCKS_PER_EXTENT * BLOCK_SIZE)
        }
    }

    pub fn block(&self, id: u32) -> &[u8] {
        // SAFETY: block_ptr returns BLOCK_SIZE valid bytes; the shared borrow
        // of self keeps mutation away for the slice's lifetime.
        unsafe { slice::from_raw_parts(self.block_ptr(id), BLOCK_SIZE) }
    }

    pub fn block_mut(&mut self, id: u32) -> &mut [u8] {
        // SAFETY: as in `block`; the exclusive borrow of self guarantees
        // this is the only live view into the arena.
        unsafe { slice::from_raw_parts_mut(self.block_ptr(id), BLOCK_SIZE) }
    }

    /// Mutable views of two distinct blocks at once.
    pub fn pair_mut(&mut self, a: u32, b: u32) -> (&mut [u8], &mut [u8]) {
        assert_ne!(a, b, "pair_mut requires distinct block ids");
        // SAFETY: distinct ids resolve to disjoint BLOCK_SIZE regions, so the
        // two exclusive slices cannot overlap.
        unsafe {
            (
                slice::from_raw_parts_mut(self.block_ptr(a), BLOCK_SIZE),
                slice::from_raw_parts_mut(self.block_ptr(b), BLOCK_SIZE),
            )
        }
    }

    /// Release every extent and return to the pristine empty state. All
    /// outstanding block ids become invalid.
    pub fn reset(&mut self) {
        if self.l1.is_null() {
            return;
        }
        // SAFETY: counts mirror exactly the extents registered in the
        // directory; each pointer is freed once and never read again.
        unsafe {
            for extent_no in 0..self.payload_count as usize {
                let l2 = *self.l1_slots().add(extent_no / Self::PTRS_PER_EXTENT);
                let payload = *(l2 as *const *mut u8).add(extent_no % Self::PTRS_PER_EXTENT);
                self.free_extent_raw(payload);
            }
            for l1_slot in 0..self.l2_count as usize {
                let l2 = *self.l1_slots().add(l1_slot);
                self.free_extent_raw(l2);
            }
            let l1 = self.l1;
            self.l1 = ptr::null_mut();
            self.free_extent_raw(l1);
        }
        self.l2_count = 0;
        self.payload_count = 0;
        self.block_count = 0;
        debug_assert_eq!(self.extent_count, 0);
    }
}

impl<A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize> Drop
    for BlockArena<A, BLOCK_SIZE, EXTENT_SIZE>
{
    fn drop(&mut self) {
        self.reset();
    }
}
