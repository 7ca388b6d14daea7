//! Block layout and typed views.
//!
//! Every tree node occupies exactly one `BLOCK_SIZE` block and starts with a
//! 4-byte header `{kind, count}`. Three kinds exist:
//!
//! ```text
//! Leaf   (kind 0x02):
//! +------+-------+---------+---------+--------------------------+
//! | kind | count | prev_id | next_id | elems[0..count]          |
//! |  2B  |  2B   |   4B    |   4B    | count * size_of::<E>()   |
//! +------+-------+---------+---------+--------------------------+
//!
//! Inner  (kind 0x01):
//! +------+-------+---------------------------+----------------------+
//! | kind | count | seps[0..CAP-1]            | child_ids[0..CAP]    |
//! |  2B  |  2B   | (CAP-1) * size_of::<E>()  | CAP * 4B             |
//! +------+-------+---------------------------+----------------------+
//!
//! Free   (kind 0x30):
//! +------+-------+---------+
//! | kind | count | next_id |   (threads the garbage list)
//! +------+-------+---------+
//! ```
//!
//! An inner node of count n has n children and n-1 separators; the separator
//! at slot i is a copy of the maximum element of child i's subtree. The
//! rightmost child's maximum lives in an ancestor (or in the tree struct for
//! the rightmost spine).
//!
//! Views borrow a block's bytes for the span of one operation and read or
//! write elements at unaligned offsets through zerocopy, so the element type
//! needs no alignment guarantee inside the block.

use std::marker::PhantomData;

use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::cmp::Element;

/// Sentinel "no block".
pub const INVALID_ID: u32 = u32::MAX;

/// Compile-time bound on tree height.
pub const MAX_DEPTH: usize = 16;

pub const BLOCK_HEADER_SIZE: usize = 4;
pub const LEAF_HEADER_SIZE: usize = 12;
pub const ID_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Unknown,
    Inner,
    Leaf,
    Free,
}

impl BlockKind {
    const INNER: u16 = 0x01;
    const LEAF: u16 = 0x02;
    const FREE: u16 = 0x30;

    pub fn from_raw(raw: u16) -> Self {
        match raw {
            Self::INNER => BlockKind::Inner,
            Self::LEAF => BlockKind::Leaf,
            Self::FREE => BlockKind::Free,
            _ => BlockKind::Unknown,
        }
    }

    fn raw(self) -> u16 {
        match self {
            BlockKind::Inner => Self::INNER,
            BlockKind::Leaf => Self::LEAF,
            BlockKind::Free => Self::FREE,
            BlockKind::Unknown => 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct BlockHeader {
    kind: U16<LittleEndian>,
    count: U16<LittleEndian>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct LeafHeader {
    kind: U16<LittleEndian>,
    count: U16<LittleEndian>,
    prev_id: U32<LittleEndian>,
    next_id: U32<LittleEndian>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FreeHeader {
    kind: U16<LittleEndian>,
    count: U16<LittleEndian>,
    next_id: U32<LittleEndian>,
}

/// Elements a leaf can hold.
pub const fn leaf_cap<E>(block_size: usize) -> usize {
    (block_size - LEAF_HEADER_SIZE) / std::mem::size_of::<E>()
}

/// Children an inner node can hold (separators: one less).
pub const fn inner_cap<E>(block_size: usize) -> usize {
    (block_size - BLOCK_HEADER_SIZE) / (std::mem::size_of::<E>() + ID_SIZE)
}

pub fn block_kind(data: &[u8]) -> BlockKind {
    // INVARIANT: every arena block is at least header-sized.
    let header = BlockHeader::ref_from_bytes(&data[..BLOCK_HEADER_SIZE]).unwrap();
    BlockKind::from_raw(header.kind.get())
}

pub fn block_count(data: &[u8]) -> usize {
    let header = BlockHeader::ref_from_bytes(&data[..BLOCK_HEADER_SIZE]).unwrap();
    header.count.get() as usize
}

/// Tag a block as garbage and point it at the current list head.
pub fn init_free(data: &mut [u8], next_id: u32) {
    let header = FreeHeader {
        kind: U16::new(BlockKind::Free.raw()),
        count: U16::new(0),
        next_id: U32::new(next_id),
    };
    data[..std::mem::size_of::<FreeHeader>()].copy_from_slice(header.as_bytes());
}

pub fn free_next(data: &[u8]) -> u32 {
    let header = FreeHeader::ref_from_bytes(&data[..std::mem::size_of::<FreeHeader>()]).unwrap();
    debug_assert_eq!(BlockKind::from_raw(header.kind.get()), BlockKind::Free);
    header.next_id.get()
}

// ---------------------------------------------------------------------------
// Leaf views
// ---------------------------------------------------------------------------

pub struct LeafView<'a, E> {
    data: &'a [u8],
    _elem: PhantomData<E>,
}

impl<'a, E: Element> LeafView<'a, E> {
    pub fn new(data: &'a [u8]) -> Self {
        debug_assert_eq!(block_kind(data), BlockKind::Leaf);
        Self {
            data,
            _elem: PhantomData,
        }
    }

    fn header(&self) -> &LeafHeader {
        // INVARIANT: kind checked at construction, block is header-sized.
        LeafHeader::ref_from_bytes(&self.data[..LEAF_HEADER_SIZE]).unwrap()
    }

    pub fn count(&self) -> usize {
        self.header().count.get() as usize
    }

    pub fn prev_id(&self) -> u32 {
        self.header().prev_id.get()
    }

    pub fn next_id(&self) -> u32 {
        self.header().next_id.get()
    }

    pub fn elem(&self, i: usize) -> E {
        read_elem(self.data, LEAF_HEADER_SIZE, i)
    }
}

pub struct LeafViewMut<'a, E> {
    data: &'a mut [u8],
    _elem: PhantomData<E>,
}

impl<'a, E: Element> LeafViewMut<'a, E> {
    pub fn new(data: &'a mut [u8]) -> Self {
        debug_assert_eq!(block_kind(data), BlockKind::Leaf);
        Self {
            data,
            _elem: PhantomData,
        }
    }

    /// Tag the block as a leaf with no elements and the given chain links.
    pub fn init(data: &'a mut [u8], prev_id: u32, next_id: u32) -> Self {
        let header = LeafHeader {
            kind: U16::new(BlockKind::Leaf.raw()),
            count: U16::new(0),
            prev_id: U32::new(prev_id),
            next_id: U32::new(next_id),
        };
        data[..LEAF_HEADER_SIZE].copy_from_slice(header.as_bytes());
        Self {
            data,
            _elem: PhantomData,
        }
    }

    fn header(&self) -> &LeafHeader {
        LeafHeader::ref_from_bytes(&self.data[..LEAF_HEADER_SIZE]).unwrap()
    }

    fn header_mut(&mut self) -> &mut LeafHeader {
        LeafHeader::mut_from_bytes(&mut self.data[..LEAF_HEADER_SIZE]).unwrap()
    }

    pub fn count(&self) -> usize {
        self.header().count.get() as usize
    }

    pub fn set_count(&mut self, count: usize) {
        self.header_mut().count.set(count as u16);
    }

    pub fn prev_id(&self) -> u32 {
        self.header().prev_id.get()
    }

    pub fn next_id(&self) -> u32 {
        self.header().next_id.get()
    }

    pub fn set_prev_id(&mut self, id: u32) {
        self.header_mut().prev_id.set(id);
    }

    pub fn set_next_id(&mut self, id: u32) {
        self.header_mut().next_id.set(id);
    }

    pub fn elem(&self, i: usize) -> E {
        read_elem(self.data, LEAF_HEADER_SIZE, i)
    }

    pub fn set_elem(&mut self, i: usize, e: &E) {
        write_elem(self.data, LEAF_HEADER_SIZE, i, e);
    }

    /// Shift `n` elements from slot `src` to slot `dst` within this leaf.
    pub fn move_elems(&mut self, dst: usize, src: usize, n: usize) {
        move_region::<E>(self.data, LEAF_HEADER_SIZE, dst, src, n);
    }

    /// Copy `n` elements from `src` starting at `src_pos` into this leaf at
    /// `dst_pos`.
    pub fn copy_elems_from(
        &mut self,
        dst_pos: usize,
        src: &LeafViewMut<'_, E>,
        src_pos: usize,
        n: usize,
    ) {
        copy_region::<E>(
            self.data,
            LEAF_HEADER_SIZE,
            dst_pos,
            src.data,
            LEAF_HEADER_SIZE,
            src_pos,
            n,
        );
    }
}

// ---------------------------------------------------------------------------
// Inner views
// ---------------------------------------------------------------------------

pub struct InnerView<'a, E, const BLOCK_SIZE: usize> {
    data: &'a [u8],
    _elem: PhantomData<E>,
}

impl<'a, E: Element, const BLOCK_SIZE: usize> InnerView<'a, E, BLOCK_SIZE> {
    pub const CAP: usize = inner_cap::<E>(BLOCK_SIZE);
    const CHILD_OFF: usize = BLOCK_HEADER_SIZE + (Self::CAP - 1) * std::mem::size_of::<E>();

    pub fn new(data: &'a [u8]) -> Self {
        debug_assert_eq!(block_kind(data), BlockKind::Inner);
        Self {
            data,
            _elem: PhantomData,
        }
    }

    pub fn count(&self) -> usize {
        block_count(self.data)
    }

    pub fn elem(&self, i: usize) -> E {
        debug_assert!(i < Self::CAP - 1);
        read_elem(self.data, BLOCK_HEADER_SIZE, i)
    }

    pub fn child(&self, i: usize) -> u32 {
        debug_assert!(i < Self::CAP);
        let off = Self::CHILD_OFF + i * ID_SIZE;
        u32::from_le_bytes(self.data[off..off + ID_SIZE].try_into().unwrap())
    }
}

pub struct InnerViewMut<'a, E, const BLOCK_SIZE: usize> {
    data: &'a mut [u8],
    _elem: PhantomData<E>,
}

impl<'a, E: Element, const BLOCK_SIZE: usize> InnerViewMut<'a, E, BLOCK_SIZE> {
    pub const CAP: usize = inner_cap::<E>(BLOCK_SIZE);
    const CHILD_OFF: usize = BLOCK_HEADER_SIZE + (Self::CAP - 1) * std::mem::size_of::<E>();

    pub fn new(data: &'a mut [u8]) -> Self {
        debug_assert_eq!(block_kind(data), BlockKind::Inner);
        Self {
            data,
            _elem: PhantomData,
        }
    }

    /// Tag the block as an empty inner node.
    pub fn init(data: &'a mut [u8]) -> Self {
        let header = BlockHeader {
            kind: U16::new(BlockKind::Inner.raw()),
            count: U16::new(0),
        };
        data[..BLOCK_HEADER_SIZE].copy_from_slice(header.as_bytes());
        Self {
            data,
            _elem: PhantomData,
        }
    }

    pub fn count(&self) -> usize {
        block_count(self.data)
    }

    pub fn set_count(&mut self, count: usize) {
        let header = BlockHeader::mut_from_bytes(&mut self.data[..BLOCK_HEADER_SIZE]).unwrap();
        header.count.set(count as u16);
    }

    pub fn elem(&self, i: usize) -> E {
        debug_assert!(i < Self::CAP - 1);
        read_elem(self.data, BLOCK_HEADER_SIZE, i)
    }

    pub fn set_elem(&mut self, i: usize, e: &E) {
        debug_assert!(i < Self::CAP - 1);
        write_elem(self.data, BLOCK_HEADER_SIZE, i, e);
    }

    pub fn child(&self, i: usize) -> u32 {
        debug_assert!(i < Self::CAP);
        let off = Self::CHILD_OFF + i * ID_SIZE;
        u32::from_le_bytes(self.data[off..off + ID_SIZE].try_into().unwrap())
    }

    pub fn set_child(&mut self, i: usize, id: u32) {
        debug_assert!(i < Self::CAP);
        let off = Self::CHILD_OFF + i * ID_SIZE;
        self.data[off..off + ID_SIZE].copy_from_slice(&id.to_le_bytes());
    }

    pub fn move_elems(&mut self, dst: usize, src: usize, n: usize) {
        debug_assert!(dst + n <= Self::CAP - 1 && src + n <= Self::CAP - 1);
        move_region::<E>(self.data, BLOCK_HEADER_SIZE, dst, src, n);
    }

    pub fn copy_elems_from(
        &mut self,
        dst_pos: usize,
        src: &InnerViewMut<'_, E, BLOCK_SIZE>,
        src_pos: usize,
        n: usize,
    ) {
        debug_assert!(dst_pos + n <= Self::CAP - 1 && src_pos + n <= Self::CAP - 1);
        copy_region::<E>(
            self.data,
            BLOCK_HEADER_SIZE,
            dst_pos,
            src.data,
            BLOCK_HEADER_SIZE,
            src_pos,
            n,
        );
    }

    pub fn move_children(&mut self, dst: usize, src: usize, n: usize) {
        debug_assert!(dst + n <= Self::CAP && src + n <= Self::CAP);
        let base = Self::CHILD_OFF;
        self.data.copy_within(
            base + src * ID_SIZE..base + (src + n) * ID_SIZE,
            base + dst * ID_SIZE,
        );
    }

    pub fn copy_children_from(
        &mut self,
        dst_pos: usize,
        src: &InnerViewMut<'_, E, BLOCK_SIZE>,
        src_pos: usize,
        n: usize,
    ) {
        debug_assert!(dst_pos + n <= Self::CAP && src_pos + n <= Self::CAP);
        let base = Self::CHILD_OFF;
        self.data[base + dst_pos * ID_SIZE..base + (dst_pos + n) * ID_SIZE]
            .copy_from_slice(&src.data[base + src_pos * ID_SIZE..base + (src_pos + n) * ID_SIZE]);
    }
}

fn read_elem<E: Element>(data: &[u8], base: usize, i: usize) -> E {
    let size = std::mem::size_of::<E>();
    let off = base + i * size;
    // INVARIANT: the slice is exactly size_of::<E>() bytes.
    E::read_from_bytes(&data[off..off + size]).unwrap()
}

fn write_elem<E: Element>(data: &mut [u8], base: usize, i: usize, e: &E) {
    let size = std::mem::size_of::<E>();
    let off = base + i * size;
    data[off..off + size].copy_from_slice(e.as_bytes());
}

fn move_region<E: Element>(data: &mut [u8], base: usize, dst: usize, src: usize, n: usize) {
    let size = std::mem::size_of::<E>();
    data.copy_within(base + src * size..base + (src + n) * size, base + dst * size);
}

#[allow(clippy::too_many_arguments)]
fn copy_region<E: Element>(
    dst: &mut [u8],
    dst_base: usize,
    dst_pos: usize,
    src: &[u8],
    src_base: usize,
    src_pos: usize,
    n: usize,
) {
    let size = std::mem::size_of::<E>();
    dst[dst_base + dst_pos * size..dst_base + (dst_pos + n) * size]
        .copy_from_slice(&src[src_base + src_pos * size..src_base + (src_pos + n) * size]);
}
