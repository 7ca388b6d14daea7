//! Block allocation layer.
//!
//! Two pieces sit between the tree and the heap:
//!
//! - [`ExtentAllocator`]: the host-supplied page source. The tree never talks
//!   to the global allocator directly; it requests fixed-size extents (16 KiB
//!   by default) through this trait, so an embedding application can meter,
//!   pool or fail allocations deterministically.
//! - [`BlockArena`]: a three-level page directory carving extents into
//!   fixed-size blocks and handing out dense, stable 32-bit block ids. All
//!   tree nodes are addressed by id and resolved to memory only for the span
//!   of one operation.

mod arena;
mod extent;

pub use arena::BlockArena;
pub use extent::{ExtentAllocator, HeapAllocator, QuotaAllocator};
