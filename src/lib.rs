//! # blocktree - In-Memory B+*-Tree Index Engine
//!
//! An ordered index over fixed-size POD elements, engineered for memory
//! efficiency: elements live by value inside fixed-size blocks (512 B by
//! default), blocks are addressed by stable 32-bit ids instead of pointers,
//! and occupancy is pushed toward two thirds by balancing across up to three
//! sibling blocks before a split. A well-filled tree costs roughly 20%
//! overhead on top of the payload.
//!
//! ## Quick Start
//!
//! ```
//! use blocktree::{BTree, HeapAllocator, U64Cmp};
//!
//! let mut tree: BTree<U64Cmp> = BTree::new(U64Cmp, HeapAllocator);
//!
//! for key in [3u64, 1, 4, 1, 5] {
//!     tree.insert(key).unwrap();
//! }
//!
//! assert_eq!(tree.len(), 4); // the second 1 replaced the first
//! assert_eq!(tree.find(&4), Some(4));
//! assert_eq!(tree.iter().collect::<Vec<_>>(), vec![1, 3, 4, 5]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------+
//! |       Public API (BTree, Cursor)     |
//! +--------------------------------------+
//! |  Structural ops: borrow / cascade /  |
//! |  split / merge over sibling blocks   |
//! +--------------------------------------+
//! |  Blocks: leaf / inner / free views   |
//! +--------------------------------------+
//! |  BlockArena: id -> block directory   |
//! +--------------------------------------+
//! |  ExtentAllocator (host page source)  |
//! +--------------------------------------+
//! ```
//!
//! Lookup costs one block probe per level; with 8-byte elements and 512-byte
//! blocks a million elements fit in a tree of height 4. Iteration walks the
//! doubly-linked leaf chain without touching inner nodes.
//!
//! ## Memory model
//!
//! All memory arrives from an [`ExtentAllocator`] in fixed-size extents
//! (16 KiB by default) and is never returned until the tree drops; freed
//! blocks are recycled through an internal garbage list. Insertion reserves
//! its worst-case block budget *before* mutating, so an insert that fails on
//! memory leaves the tree exactly as it was. Deletion and lookup never
//! allocate.
//!
//! ## Cursors
//!
//! A [`Cursor`] is a block id plus a position: eight bytes, `Copy`, valid to
//! hold across mutations. A structural change can make a cursor point at a
//! different element ("broken"), but dereferencing stays safe: every access
//! re-validates the block and self-invalidates on mismatch. Replacing an
//! element never breaks cursors.
//!
//! ## Module Overview
//!
//! - [`alloc`]: extent sources and the block arena
//! - [`cmp`]: element bounds and the ordering trait
//! - [`tree`]: block layout, structural algorithms, cursors, self-check

pub mod alloc;
pub mod cmp;
pub mod tree;

pub use alloc::{BlockArena, ExtentAllocator, HeapAllocator, QuotaAllocator};
pub use cmp::{Comparator, Element, U64Cmp};
pub use tree::{check_bits, BTree, Cursor, Iter};
