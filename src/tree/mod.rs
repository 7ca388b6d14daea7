//! The B+*-tree engine.
//!
//! - `block`: block layout, capacity math and byte-level views
//! - `search`: in-block lower/upper bound probing
//! - `path`: root-to-leaf descent and max-slot descriptors
//! - `ops`: the in-place move / insert-and-move structural primitives
//! - `insert` / `delete`: rebalancing drivers (borrow, cascade, split,
//!   merge, root growth and collapse)
//! - `build`: one-pass bulk load from sorted input
//! - `cursor`: leaf-chain cursors and the iterator adaptor
//! - `check`: invariant self-check
//! - `btree`: the tree struct and public API

mod block;
mod btree;
mod build;
mod check;
mod cursor;
mod delete;
mod insert;
mod ops;
mod path;
mod search;

pub use block::{inner_cap, leaf_cap, INVALID_ID, MAX_DEPTH};
pub use btree::{BTree, DEFAULT_BLOCK_SIZE, DEFAULT_EXTENT_SIZE};
pub use check::check_bits;
pub use cursor::{Cursor, Iter};
