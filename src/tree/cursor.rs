//! Cursors over the leaf chain.
//!
//! A cursor is eight bytes: a block id and a position. It stays cheap to
//! copy and survives arbitrary tree mutation without becoming unsafe:
//! structural changes may rebind the block or relocate elements ("broken"
//! cursor), but the block id remains resolvable because reclaimed blocks go
//! to the garbage list rather than back to the allocator. Every access
//! re-checks that the block is still a live leaf and the position is in
//! range, and invalidates the cursor otherwise. Replacement of an element
//! never breaks cursors.
//!
//! Positions are canonicalized eagerly: `last` and backward rewinds resolve
//! the concrete in-leaf position at construction time, so cursor equality is
//! a plain field comparison.

use crate::alloc::ExtentAllocator;
use crate::cmp::Comparator;
use crate::tree::block::{block_kind, BlockKind, LeafView, INVALID_ID};
use crate::tree::btree::BTree;
use crate::tree::search;

/// Position of one element in the tree. Obtain from the cursor
/// constructors on [`BTree`]; step and dereference through the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    block_id: u32,
    pos: u16,
}

impl Cursor {
    /// The cursor pointing at nothing.
    pub fn invalid() -> Self {
        Self {
            block_id: INVALID_ID,
            pos: 0,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.block_id == INVALID_ID
    }

    fn at(block_id: u32, pos: usize) -> Self {
        Self {
            block_id,
            pos: pos as u16,
        }
    }
}

impl<C: Comparator, A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize>
    BTree<C, A, BLOCK_SIZE, EXTENT_SIZE>
{
    /// Cursor at the smallest element; invalid for an empty tree.
    pub fn cursor_first(&self) -> Cursor {
        if self.first_id == INVALID_ID {
            return Cursor::invalid();
        }
        Cursor::at(self.first_id, 0)
    }

    /// Cursor at the largest element; invalid for an empty tree.
    pub fn cursor_last(&self) -> Cursor {
        if self.last_id == INVALID_ID {
            return Cursor::invalid();
        }
        let count = self.leaf(self.last_id).count();
        Cursor::at(self.last_id, count - 1)
    }

    /// Cursor at the first element >= `key`, plus whether an equal element
    /// exists. Invalid when every element is smaller.
    pub fn lower_bound(&self, key: &C::Key) -> (Cursor, bool) {
        if self.root_id == INVALID_ID {
            return (Cursor::invalid(), false);
        }
        let mut block_id = self.root_id;
        let mut exact = false;
        for _ in 1..self.depth {
            let inner = self.inner(block_id);
            let (pos, eq) =
                search::lower_bound_key(&self.cmp, inner.count() - 1, |i| inner.elem(i), key);
            exact = eq;
            block_id = inner.child(pos);
        }
        let leaf = self.leaf(block_id);
        let (pos, eq) = search::lower_bound_key(&self.cmp, leaf.count(), |i| leaf.elem(i), key);
        exact = eq;
        if pos >= leaf.count() {
            let next = leaf.next_id();
            if next == INVALID_ID {
                (Cursor::invalid(), exact)
            } else {
                (Cursor::at(next, 0), exact)
            }
        } else {
            (Cursor::at(block_id, pos), exact)
        }
    }

    /// Cursor at the first element > `key`, plus whether an equal element
    /// exists anywhere in the tree. Invalid when every element is <= `key`.
    pub fn upper_bound(&self, key: &C::Key) -> (Cursor, bool) {
        if self.root_id == INVALID_ID {
            return (Cursor::invalid(), false);
        }
        let mut block_id = self.root_id;
        let mut exact = false;
        for _ in 1..self.depth {
            let inner = self.inner(block_id);
            let (pos, eq) =
                search::upper_bound_key(&self.cmp, inner.count() - 1, |i| inner.elem(i), key);
            exact |= eq;
            block_id = inner.child(pos);
        }
        let leaf = self.leaf(block_id);
        let (pos, eq) = search::upper_bound_key(&self.cmp, leaf.count(), |i| leaf.elem(i), key);
        exact |= eq;
        if pos >= leaf.count() {
            let next = leaf.next_id();
            if next == INVALID_ID {
                (Cursor::invalid(), exact)
            } else {
                (Cursor::at(next, 0), exact)
            }
        } else {
            (Cursor::at(block_id, pos), exact)
        }
    }

    /// Re-validate a cursor and return its leaf view. Broken cursors (block
    /// reclaimed or position out of range) invalidate themselves.
    fn cursor_leaf(&self, cursor: &mut Cursor) -> Option<LeafView<'_, C::Elem>> {
        if cursor.block_id == INVALID_ID {
            return None;
        }
        if !self.arena.contains(cursor.block_id) {
            *cursor = Cursor::invalid();
            return None;
        }
        let data = self.arena.block(cursor.block_id);
        if block_kind(data) != BlockKind::Leaf {
            *cursor = Cursor::invalid();
            return None;
        }
        let leaf = LeafView::new(data);
        if cursor.pos as usize >= leaf.count() {
            *cursor = Cursor::invalid();
            return None;
        }
        Some(leaf)
    }

    /// Element under the cursor, or `None` (invalidating it) when the
    /// cursor is invalid or broken.
    pub fn cursor_get(&self, cursor: &mut Cursor) -> Option<C::Elem> {
        let pos = cursor.pos as usize;
        self.cursor_leaf(cursor).map(|leaf| leaf.elem(pos))
    }

    /// Step forward. An invalid cursor rewinds to the first element.
    /// Returns false when the cursor ends up invalid.
    pub fn cursor_next(&self, cursor: &mut Cursor) -> bool {
        if cursor.block_id == INVALID_ID {
            *cursor = self.cursor_first();
            return !cursor.is_invalid();
        }
        let Some(leaf) = self.cursor_leaf(cursor) else {
            return false;
        };
        let next = leaf.next_id();
        let count = leaf.count();
        if cursor.pos as usize + 1 >= count {
            if next == INVALID_ID {
                *cursor = Cursor::invalid();
                return false;
            }
            *cursor = Cursor::at(next, 0);
        } else {
            cursor.pos += 1;
        }
        true
    }

    /// Step backward. An invalid cursor rewinds to the last element.
    /// Returns false when the cursor ends up invalid.
    pub fn cursor_prev(&self, cursor: &mut Cursor) -> bool {
        if cursor.block_id == INVALID_ID {
            *cursor = self.cursor_last();
            return !cursor.is_invalid();
        }
        let Some(leaf) = self.cursor_leaf(cursor) else {
            return false;
        };
        let prev = leaf.prev_id();
        if cursor.pos == 0 {
            if prev == INVALID_ID {
                *cursor = Cursor::invalid();
                return false;
            }
            let count = self.leaf(prev).count();
            *cursor = Cursor::at(prev, count - 1);
        } else {
            cursor.pos -= 1;
        }
        true
    }

    /// Whether two cursors address the same element. All invalid cursors
    /// are equal to each other.
    pub fn cursors_eq(&self, a: &Cursor, b: &Cursor) -> bool {
        if a.is_invalid() && b.is_invalid() {
            return true;
        }
        a == b
    }

    /// Ascending iteration over all elements.
    pub fn iter(&self) -> Iter<'_, C, A, BLOCK_SIZE, EXTENT_SIZE> {
        Iter {
            tree: self,
            cursor: self.cursor_first(),
        }
    }
}

/// Ascending element iterator borrowed from a tree.
pub struct Iter<'a, C: Comparator, A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize>
{
    tree: &'a BTree<C, A, BLOCK_SIZE, EXTENT_SIZE>,
    cursor: Cursor,
}

impl<C: Comparator, A: ExtentAllocator, const BLOCK_SIZE: usize, const EXTENT_SIZE: usize> Iterator
    for Iter<'_, C, A, BLOCK_SIZE, EXTENT_SIZE>
{
    type Item = C::Elem;

    fn next(&mut self) -> Option<C::Elem> {
        let elem = self.tree.cursor_get(&mut self.cursor)?;
        self.tree.cursor_next(&mut self.cursor);
        Some(elem)
    }
}
