//! Element and comparator contracts.
//!
//! The tree stores opaque fixed-size POD values ("elements") directly inside
//! block bytes and orders them through a user-supplied comparator. Lookup may
//! use a separate key type, compared against elements by the same comparator.
//!
//! Elements must be plain bytes: they are relocated with raw byte copies when
//! blocks are split, merged or rebalanced, and they are read back from
//! arbitrary (unaligned) offsets inside a block. The [`Element`] bound
//! captures exactly that via zerocopy's marker traits.

use std::cmp::Ordering;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Marker bound for values the tree can store.
///
/// Blanket-implemented for every type satisfying the zerocopy POD traits,
/// which includes all primitive integers and `#[repr(C)]` structs composed
/// of them.
pub trait Element: Copy + FromBytes + IntoBytes + Immutable + KnownLayout {}

impl<T: Copy + FromBytes + IntoBytes + Immutable + KnownLayout> Element for T {}

/// Ordering contract for one tree instance.
///
/// The comparator owns whatever state the ordering needs (collations, column
/// descriptors, ...) and must induce a strict total order: `cmp_elem`
/// returning `Equal` means "same element" as far as the tree is concerned,
/// and an insert of an equal element replaces the stored one.
///
/// `cmp_key` relates elements to standalone lookup keys. For self-keyed
/// element types it is typically the same comparison.
pub trait Comparator {
    type Elem: Element;
    type Key;

    /// Switch in-block search from binary to linear probing. Linear wins for
    /// very cheap comparisons on small blocks.
    const LINEAR_SEARCH: bool = false;

    fn cmp_elem(&self, a: &Self::Elem, b: &Self::Elem) -> Ordering;

    fn cmp_key(&self, elem: &Self::Elem, key: &Self::Key) -> Ordering;
}

/// Natural ordering over `u64` elements keyed by themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct U64Cmp;

impl Comparator for U64Cmp {
    type Elem = u64;
    type Key = u64;

    fn cmp_elem(&self, a: &u64, b: &u64) -> Ordering {
        a.cmp(b)
    }

    fn cmp_key(&self, elem: &u64, key: &u64) -> Ordering {
        elem.cmp(key)
    }
}
