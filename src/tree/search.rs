//! In-block search primitives.
//!
//! All three routines scan a sorted element region through an indexed getter
//! and report an insertion position plus an exactness flag. Binary probing is
//! the default; comparators for trivially cheap element types can opt into a
//! linear scan via [`Comparator::LINEAR_SEARCH`].

use std::cmp::Ordering;

use crate::cmp::Comparator;

/// First index whose element is >= `key`; `exact` iff an equal element
/// exists. With duplicates the lowest equal index is returned.
pub(crate) fn lower_bound_key<C: Comparator>(
    cmp: &C,
    n: usize,
    get: impl Fn(usize) -> C::Elem,
    key: &C::Key,
) -> (usize, bool) {
    if C::LINEAR_SEARCH {
        for i in 0..n {
            match cmp.cmp_key(&get(i), key) {
                Ordering::Less => {}
                Ordering::Equal => return (i, true),
                Ordering::Greater => return (i, false),
            }
        }
        return (n, false);
    }

    let mut begin = 0;
    let mut end = n;
    let mut exact = false;
    while begin != end {
        let mid = begin + (end - begin) / 2;
        match cmp.cmp_key(&get(mid), key) {
            Ordering::Greater => end = mid,
            Ordering::Less => begin = mid + 1,
            Ordering::Equal => {
                // Keep scanning left for the lowest equal position.
                exact = true;
                end = mid;
            }
        }
    }
    (end, exact)
}

/// First index whose element is >= `elem`. Elements are unique within a
/// block, so the search stops at the first equal hit.
pub(crate) fn lower_bound_elem<C: Comparator>(
    cmp: &C,
    n: usize,
    get: impl Fn(usize) -> C::Elem,
    elem: &C::Elem,
) -> (usize, bool) {
    if C::LINEAR_SEARCH {
        for i in 0..n {
            match cmp.cmp_elem(&get(i), elem) {
                Ordering::Less => {}
                Ordering::Equal => return (i, true),
                Ordering::Greater => return (i, false),
            }
        }
        return (n, false);
    }

    let mut begin = 0;
    let mut end = n;
    while begin != end {
        let mid = begin + (end - begin) / 2;
        match cmp.cmp_elem(&get(mid), elem) {
            Ordering::Greater => end = mid,
            Ordering::Less => begin = mid + 1,
            Ordering::Equal => return (mid, true),
        }
    }
    (end, false)
}

/// First index whose element is strictly greater than `key`; `exact` iff an
/// equal element exists anywhere in the region.
pub(crate) fn upper_bound_key<C: Comparator>(
    cmp: &C,
    n: usize,
    get: impl Fn(usize) -> C::Elem,
    key: &C::Key,
) -> (usize, bool) {
    if C::LINEAR_SEARCH {
        let mut exact = false;
        for i in 0..n {
            match cmp.cmp_key(&get(i), key) {
                Ordering::Less => {}
                Ordering::Equal => exact = true,
                Ordering::Greater => return (i, exact),
            }
        }
        return (n, exact);
    }

    let mut begin = 0;
    let mut end = n;
    let mut exact = false;
    while begin != end {
        let mid = begin + (end - begin) / 2;
        match cmp.cmp_key(&get(mid), key) {
            Ordering::Greater => end = mid,
            Ordering::Less => begin = mid + 1,
            Ordering::Equal => {
                exact = true;
                begin = mid + 1;
            }
        }
    }
    (end, exact)
}
