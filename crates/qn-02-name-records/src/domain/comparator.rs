//! # Name Ordering
//!
//! Names are `/`-separated paths. The part before the final `/` is the
//! canonical name; whatever follows is an alias suffix (`h/cjd/` and
//! `h/cjd/2` both canonicalise to `h/cjd`).
//!
//! Ordering compares, in turn:
//!
//! 1. length of the canonical prefix (shorter first)
//! 2. prefix bytes
//! 3. full length
//! 4. suffix bytes
//!
//! Registration time never takes part in ordering. Aliases of one canonical
//! name are resolved before records are built (earliest registrant wins),
//! so the list never holds two entries with the same prefix.

use std::cmp::Ordering;

/// Strip the final `/` and anything after it.
#[must_use]
pub fn canonical_name(full_name: &str) -> &str {
    match full_name.rfind('/') {
        Some(idx) => &full_name[..idx],
        None => full_name,
    }
}

/// Total order over full names.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let a_prefix = prefix_len(a);
    let b_prefix = prefix_len(b);

    a_prefix
        .cmp(&b_prefix)
        .then_with(|| a[..a_prefix.unwrap_or(0)].cmp(&b[..b_prefix.unwrap_or(0)]))
        .then_with(|| a.len().cmp(&b.len()))
        .then_with(|| a.cmp(b))
}

/// Position of the last separator; `None` sorts before any `Some`.
fn prefix_len(name: &[u8]) -> Option<usize> {
    name.iter().rposition(|b| *b == b'/')
}
