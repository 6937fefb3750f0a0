//! # Filter Pass
//!
//! Turns the raw ledger listing into the ordered input of a merge:
//!
//! 1. sort by [`compare_names`]
//! 2. structural checks on name and value
//! 3. alias resolution: among entries sharing a canonical name the
//!    earliest `first_seen` wins, ties going to the entry that sorts first
//! 4. authority signature check on the survivors
//!
//! Aliases are resolved before the authority check, so an unauthorized
//! early registrant still shadows a later authorized alias.

use crate::domain::authority::{is_authorized, AuthorityKeyMap};
use crate::ports::outbound::LedgerName;
use qn_02_name_records::{canonical_name, canonical_value, compare_names};
use std::fmt;

/// Longest accepted ledger name, in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// Longest accepted raw value, in bytes.
pub const MAX_VALUE_LEN: usize = 255;

/// Why an entry was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Value is not a JSON object.
    InvalidValue(String),
    /// Value longer than [`MAX_VALUE_LEN`].
    ValueTooLong(usize),
    /// Name longer than [`MAX_NAME_LEN`].
    NameTooLong(usize),
    /// Shadowed by an earlier registration of the same canonical name.
    Alias {
        /// Full name of the entry that won.
        kept: String,
    },
    /// `auth` missing or not signed by the authority key in force.
    Unauthorized,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(e) => write!(f, "invalid value: {}", e),
            Self::ValueTooLong(n) => write!(f, "value too long: {} bytes", n),
            Self::NameTooLong(n) => write!(f, "name too long: {} bytes", n),
            Self::Alias { kept } => write!(f, "alias of {}", kept),
            Self::Unauthorized => write!(f, "not authorized"),
        }
    }
}

/// Result of the filter pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Entries to merge, in comparator order.
    pub accepted: Vec<LedgerName>,
    /// Dropped entries with the reason.
    pub rejected: Vec<(String, RejectReason)>,
}

fn structural_check(entry: &LedgerName) -> Result<(), RejectReason> {
    if entry.name.len() > MAX_NAME_LEN {
        return Err(RejectReason::NameTooLong(entry.name.len()));
    }
    if entry.value.len() > MAX_VALUE_LEN {
        return Err(RejectReason::ValueTooLong(entry.value.len()));
    }
    canonical_value(&entry.value)
        .map(|_| ())
        .map_err(|e| RejectReason::InvalidValue(e.to_string()))
}

/// Run the filter pass over a ledger listing.
#[must_use]
pub fn filter_names(mut entries: Vec<LedgerName>, keys: &AuthorityKeyMap) -> FilterOutcome {
    entries.sort_by(|a, b| compare_names(&a.name, &b.name));
    let mut outcome = FilterOutcome::default();

    let mut survivors: Vec<LedgerName> = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Err(reason) = structural_check(&entry) {
            outcome.rejected.push((entry.name, reason));
            continue;
        }
        // equal canonical names are adjacent in comparator order
        match survivors.last_mut() {
            Some(held) if canonical_name(&held.name) == canonical_name(&entry.name) => {
                if entry.first_seen < held.first_seen {
                    let loser = std::mem::replace(held, entry);
                    outcome.rejected.push((
                        loser.name,
                        RejectReason::Alias {
                            kept: held.name.clone(),
                        },
                    ));
                } else {
                    let kept = held.name.clone();
                    outcome
                        .rejected
                        .push((entry.name, RejectReason::Alias { kept }));
                }
            }
            _ => survivors.push(entry),
        }
    }

    for entry in survivors {
        if is_authorized(keys, &entry.name, entry.first_seen, &entry.value) {
            outcome.accepted.push(entry);
        } else {
            outcome.rejected.push((entry.name, RejectReason::Unauthorized));
        }
    }
    outcome
}
