//! Record, list and snapshot errors.

use qn_01_wire_codec::WireError;
use thiserror::Error;

/// Errors building or updating a single record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The ledger value is not a JSON object.
    #[error("Invalid record value: {0}")]
    InvalidValue(String),

    /// A field does not fit the 255-byte string limit of the list codec.
    #[error("Field {field} too long: {len} bytes")]
    FieldTooLong {
        /// Which field overflowed.
        field: &'static str,
        /// Its length in bytes.
        len: usize,
    },

    /// Signable content did not decode as `(name, nextName, value)`.
    #[error("Malformed signable content: {0}")]
    MalformedContent(String),

    /// Underlying wire error.
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),
}

/// A broken ordering invariant, reported by [`crate::NameList::verify_invariants`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `records[index - 1].next` does not name `records[index]`.
    #[error("Broken successor link at {index}: expected {expected}, found {found}")]
    BrokenLink {
        /// Index of the record whose predecessor is wrong.
        index: usize,
        /// Name of the record at `index`.
        expected: String,
        /// Successor recorded by the predecessor.
        found: String,
    },

    /// `records[index - 1]` does not sort strictly before `records[index]`.
    #[error("Records out of order at {index}")]
    OutOfOrder {
        /// Index of the second record of the pair.
        index: usize,
    },

    /// Looking up `records[index].name()` returned some other record.
    #[error("Lookup of {name} did not return index {index}")]
    LookupMismatch {
        /// Index of the record.
        index: usize,
        /// Canonical name looked up.
        name: String,
    },
}

/// Snapshot persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failed.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Declared or actual size is beyond what a snapshot may hold.
    #[error("Snapshot too large: {0} bytes")]
    TooLarge(u64),

    /// Declared record count cannot fit in the payload.
    #[error("Implausible record count {count} for {payload} payload bytes")]
    ImplausibleCount {
        /// Declared record count.
        count: u32,
        /// Declared payload length.
        payload: u32,
    },

    /// File is shorter than its header or declared length.
    #[error("Snapshot length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch {
        /// Payload length from the header.
        declared: usize,
        /// Payload bytes present.
        actual: usize,
    },

    /// Bytes remain after the declared number of records.
    #[error("Snapshot has {0} trailing bytes")]
    TrailingData(usize),

    /// Recomputed digest differs from the stored one.
    #[error("Snapshot hash mismatch")]
    HashMismatch,

    /// A record carries more signatures than the format can count.
    #[error("Record {name} has {count} signatures (max 255)")]
    TooManySignatures {
        /// Full name of the record.
        name: String,
        /// Signature count.
        count: usize,
    },

    /// An entry did not decode.
    #[error("Snapshot decode error: {0}")]
    Wire(#[from] WireError),

    /// An entry decoded but is not a valid record.
    #[error("Snapshot record error: {0}")]
    Record(#[from] RecordError),
}
