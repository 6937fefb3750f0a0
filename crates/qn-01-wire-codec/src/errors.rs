//! Wire format errors.

use std::fmt;

/// Errors raised while building or parsing wire data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A read asked for more bytes than remain in the buffer.
    OutOfBounds {
        /// Bytes requested by the read.
        requested: usize,
        /// Bytes left in the view.
        available: usize,
    },
    /// A string list had more than 255 entries.
    TooManyStrings(usize),
    /// A string in a list was longer than 255 bytes.
    StringTooLong(usize),
    /// The alignment pad after a string list contained a non-zero byte.
    NonZeroPadding,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds {
                requested,
                available,
            } => write!(
                f,
                "Read past end of buffer: requested {} bytes, {} available",
                requested, available
            ),
            Self::TooManyStrings(n) => write!(f, "String list too long: {} entries (max 255)", n),
            Self::StringTooLong(n) => write!(f, "String too long: {} bytes (max 255)", n),
            Self::NonZeroPadding => write!(f, "Non-zero padding after string list"),
        }
    }
}

impl std::error::Error for WireError {}
