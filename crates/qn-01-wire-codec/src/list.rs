//! # String List Codec
//!
//! Wire layout (front to back):
//!
//! ```text
//! [count:u8] ([len:u8][bytes])* [zero pad]
//! ```
//!
//! The pad brings `1 + Σ(1 + len)` up to a multiple of 8. Decoding rejects
//! any non-zero pad byte.

use crate::buffer::WireBuffer;
use crate::errors::WireError;

/// Maximum number of strings in one list.
pub const MAX_LIST_ITEMS: usize = 255;

/// Maximum length of one string.
pub const MAX_STRING_LEN: usize = 255;

fn pad_for(unpadded: usize) -> usize {
    (8 - unpadded % 8) % 8
}

/// Total encoded size of a list, pad included.
#[must_use]
pub fn encoded_list_len<T: AsRef<[u8]>>(items: &[T]) -> usize {
    let unpadded = 1 + items.iter().map(|s| 1 + s.as_ref().len()).sum::<usize>();
    unpadded + pad_for(unpadded)
}

/// Prepend an encoded list to `buf`.
pub fn write_str_list<T: AsRef<[u8]>>(buf: &mut WireBuffer, items: &[T]) -> Result<(), WireError> {
    if items.len() > MAX_LIST_ITEMS {
        return Err(WireError::TooManyStrings(items.len()));
    }
    if let Some(long) = items.iter().find(|s| s.as_ref().len() > MAX_STRING_LEN) {
        return Err(WireError::StringTooLong(long.as_ref().len()));
    }

    let unpadded = 1 + items.iter().map(|s| 1 + s.as_ref().len()).sum::<usize>();
    buf.push_zeros(pad_for(unpadded));
    for item in items.iter().rev() {
        let bytes = item.as_ref();
        buf.push(bytes);
        // bounded by MAX_STRING_LEN above
        buf.push8(bytes.len() as u8);
    }
    buf.push8(items.len() as u8);
    Ok(())
}

/// Consume an encoded list from the front of `buf`.
pub fn read_str_list(buf: &mut WireBuffer) -> Result<Vec<Vec<u8>>, WireError> {
    let count = buf.pop8()? as usize;
    let mut out = Vec::with_capacity(count);
    let mut unpadded = 1;
    for _ in 0..count {
        let len = buf.pop8()? as usize;
        out.push(buf.pop(len)?.to_vec());
        unpadded += 1 + len;
    }
    if buf.pop(pad_for(unpadded))?.iter().any(|b| *b != 0) {
        return Err(WireError::NonZeroPadding);
    }
    Ok(out)
}
