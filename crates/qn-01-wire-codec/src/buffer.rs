//! # Wire Buffer
//!
//! A byte window over a backing vector. The unread region is
//! `data[offset..]`: pushes move `offset` backwards, pops move it forwards.
//!
//! ```text
//!   data:  [ free ........ | unread bytes ]
//!                          ^ offset        ^ data.len()
//! ```
//!
//! When a push does not fit in the free region the backing storage is
//! reallocated (at least doubled) and the unread bytes are shifted to the
//! tail of the new allocation.

use crate::errors::WireError;

/// Default backing capacity for a fresh buffer.
const DEFAULT_CAPACITY: usize = 512;

/// Prepend-write / front-read byte buffer with big-endian integer helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireBuffer {
    data: Vec<u8>,
    offset: usize,
}

impl WireBuffer {
    /// Create an empty buffer with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer able to take `capacity` pushed bytes before
    /// reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity],
            offset: capacity,
        }
    }

    /// Wrap received bytes so they can be popped front to back.
    #[must_use]
    pub fn wrap(bytes: Vec<u8>) -> Self {
        Self {
            data: bytes,
            offset: 0,
        }
    }

    /// Copy a slice into a readable buffer.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::wrap(bytes.to_vec())
    }

    /// Empty the view, leaving all storage free for pushes.
    pub fn reset(&mut self) {
        self.offset = self.data.len();
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len() - self.offset
    }

    /// True when nothing is left to read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The unread bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.offset..]
    }

    /// Consume the buffer, returning the unread bytes.
    #[must_use]
    pub fn into_vec(mut self) -> Vec<u8> {
        if self.offset == 0 {
            return self.data;
        }
        self.data.split_off(self.offset)
    }

    // =========================================================================
    // Writes (prepend)
    // =========================================================================

    /// Prepend raw bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.reserve_front(bytes.len());
        let start = self.offset - bytes.len();
        self.data[start..self.offset].copy_from_slice(bytes);
        self.offset = start;
    }

    /// Prepend `count` zero bytes.
    pub fn push_zeros(&mut self, count: usize) {
        self.reserve_front(count);
        let start = self.offset - count;
        self.data[start..self.offset].fill(0);
        self.offset = start;
    }

    /// Prepend one byte.
    pub fn push8(&mut self, value: u8) {
        self.push(&[value]);
    }

    /// Prepend a big-endian u16.
    pub fn push16(&mut self, value: u16) {
        self.push(&value.to_be_bytes());
    }

    /// Prepend a big-endian u32.
    pub fn push32(&mut self, value: u32) {
        self.push(&value.to_be_bytes());
    }

    fn reserve_front(&mut self, needed: usize) {
        if needed <= self.offset {
            return;
        }
        let used = self.size();
        let new_len = (self.data.len() * 2).max(used + needed).max(DEFAULT_CAPACITY);
        let mut grown = vec![0u8; new_len];
        grown[new_len - used..].copy_from_slice(&self.data[self.offset..]);
        self.data = grown;
        self.offset = new_len - used;
    }

    // =========================================================================
    // Reads (front)
    // =========================================================================

    /// Consume `len` bytes from the front.
    pub fn pop(&mut self, len: usize) -> Result<&[u8], WireError> {
        let available = self.size();
        if len > available {
            return Err(WireError::OutOfBounds {
                requested: len,
                available,
            });
        }
        let start = self.offset;
        self.offset += len;
        Ok(&self.data[start..self.offset])
    }

    /// Consume exactly `N` bytes into an array.
    pub fn pop_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.pop(N)?);
        Ok(out)
    }

    /// Consume one byte.
    pub fn pop8(&mut self) -> Result<u8, WireError> {
        Ok(self.pop_array::<1>()?[0])
    }

    /// Consume a big-endian u16.
    pub fn pop16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_be_bytes(self.pop_array()?))
    }

    /// Consume a big-endian u32.
    pub fn pop32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_be_bytes(self.pop_array()?))
    }
}

impl Default for WireBuffer {
    fn default() -> Self {
        Self::new()
    }
}
