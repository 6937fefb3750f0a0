//! # Datagram Header
//!
//! Every request and reply starts with four bytes:
//!
//! ```text
//! [op:u8][cookie-high:u8][cookie-low:u16 BE]
//! ```
//!
//! Bit 7 of `op` marks a response; bits 0-6 name the operation.
//! `cookie-high ‖ cookie-low` is a 24-bit correlation id.

use crate::buffer::WireBuffer;
use crate::errors::WireError;
use std::fmt;

/// Header width in bytes.
pub const HEADER_SIZE: usize = 4;

/// Bit set on the op byte of every reply.
pub const RESPONSE_FLAG: u8 = 0x80;

/// Upper bound on a datagram we emit.
pub const DATAGRAM_BUDGET: usize = 1024;

/// Protocol operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Opaque echo.
    Ping = 0x00,
    /// Cold key to hot key binding exchange.
    HotKeys = 0x01,
    /// Record lookup with per-signer signature slots.
    Lookup = 0x02,
}

impl OpCode {
    /// Decode the operation bits of an op byte, ignoring the response flag.
    #[must_use]
    pub fn from_op_byte(op: u8) -> Option<Self> {
        match op & !RESPONSE_FLAG {
            0x00 => Some(Self::Ping),
            0x01 => Some(Self::HotKeys),
            0x02 => Some(Self::Lookup),
            _ => None,
        }
    }

    /// Op byte for a request.
    #[must_use]
    pub fn request_byte(self) -> u8 {
        self as u8
    }

    /// Op byte for the matching reply.
    #[must_use]
    pub fn response_byte(self) -> u8 {
        self as u8 | RESPONSE_FLAG
    }
}

/// 24-bit request correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cookie(u32);

impl Cookie {
    /// Largest representable cookie.
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Build a cookie from the low 24 bits of `value`.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Self(value & Self::MAX)
    }

    /// Numeric value.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0)
    }
}

/// Parsed datagram header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Raw op byte, response flag included.
    pub op: u8,
    /// Correlation id.
    pub cookie: Cookie,
}

impl Header {
    /// Header for an outgoing request.
    #[must_use]
    pub fn request(op: OpCode, cookie: Cookie) -> Self {
        Self {
            op: op.request_byte(),
            cookie,
        }
    }

    /// Header for the reply to this request.
    #[must_use]
    pub fn reply(&self) -> Self {
        Self {
            op: self.op | RESPONSE_FLAG,
            cookie: self.cookie,
        }
    }

    /// True when the response flag is set.
    #[must_use]
    pub fn is_response(&self) -> bool {
        self.op & RESPONSE_FLAG != 0
    }

    /// The operation named by the header, if known.
    #[must_use]
    pub fn op_code(&self) -> Option<OpCode> {
        OpCode::from_op_byte(self.op)
    }

    /// Prepend the header to a payload.
    pub fn push_onto(&self, buf: &mut WireBuffer) {
        // low 16 bits first since pushes prepend
        buf.push16((self.cookie.0 & 0xFFFF) as u16);
        buf.push8((self.cookie.0 >> 16) as u8);
        buf.push8(self.op);
    }

    /// Consume a header from the front of a datagram.
    pub fn pop_from(buf: &mut WireBuffer) -> Result<Self, WireError> {
        let op = buf.pop8()?;
        let high = buf.pop8()? as u32;
        let low = buf.pop16()? as u32;
        Ok(Self {
            op,
            cookie: Cookie::new((high << 16) | low),
        })
    }
}
