//! # Wire Codec
//!
//! Byte-level framing shared by every Quorum-Names message and by the
//! snapshot file format.
//!
//! ## Zero-Dependency Core
//!
//! This crate has **no external dependencies**. It provides:
//!
//! - [`WireBuffer`]: a byte window written by *prepending* and read by
//!   consuming from the front. Messages are built by pushing fields in
//!   reverse order, so the last push is the first byte on the wire.
//! - [`write_str_list`] / [`read_str_list`]: up to 255 short byte strings,
//!   8-byte aligned with a zero pad, prefixed by a one-byte count.
//! - [`Header`]: the 4-byte `[op][cookie-high][cookie-low:u16]` datagram
//!   header and the [`OpCode`] set.
//!
//! ## Example
//!
//! ```rust
//! use qn_01_wire_codec::{read_str_list, write_str_list, WireBuffer};
//!
//! let mut buf = WireBuffer::new();
//! write_str_list(&mut buf, &[b"h/nic".as_slice(), b"h/ping".as_slice()]).unwrap();
//! buf.push32(7);
//!
//! assert_eq!(buf.pop32().unwrap(), 7);
//! let names = read_str_list(&mut buf).unwrap();
//! assert_eq!(names, vec![b"h/nic".to_vec(), b"h/ping".to_vec()]);
//! assert_eq!(buf.size(), 0);
//! ```

pub mod buffer;
pub mod errors;
pub mod header;
pub mod list;

pub use buffer::WireBuffer;
pub use errors::WireError;
pub use header::{Cookie, Header, OpCode, DATAGRAM_BUDGET, HEADER_SIZE, RESPONSE_FLAG};
pub use list::{encoded_list_len, read_str_list, write_str_list, MAX_LIST_ITEMS, MAX_STRING_LEN};
