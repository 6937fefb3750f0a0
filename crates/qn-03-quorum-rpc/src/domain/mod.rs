//! Domain layer: codecs, pending requests, errors.

pub mod errors;
pub mod pending;
pub mod protocol;
