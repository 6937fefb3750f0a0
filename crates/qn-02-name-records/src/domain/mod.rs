//! Domain layer: pure record logic, no I/O.

pub mod comparator;
pub mod errors;
pub mod hot_keys;
pub mod identity;
pub mod name_list;
pub mod record;
