// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// the snapshot data model and chain validation.

pub mod core;
pub use self::core::*;
