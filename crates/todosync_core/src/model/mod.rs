//! Domain model for per-user todo collections.
//!
//! # Responsibility
//! - Define the records shared by the stores, the engine and the wire layer.
//!
//! # Invariants
//! - A collection is always observed together with the version it was read at.
//! - Versions never go negative; they wrap from `i32::MAX` to zero.

pub mod todo;
pub mod version;
