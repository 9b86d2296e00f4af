//! crates/domains/src/lib.rs
//!
//! Domain models, the error taxonomy and the port traits of the forum core.
//! Nothing in this crate performs I/O.

pub mod errors;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use ports::*;
