//! crates/storage-adapters/src/lib.rs
//!
//! Implementations of the forum ports. The in-memory store is always
//! compiled; the Postgres store sits behind the `db-postgres` feature.

pub mod avatar;
pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use avatar::PathAvatarResolver;
pub use memory::MemoryForumStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgForumStore;
