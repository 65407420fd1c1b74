//! Persistent storage backend on a single redb file.

mod store;

pub use store::*;
