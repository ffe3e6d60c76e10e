// Path: crates/storage/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Pure-Rust persistent storage for the light-client host.
//!
//! Both logical tables the host persists (the code store and the client
//! namespaces) are prefixes of one ordered redb table, so a single write
//! transaction commits a whole call's changes.

pub mod redb_store;

pub use redb_store::RedbStore;
