//! Cryptographic algorithm implementations.

pub mod hash;
