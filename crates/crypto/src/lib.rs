// Path: crates/crypto/src/lib.rs
//! # IOI Light-Client Crypto Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # IOI Light-Client Cryptography
//!
//! Content hashing used to derive module checksums.

pub mod algorithms;
