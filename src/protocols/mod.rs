//! Quantum Cryptography Protocols.
//!
//! Each protocol builds its own observers for every run, so scenarios never share state.

pub mod qkd;
pub use qkd::{bb84, e91};
