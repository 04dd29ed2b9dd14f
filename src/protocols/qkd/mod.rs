//! Quantum Key Distribution (QKD) Protocols.
//!
//! This module contains the two polarization-based schemes:
//! - **BB84**: single photons with fixed polarizations, optionally intercepted and resent.
//! - **E91**: entangled photon pairs checked against the quantum correlation $\cos(2\Delta)$.

pub mod bb84;
pub mod e91;
