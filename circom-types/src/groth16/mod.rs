//! This module defines the Groth16 artifacts produced and consumed by snarkjs and utilities to read them from files.
mod proof;
mod public_input;
mod verification_key;
mod zkey;

pub use proof::Groth16Proof;
pub use public_input::PublicSignals;
pub use verification_key::VerificationKey;
pub use zkey::ZKey;

/// The protocol name snarkjs writes into proofs and verification keys.
pub const PROTOCOL: &str = "groth16";
