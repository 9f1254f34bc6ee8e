//! Groth16 proving and verification for the Poseidon2 Circom circuit.
//!
//! The [`circom`] module loads the circuit's snarkjs proving key and compiled wasm and produces
//! proofs, [`verifier`] checks snarkjs proofs against a `verification_key.json`, and [`harness`]
//! ties the two together: prove once, verify once, report.
#![deny(missing_docs)]

pub mod circom;
pub mod harness;
pub mod verifier;

pub use ark_bn254::Fr;
pub use circom_types::groth16::{Groth16Proof, PublicSignals, VerificationKey};

/// Errors that can occur during Groth16 proof generation and verification.
#[derive(Debug, thiserror::Error)]
pub enum Groth16Error {
    /// Failed to generate a witness for the circuit.
    #[error("failed to generate witness")]
    WitnessGeneration(#[source] eyre::Report),
    /// Failed to generate a Groth16 proof.
    #[error("failed to generate proof")]
    ProofGeneration(#[source] eyre::Report),
    /// Generated proof could not be verified against the verification key.
    #[error("proof could not be verified")]
    InvalidProof,
    /// The verification key is not a BN254 Groth16 key.
    #[error("unsupported verification key: {0}")]
    UnsupportedKey(String),
    /// The pairing check could not be carried out.
    #[error("failed to verify proof")]
    Verification(#[source] eyre::Report),
    /// The verification key could not be read or parsed.
    #[error("could not load verification key")]
    VerificationKey(#[source] std::io::Error),
}
