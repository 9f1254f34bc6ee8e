//! Native Poseidon2 over the BN254 scalar field.
//!
//! The permutation follows "Poseidon2: A Faster Version of the Poseidon Hash Function": full
//! rounds use a cheap circulant-style external matrix, partial rounds a sparse internal matrix,
//! and the S-box is `x^5`. Round constants are derived from SHAKE-256 (see [`RoundConstants`]).
//!
//! On top of the permutation the crate provides a fixed-length hash, a sponge for variable
//! length input, byte hashing and a binary Merkle tree built on the width-2 compression.
//!
//! ```
//! use ark_bn254::Fr;
//! use poseidon2::Poseidon2Hash;
//!
//! let hasher = Poseidon2Hash::new(3);
//! let digest = hasher.hash_variable(&[Fr::from(1u64), Fr::from(2u64)]);
//! assert_eq!(digest, hasher.hash_variable(&[Fr::from(1u64), Fr::from(2u64)]));
//! ```
#![deny(missing_docs)]

mod config;
mod constants;
mod hash;
pub mod merkle;
mod permutation;
pub mod utils;

pub use config::Poseidon2Config;
pub use constants::RoundConstants;
pub use hash::{Poseidon2Hash, poseidon2_hash, poseidon2_hash_bytes};
pub use merkle::{MerkleProof, Poseidon2Merkle};
pub use permutation::Poseidon2Permutation;

/// The field Poseidon2 operates on.
pub type Fr = ark_bn254::Fr;

/// Errors raised by the Poseidon2 hashers and the Merkle tree.
#[derive(Debug, thiserror::Error)]
pub enum Poseidon2Error {
    /// A fixed-length hash was given the wrong number of inputs.
    #[error("expected {expected} input elements but got {got}")]
    InputLength {
        /// The rate of the instance
        expected: usize,
        /// The number of elements provided
        got: usize,
    },
    /// A Merkle proof was requested for a leaf that does not exist.
    #[error("leaf index {index} out of range for {len} leaves")]
    IndexOutOfRange {
        /// The requested index
        index: usize,
        /// The number of leaves
        len: usize,
    },
    /// Hand-built parameters that cannot drive the permutation.
    #[error("invalid Poseidon2 parameters: {0}")]
    InvalidConfig(String),
    /// A serialized Merkle proof could not be decoded.
    #[error("malformed merkle proof: {0}")]
    MalformedProof(String),
    /// A hex string could not be decoded into a field element.
    #[error(transparent)]
    InvalidHex(#[from] hex::FromHexError),
}
