//! This module defines the [`Groth16Proof`] struct that implements de/serialization using [`serde`].
use std::path::Path;

use ark_bn254::{Bn254, G1Affine, G2Affine};
use serde::{Deserialize, Serialize};

use crate::traits::CircomArkworksPairingBridge;

/// Represents a Groth16 proof in JSON format as created by snarkjs (`proof.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    /// Proof element A (or alpha) in G1
    #[serde(serialize_with = "crate::serde_compat::serialize_g1")]
    #[serde(deserialize_with = "crate::serde_compat::deserialize_g1")]
    pub pi_a: G1Affine,
    /// Proof element B (or beta) in G2
    #[serde(serialize_with = "crate::serde_compat::serialize_g2")]
    #[serde(deserialize_with = "crate::serde_compat::deserialize_g2")]
    pub pi_b: G2Affine,
    /// Proof element C (or gamma) in G1
    #[serde(serialize_with = "crate::serde_compat::serialize_g1")]
    #[serde(deserialize_with = "crate::serde_compat::deserialize_g1")]
    pub pi_c: G1Affine,
    /// Proof protocol, always `groth16`
    pub protocol: String,
    /// Proof curve, `bn128` for BN254
    pub curve: String,
}

impl Groth16Proof {
    /// Reads a proof from a snarkjs `proof.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

impl From<ark_groth16::Proof<Bn254>> for Groth16Proof {
    fn from(proof: ark_groth16::Proof<Bn254>) -> Self {
        Self {
            pi_a: proof.a,
            pi_b: proof.b,
            pi_c: proof.c,
            protocol: super::PROTOCOL.to_owned(),
            curve: Bn254::get_circom_name(),
        }
    }
}

impl From<Groth16Proof> for ark_groth16::Proof<Bn254> {
    fn from(proof: Groth16Proof) -> Self {
        Self {
            a: proof.pi_a,
            b: proof.pi_b,
            c: proof.pi_c,
        }
    }
}
