//! This module defines the [`VerificationKey`] struct that implements de/serialization using [`serde`].
use std::{io::Read, path::Path};

use ark_bn254::{Bn254, Fq12, G1Affine, G2Affine};
use ark_ec::pairing::Pairing;
use serde::{Deserialize, Serialize};

use crate::traits::CircomArkworksPairingBridge;

/// Represents a verification key in JSON format that was created by snarkjs (`verification_key.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    /// The protocol used to generate the key, always `groth16`
    pub protocol: String,
    /// The curve, `bn128` for BN254
    pub curve: String,
    /// The number of public inputs
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    /// The element α of the verification key ∈ G1
    #[serde(rename = "vk_alpha_1")]
    #[serde(serialize_with = "crate::serde_compat::serialize_g1")]
    #[serde(deserialize_with = "crate::serde_compat::deserialize_g1")]
    pub alpha_1: G1Affine,
    /// The element β of the verification key ∈ G2
    #[serde(rename = "vk_beta_2")]
    #[serde(serialize_with = "crate::serde_compat::serialize_g2")]
    #[serde(deserialize_with = "crate::serde_compat::deserialize_g2")]
    pub beta_2: G2Affine,
    /// The γ element in G2
    #[serde(rename = "vk_gamma_2")]
    #[serde(serialize_with = "crate::serde_compat::serialize_g2")]
    #[serde(deserialize_with = "crate::serde_compat::deserialize_g2")]
    pub gamma_2: G2Affine,
    /// The δ element in G2
    #[serde(rename = "vk_delta_2")]
    #[serde(serialize_with = "crate::serde_compat::serialize_g2")]
    #[serde(deserialize_with = "crate::serde_compat::deserialize_g2")]
    pub delta_2: G2Affine,
    /// The pairing of α and β, e(α, β)
    #[serde(rename = "vk_alphabeta_12")]
    #[serde(serialize_with = "crate::serde_compat::serialize_gt")]
    #[serde(deserialize_with = "crate::serde_compat::deserialize_gt")]
    pub alpha_beta_gt: Fq12,
    /// Used to bind the public inputs to the proof
    #[serde(rename = "IC")]
    #[serde(serialize_with = "crate::serde_compat::serialize_g1_seq")]
    #[serde(deserialize_with = "crate::serde_compat::deserialize_g1_seq")]
    pub ic: Vec<G1Affine>,
}

impl VerificationKey {
    /// Deserializes a [`VerificationKey`] from a reader.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(rdr)
    }

    /// Reads a verification key from a snarkjs `verification_key.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::from_reader(std::io::BufReader::new(file))?)
    }

    /// Returns `true` if `nPublic` agrees with the number of IC points.
    pub fn is_consistent(&self) -> bool {
        self.ic.len() == self.n_public + 1
    }
}

impl From<VerificationKey> for ark_groth16::VerifyingKey<Bn254> {
    fn from(vk: VerificationKey) -> Self {
        Self {
            alpha_g1: vk.alpha_1,
            beta_g2: vk.beta_2,
            gamma_g2: vk.gamma_2,
            delta_g2: vk.delta_2,
            gamma_abc_g1: vk.ic,
        }
    }
}

impl From<ark_groth16::VerifyingKey<Bn254>> for VerificationKey {
    fn from(vk: ark_groth16::VerifyingKey<Bn254>) -> Self {
        let alpha_beta_gt = Bn254::pairing(vk.alpha_g1, vk.beta_g2).0;
        Self {
            protocol: super::PROTOCOL.to_owned(),
            curve: Bn254::get_circom_name(),
            n_public: vk.gamma_abc_g1.len().saturating_sub(1),
            alpha_1: vk.alpha_g1,
            beta_2: vk.beta_g2,
            gamma_2: vk.gamma_g2,
            delta_2: vk.delta_g2,
            alpha_beta_gt,
            ic: vk.gamma_abc_g1,
        }
    }
}
