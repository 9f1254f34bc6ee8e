//! Verification of snarkjs Groth16 proofs against a snarkjs `verification_key.json`.

use std::path::{Path, PathBuf};

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, VerifyingKey, prepare_verifying_key};
use circom_types::groth16::{Groth16Proof, PROTOCOL, PublicSignals, VerificationKey};
use circom_types::traits::CircomArkworksPairingBridge;

use crate::Groth16Error;
use crate::harness::ProofVerifier;

/// Checks `proof` for `public_signals` under `vk`.
///
/// Returns an error for keys or proofs that are not BN254 Groth16. A public signal count that
/// disagrees with the key is a failed verification, not an error.
pub fn verify_groth16(
    vk: &VerificationKey,
    public_signals: &PublicSignals<Fr>,
    proof: &Groth16Proof,
) -> Result<bool, Groth16Error> {
    let curve = Bn254::get_circom_name();
    for (what, protocol, c) in [
        ("verification key", &vk.protocol, &vk.curve),
        ("proof", &proof.protocol, &proof.curve),
    ] {
        if protocol != PROTOCOL || *c != curve {
            return Err(Groth16Error::UnsupportedKey(format!(
                "{what} is {protocol} over {c}, expected {PROTOCOL} over {curve}"
            )));
        }
    }

    if public_signals.len() != vk.n_public || !vk.is_consistent() {
        tracing::warn!(
            expected = vk.n_public,
            ic = vk.ic.len(),
            got = public_signals.len(),
            "public signal count does not match the verification key"
        );
        return Ok(false);
    }

    let ark_vk: VerifyingKey<Bn254> = vk.clone().into();
    let ark_proof: Proof<Bn254> = proof.clone().into();
    let pvk = prepare_verifying_key(&ark_vk);
    Groth16::<Bn254>::verify_proof(&pvk, &ark_proof, public_signals.as_ref())
        .map_err(|e| Groth16Error::Verification(eyre::eyre!(e)))
}

impl ProofVerifier for VerificationKey {
    fn verify(
        &self,
        public_signals: &PublicSignals<Fr>,
        proof: &Groth16Proof,
    ) -> Result<bool, Groth16Error> {
        verify_groth16(self, public_signals, proof)
    }
}

/// A verification key that is read from disk every time a proof is verified.
#[derive(Debug, Clone)]
pub struct VerificationKeyFile {
    path: PathBuf,
}

impl VerificationKeyFile {
    /// Refers to the key at `path` without reading it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The location of the key.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the key.
    pub fn load(&self) -> Result<VerificationKey, Groth16Error> {
        tracing::debug!(path = %self.path.display(), "loading verification key");
        VerificationKey::from_path(&self.path).map_err(Groth16Error::VerificationKey)
    }
}

impl ProofVerifier for VerificationKeyFile {
    fn verify(
        &self,
        public_signals: &PublicSignals<Fr>,
        proof: &Groth16Proof,
    ) -> Result<bool, Groth16Error> {
        self.load()?.verify(public_signals, proof)
    }
}
