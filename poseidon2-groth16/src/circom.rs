//! Loads the Poseidon2 circuit's snarkjs proving key and compiled wasm, computes witnesses and
//! generates/verifies Groth16 proofs using the `arkworks` ecosystem. Only the `bn254` curve is
//! supported.

use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use ark_bn254::Bn254;
use ark_circom::{CircomReduction, WitnessCalculator};
use ark_ff::UniformRand as _;
use ark_groth16::{Groth16, prepare_verifying_key};
use circom_types::CheckElement;
use circom_types::groth16::ZKey;
use num_bigint::BigInt;
use rand::{CryptoRng, Rng};
use sha2::Digest as _;
use wasmer::{Module, Store};

use crate::harness::{FullProver, ProofOutput};
use crate::{Groth16Error, circom::proof_input::ProofInput};

pub use ark_groth16::Proof;

pub mod proof_input;

pub use proof_input::{CircuitInput, Poseidon2Input};

/// Errors that can occur while loading the `.zkey` or the circuit wasm.
#[derive(Debug, thiserror::Error)]
pub enum ZkeyError {
    /// The SHA-256 fingerprint of the `.zkey` did not match the expected value.
    #[error("invalid zkey - wrong sha256 fingerprint: {0}")]
    ZkeyFingerprintMismatch(String),
    /// The SHA-256 fingerprint of the wasm did not match the expected value.
    #[error("invalid wasm - wrong sha256 fingerprint: {0}")]
    WasmFingerprintMismatch(String),
    /// Could not parse the `.zkey` file.
    #[error("Could not parse zkey - see wrapped error")]
    ZkeyInvalid(#[source] eyre::Report),
    /// Could not compile or instantiate the circuit wasm.
    #[error("Could not load circuit wasm - see wrapped error")]
    WasmInvalid(#[source] eyre::Report),
    /// Any I/O error encountered while reading the `.zkey` or wasm file
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl From<circom_types::ZKeyParserError> for ZkeyError {
    fn from(value: circom_types::ZKeyParserError) -> Self {
        Self::ZkeyInvalid(eyre::eyre!(value))
    }
}

/// Hex encoded SHA-256 digest of `bytes`, the format expected by the builder's fingerprints.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(sha2::Sha256::digest(bytes))
}

struct WasmWitness {
    store: Store,
    calculator: WitnessCalculator,
}

/// Core material for generating Groth16 proofs of the Poseidon2 circuit.
///
/// Holds the proving key, the constraint matrices and the wasm witness calculator. The wasm
/// instance is not reentrant, so witness generation is serialized behind a lock.
///
/// The wasm runtime expects a Tokio context, so the material owns a current-thread runtime that
/// is entered while the module is instantiated and while witnesses are computed.
pub struct CircomGroth16Material {
    zkey: ZKey<Bn254>,
    witness: Mutex<WasmWitness>,
    // dropped after the wasm store
    runtime: tokio::runtime::Runtime,
}

impl std::fmt::Debug for CircomGroth16Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircomGroth16Material")
            .field("n_public", &self.zkey.n_public)
            .field("domain_size", &self.zkey.domain_size)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CircomGroth16Material`].
#[derive(Debug, Clone)]
pub struct CircomGroth16MaterialBuilder {
    check: CheckElement,
    fingerprint_zkey: Option<String>,
    fingerprint_wasm: Option<String>,
}

impl Default for CircomGroth16MaterialBuilder {
    fn default() -> Self {
        Self {
            check: CheckElement::Yes,
            fingerprint_zkey: None,
            fingerprint_wasm: None,
        }
    }
}

impl CircomGroth16MaterialBuilder {
    /// Creates a builder that validates every point of the zkey.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether to run curve and subgroup checks on the zkey points.
    pub fn check(mut self, check: CheckElement) -> Self {
        self.check = check;
        self
    }

    /// Expected SHA-256 of the `.zkey`. A matching zkey is trusted and its points are not
    /// checked.
    pub fn fingerprint_zkey(mut self, fingerprint_zkey: String) -> Self {
        self.fingerprint_zkey = Some(fingerprint_zkey);
        self
    }

    /// Expected SHA-256 of the circuit wasm.
    pub fn fingerprint_wasm(mut self, fingerprint_wasm: String) -> Self {
        self.fingerprint_wasm = Some(fingerprint_wasm);
        self
    }

    /// Loads the Groth16 material from `.zkey` and wasm files and verifies their fingerprints if
    /// provided.
    pub fn build_from_paths(
        self,
        zkey_path: impl AsRef<Path>,
        wasm_path: impl AsRef<Path>,
    ) -> Result<CircomGroth16Material, ZkeyError> {
        let zkey_bytes = std::fs::read(zkey_path)?;
        let wasm_bytes = std::fs::read(wasm_path)?;
        self.build_from_bytes(&zkey_bytes, &wasm_bytes)
    }

    /// Builds Groth16 material directly from `.zkey` and wasm readers.
    pub fn build_from_reader(
        self,
        mut zkey_reader: impl Read,
        mut wasm_reader: impl Read,
    ) -> Result<CircomGroth16Material, ZkeyError> {
        let mut zkey_bytes = Vec::new();
        zkey_reader.read_to_end(&mut zkey_bytes)?;
        let mut wasm_bytes = Vec::new();
        wasm_reader.read_to_end(&mut wasm_bytes)?;
        self.build_from_bytes(&zkey_bytes, &wasm_bytes)
    }

    /// Builds Groth16 material directly from in-memory `.zkey` and wasm bytes.
    pub fn build_from_bytes(
        self,
        zkey_bytes: &[u8],
        wasm_bytes: &[u8],
    ) -> Result<CircomGroth16Material, ZkeyError> {
        let check = if let Some(should_fingerprint) = self.fingerprint_zkey {
            let is_fingerprint = fingerprint(zkey_bytes);
            if is_fingerprint != should_fingerprint {
                return Err(ZkeyError::ZkeyFingerprintMismatch(is_fingerprint));
            }
            CheckElement::No
        } else {
            self.check
        };
        if let Some(should_fingerprint) = self.fingerprint_wasm {
            let is_fingerprint = fingerprint(wasm_bytes);
            if is_fingerprint != should_fingerprint {
                return Err(ZkeyError::WasmFingerprintMismatch(is_fingerprint));
            }
        }

        let zkey = ZKey::<Bn254>::from_reader(zkey_bytes, check)?;
        tracing::debug!(
            n_public = zkey.n_public,
            constraints = zkey.matrices.num_constraints,
            "loaded proving key"
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let guard = runtime.enter();
        let mut store = Store::default();
        let module = Module::new(&store, wasm_bytes)
            .map_err(|e| ZkeyError::WasmInvalid(eyre::eyre!(e)))?;
        let calculator = WitnessCalculator::from_module(&mut store, module)
            .map_err(|e| ZkeyError::WasmInvalid(eyre::eyre!(e.to_string())))?;

        drop(guard);
        Ok(CircomGroth16Material {
            zkey,
            witness: Mutex::new(WasmWitness { store, calculator }),
            runtime,
        })
    }
}

impl CircomGroth16Material {
    /// The parsed proving key.
    pub fn zkey(&self) -> &ZKey<Bn254> {
        &self.zkey
    }

    /// Runs the circuit wasm on `inputs` and returns the full witness, starting with the
    /// constant one.
    pub fn generate_witness(
        &self,
        inputs: &impl ProofInput,
    ) -> Result<Vec<ark_bn254::Fr>, Groth16Error> {
        let mut guard = self.witness.lock().map_err(|_| {
            Groth16Error::WitnessGeneration(eyre::eyre!("witness calculator lock poisoned"))
        })?;
        let WasmWitness { store, calculator } = &mut *guard;
        let _runtime = self.runtime.enter();
        let witness = calculator
            .calculate_witness(store, inputs.prepare_input(), true)
            .map_err(|e| Groth16Error::WitnessGeneration(eyre::eyre!(e.to_string())))?;
        witness
            .iter()
            .map(bigint_to_fr)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Groth16Error::WitnessGeneration)
    }

    /// Generates a Groth16 proof from a witness and returns it with the public inputs.
    ///
    /// Doesn't verify the proof internally.
    pub fn generate_proof_from_witness<R: Rng + CryptoRng>(
        &self,
        witness: &[ark_bn254::Fr],
        rng: &mut R,
    ) -> Result<(Proof<Bn254>, Vec<ark_bn254::Fr>), Groth16Error> {
        let (matrices, pk) = self.zkey.as_inner();
        let expected = matrices.num_instance_variables + matrices.num_witness_variables;
        if witness.len() != expected {
            return Err(Groth16Error::ProofGeneration(eyre::eyre!(
                "witness has {} elements, the proving key expects {expected}",
                witness.len()
            )));
        }

        let r = ark_bn254::Fr::rand(rng);
        let s = ark_bn254::Fr::rand(rng);
        let proof = Groth16::<Bn254, CircomReduction>::create_proof_with_reduction_and_matrices(
            pk,
            r,
            s,
            matrices,
            matrices.num_instance_variables,
            matrices.num_constraints,
            witness,
        )
        .map_err(|e| Groth16Error::ProofGeneration(eyre::eyre!(e)))?;

        let inputs = witness[1..matrices.num_instance_variables].to_vec();
        Ok((proof, inputs))
    }

    /// Computes the witness for `inputs` and proves it.
    pub fn generate_proof<R: Rng + CryptoRng>(
        &self,
        inputs: &impl ProofInput,
        rng: &mut R,
    ) -> Result<(Proof<Bn254>, Vec<ark_bn254::Fr>), Groth16Error> {
        let witness = self.generate_witness(inputs)?;
        self.generate_proof_from_witness(&witness, rng)
    }

    /// Verifies a proof against the verifying key embedded in the zkey.
    pub fn verify_proof(
        &self,
        proof: &Proof<Bn254>,
        public_inputs: &[ark_bn254::Fr],
    ) -> Result<(), Groth16Error> {
        let pvk = prepare_verifying_key(&self.zkey.pk.vk);
        let valid = Groth16::<Bn254>::verify_proof(&pvk, proof, public_inputs)
            .map_err(|e| Groth16Error::Verification(eyre::eyre!(e)))?;
        if valid {
            Ok(())
        } else {
            Err(Groth16Error::InvalidProof)
        }
    }
}

impl<I: ProofInput> FullProver<I> for CircomGroth16Material {
    fn full_prove(&self, input: &I) -> Result<ProofOutput, Groth16Error> {
        let (proof, public_inputs) = self.generate_proof(input, &mut rand::thread_rng())?;
        Ok(ProofOutput {
            proof: proof.into(),
            public_signals: public_inputs.into(),
        })
    }
}

fn bigint_to_fr(value: &BigInt) -> eyre::Result<ark_bn254::Fr> {
    value
        .to_biguint()
        .map(ark_bn254::Fr::from)
        .ok_or_else(|| eyre::eyre!("negative witness value {value}"))
}
