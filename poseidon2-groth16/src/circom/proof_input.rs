//! Conversion of circuit inputs into the signal map consumed by the witness calculator.

use std::collections::{BTreeMap, HashMap};

use ark_bn254::Fr;
use ark_ff::PrimeField;
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

/// Inputs that can be fed to the circuit's witness calculator, keyed by signal name.
pub trait ProofInput {
    /// Returns the value of every input signal.
    fn prepare_input(&self) -> HashMap<String, Vec<BigInt>>;
}

/// Encodes a single field element as a one-element signal value.
#[inline(always)]
pub fn fr_to_bigint_vec(f: Fr) -> Vec<BigInt> {
    vec![BigInt::from(BigUint::from(f.into_bigint()))]
}

impl ProofInput for HashMap<String, Vec<BigInt>> {
    fn prepare_input(&self) -> HashMap<String, Vec<BigInt>> {
        self.to_owned()
    }
}

/// The two preimage elements of the Poseidon2 circuit, `{"x": "...", "y": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poseidon2Input {
    /// First input signal
    #[serde(serialize_with = "circom_types::serde_compat::serialize_f")]
    #[serde(deserialize_with = "circom_types::serde_compat::deserialize_f")]
    pub x: Fr,
    /// Second input signal
    #[serde(serialize_with = "circom_types::serde_compat::serialize_f")]
    #[serde(deserialize_with = "circom_types::serde_compat::deserialize_f")]
    pub y: Fr,
}

impl Poseidon2Input {
    /// Creates an input from two field elements.
    pub fn new(x: Fr, y: Fr) -> Self {
        Self { x, y }
    }
}

impl Default for Poseidon2Input {
    fn default() -> Self {
        Self {
            x: Fr::from(123456789u64),
            y: Fr::from(987654321u64),
        }
    }
}

impl ProofInput for Poseidon2Input {
    fn prepare_input(&self) -> HashMap<String, Vec<BigInt>> {
        HashMap::from([
            ("x".to_owned(), fr_to_bigint_vec(self.x)),
            ("y".to_owned(), fr_to_bigint_vec(self.y)),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum SignalValue {
    Scalar(#[serde(deserialize_with = "circom_types::serde_compat::deserialize_f")] Fr),
    Array(#[serde(deserialize_with = "circom_types::serde_compat::deserialize_f_seq")] Vec<Fr>),
}

/// Any circuit input in the snarkjs `input.json` form, signal names mapped to a decimal string
/// or an array of decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CircuitInput(BTreeMap<String, SignalValue>);

impl From<Poseidon2Input> for CircuitInput {
    fn from(input: Poseidon2Input) -> Self {
        Self(BTreeMap::from([
            ("x".to_owned(), SignalValue::Scalar(input.x)),
            ("y".to_owned(), SignalValue::Scalar(input.y)),
        ]))
    }
}

impl ProofInput for CircuitInput {
    fn prepare_input(&self) -> HashMap<String, Vec<BigInt>> {
        self.0
            .iter()
            .map(|(name, value)| {
                let values = match value {
                    SignalValue::Scalar(f) => fr_to_bigint_vec(*f),
                    SignalValue::Array(fs) => fs.iter().flat_map(|f| fr_to_bigint_vec(*f)).collect(),
                };
                (name.clone(), values)
            })
            .collect()
    }
}
