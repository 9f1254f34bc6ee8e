//! This module defines the [`PublicSignals`] struct that allows loading public signals from JSON files via [`serde::Deserialize`] and [`serde::Serialize`].

use std::path::Path;

use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};

/// The public signals of a Groth16 proof, as written by snarkjs into `public.json`.
///
/// For the Poseidon2 circuit this is the single hash output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicSignals<F: PrimeField>(
    /// The values of the public signals.
    #[serde(serialize_with = "crate::serde_compat::serialize_f_seq")]
    #[serde(deserialize_with = "crate::serde_compat::deserialize_f_seq")]
    pub Vec<F>,
);

impl<F: PrimeField> PublicSignals<F> {
    /// Reads public signals from a snarkjs `public.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// The number of public signals.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no public signals.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes `self` and returns the inner values.
    pub fn into_inner(self) -> Vec<F> {
        self.0
    }
}

impl<F: PrimeField> AsRef<[F]> for PublicSignals<F> {
    fn as_ref(&self) -> &[F] {
        &self.0
    }
}

impl<F: PrimeField> From<Vec<F>> for PublicSignals<F> {
    fn from(values: Vec<F>) -> Self {
        Self(values)
    }
}
