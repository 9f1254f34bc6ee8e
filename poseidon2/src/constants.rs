use ark_ff::PrimeField;
use sha3::{
    Shake256,
    digest::{ExtendableOutput, Update, XofReader},
};

use crate::{Fr, Poseidon2Config};

const EXTERNAL_SEED: &str = "poseidon2_external_constants";
const INTERNAL_SEED: &str = "poseidon2_internal_constants";

/// The round constants of a Poseidon2 instance.
///
/// Every constant is 32 bytes of SHAKE-256 output, read big-endian and reduced modulo the field
/// order. The external constant for round `r` and lane `i` hashes
/// `poseidon2_external_constants_{r}_{i}`, the internal constant for partial round `r` hashes
/// `poseidon2_internal_constants_{r}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundConstants {
    /// One vector of `t` constants per full round
    pub external: Vec<Vec<Fr>>,
    /// One constant per partial round
    pub internal: Vec<Fr>,
}

impl RoundConstants {
    /// Derives the constants for `config`.
    pub fn generate(config: &Poseidon2Config) -> Self {
        let external = (0..config.rounds_f)
            .map(|round| {
                (0..config.t)
                    .map(|lane| shake_to_field(&format!("{EXTERNAL_SEED}_{round}_{lane}")))
                    .collect()
            })
            .collect();
        let internal = (0..config.rounds_p)
            .map(|round| shake_to_field(&format!("{INTERNAL_SEED}_{round}")))
            .collect();
        tracing::trace!(
            t = config.t,
            rounds_f = config.rounds_f,
            rounds_p = config.rounds_p,
            "derived round constants"
        );
        Self { external, internal }
    }
}

fn shake_to_field(seed: &str) -> Fr {
    let mut hasher = Shake256::default();
    hasher.update(seed.as_bytes());
    let mut reader = hasher.finalize_xof();
    let mut buf = [0u8; 32];
    reader.read(&mut buf);
    Fr::from_be_bytes_mod_order(&buf)
}
