use ark_ff::{PrimeField, Zero};

use crate::{Fr, Poseidon2Config, Poseidon2Error, Poseidon2Permutation};

/// Bytes packed into one field element when hashing raw data. 31 bytes always fit below the
/// BN254 scalar modulus.
pub(crate) const BYTES_PER_ELEMENT: usize = 31;

/// Poseidon2 hashing for a fixed state width.
#[derive(Debug, Clone)]
pub struct Poseidon2Hash {
    permutation: Poseidon2Permutation,
}

impl Poseidon2Hash {
    /// Creates a hasher with the recommended parameters for width `t`.
    ///
    /// # Panics
    ///
    /// Panics if `t < 2`.
    pub fn new(t: usize) -> Self {
        Self {
            permutation: Poseidon2Permutation::for_width(t),
        }
    }

    /// Creates a hasher from explicit parameters.
    pub fn with_config(config: Poseidon2Config) -> Result<Self, Poseidon2Error> {
        Ok(Self {
            permutation: Poseidon2Permutation::new(config)?,
        })
    }

    /// The configuration of this hasher.
    pub fn config(&self) -> &Poseidon2Config {
        self.permutation.config()
    }

    /// Hashes exactly `rate` elements with a single permutation.
    pub fn hash_fixed(&self, inputs: &[Fr]) -> Result<Fr, Poseidon2Error> {
        let config = self.config();
        if inputs.len() != config.rate {
            return Err(Poseidon2Error::InputLength {
                expected: config.rate,
                got: inputs.len(),
            });
        }
        let mut state = vec![Fr::zero(); config.t];
        state[..config.rate].copy_from_slice(inputs);
        self.permutation.permute_mut(&mut state);
        Ok(state[0])
    }

    /// Sponge hash over any number of elements.
    ///
    /// The input is absorbed `rate` elements at a time into a zero state, the last chunk padded
    /// with zeroes, and the first lane is squeezed. Empty input hashes to zero.
    pub fn hash_variable(&self, inputs: &[Fr]) -> Fr {
        let rate = self.config().rate;
        let mut state = vec![Fr::zero(); self.config().t];
        for chunk in inputs.chunks(rate) {
            for (lane, x) in state.iter_mut().zip(chunk) {
                *lane += x;
            }
            self.permutation.permute_mut(&mut state);
        }
        state[0]
    }

    /// Hashes raw bytes, packed big-endian into 31-byte field elements.
    pub fn hash_bytes(&self, data: &[u8]) -> Fr {
        self.hash_variable(&bytes_to_elements(data))
    }
}

impl Default for Poseidon2Hash {
    fn default() -> Self {
        Self::new(3)
    }
}

pub(crate) fn bytes_to_elements(data: &[u8]) -> Vec<Fr> {
    data.chunks(BYTES_PER_ELEMENT)
        .map(Fr::from_be_bytes_mod_order)
        .collect()
}

/// Sponge hash of `inputs` with width `t`.
pub fn poseidon2_hash(inputs: &[Fr], t: usize) -> Fr {
    Poseidon2Hash::new(t).hash_variable(inputs)
}

/// Hash of `data` with width `t`.
pub fn poseidon2_hash_bytes(data: &[u8], t: usize) -> Fr {
    Poseidon2Hash::new(t).hash_bytes(data)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use ark_ff::Zero;

    use super::{Poseidon2Hash, bytes_to_elements, poseidon2_hash, poseidon2_hash_bytes};
    use crate::{Fr, Poseidon2Config, Poseidon2Error};

    fn decimal(s: &str) -> Fr {
        Fr::from_str(s).unwrap()
    }

    fn fr(values: &[u64]) -> Vec<Fr> {
        values.iter().copied().map(Fr::from).collect()
    }

    #[test]
    fn empty_input_hashes_to_zero() {
        assert!(Poseidon2Hash::new(3).hash_variable(&[]).is_zero());
        assert!(poseidon2_hash_bytes(&[], 4).is_zero());
    }

    #[test]
    fn hash_fixed_checks_length() {
        let hasher = Poseidon2Hash::new(4);
        assert!(hasher.hash_fixed(&fr(&[1, 2])).is_ok());
        let err = hasher.hash_fixed(&fr(&[1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            Poseidon2Error::InputLength {
                expected: 2,
                got: 3
            }
        ));
    }

    #[test]
    fn fixed_and_variable_agree_on_one_block() {
        let hasher = Poseidon2Hash::new(4);
        let inputs = fr(&[7, 11]);
        assert_eq!(
            hasher.hash_fixed(&inputs).unwrap(),
            hasher.hash_variable(&inputs)
        );
    }

    #[test]
    fn short_block_is_zero_padded() {
        let hasher = Poseidon2Hash::new(4);
        assert_eq!(
            hasher.hash_variable(&fr(&[1, 2, 3])),
            hasher.hash_variable(&fr(&[1, 2, 3, 0]))
        );
        assert_ne!(
            hasher.hash_variable(&fr(&[1, 2])),
            hasher.hash_variable(&fr(&[2, 1]))
        );
    }

    #[test]
    fn convenience_functions_match_hasher() {
        let inputs = fr(&[1, 2, 3, 4]);
        assert_eq!(
            poseidon2_hash(&inputs, 3),
            Poseidon2Hash::default().hash_variable(&inputs)
        );
        assert_ne!(poseidon2_hash(&inputs, 3), poseidon2_hash(&inputs, 5));
    }

    #[test]
    fn bytes_are_packed_big_endian() {
        let data: Vec<u8> = (1..=32).collect();
        let elements = bytes_to_elements(&data);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1], Fr::from(32u64));
        assert_eq!(elements[0], {
            let mut acc = Fr::zero();
            for b in 1..=31u64 {
                acc = acc * Fr::from(256u64) + Fr::from(b);
            }
            acc
        });
        assert_eq!(
            poseidon2_hash_bytes(&data, 3),
            poseidon2_hash(&elements, 3)
        );
    }

    #[test]
    fn known_answers() {
        assert_eq!(
            poseidon2_hash(&fr(&[1, 2, 3, 4]), 3),
            decimal("17098919107443460533469668684938229531175942012990083725847334368531602540257")
        );
        assert_eq!(
            poseidon2_hash(&fr(&[42]), 3),
            decimal("15152073625797397424597246776996744176545531741739909641637415208320592965154")
        );
        assert_eq!(
            poseidon2_hash_bytes("你好 Poseidon2!".as_bytes(), 3),
            decimal("18048980160824259644444347795625437896598165170148288217399423871841904719479")
        );
    }

    #[test]
    fn explicit_config_is_validated() {
        let config = Poseidon2Config {
            rate: 3,
            ..Poseidon2Config::for_width(3)
        };
        assert!(matches!(
            Poseidon2Hash::with_config(config),
            Err(Poseidon2Error::InvalidConfig(_))
        ));
        let hasher = Poseidon2Hash::with_config(Poseidon2Config::for_width(3)).unwrap();
        assert_eq!(
            hasher.hash_variable(&fr(&[1, 2, 3, 4])),
            poseidon2_hash(&fr(&[1, 2, 3, 4]), 3)
        );
    }
}
