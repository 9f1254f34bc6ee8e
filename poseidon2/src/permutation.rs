use ark_ff::{AdditiveGroup as _, Field};

use crate::{Fr, Poseidon2Config, Poseidon2Error, RoundConstants};

/// The Poseidon2 permutation for a fixed configuration.
#[derive(Debug, Clone)]
pub struct Poseidon2Permutation {
    config: Poseidon2Config,
    constants: RoundConstants,
}

impl Poseidon2Permutation {
    /// Creates the permutation for `config`, deriving its round constants.
    pub fn new(config: Poseidon2Config) -> Result<Self, Poseidon2Error> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// The permutation with the recommended parameters for width `t`.
    ///
    /// # Panics
    ///
    /// Panics if `t < 2`.
    pub fn for_width(t: usize) -> Self {
        Self::from_valid(Poseidon2Config::for_width(t))
    }

    fn from_valid(config: Poseidon2Config) -> Self {
        let constants = RoundConstants::generate(&config);
        Self { config, constants }
    }

    /// The configuration of this permutation.
    pub fn config(&self) -> &Poseidon2Config {
        &self.config
    }

    /// Permutes `state` in place.
    ///
    /// # Panics
    ///
    /// Panics if `state.len()` differs from the configured width.
    pub fn permute_mut(&self, state: &mut [Fr]) {
        assert_eq!(state.len(), self.config.t, "state width mismatch");
        let half_f = self.config.rounds_f / 2;
        let (first, last) = self.constants.external.split_at(half_f);

        for round_constants in first {
            self.external_round(state, round_constants);
        }
        for round_constant in &self.constants.internal {
            self.internal_round(state, *round_constant);
        }
        for round_constants in last {
            self.external_round(state, round_constants);
        }
    }

    /// Returns the permutation of `state`.
    pub fn permute(&self, state: &[Fr]) -> Vec<Fr> {
        let mut state = state.to_vec();
        self.permute_mut(&mut state);
        state
    }

    fn sbox(&self, x: Fr) -> Fr {
        x.pow([self.config.alpha])
    }

    fn external_round(&self, state: &mut [Fr], round_constants: &[Fr]) {
        for (s, c) in state.iter_mut().zip(round_constants) {
            *s = self.sbox(*s + c);
        }
        external_matrix(state);
    }

    fn internal_round(&self, state: &mut [Fr], round_constant: Fr) {
        state[0] = self.sbox(state[0] + round_constant);
        internal_matrix(state);
    }
}

/// `out_i = Σ s + (t - 1)·s_i`, except for `t = 2` where the matrix is `[[1, 1], [1, 2]]`.
pub(crate) fn external_matrix(state: &mut [Fr]) {
    if let [s0, s1] = state {
        let (a, b) = (*s0, *s1);
        *s0 = a + b;
        *s1 = a + b.double();
        return;
    }
    let sum: Fr = state.iter().sum();
    let factor = Fr::from((state.len() - 1) as u64);
    for s in state.iter_mut() {
        *s = sum + factor * *s;
    }
}

/// Mixes into lane 0 and shifts every other lane down by one position.
pub(crate) fn internal_matrix(state: &mut [Fr]) {
    let t = state.len();
    let first = match *state {
        [s0, s1] => s1 - s0,
        [s0, s1, s2] => s0.double() - s1 + s2,
        [s0, s1, s2, s3] => Fr::from(3u64) * s0 - s1.double() + s2 + s3,
        _ => {
            let rest: Fr = state[1..].iter().sum();
            Fr::from((t - 1) as u64) * state[0] - rest
        }
    };
    state.copy_within(0..t - 1, 1);
    state[0] = first;
}
