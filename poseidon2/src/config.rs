use crate::Poseidon2Error;

/// The parameters of a Poseidon2 instance.
///
/// [`Poseidon2Config::for_width`] always yields a usable instance. Hand-built configurations are
/// checked by [`Poseidon2Config::validate`] before a permutation is created from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poseidon2Config {
    /// The state width `t`
    pub t: usize,
    /// The number of elements absorbed per permutation
    pub rate: usize,
    /// The number of state elements never touched by input
    pub capacity: usize,
    /// The number of full rounds, split evenly before and after the partial rounds
    pub rounds_f: usize,
    /// The number of partial rounds
    pub rounds_p: usize,
    /// The S-box exponent
    pub alpha: u64,
}

impl Poseidon2Config {
    /// The recommended parameters for width `t` at the 128-bit security level.
    ///
    /// Widths other than 2, 3, 4 and 8 get rate `t - 1`, capacity 1, 8 full and 57 partial
    /// rounds.
    ///
    /// # Panics
    ///
    /// Panics if `t < 2`.
    pub fn for_width(t: usize) -> Self {
        assert!(t >= 2, "Poseidon2 needs a state of at least two elements");
        let (rate, capacity, rounds_f, rounds_p) = match t {
            2 => (1, 1, 8, 56),
            3 => (1, 2, 8, 57),
            4 => (2, 2, 8, 56),
            8 => (7, 1, 8, 57),
            _ => (t - 1, 1, 8, 57),
        };
        Self {
            t,
            rate,
            capacity,
            rounds_f,
            rounds_p,
            alpha: 5,
        }
    }
}

impl Poseidon2Config {
    /// Checks that the parameters describe a permutation that can be run.
    pub fn validate(&self) -> Result<(), Poseidon2Error> {
        let invalid = |reason: String| Err(Poseidon2Error::InvalidConfig(reason));
        if self.t < 2 {
            return invalid(format!("width {} is below 2", self.t));
        }
        if self.rate == 0 || self.rate + self.capacity != self.t {
            return invalid(format!(
                "rate {} and capacity {} do not split width {}",
                self.rate, self.capacity, self.t
            ));
        }
        if self.rounds_f == 0 || !self.rounds_f.is_multiple_of(2) {
            return invalid(format!("{} full rounds cannot be split evenly", self.rounds_f));
        }
        if self.alpha < 3 {
            return invalid(format!("s-box exponent {} is not a permutation", self.alpha));
        }
        Ok(())
    }
}

impl Default for Poseidon2Config {
    fn default() -> Self {
        Self::for_width(3)
    }
}
