//! Tunable parameters for key generation and digests.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::prime::MILLER_RABIN_TRIALS;
use crate::signature::DIGEST_SEED;

/// Default size of each generated prime, in bits.
pub const DEFAULT_BIT_SIZE: usize = 1024;

/// Smallest accepted [`KeyConfig::bit_size`].
pub const MIN_BIT_SIZE: usize = 8;

/// Settings shared by a [`KeyManager`](crate::KeyManager) session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct KeyConfig {
    /// Size in bits of each generated prime `p` and `q`. Also the exclusive
    /// upper bound for randomly chosen public exponents.
    pub bit_size: usize,
    /// Miller-Rabin rounds per prime candidate.
    pub miller_rabin_trials: usize,
    /// Initial accumulator of the file checksum.
    pub digest_seed: u64,
    /// Cap on prime candidates tried per generated field; `None` searches
    /// until a prime turns up.
    pub max_prime_attempts: Option<usize>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        KeyConfig {
            bit_size: DEFAULT_BIT_SIZE,
            miller_rabin_trials: MILLER_RABIN_TRIALS,
            digest_seed: DIGEST_SEED,
            max_prime_attempts: None,
        }
    }
}

impl KeyConfig {
    /// Sets the prime size in bits.
    pub fn with_bit_size(mut self, bit_size: usize) -> Self {
        self.bit_size = bit_size;
        self
    }

    /// Sets the number of Miller-Rabin rounds.
    pub fn with_miller_rabin_trials(mut self, trials: usize) -> Self {
        self.miller_rabin_trials = trials;
        self
    }

    /// Sets the checksum seed.
    pub fn with_digest_seed(mut self, seed: u64) -> Self {
        self.digest_seed = seed;
        self
    }

    /// Caps the prime search.
    pub fn with_max_prime_attempts(mut self, attempts: Option<usize>) -> Self {
        self.max_prime_attempts = attempts;
        self
    }

    /// Checks that the settings can produce keys.
    pub fn validate(&self) -> Result<()> {
        if self.bit_size < MIN_BIT_SIZE {
            return Err(Error::InvalidBitSize(self.bit_size));
        }
        if self.miller_rabin_trials == 0 {
            return Err(Error::MissingPrerequisite(
                "at least one Miller-Rabin round is required",
            ));
        }
        Ok(())
    }
}
