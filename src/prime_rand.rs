//! Generation of random primes.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace, warn};
use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand_core::CryptoRngCore;

use crate::errors::{Error, Result};
use crate::prime::{probably_prime, MILLER_RABIN_TRIALS};

/// A generic trait for generating random primes.
///
/// *Warning*: This is highly dependent on the provided random number generator
/// to provide actually random primes.
///
/// # Example
/// ```
/// use checksig::RandPrime;
///
/// let mut rng = rand::thread_rng();
/// let p = rng.gen_prime(256).unwrap();
/// assert_eq!(p.bits(), 256);
/// ```
pub trait RandPrime {
    /// Generate a random prime number with exactly `bit_size` bits.
    fn gen_prime(&mut self, bit_size: usize) -> Result<BigUint>;
}

impl<R: CryptoRngCore + ?Sized> RandPrime for R {
    fn gen_prime(&mut self, bit_size: usize) -> Result<BigUint> {
        PrimeSearch::new(bit_size).run(self)
    }
}

/// Draws uniformly random odd `bit_size`-bit integers until one is prime.
///
/// Equivalent to `rng.gen_prime(bit_size)`.
pub fn generate_large_prime<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    bit_size: usize,
) -> Result<BigUint> {
    PrimeSearch::new(bit_size).run(rng)
}

/// A configurable prime search.
///
/// Candidates are sampled uniformly from the odd integers in
/// `[2^(bit_size-1), 2^bit_size)`. By default the search runs until it finds
/// a prime; it can be capped with [`with_max_attempts`](Self::with_max_attempts)
/// and stopped from another thread with [`with_cancel`](Self::with_cancel).
///
/// ```
/// use std::sync::atomic::AtomicBool;
/// use checksig::PrimeSearch;
///
/// let cancel = AtomicBool::new(false);
/// let p = PrimeSearch::new(128)
///     .with_cancel(&cancel)
///     .run(&mut rand::thread_rng())
///     .unwrap();
/// assert_eq!(p.bits(), 128);
/// ```
#[derive(Debug, Clone)]
pub struct PrimeSearch<'a> {
    bit_size: usize,
    trials: usize,
    max_attempts: Option<usize>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> PrimeSearch<'a> {
    /// Search for a prime of exactly `bit_size` bits.
    pub fn new(bit_size: usize) -> Self {
        PrimeSearch {
            bit_size,
            trials: MILLER_RABIN_TRIALS,
            max_attempts: None,
            cancel: None,
        }
    }

    /// Number of Miller-Rabin rounds each candidate must pass.
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    /// Give up with [`Error::AttemptsExhausted`] after this many candidates.
    pub fn with_max_attempts(mut self, max_attempts: Option<usize>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Stop with [`Error::Cancelled`] once `flag` is set.
    ///
    /// The flag is polled before every candidate.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Runs the search.
    pub fn run<R: CryptoRngCore + ?Sized>(&self, rng: &mut R) -> Result<BigUint> {
        if self.bit_size < 2 {
            return Err(Error::InvalidBitSize(self.bit_size));
        }

        let top = BigUint::one() << (self.bit_size - 1);
        let mut attempts = 0usize;

        loop {
            if let Some(flag) = self.cancel {
                if flag.load(Ordering::Relaxed) {
                    warn!(
                        "{}-bit prime search cancelled after {} candidates",
                        self.bit_size, attempts
                    );
                    return Err(Error::Cancelled);
                }
            }
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    warn!(
                        "{}-bit prime search gave up after {} candidates",
                        self.bit_size, attempts
                    );
                    return Err(Error::AttemptsExhausted(attempts));
                }
            }
            attempts += 1;

            // Fix the top bit so the candidate has exactly bit_size bits and the
            // bottom bit so it is odd; everything in between is uniform.
            let candidate = rng.gen_biguint(self.bit_size - 1) | &top | BigUint::one();

            if probably_prime(rng, &candidate, self.trials) {
                debug!("found {}-bit prime after {} candidates", self.bit_size, attempts);
                return Ok(candidate);
            }
            trace!("rejected composite candidate {}", attempts);
        }
    }
}
