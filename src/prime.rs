//! Prime sieving and probabilistic primality checks.

use std::collections::HashMap;

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand_core::CryptoRngCore;

/// Number of Miller-Rabin rounds run by [`is_prime`].
///
/// A composite survives all rounds with probability at most `4^-5`.
pub const MILLER_RABIN_TRIALS: usize = 5;

/// Every prime below 1000, ascending.
///
/// Used to answer small inputs directly and to reject candidates with a small
/// factor before any modular exponentiation happens.
pub const SMALL_PRIMES: [u32; 168] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43,
    47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97, 101, 103, 107,
    109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181,
    191, 193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263,
    269, 271, 277, 281, 283, 293, 307, 311, 313, 317, 331, 337, 347, 349,
    353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419, 421, 431, 433,
    439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503, 509, 521,
    523, 541, 547, 557, 563, 569, 571, 577, 587, 593, 599, 601, 607, 613,
    617, 619, 631, 641, 643, 647, 653, 659, 661, 673, 677, 683, 691, 701,
    709, 719, 727, 733, 739, 743, 751, 757, 761, 769, 773, 787, 797, 809,
    811, 821, 823, 827, 829, 839, 853, 857, 859, 863, 877, 881, 883, 887,
    907, 911, 919, 929, 937, 941, 947, 953, 967, 971, 977, 983, 991, 997,
];

/// Upper bound (exclusive) of [`SMALL_PRIMES`].
const SMALL_PRIMES_LIMIT: u32 = 1000;

/// Lazy, ascending sequence of the primes below a limit.
///
/// Created by [`sieve_primes`]. Runs an incremental sieve of Eratosthenes:
/// every prime found so far is filed under its next multiple, so memory grows
/// with the number of primes yielded rather than with the limit.
#[derive(Debug, Clone)]
pub struct SievePrimes {
    limit: u64,
    candidate: u64,
    /// next composite -> primes that divide it
    composites: HashMap<u64, Vec<u64>>,
}

/// Returns the primes below `limit` in ascending order.
///
/// The sequence is a pure function of `limit`: calling this again starts over.
pub fn sieve_primes(limit: u64) -> SievePrimes {
    SievePrimes {
        limit,
        candidate: 2,
        composites: HashMap::new(),
    }
}

impl Iterator for SievePrimes {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while self.candidate < self.limit {
            let c = self.candidate;
            self.candidate += 1;

            match self.composites.remove(&c) {
                Some(factors) => {
                    for p in factors {
                        if let Some(next) = c.checked_add(p) {
                            if next < self.limit {
                                self.composites.entry(next).or_default().push(p);
                            }
                        }
                    }
                }
                None => {
                    if let Some(square) = c.checked_mul(c) {
                        if square < self.limit {
                            self.composites.insert(square, vec![c]);
                        }
                    }
                    return Some(c);
                }
            }
        }
        None
    }
}

/// Reports whether `num` is prime, drawing Miller-Rabin bases from the
/// thread-local RNG.
///
/// See [`is_prime_with_rng`].
pub fn is_prime(num: &BigUint) -> bool {
    is_prime_with_rng(&mut rand::thread_rng(), num)
}

/// Reports whether `num` is prime.
///
/// Numbers below 2 are not prime. Members of [`SMALL_PRIMES`] are prime and
/// anything else divisible by one of them is composite. The remaining
/// candidates go through [`MILLER_RABIN_TRIALS`] rounds of [`miller_rabin`],
/// so a `true` answer for a large input is probabilistic, while `false` is
/// always correct.
pub fn is_prime_with_rng<R: CryptoRngCore + ?Sized>(rng: &mut R, num: &BigUint) -> bool {
    probably_prime(rng, num, MILLER_RABIN_TRIALS)
}

/// [`is_prime_with_rng`] with an explicit number of Miller-Rabin rounds.
pub fn probably_prime<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    num: &BigUint,
    trials: usize,
) -> bool {
    if let Some(small) = num.to_u32() {
        if small < 2 {
            return false;
        }
        if small < SMALL_PRIMES_LIMIT {
            return SMALL_PRIMES.binary_search(&small).is_ok();
        }
    }

    if SMALL_PRIMES.iter().any(|&p| (num % p).is_zero()) {
        return false;
    }

    miller_rabin(rng, num, trials)
}

/// Reports whether `num` passes `trials` rounds of the Miller-Rabin test with
/// uniformly random bases in `[2, num - 2]`.
///
/// Writes `num - 1 = s * 2^t` with `s` odd. A round passes when `a^s` is 1 or
/// `num - 1`, or when squaring it at most `t - 1` times reaches `num - 1`. The
/// first failing round proves `num` composite. Primes always pass; a composite
/// passes every round with probability at most `4^-trials`.
///
/// See Handbook of Applied Cryptography, p. 139, Algorithm 4.24.
pub fn miller_rabin<R: CryptoRngCore + ?Sized>(rng: &mut R, num: &BigUint, trials: usize) -> bool {
    let two = BigUint::from(2u32);
    if num < &two {
        return false;
    }
    if num == &two || num == &BigUint::from(3u32) {
        return true;
    }
    if num.is_even() {
        return false;
    }

    let nm1 = num - 1u32;
    // determine s, t such that nm1 = s << t
    let t = nm1.trailing_zeros().unwrap_or(0);
    let s = &nm1 >> t;

    'trials: for _ in 0..trials {
        let a = rng.gen_biguint_range(&two, &nm1);
        let mut v = a.modpow(&s, num);
        if v.is_one() || v == nm1 {
            continue;
        }

        for _ in 1..t {
            v = (&v * &v) % num;
            if v == nm1 {
                continue 'trials;
            }
        }
        return false;
    }

    true
}
