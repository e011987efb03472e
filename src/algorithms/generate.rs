//! Generate prime components and exponents for a [`KeyMaterial`]

use core::fmt;
use core::sync::atomic::AtomicBool;

use log::debug;
use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand_core::CryptoRngCore;

use crate::config::KeyConfig;
use crate::errors::{Error, KeyField, Result};
use crate::key::KeyMaterial;
use crate::math::{gcd, mod_inverse};
use crate::prime_rand::PrimeSearch;

/// Random draws spent on a coprime public exponent before falling back to a
/// linear scan of the candidate range.
const MAX_EXPONENT_DRAWS: usize = 256;

/// Smallest public exponent ever generated. `e = 1` signs nothing and `e = 2`
/// is never coprime with an even totient.
const MIN_PUBLIC_EXPONENT: u32 = 3;

/// A matching public/private exponent pair.
#[derive(Clone, PartialEq, Eq)]
pub struct ExponentPair {
    /// Public exponent
    pub e: BigUint,
    /// Private exponent
    pub d: BigUint,
}

impl fmt::Debug for ExponentPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExponentPair")
            .field("e", &self.e)
            .finish_non_exhaustive()
    }
}

/// Generates one prime of `config.bit_size` bits.
pub(crate) fn generate_prime<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    config: &KeyConfig,
    cancel: Option<&AtomicBool>,
) -> Result<BigUint> {
    let mut search = PrimeSearch::new(config.bit_size)
        .with_trials(config.miller_rabin_trials)
        .with_max_attempts(config.max_prime_attempts);
    if let Some(flag) = cancel {
        search = search.with_cancel(flag);
    }
    search.run(rng)
}

/// Completes an exponent pair modulo `phi`.
///
/// - both exponents given: returned unchanged, without any check;
/// - only `e`: `d` is its inverse modulo `phi`;
/// - only `d`: `e` is its inverse modulo `phi`;
/// - neither: `e` is drawn uniformly from `[3, bit_size)` until it is coprime
///   with `phi`, then `d` is derived from it.
///
/// Fails with [`Error::InvalidKey`] naming the supplied exponent if it has no
/// inverse modulo `phi`.
pub fn generate_exponents<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    phi: &BigUint,
    e: Option<BigUint>,
    d: Option<BigUint>,
    bit_size: usize,
) -> Result<ExponentPair> {
    match (e, d) {
        (Some(e), Some(d)) => Ok(ExponentPair { e, d }),
        (Some(e), None) => {
            let d = invert(KeyField::E, &e, phi)?;
            Ok(ExponentPair { e, d })
        }
        (None, Some(d)) => {
            let e = invert(KeyField::D, &d, phi)?;
            Ok(ExponentPair { e, d })
        }
        (None, None) => {
            let e = random_public_exponent(rng, phi, bit_size)?;
            let d = invert(KeyField::E, &e, phi)?;
            debug!("generated public exponent {}", e);
            Ok(ExponentPair { e, d })
        }
    }
}

/// Generates a complete key set: two distinct `config.bit_size`-bit primes and
/// an exponent pair for them.
///
/// With small bit sizes every candidate exponent in `[3, bit_size)` can share
/// a factor with `phi`; both primes are then drawn again.
pub(crate) fn generate_key_material<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    config: &KeyConfig,
) -> Result<KeyMaterial> {
    config.validate()?;

    loop {
        let p = generate_prime(rng, config, None)?;
        let q = loop {
            let q = generate_prime(rng, config, None)?;
            // Makes sure that the primes are unequal.
            if q != p {
                break q;
            }
        };

        let mut keys = KeyMaterial::new();
        keys.store_prime(KeyField::P, p)?;
        keys.store_prime(KeyField::Q, q)?;

        let phi = keys
            .phi()
            .cloned()
            .ok_or(Error::MissingPrerequisite("phi requires both p and q"))?;
        let pair = match generate_exponents(rng, &phi, None, None, config.bit_size) {
            Ok(pair) => pair,
            Err(Error::InvalidKey { field: KeyField::E, .. }) => {
                debug!(
                    "no public exponent below {} fits phi, redrawing primes",
                    config.bit_size
                );
                continue;
            }
            Err(err) => return Err(err),
        };
        keys.store_exponent(KeyField::E, pair.e)?;
        keys.store_exponent(KeyField::D, pair.d)?;

        return Ok(keys);
    }
}

fn invert(field: KeyField, exponent: &BigUint, phi: &BigUint) -> Result<BigUint> {
    mod_inverse(exponent, phi).ok_or_else(|| Error::invalid_key(field, "not invertible modulo phi"))
}

fn random_public_exponent<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    phi: &BigUint,
    bit_size: usize,
) -> Result<BigUint> {
    let low = BigUint::from(MIN_PUBLIC_EXPONENT);
    let high = BigUint::from(bit_size as u64);
    if high <= low {
        return Err(Error::InvalidBitSize(bit_size));
    }

    for _ in 0..MAX_EXPONENT_DRAWS {
        let e = rng.gen_biguint_range(&low, &high);
        if gcd(&e, phi).is_one() {
            return Ok(e);
        }
    }

    // Unlucky draws or a totient sharing a factor with most candidates.
    let mut e = low;
    while e < high {
        if gcd(&e, phi).is_one() {
            return Ok(e);
        }
        e += 1u32;
    }

    Err(Error::invalid_key(
        KeyField::E,
        "no exponent below the bit size is coprime with phi",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{PrivateKeyParts, PublicKeyParts};
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn phi_3120() -> BigUint {
        // p = 61, q = 53
        BigUint::from(3120u32)
    }

    #[test]
    fn test_only_public_exponent() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let pair =
            generate_exponents(&mut rng, &phi_3120(), Some(BigUint::from(17u32)), None, 1024)
                .unwrap();
        assert_eq!(pair.e, BigUint::from(17u32));
        assert_eq!(pair.d, BigUint::from(2753u32));
    }

    #[test]
    fn test_only_private_exponent() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let pair =
            generate_exponents(&mut rng, &phi_3120(), None, Some(BigUint::from(2753u32)), 1024)
                .unwrap();
        assert_eq!(pair.e, BigUint::from(17u32));
        assert_eq!(pair.d, BigUint::from(2753u32));
    }

    #[test]
    fn test_both_exponents_unchanged() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let pair = generate_exponents(
            &mut rng,
            &phi_3120(),
            Some(BigUint::from(6u32)),
            Some(BigUint::from(10u32)),
            1024,
        )
        .unwrap();
        assert_eq!(pair.e, BigUint::from(6u32));
        assert_eq!(pair.d, BigUint::from(10u32));
    }

    #[test]
    fn test_non_invertible_exponent() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let err = generate_exponents(&mut rng, &phi_3120(), Some(BigUint::from(15u32)), None, 1024)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey { field: KeyField::E, .. }));

        let err = generate_exponents(&mut rng, &phi_3120(), None, Some(BigUint::from(26u32)), 1024)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey { field: KeyField::D, .. }));
    }

    #[test]
    fn test_random_exponents() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let phi = phi_3120();
        for _ in 0..100 {
            let pair = generate_exponents(&mut rng, &phi, None, None, 1024).unwrap();
            assert!(pair.e >= BigUint::from(3u32) && pair.e < BigUint::from(1024u32));
            assert!(gcd(&pair.e, &phi).is_one());
            assert!(((&pair.e * &pair.d) % &phi).is_one());
        }
    }

    #[test]
    fn test_no_coprime_exponent_in_range() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        // every candidate in [3, 8) shares a factor with 2 * 3 * 5 * 7
        let phi = BigUint::from(210u32);
        let err = generate_exponents(&mut rng, &phi, None, None, 8).unwrap_err();
        assert!(matches!(err, Error::InvalidKey { field: KeyField::E, .. }));

        let err = generate_exponents(&mut rng, &phi, None, None, 3).unwrap_err();
        assert!(matches!(err, Error::InvalidBitSize(3)));
    }

    macro_rules! key_generation {
        ($name:ident, $size:expr) => {
            #[test]
            fn $name() {
                let mut rng = ChaCha8Rng::from_seed([42; 32]);
                let config = KeyConfig::default().with_bit_size($size);
                for _ in 0..5 {
                    let keys = generate_key_material(&mut rng, &config).unwrap();
                    let valid = keys.validated().unwrap();
                    assert_eq!(valid.p().bits(), $size);
                    assert_eq!(valid.q().bits(), $size);
                    assert_ne!(valid.p(), valid.q());
                    assert!(valid.n().bits() >= 2 * $size - 1);
                    assert!(((valid.e() * valid.d()) % valid.phi()).is_one());
                }
            }
        };
    }

    #[test]
    fn key_generation_at_minimum_size() {
        let config = KeyConfig::default().with_bit_size(crate::config::MIN_BIT_SIZE);
        for seed in 0..200u8 {
            let mut rng = ChaCha8Rng::from_seed([seed; 32]);
            let keys = generate_key_material(&mut rng, &config).unwrap();
            assert!(keys.check_keys(), "seed {}", seed);
            let e = keys.e().unwrap();
            assert!(e >= &BigUint::from(3u32) && e < &BigUint::from(8u32));
        }
    }

    key_generation!(key_generation_8, 8);
    key_generation!(key_generation_16, 16);
    key_generation!(key_generation_64, 64);
    key_generation!(key_generation_256, 256);
    key_generation!(key_generation_512, 512);
}
