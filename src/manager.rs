//! Session object that fills in, generates and uses a [`KeyMaterial`].

use core::sync::atomic::AtomicBool;
use std::io::Read;
use std::path::Path;

use log::debug;
use num_bigint::BigUint;
use rand::rngs::ThreadRng;
use rand_core::CryptoRngCore;

use crate::algorithms::generate::{
    generate_exponents, generate_key_material, generate_prime, ExponentPair,
};
use crate::config::KeyConfig;
use crate::errors::{Error, KeyField, Result};
use crate::key::{parse_decimal, validate_exponent, KeyMaterial, PublicKey};
use crate::prime::probably_prime;
use crate::signature::{self, Verification};

/// Owns one session's [`KeyMaterial`] together with its settings and RNG.
///
/// Every operation a front-end needs goes through here: accepting or
/// generating each field, deriving exponents, checking validity, and signing
/// or verifying files. Fields can be filled in any order; signing refuses to
/// run until [`check_keys`](Self::check_keys) holds.
///
/// ```
/// use checksig::{KeyConfig, KeyManager};
///
/// let mut manager = KeyManager::with_config(KeyConfig::default().with_bit_size(128)).unwrap();
/// manager.set_keys(None, None).unwrap();
/// manager.generate_keys(None, None, None).unwrap();
/// assert!(manager.check_keys());
///
/// let signature = manager.sign(&b"some document"[..]).unwrap();
/// let public_key = manager.public_key().unwrap();
/// let outcome = manager.verify(&b"some document"[..], &signature, &public_key).unwrap();
/// assert!(outcome.is_valid);
/// ```
#[derive(Debug)]
pub struct KeyManager<R = ThreadRng> {
    keys: KeyMaterial,
    config: KeyConfig,
    rng: R,
}

impl KeyManager<ThreadRng> {
    /// Empty session with the default settings and the thread-local RNG.
    pub fn new() -> Self {
        KeyManager {
            keys: KeyMaterial::new(),
            config: KeyConfig::default(),
            rng: rand::thread_rng(),
        }
    }

    /// Empty session with `config` and the thread-local RNG.
    pub fn with_config(config: KeyConfig) -> Result<Self> {
        Self::from_rng(config, rand::thread_rng())
    }
}

impl Default for KeyManager<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CryptoRngCore> KeyManager<R> {
    /// Empty session drawing randomness from `rng`.
    pub fn from_rng(config: KeyConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(KeyManager {
            keys: KeyMaterial::new(),
            config,
            rng,
        })
    }

    /// Session holding a freshly generated, complete key set.
    pub fn generate(config: KeyConfig, mut rng: R) -> Result<Self> {
        let keys = generate_key_material(&mut rng, &config)?;
        Ok(KeyManager { keys, config, rng })
    }

    /// The session settings.
    pub fn config(&self) -> &KeyConfig {
        &self.config
    }

    /// The key set as filled in so far.
    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    /// Gives up the session, keeping the key set.
    pub fn into_keys(self) -> KeyMaterial {
        self.keys
    }

    /// Forgets every key field.
    pub fn reset(&mut self) {
        self.keys = KeyMaterial::new();
    }

    /// Reports whether the key set is complete and both exponents are
    /// coprime with `phi`.
    pub fn check_keys(&self) -> bool {
        self.keys.check_keys()
    }

    /// The public key `{e, n}` of a valid key set.
    pub fn public_key(&self) -> Result<PublicKey> {
        self.keys.public_key()
    }

    /// Primality check with the session's RNG and Miller-Rabin round count.
    pub fn is_prime(&mut self, num: &BigUint) -> bool {
        probably_prime(&mut self.rng, num, self.config.miller_rabin_trials)
    }

    /// Sets both primes, generating whichever is not supplied.
    ///
    /// A supplied prime must pass the primality test, and the two primes must
    /// differ; otherwise nothing is changed and [`Error::InvalidKey`] names the
    /// offending field. `n` and `phi` are recomputed from the result.
    pub fn set_keys(&mut self, p: Option<BigUint>, q: Option<BigUint>) -> Result<&KeyMaterial> {
        if let Some(p) = &p {
            self.require_prime(KeyField::P, p)?;
        }
        if let Some(q) = &q {
            self.require_prime(KeyField::Q, q)?;
        }
        if p.is_some() && p == q {
            return Err(Error::invalid_key(KeyField::Q, "must differ from p"));
        }

        let p = match p {
            Some(p) => p,
            None => self.fresh_prime(q.as_ref(), None)?,
        };
        let q = match q {
            Some(q) => q,
            None => self.fresh_prime(Some(&p), None)?,
        };

        self.keys.store_prime(KeyField::P, p)?;
        self.keys.store_prime(KeyField::Q, q)?;
        Ok(&self.keys)
    }

    /// Accepts a caller-supplied value for one field.
    ///
    /// `p` and `q` must be prime and differ from each other. `e` and `d` must
    /// be coprime with `phi` once `phi` is known; before that they are stored
    /// as given and checked by [`check_keys`](Self::check_keys). `n` and `phi`
    /// are always derived and cannot be set.
    pub fn set_field(&mut self, field: KeyField, value: BigUint) -> Result<()> {
        match field {
            KeyField::P | KeyField::Q => {
                self.require_prime(field, &value)?;
                if self.keys.get(other_prime(field)) == Some(&value) {
                    return Err(Error::invalid_key(field, "p and q must differ"));
                }
                self.keys.store_prime(field, value)
            }
            KeyField::E | KeyField::D => {
                if let Some(phi) = self.keys.phi() {
                    validate_exponent(field, &value, phi)?;
                }
                self.keys.store_exponent(field, value)
            }
            KeyField::N | KeyField::Phi => Err(Error::invalid_key(field, "derived from p and q")),
        }
    }

    /// Parses `text` as a decimal integer and sets it with
    /// [`set_field`](Self::set_field).
    ///
    /// Fails with [`Error::MalformedInput`] if `text` is not a non-negative
    /// decimal number.
    pub fn set_field_str(&mut self, field: KeyField, text: &str) -> Result<()> {
        let value = parse_decimal(field, text)?;
        self.set_field(field, value)
    }

    /// Generates a fresh prime of the configured size and stores it as `p` or
    /// `q`.
    pub fn generate_prime_field(&mut self, field: KeyField) -> Result<BigUint> {
        self.generate_prime_field_inner(field, None)
    }

    /// Like [`generate_prime_field`](Self::generate_prime_field), but gives up
    /// with [`Error::Cancelled`] once `cancel` is set.
    pub fn generate_prime_field_with_cancel(
        &mut self,
        field: KeyField,
        cancel: &AtomicBool,
    ) -> Result<BigUint> {
        self.generate_prime_field_inner(field, Some(cancel))
    }

    /// Completes an exponent pair.
    ///
    /// With `phi` given, the pair is computed for that totient and returned
    /// without touching the session. Otherwise `phi` comes from the stored
    /// primes, failing with [`Error::MissingPrerequisite`] if they are not
    /// both set, and the resulting pair is stored as `e` and `d`.
    ///
    /// See [`generate_exponents`] for how missing exponents are derived.
    pub fn generate_keys(
        &mut self,
        phi: Option<&BigUint>,
        public_exponent: Option<BigUint>,
        private_exponent: Option<BigUint>,
    ) -> Result<ExponentPair> {
        let bit_size = self.config.bit_size;

        if let Some(phi) = phi {
            return generate_exponents(
                &mut self.rng,
                phi,
                public_exponent,
                private_exponent,
                bit_size,
            );
        }

        let phi = self
            .keys
            .phi()
            .cloned()
            .ok_or(Error::MissingPrerequisite("p and q must be set to derive phi"))?;
        let pair = generate_exponents(
            &mut self.rng,
            &phi,
            public_exponent,
            private_exponent,
            bit_size,
        )?;
        debug!("derived exponent pair for the session key");

        self.keys.store_exponent(KeyField::E, pair.e.clone())?;
        self.keys.store_exponent(KeyField::D, pair.d.clone())?;
        Ok(pair)
    }

    /// Signs the bytes of `reader` with the session key.
    pub fn sign<Rd: Read>(&self, reader: Rd) -> Result<BigUint> {
        signature::sign_with_seed(reader, &self.keys, self.config.digest_seed)
    }

    /// Signs the file at `path` with the session key.
    pub fn sign_file<P: AsRef<Path>>(&self, path: P) -> Result<BigUint> {
        signature::sign_file_with_seed(path, &self.keys, self.config.digest_seed)
    }

    /// Verifies `signature` over the bytes of `reader` against `public_key`,
    /// which need not belong to this session.
    pub fn verify<Rd: Read>(
        &self,
        reader: Rd,
        signature: &BigUint,
        public_key: &PublicKey,
    ) -> Result<Verification> {
        signature::verify_with_seed(reader, signature, public_key, self.config.digest_seed)
    }

    /// Verifies `signature` over the file at `path` against `public_key`.
    pub fn verify_file<P: AsRef<Path>>(
        &self,
        path: P,
        signature: &BigUint,
        public_key: &PublicKey,
    ) -> Result<Verification> {
        signature::verify_file_with_seed(path, signature, public_key, self.config.digest_seed)
    }

    fn require_prime(&mut self, field: KeyField, value: &BigUint) -> Result<()> {
        if self.is_prime(value) {
            Ok(())
        } else {
            Err(Error::invalid_key(field, "not prime"))
        }
    }

    fn generate_prime_field_inner(
        &mut self,
        field: KeyField,
        cancel: Option<&AtomicBool>,
    ) -> Result<BigUint> {
        if !field.is_prime_field() {
            return Err(Error::invalid_key(field, "not a prime field"));
        }

        let other = self.keys.get(other_prime(field)).cloned();
        let prime = self.fresh_prime(other.as_ref(), cancel)?;
        debug!("generated {}-bit prime for {}", self.config.bit_size, field);

        self.keys.store_prime(field, prime.clone())?;
        Ok(prime)
    }

    /// A new prime of the configured size that differs from `avoid`.
    fn fresh_prime(
        &mut self,
        avoid: Option<&BigUint>,
        cancel: Option<&AtomicBool>,
    ) -> Result<BigUint> {
        loop {
            let prime = generate_prime(&mut self.rng, &self.config, cancel)?;
            if avoid != Some(&prime) {
                return Ok(prime);
            }
        }
    }
}

fn other_prime(field: KeyField) -> KeyField {
    match field {
        KeyField::P => KeyField::Q,
        _ => KeyField::P,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicBool;
    use num_traits::One;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn manager(bits: usize) -> KeyManager<ChaCha8Rng> {
        let config = KeyConfig::default().with_bit_size(bits);
        KeyManager::from_rng(config, ChaCha8Rng::from_seed([42; 32])).unwrap()
    }

    #[test]
    fn set_keys_generates_missing_primes() {
        let mut manager = manager(64);
        let keys = manager.set_keys(None, None).unwrap();

        let p = keys.p().unwrap().clone();
        let q = keys.q().unwrap().clone();
        assert_eq!(p.bits(), 64);
        assert_eq!(q.bits(), 64);
        assert_ne!(p, q);
        assert_eq!(keys.n().unwrap(), &(&p * &q));
        assert_eq!(keys.phi().unwrap(), &((&p - 1u32) * (&q - 1u32)));
        assert!(!keys.check_keys());
    }

    #[test]
    fn set_keys_keeps_supplied_primes() {
        let mut manager = manager(64);
        let keys = manager
            .set_keys(Some(BigUint::from(61u32)), None)
            .unwrap();
        assert_eq!(keys.p(), Some(&BigUint::from(61u32)));
        assert_eq!(keys.q().unwrap().bits(), 64);

        let keys = manager
            .set_keys(Some(BigUint::from(61u32)), Some(BigUint::from(53u32)))
            .unwrap();
        assert_eq!(keys.n(), Some(&BigUint::from(3233u32)));
        assert_eq!(keys.phi(), Some(&BigUint::from(3120u32)));
    }

    #[test]
    fn set_keys_rejects_composites() {
        let mut manager = manager(64);
        let err = manager.set_keys(Some(BigUint::from(4u32)), None).unwrap_err();
        assert!(matches!(err, Error::InvalidKey { field: KeyField::P, .. }));

        let err = manager
            .set_keys(Some(BigUint::from(61u32)), Some(BigUint::from(1001u32)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey { field: KeyField::Q, .. }));

        // nothing was stored
        assert!(manager.keys().p().is_none());
    }

    #[test]
    fn set_keys_rejects_equal_primes() {
        let mut manager = manager(64);
        let err = manager
            .set_keys(Some(BigUint::from(61u32)), Some(BigUint::from(61u32)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey { field: KeyField::Q, .. }));
    }

    #[test]
    fn generate_keys_requires_primes() {
        let mut manager = manager(64);
        let err = manager.generate_keys(None, None, None).unwrap_err();
        assert!(matches!(err, Error::MissingPrerequisite(_)));

        manager.generate_prime_field(KeyField::P).unwrap();
        let err = manager.generate_keys(None, None, None).unwrap_err();
        assert!(matches!(err, Error::MissingPrerequisite(_)));
    }

    #[test]
    fn generate_keys_with_explicit_phi_is_detached() {
        let mut manager = manager(64);
        let pair = manager
            .generate_keys(Some(&BigUint::from(3120u32)), Some(BigUint::from(17u32)), None)
            .unwrap();
        assert_eq!(pair.d, BigUint::from(2753u32));
        assert!(manager.keys().e().is_none());
    }

    #[test]
    fn field_at_a_time_setup() {
        let mut manager = manager(64);

        let p = manager.generate_prime_field(KeyField::P).unwrap();
        assert_eq!(manager.keys().p(), Some(&p));
        assert!(manager.keys().n().is_none());

        let q = manager.generate_prime_field(KeyField::Q).unwrap();
        assert_ne!(p, q);
        assert_eq!(manager.keys().n(), Some(&(&p * &q)));

        let pair = manager.generate_keys(None, None, None).unwrap();
        assert_eq!(manager.keys().e(), Some(&pair.e));
        assert_eq!(manager.keys().d(), Some(&pair.d));
        assert!(manager.check_keys());

        let phi = manager.keys().phi().unwrap().clone();
        assert!(((&pair.e * &pair.d) % &phi).is_one());
    }

    #[test]
    fn generate_prime_field_rejects_other_fields() {
        let mut manager = manager(64);
        for field in [KeyField::N, KeyField::Phi, KeyField::E, KeyField::D] {
            assert!(matches!(
                manager.generate_prime_field(field),
                Err(Error::InvalidKey { .. })
            ));
        }
    }

    #[test]
    fn generate_prime_field_can_be_cancelled() {
        let mut manager = manager(512);
        let cancel = AtomicBool::new(true);
        let err = manager
            .generate_prime_field_with_cancel(KeyField::P, &cancel)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(manager.keys().p().is_none());
    }

    #[test]
    fn typed_in_fields() {
        let mut manager = manager(64);
        manager.set_field_str(KeyField::P, "61").unwrap();
        manager.set_field_str(KeyField::Q, " 53\n").unwrap();

        let err = manager.set_field_str(KeyField::E, "seventeen").unwrap_err();
        assert!(matches!(err, Error::MalformedInput { field: KeyField::E, .. }));

        let err = manager.set_field_str(KeyField::E, "15").unwrap_err();
        assert!(matches!(err, Error::InvalidKey { field: KeyField::E, .. }));

        manager.set_field_str(KeyField::E, "17").unwrap();
        manager.set_field_str(KeyField::D, "2753").unwrap();
        assert!(manager.check_keys());

        let err = manager.set_field_str(KeyField::N, "3233").unwrap_err();
        assert!(matches!(err, Error::InvalidKey { field: KeyField::N, .. }));

        let err = manager.set_field_str(KeyField::Q, "61").unwrap_err();
        assert!(matches!(err, Error::InvalidKey { field: KeyField::Q, .. }));
    }

    #[test]
    fn exponents_before_primes() {
        let mut manager = manager(64);
        // no phi yet, accepted as given
        manager.set_field(KeyField::E, BigUint::from(15u32)).unwrap();
        manager.set_field(KeyField::D, BigUint::from(2753u32)).unwrap();
        manager
            .set_keys(Some(BigUint::from(61u32)), Some(BigUint::from(53u32)))
            .unwrap();

        // gcd(15, 3120) != 1
        assert!(!manager.check_keys());
        assert!(manager.sign(&b"data"[..]).is_err());
    }

    #[test]
    fn sign_and_verify_session() {
        let config = KeyConfig::default().with_bit_size(128);
        let manager = KeyManager::generate(config, ChaCha8Rng::from_seed([1; 32])).unwrap();
        assert!(manager.check_keys());

        let signature = manager.sign(&b"document body"[..]).unwrap();
        let public = manager.public_key().unwrap();
        let outcome = manager.verify(&b"document body"[..], &signature, &public).unwrap();
        assert!(outcome.is_valid);
        assert_eq!(outcome.recovered, outcome.recomputed);

        let outcome = manager.verify(&b"document bodz"[..], &signature, &public).unwrap();
        assert!(!outcome.is_valid);
    }

    #[test]
    fn generate_at_minimum_bit_size() {
        let config = KeyConfig::default().with_bit_size(crate::config::MIN_BIT_SIZE);
        for seed in 0..200u8 {
            let manager = KeyManager::generate(config.clone(), ChaCha8Rng::from_seed([seed; 32]))
                .unwrap_or_else(|err| panic!("seed {}: {}", seed, err));
            assert!(manager.check_keys());
        }
    }

    #[test]
    fn reset_forgets_keys() {
        let config = KeyConfig::default().with_bit_size(64);
        let mut manager = KeyManager::generate(config, ChaCha8Rng::from_seed([2; 32])).unwrap();
        assert!(manager.check_keys());
        manager.reset();
        assert!(!manager.check_keys());
        assert!(manager.keys().p().is_none());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = KeyConfig::default().with_bit_size(2);
        assert!(KeyManager::from_rng(config, ChaCha8Rng::from_seed([0; 32])).is_err());
    }
}
