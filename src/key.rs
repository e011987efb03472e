use core::fmt;

use num_bigint::BigUint;
use num_traits::{One, Zero};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::errors::{Error, KeyField, Result};
use crate::math::gcd;
use crate::traits::{PrivateKeyParts, PublicKeyParts};

/// Represents the public part of a key: the modulus and the public exponent.
///
/// A verifier only ever needs this pair, so it can be built from values
/// received out of band without access to the primes or the private exponent.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PublicKey {
    /// Modulus
    n: BigUint,
    /// Public exponent
    e: BigUint,
}

impl PublicKey {
    /// Create a new public key from its components.
    ///
    /// The modulus must be greater than one and the exponent non-zero.
    pub fn new(n: BigUint, e: BigUint) -> Result<Self> {
        if n <= BigUint::one() {
            return Err(Error::invalid_key(KeyField::N, "modulus must be greater than 1"));
        }
        if e.is_zero() {
            return Err(Error::invalid_key(KeyField::E, "public exponent must be non-zero"));
        }
        Ok(PublicKey { n, e })
    }

    /// Parse a public key from the decimal strings a user typed in.
    pub fn from_decimal(n: &str, e: &str) -> Result<Self> {
        Self::new(parse_decimal(KeyField::N, n)?, parse_decimal(KeyField::E, e)?)
    }
}

impl PublicKeyParts for PublicKey {
    fn n(&self) -> &BigUint {
        &self.n
    }

    fn e(&self) -> &BigUint {
        &self.e
    }
}

/// Parses a decimal integer for `field`, ignoring surrounding whitespace.
pub(crate) fn parse_decimal(field: KeyField, text: &str) -> Result<BigUint> {
    let trimmed = text.trim();
    let malformed = || Error::MalformedInput {
        field,
        input: text.to_owned(),
    };

    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    BigUint::parse_bytes(trimmed.as_bytes(), 10).ok_or_else(malformed)
}

/// Accepts `key` as an exponent only if it is coprime with `phi`.
///
/// `field` names the exponent in the error.
pub fn validate_exponent(field: KeyField, key: &BigUint, phi: &BigUint) -> Result<BigUint> {
    if gcd(key, phi).is_one() {
        Ok(key.clone())
    } else {
        Err(Error::invalid_key(field, "not coprime with phi"))
    }
}

/// The full set of key fields `{p, q, n, phi, e, d}`, filled in one at a time.
///
/// `n` and `phi` have no setters: they are recomputed whenever `p` or `q`
/// changes and exist exactly when both primes do. Any field may be missing
/// while a collaborator is still filling the set in; signing goes through
/// [`KeyMaterial::validated`], which refuses incomplete or inconsistent sets.
///
/// Secret fields are zeroized when the value is dropped.
#[derive(Clone, Default)]
pub struct KeyMaterial {
    p: Option<BigUint>,
    q: Option<BigUint>,
    n: Option<BigUint>,
    phi: Option<BigUint>,
    e: Option<BigUint>,
    d: Option<BigUint>,
}

impl KeyMaterial {
    /// An empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// First prime, if set.
    pub fn p(&self) -> Option<&BigUint> {
        self.p.as_ref()
    }

    /// Second prime, if set.
    pub fn q(&self) -> Option<&BigUint> {
        self.q.as_ref()
    }

    /// Modulus, present once both primes are set.
    pub fn n(&self) -> Option<&BigUint> {
        self.n.as_ref()
    }

    /// Euler totient, present once both primes are set.
    pub fn phi(&self) -> Option<&BigUint> {
        self.phi.as_ref()
    }

    /// Public exponent, if set.
    pub fn e(&self) -> Option<&BigUint> {
        self.e.as_ref()
    }

    /// Private exponent, if set.
    pub fn d(&self) -> Option<&BigUint> {
        self.d.as_ref()
    }

    /// Returns the stored value of `field`.
    pub fn get(&self, field: KeyField) -> Option<&BigUint> {
        match field {
            KeyField::P => self.p(),
            KeyField::Q => self.q(),
            KeyField::N => self.n(),
            KeyField::Phi => self.phi(),
            KeyField::E => self.e(),
            KeyField::D => self.d(),
        }
    }

    /// Reports whether all six fields are present and both exponents are
    /// coprime with `phi`.
    pub fn check_keys(&self) -> bool {
        self.validated().is_ok()
    }

    /// Borrows the key set as a complete, validated key.
    ///
    /// Fails with [`Error::InvalidKey`] naming the first missing field or the
    /// exponent that is not coprime with `phi`.
    pub fn validated(&self) -> Result<ValidKeys<'_>> {
        let p = require(KeyField::P, &self.p)?;
        let q = require(KeyField::Q, &self.q)?;
        let n = require(KeyField::N, &self.n)?;
        let phi = require(KeyField::Phi, &self.phi)?;
        let e = require(KeyField::E, &self.e)?;
        let d = require(KeyField::D, &self.d)?;

        validate_exponent(KeyField::E, e, phi)?;
        validate_exponent(KeyField::D, d, phi)?;

        Ok(ValidKeys { p, q, n, phi, e, d })
    }

    /// The public half `{e, n}` of a valid key set.
    pub fn public_key(&self) -> Result<PublicKey> {
        let keys = self.validated()?;
        Ok(PublicKey {
            n: keys.n.clone(),
            e: keys.e.clone(),
        })
    }

    /// Stores `value` under `p` or `q` and recomputes `n` and `phi`.
    ///
    /// Primality is the caller's responsibility.
    pub(crate) fn store_prime(&mut self, field: KeyField, value: BigUint) -> Result<()> {
        match field {
            KeyField::P => replace_secret(&mut self.p, Some(value)),
            KeyField::Q => replace_secret(&mut self.q, Some(value)),
            _ => return Err(Error::invalid_key(field, "not a prime field")),
        }
        self.recompute();
        Ok(())
    }

    /// Stores `value` under `e` or `d`.
    pub(crate) fn store_exponent(&mut self, field: KeyField, value: BigUint) -> Result<()> {
        match field {
            KeyField::E => self.e = Some(value),
            KeyField::D => replace_secret(&mut self.d, Some(value)),
            _ => return Err(Error::invalid_key(field, "not an exponent")),
        }
        Ok(())
    }

    fn recompute(&mut self) {
        let (n, phi) = match (&self.p, &self.q) {
            (Some(p), Some(q)) => (Some(p * q), Some((p - 1u32) * (q - 1u32))),
            _ => (None, None),
        };
        self.n = n;
        replace_secret(&mut self.phi, phi);
    }
}

fn require(field: KeyField, slot: &Option<BigUint>) -> Result<&BigUint> {
    slot.as_ref().ok_or_else(|| Error::invalid_key(field, "not set"))
}

fn replace_secret(slot: &mut Option<BigUint>, value: Option<BigUint>) {
    if let Some(mut old) = core::mem::replace(slot, value) {
        old.zeroize();
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("p", &self.p.as_ref().map(|_| "..."))
            .field("q", &self.q.as_ref().map(|_| "..."))
            .field("n", &self.n)
            .field("phi", &self.phi.as_ref().map(|_| "..."))
            .field("e", &self.e)
            .field("d", &self.d.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Zeroize for KeyMaterial {
    fn zeroize(&mut self) {
        replace_secret(&mut self.p, None);
        replace_secret(&mut self.q, None);
        replace_secret(&mut self.phi, None);
        replace_secret(&mut self.d, None);
        self.n = None;
        self.e = None;
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// A [`KeyMaterial`] that passed [`KeyMaterial::validated`].
///
/// All six fields are present and both exponents are coprime with `phi`.
#[derive(Clone, Copy)]
pub struct ValidKeys<'a> {
    p: &'a BigUint,
    q: &'a BigUint,
    n: &'a BigUint,
    phi: &'a BigUint,
    e: &'a BigUint,
    d: &'a BigUint,
}

impl fmt::Debug for ValidKeys<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidKeys")
            .field("n", self.n)
            .field("e", self.e)
            .finish_non_exhaustive()
    }
}

impl PublicKeyParts for ValidKeys<'_> {
    fn n(&self) -> &BigUint {
        self.n
    }

    fn e(&self) -> &BigUint {
        self.e
    }
}

impl PrivateKeyParts for ValidKeys<'_> {
    fn d(&self) -> &BigUint {
        self.d
    }

    fn p(&self) -> &BigUint {
        self.p
    }

    fn q(&self) -> &BigUint {
        self.q
    }

    fn phi(&self) -> &BigUint {
        self.phi
    }
}
