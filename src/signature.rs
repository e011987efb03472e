//! Checksum signatures over a byte stream.
//!
//! The signed value is an additive checksum of the input's bytes reduced
//! modulo `n`:
//!
//! ```text
//! acc = seed mod n
//! acc = (acc + byte) mod n    for every byte
//! ```
//!
//! A signature is `acc^d mod n`; verification recomputes the checksum and
//! compares it with `signature^e mod n`.
//!
//! # Security
//!
//! The checksum is **not** a cryptographic hash. It ignores byte order, so any
//! permutation of the input verifies against the same signature, and forging
//! an input for a given checksum takes a single appended byte sequence. No
//! padding scheme is applied either. Treat these signatures as integrity
//! checks against accidental change only.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use log::debug;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::algorithms::rsa::{rsa_sign_raw, rsa_verify_raw};
use crate::errors::{Error, KeyField, Result};
use crate::key::{KeyMaterial, PublicKey};
use crate::traits::PublicKeyParts;

/// Default initial value of the checksum accumulator.
pub const DIGEST_SEED: u64 = 100;

/// Outcome of [`verify`].
///
/// A mismatch is an ordinary result, reported through `is_valid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Whether the recovered and recomputed checksums agree.
    pub is_valid: bool,
    /// `signature^e mod n`.
    pub recovered: BigUint,
    /// Checksum of the input under the verifier's modulus.
    pub recomputed: BigUint,
}

/// Checksum of every byte `reader` yields, modulo `modulus`, seeded with
/// [`DIGEST_SEED`].
pub fn digest<R: Read>(reader: R, modulus: &BigUint) -> Result<BigUint> {
    digest_with_seed(reader, modulus, DIGEST_SEED)
}

/// Checksum of every byte `reader` yields, modulo `modulus`, starting from
/// `seed`.
///
/// Fails with [`Error::InvalidKey`] for a zero modulus and with
/// [`Error::FileAccess`] if reading fails.
pub fn digest_with_seed<R: Read>(reader: R, modulus: &BigUint, seed: u64) -> Result<BigUint> {
    if modulus.is_zero() {
        return Err(Error::invalid_key(KeyField::N, "modulus must be non-zero"));
    }

    let mut reader = BufReader::new(reader);
    let mut acc = BigUint::from(seed) % modulus;
    let mut buf = [0u8; 8192];
    let mut total = 0usize;

    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        total += read;

        for &byte in &buf[..read] {
            acc += u32::from(byte);
            if &acc >= modulus {
                acc %= modulus;
            }
        }
    }

    debug!("checksummed {} bytes", total);
    Ok(acc)
}

/// Signs the bytes of `reader` with the private exponent of `keys`.
///
/// Fails with [`Error::InvalidKey`] before reading anything if `keys` is not a
/// complete, valid key set.
pub fn sign<R: Read>(reader: R, keys: &KeyMaterial) -> Result<BigUint> {
    sign_with_seed(reader, keys, DIGEST_SEED)
}

/// [`sign`] with an explicit checksum seed.
pub fn sign_with_seed<R: Read>(reader: R, keys: &KeyMaterial, seed: u64) -> Result<BigUint> {
    let keys = keys.validated()?;
    let checksum = digest_with_seed(reader, keys.n(), seed)?;
    Ok(rsa_sign_raw(&keys, &checksum))
}

/// Signs the contents of the file at `path`.
///
/// The key set is validated before the file is opened.
pub fn sign_file<P: AsRef<Path>>(path: P, keys: &KeyMaterial) -> Result<BigUint> {
    sign_file_with_seed(path, keys, DIGEST_SEED)
}

/// [`sign_file`] with an explicit checksum seed.
pub fn sign_file_with_seed<P: AsRef<Path>>(
    path: P,
    keys: &KeyMaterial,
    seed: u64,
) -> Result<BigUint> {
    keys.validated()?;
    let file = File::open(path)?;
    sign_with_seed(file, keys, seed)
}

/// Verifies `signature` over the bytes of `reader` with `public_key`.
///
/// Only `{e, n}` is needed, so a third party holding nothing but the public
/// key can verify. Errors are reserved for I/O failures.
pub fn verify<R: Read>(
    reader: R,
    signature: &BigUint,
    public_key: &PublicKey,
) -> Result<Verification> {
    verify_with_seed(reader, signature, public_key, DIGEST_SEED)
}

/// [`verify`] with an explicit checksum seed.
pub fn verify_with_seed<R: Read>(
    reader: R,
    signature: &BigUint,
    public_key: &PublicKey,
    seed: u64,
) -> Result<Verification> {
    let recovered = rsa_verify_raw(public_key, signature);
    let recomputed = digest_with_seed(reader, public_key.n(), seed)?;

    Ok(Verification {
        is_valid: recovered == recomputed,
        recovered,
        recomputed,
    })
}

/// Verifies `signature` over the contents of the file at `path`.
pub fn verify_file<P: AsRef<Path>>(
    path: P,
    signature: &BigUint,
    public_key: &PublicKey,
) -> Result<Verification> {
    verify_file_with_seed(path, signature, public_key, DIGEST_SEED)
}

/// [`verify_file`] with an explicit checksum seed.
pub fn verify_file_with_seed<P: AsRef<Path>>(
    path: P,
    signature: &BigUint,
    public_key: &PublicKey,
    seed: u64,
) -> Result<Verification> {
    let file = File::open(path)?;
    verify_with_seed(file, signature, public_key, seed)
}
