#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Usage
//!
//! ## Generating a key and signing a file
//!
//! ```
//! use checksig::{KeyConfig, KeyManager};
//!
//! # fn main() -> checksig::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("report.txt");
//! std::fs::write(&path, b"quarterly numbers")?;
//!
//! let config = KeyConfig::default().with_bit_size(256);
//! let manager = KeyManager::generate(config, rand::thread_rng())?;
//!
//! let signature = manager.sign_file(&path)?;
//! let public_key = manager.public_key()?;
//!
//! let outcome = checksig::verify_file(&path, &signature, &public_key)?;
//! assert!(outcome.is_valid);
//! # Ok(())
//! # }
//! ```
//!
//! ## Filling in a key set by hand
//!
//! Fields may be typed in as decimal strings and completed in any order.
//! `n` and `phi` are always derived from `p` and `q`.
//!
//! ```
//! use checksig::{KeyField, KeyManager};
//!
//! # fn main() -> checksig::Result<()> {
//! let mut manager = KeyManager::new();
//! manager.set_field_str(KeyField::P, "61")?;
//! manager.set_field_str(KeyField::Q, "53")?;
//! manager.set_field_str(KeyField::E, "17")?;
//!
//! let e = manager.keys().e().cloned();
//! let pair = manager.generate_keys(None, e, None)?;
//! assert_eq!(pair.d.to_string(), "2753");
//! assert!(manager.check_keys());
//! # Ok(())
//! # }
//! ```
//!
//! ## Verifying with a received public key
//!
//! ```
//! use checksig::{BigUint, PublicKey};
//!
//! # fn main() -> checksig::Result<()> {
//! let public_key = PublicKey::from_decimal("3233", "17")?;
//! let signature = BigUint::from(1570u32);
//! let outcome = checksig::verify(&b"abc"[..], &signature, &public_key)?;
//! println!("valid: {}", outcome.is_valid);
//! # Ok(())
//! # }
//! ```

pub use num_bigint::BigUint;
pub use rand_core;

mod algorithms;
pub mod config;
pub mod errors;
mod key;
mod manager;
pub mod math;
pub mod prime;
mod prime_rand;
pub mod signature;
pub mod traits;

#[cfg(feature = "hazmat")]
pub mod hazmat;

pub use crate::{
    algorithms::generate::{generate_exponents, ExponentPair},
    config::KeyConfig,
    errors::{Error, KeyField, Result},
    key::{validate_exponent, KeyMaterial, PublicKey, ValidKeys},
    manager::KeyManager,
    math::{extended_gcd, gcd, mod_inverse, primitive_root},
    prime::{is_prime, miller_rabin, sieve_primes},
    prime_rand::{generate_large_prime, PrimeSearch, RandPrime},
    signature::{digest, sign, sign_file, verify, verify_file, Verification, DIGEST_SEED},
    traits::{PrivateKeyParts, PublicKeyParts},
};
