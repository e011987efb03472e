//! ⚠️ Low-level "hazmat" RSA functions.
//!
//! # ☢️️ WARNING: HAZARDOUS API ☢️
//!
//! This module holds the raw modular exponentiations behind
//! [`sign`](crate::sign) and [`verify`](crate::verify), applied to integers
//! without the checksum step or any key validation. Raw RSA without a padding
//! scheme is malleable, so there are very few valid use cases for this API.

pub use crate::algorithms::rsa::{rsa_sign_raw, rsa_verify_raw};
