//! Traits related to the key components

use num_bigint::BigUint;

/// Components of an RSA public key.
pub trait PublicKeyParts {
    /// Returns the modulus of the key.
    fn n(&self) -> &BigUint;

    /// Returns the public exponent of the key.
    fn e(&self) -> &BigUint;

    /// Returns the modulus size in bytes. Digests and signatures for or by
    /// this key are always smaller than the modulus.
    fn size(&self) -> usize {
        (self.n().bits() + 7) / 8
    }
}

/// Components of an RSA private key.
pub trait PrivateKeyParts: PublicKeyParts {
    /// Returns the private exponent of the key.
    fn d(&self) -> &BigUint;

    /// Returns the first prime factor.
    fn p(&self) -> &BigUint;

    /// Returns the second prime factor.
    fn q(&self) -> &BigUint;

    /// Returns the Euler totient `(p - 1) * (q - 1)`.
    fn phi(&self) -> &BigUint;
}
