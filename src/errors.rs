//! Error types.

use core::fmt;

/// Alias for [`core::result::Result`] with the `checksig` crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Names one of the six fields held by a [`KeyMaterial`](crate::KeyMaterial).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyField {
    /// First secret prime.
    P,
    /// Second secret prime.
    Q,
    /// Modulus, `p * q`.
    N,
    /// Euler totient, `(p - 1) * (q - 1)`.
    Phi,
    /// Public exponent.
    E,
    /// Private exponent.
    D,
}

impl KeyField {
    /// Returns `true` for the fields that hold one of the two secret primes.
    pub fn is_prime_field(self) -> bool {
        matches!(self, KeyField::P | KeyField::Q)
    }

    /// Returns `true` for the public and private exponent fields.
    pub fn is_exponent(self) -> bool {
        matches!(self, KeyField::E | KeyField::D)
    }
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyField::P => "p",
            KeyField::Q => "q",
            KeyField::N => "n",
            KeyField::Phi => "phi",
            KeyField::E => "e",
            KeyField::D => "d",
        };
        f.write_str(name)
    }
}

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A supplied key component was rejected, or the key set is incomplete.
    #[error("invalid key {field}: {reason}")]
    InvalidKey {
        /// Field that failed validation.
        field: KeyField,
        /// Why it failed.
        reason: &'static str,
    },

    /// An operation needs a key component that is neither set nor derivable.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(&'static str),

    /// The byte source could not be opened or read.
    #[error("file access error: {0}")]
    FileAccess(#[from] std::io::Error),

    /// A caller-supplied value could not be parsed as a decimal integer.
    #[error("malformed input for {field}: {input:?}")]
    MalformedInput {
        /// Field the input was meant for.
        field: KeyField,
        /// The rejected text.
        input: String,
    },

    /// Requested prime size is too small to hold a prime.
    #[error("invalid bit size {0}")]
    InvalidBitSize(usize),

    /// Prime search stopped by its cancellation flag.
    #[error("prime search cancelled")]
    Cancelled,

    /// Prime search hit its attempt cap.
    #[error("no prime found after {0} attempts")]
    AttemptsExhausted(usize),

    /// `p - 1` could not be fully factored, so no generator can be certified.
    #[error("cannot factor p - 1")]
    Unfactorable,
}

impl Error {
    pub(crate) fn invalid_key(field: KeyField, reason: &'static str) -> Self {
        Error::InvalidKey { field, reason }
    }
}
