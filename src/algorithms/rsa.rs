//! Raw RSA exponentiation

use num_bigint::BigUint;

use crate::traits::{PrivateKeyParts, PublicKeyParts};

/// ⚠️ Raw RSA signing primitive: `m^d mod n`. No padding is applied.
///
/// # ☢️️ WARNING: HAZARDOUS API ☢️
///
/// Use this function with great care! Raw RSA should never be used without an appropriate padding
/// or signature scheme. See the [module-level documentation][crate::hazmat] for more information.
#[inline]
pub fn rsa_sign_raw<K: PrivateKeyParts>(key: &K, m: &BigUint) -> BigUint {
    m.modpow(key.d(), key.n())
}

/// ⚠️ Raw RSA verification primitive: `s^e mod n`. No padding is checked.
///
/// # ☢️️ WARNING: HAZARDOUS API ☢️
///
/// Use this function with great care! Raw RSA should never be used without an appropriate padding
/// or signature scheme. See the [module-level documentation][crate::hazmat] for more information.
#[inline]
pub fn rsa_verify_raw<K: PublicKeyParts>(key: &K, s: &BigUint) -> BigUint {
    s.modpow(key.e(), key.n())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::PublicKey;

    struct Toy {
        public: PublicKey,
        d: BigUint,
        p: BigUint,
        q: BigUint,
        phi: BigUint,
    }

    impl PublicKeyParts for Toy {
        fn n(&self) -> &BigUint {
            self.public.n()
        }
        fn e(&self) -> &BigUint {
            self.public.e()
        }
    }

    impl PrivateKeyParts for Toy {
        fn d(&self) -> &BigUint {
            &self.d
        }
        fn p(&self) -> &BigUint {
            &self.p
        }
        fn q(&self) -> &BigUint {
            &self.q
        }
        fn phi(&self) -> &BigUint {
            &self.phi
        }
    }

    #[test]
    fn textbook_example() {
        // p = 61, q = 53, n = 3233, phi = 3120, e = 17, d = 2753
        let key = Toy {
            public: PublicKey::new(BigUint::from(3233u32), BigUint::from(17u32)).unwrap(),
            d: BigUint::from(2753u32),
            p: BigUint::from(61u32),
            q: BigUint::from(53u32),
            phi: BigUint::from(3120u32),
        };

        let m = BigUint::from(65u32);
        let s = rsa_sign_raw(&key, &m);
        assert_eq!(s, BigUint::from(588u32));
        assert_eq!(rsa_verify_raw(&key, &s), m);
        assert_eq!(key.size(), 2);
    }
}
