//! Greatest common divisors, modular inverses and primitive roots.

use num_bigint::Sign::Plus;
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;

use crate::errors::{Error, KeyField, Result};
use crate::prime::{is_prime_with_rng, SMALL_PRIMES};

/// Greatest common divisor of `a` and `b` by Euclid's algorithm.
///
/// `gcd(a, 0) == a`, so `gcd(0, 0) == 0`.
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    let mut a = a.clone();
    let mut b = b.clone();
    while !b.is_zero() {
        let r = &a % &b;
        a = core::mem::replace(&mut b, r);
    }
    a
}

/// Extended Euclidean algorithm.
///
/// Returns `(g, x, y)` such that `a*x + b*y == g == gcd(a, b)`. With `a == 0`
/// the result is `(b, 0, 1)`. Each step replaces `(a, b)` with `(b mod a, a)`
/// and carries the Bézout coefficients of both values along, so the loop
/// unwinds the same recursion without growing the stack.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    // a == xa*A + ya*B, b == xb*A + yb*B
    let (mut a, mut xa, mut ya) = (a.clone(), BigInt::one(), BigInt::zero());
    let (mut b, mut xb, mut yb) = (b.clone(), BigInt::zero(), BigInt::one());

    while !a.is_zero() {
        let (quotient, rem) = b.div_mod_floor(&a);

        let nx = &xb - &quotient * &xa;
        let ny = &yb - &quotient * &ya;

        b = core::mem::replace(&mut a, rem);
        xb = core::mem::replace(&mut xa, nx);
        yb = core::mem::replace(&mut ya, ny);
    }

    (b, xb, yb)
}

/// Modular multiplicative inverse of `a` modulo `m`, reduced into `[0, m)`.
///
/// Returns `None` if `gcd(a, m) != 1` or `m` is zero.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }

    let a_int = BigInt::from_biguint(Plus, a.clone());
    let m_int = BigInt::from_biguint(Plus, m.clone());
    let (g, x, _) = extended_gcd(&a_int, &m_int);

    if !g.is_one() {
        return None;
    }

    x.mod_floor(&m_int).to_biguint()
}

/// Returns a uniformly chosen primitive root modulo the prime `p`.
///
/// A candidate `g` generates `(Z/pZ)*` iff `g^((p-1)/f) != 1 (mod p)` for
/// every prime factor `f` of `p - 1`. The factors are found by trial division
/// with the small prime table, then Pollard's rho on whatever cofactor is
/// left. Rho splits off prime factors up to about 32 bits within a few
/// thousand steps, so every prime of up to 64 bits gets a root. If a
/// composite cofactor resists [`RHO_RETRIES`] runs of [`RHO_MAX_STEPS`]
/// steps each, [`Error::Unfactorable`] is returned; in practice that needs
/// `p - 1` to have at least two prime factors above roughly 40 bits.
pub fn primitive_root<R: CryptoRngCore + ?Sized>(rng: &mut R, p: &BigUint) -> Result<BigUint> {
    if !is_prime_with_rng(rng, p) {
        return Err(Error::invalid_key(KeyField::P, "primitive roots need a prime modulus"));
    }

    let two = BigUint::from(2u32);
    if p == &two {
        return Ok(BigUint::one());
    }

    let order = p - 1u32;
    let factors = prime_factors(rng, &order)?;

    loop {
        // uniform in [2, p-1]
        let g = rng.gen_biguint_range(&two, p);
        let generates = factors
            .iter()
            .all(|f| !g.modpow(&(&order / f), p).is_one());
        if generates {
            return Ok(g);
        }
    }
}

/// Steps of one Pollard rho run before it is restarted with a new constant.
pub const RHO_MAX_STEPS: usize = 1 << 20;

/// Pollard rho runs attempted on one composite before giving up.
pub const RHO_RETRIES: usize = 8;

/// Distinct prime factors of `n`, smallest first.
fn prime_factors<R: CryptoRngCore + ?Sized>(rng: &mut R, n: &BigUint) -> Result<Vec<BigUint>> {
    let mut rest = n.clone();
    let mut factors = Vec::new();

    for &prime in SMALL_PRIMES.iter() {
        if rest.is_one() {
            break;
        }
        let prime = BigUint::from(prime);
        if (&rest % &prime).is_zero() {
            while (&rest % &prime).is_zero() {
                rest /= &prime;
            }
            factors.push(prime);
        }
    }

    let mut pending = vec![rest];
    while let Some(m) = pending.pop() {
        if m.is_one() {
            continue;
        }
        if is_prime_with_rng(rng, &m) {
            factors.push(m);
            continue;
        }
        let divisor = pollard_rho(rng, &m)?;
        pending.push(&m / &divisor);
        pending.push(divisor);
    }

    factors.sort();
    factors.dedup();
    Ok(factors)
}

/// A non-trivial divisor of the composite `n`, which has no factor below
/// 1000.
fn pollard_rho<R: CryptoRngCore + ?Sized>(rng: &mut R, n: &BigUint) -> Result<BigUint> {
    let one = BigUint::one();
    let two = BigUint::from(2u32);

    for _ in 0..RHO_RETRIES {
        let c = rng.gen_biguint_range(&one, n);
        let step = |v: &BigUint| (v * v + &c) % n;

        let mut x = rng.gen_biguint_range(&two, n);
        let mut y = x.clone();
        for _ in 0..RHO_MAX_STEPS {
            x = step(&x);
            y = step(&step(&y));

            let diff = if x > y { &x - &y } else { &y - &x };
            let d = gcd(&diff, n);
            if d.is_one() {
                continue;
            }
            if &d == n {
                // cycle closed without a split, try another constant
                break;
            }
            return Ok(d);
        }
    }

    Err(Error::Unfactorable)
}
