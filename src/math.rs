//! Modular arithmetic helpers shared by the set implementations.

use crate::Error;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};

/// Deterministic Miller-Rabin over the first twelve prime bases.
///
/// Exact for every candidate below 3.3 * 10^24 and sound in practice far
/// beyond; keeps `Set::prime_field` deterministic, as the factory contract
/// requires.
pub(crate) fn is_prime(n: &BigUint) -> bool {
    const BASES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }
    for base in BASES.iter() {
        let base = BigUint::from(*base);
        if &base >= n {
            return true;
        }
        if (n % &base).is_zero() {
            return false;
        }
    }

    // n - 1 = d * 2^s with d odd
    let n_minus_one = n - 1u32;
    let mut d = n_minus_one.clone();
    let mut s = 0u32;
    while d.is_even() {
        d >>= 1;
        s += 1;
    }

    'witness: for base in BASES.iter() {
        let base = BigUint::from(*base);
        let mut x = base.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Distinct prime factors of `n`, by trial division.
///
/// Fine for parameter validation of the group orders this crate constructs;
/// not a general-purpose factoring routine.
pub(crate) fn prime_factors(n: &BigUint) -> Vec<BigUint> {
    let mut factors = Vec::new();
    let mut n = n.clone();
    let mut d = BigUint::from(2u32);
    while &d * &d <= n {
        if (&n % &d).is_zero() {
            factors.push(d.clone());
            while (&n % &d).is_zero() {
                n /= &d;
            }
        }
        d += 1u32;
    }
    if n > BigUint::one() {
        factors.push(n);
    }
    factors
}

/// Modular inverse of `a` modulo `m` via the extended Euclidean algorithm.
pub(crate) fn mod_inverse(a: &BigUint, m: &BigUint) -> Result<BigUint, Error> {
    if a.is_zero() {
        return Err(Error::DivisionByZero);
    }
    let a = BigInt::from(a.clone());
    let m_int = BigInt::from(m.clone());

    let (mut r0, mut r1) = (m_int.clone(), a);
    let (mut s0, mut s1) = (BigInt::zero(), BigInt::one());
    while !r1.is_zero() {
        let q = &r0 / &r1;
        let r2 = &r0 - &q * &r1;
        r0 = std::mem::replace(&mut r1, r2);
        let s2 = &s0 - &q * &s1;
        s0 = std::mem::replace(&mut s1, s2);
    }
    if !r0.is_one() {
        return Err(Error::DivisionByZero);
    }
    let inv = s0.mod_floor(&m_int);
    inv.to_biguint().ok_or(Error::Internal("negative residue after mod_floor"))
}

/// Reduce a signed multiplier/exponent into `[0, modulus)`.
pub(crate) fn reduce_signed(n: &BigInt, modulus: &BigUint) -> Result<BigUint, Error> {
    let m = BigInt::from(modulus.clone());
    n.mod_floor(&m)
        .to_biguint()
        .ok_or(Error::Internal("negative residue after mod_floor"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primality() {
        for p in [2u32, 3, 5, 29, 97, 7919, 1_000_003] {
            assert!(is_prime(&BigUint::from(p)), "{} should be prime", p);
        }
        for c in [0u32, 1, 4, 9, 91, 561, 1_000_001] {
            assert!(!is_prime(&BigUint::from(c)), "{} should be composite", c);
        }
    }

    #[test]
    fn factors() {
        let factors = prime_factors(&BigUint::from(360u32));
        let expected: Vec<BigUint> = [2u32, 3, 5].iter().map(|&f| BigUint::from(f)).collect();
        assert_eq!(factors, expected);

        assert_eq!(prime_factors(&BigUint::from(97u32)), vec![BigUint::from(97u32)]);
    }

    #[test]
    fn inverse() {
        let p = BigUint::from(29u32);
        for a in 1u32..29 {
            let a = BigUint::from(a);
            let inv = mod_inverse(&a, &p).unwrap();
            assert_eq!((a * inv) % &p, BigUint::one());
        }
        assert!(mod_inverse(&BigUint::zero(), &p).is_err());
    }

    #[test]
    fn signed_reduction() {
        let m = BigUint::from(10u32);
        assert_eq!(reduce_signed(&BigInt::from(-3), &m).unwrap(), BigUint::from(7u32));
        assert_eq!(reduce_signed(&BigInt::from(23), &m).unwrap(), BigUint::from(3u32));
    }
}
