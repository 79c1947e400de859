use crate::encoding::ByteTree;
use crate::Element;
use crate::Error;
use crate::Set;
use num_bigint::BigUint;
use rand::{CryptoRng, Rng};

/// One point on the sharing polynomial: the pair (index, evaluation).
///
/// Created by [`ShamirSecretSharing::share`]; any subset of at least the
/// threshold many consistent shares recovers the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    x: Element,
    y: Element,
}

impl Share {
    pub fn new(x: Element, y: Element) -> Self {
        Share { x, y }
    }

    /// The evaluation point (1-based share index as a field element).
    pub fn index(&self) -> &Element {
        &self.x
    }

    /// The polynomial evaluation at the index.
    pub fn value(&self) -> &Element {
        &self.y
    }

    /// Canonical encoding, for transcripts and audit logs.
    pub fn byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![self.x.byte_tree(), self.y.byte_tree()])
    }

    /// Decode a share of the given field.
    pub fn from_byte_tree(field: &Set, tree: &ByteTree) -> Result<Self, Error> {
        let children = tree
            .as_node()
            .ok_or(Error::MalformedByteTree("expected a node"))?;
        if children.len() != 2 {
            return Err(Error::MalformedByteTree("expected two children"));
        }
        Ok(Share {
            x: field.element_from_byte_tree(&children[0])?,
            y: field.element_from_byte_tree(&children[1])?,
        })
    }
}

/// Shamir threshold secret sharing over a prime field.
///
/// Splits a secret into `n` shares such that any `t` of them reconstruct
/// it exactly and any `t - 1` reveal nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShamirSecretSharing {
    field: Set,
    share_space: Set,
    n: usize,
    t: usize,
}

impl ShamirSecretSharing {
    /// Build an (n, t) scheme over `field`.
    ///
    /// Share indices 1..n must be distinct nonzero field elements, so the
    /// field must have more than `n` elements.
    pub fn new(field: Set, n: usize, t: usize) -> Result<Self, Error> {
        if !field.is_prime_field() {
            return Err(Error::SetMismatch("secret sharing requires a prime field"));
        }
        if n < 1 {
            return Err(Error::InvalidThreshold("n must be at least 1"));
        }
        if t < 1 {
            return Err(Error::InvalidThreshold("t must be at least 1"));
        }
        if t > n {
            return Err(Error::InvalidThreshold("t cannot exceed n"));
        }
        if BigUint::from(n) >= *field.modulus()? {
            return Err(Error::InvalidThreshold("n must be smaller than the field order"));
        }
        let share_space = field.power(2)?;
        Ok(ShamirSecretSharing {
            field,
            share_space,
            n,
            t,
        })
    }

    pub fn field(&self) -> &Set {
        &self.field
    }

    /// The (field x field) product set shares live in.
    pub fn share_space(&self) -> &Set {
        &self.share_space
    }

    pub fn share_count(&self) -> usize {
        self.n
    }

    pub fn threshold(&self) -> usize {
        self.t
    }

    /// Split `secret` into `n` shares.
    ///
    /// Builds a degree-(t-1) polynomial with constant term `secret` and
    /// uniformly random higher coefficients, and evaluates it at
    /// x = 1, 2, ..., n.
    pub fn share<R: Rng + CryptoRng>(
        &self,
        secret: &Element,
        rng: &mut R,
    ) -> Result<Vec<Share>, Error> {
        if !self.field.contains(secret) {
            return Err(Error::NotAMember("secret"));
        }
        let mut coefficients = Vec::with_capacity(self.t);
        coefficients.push(secret.clone());
        for _ in 1..self.t {
            coefficients.push(self.field.random_element(rng)?);
        }

        let mut shares = Vec::with_capacity(self.n);
        for i in 1..=self.n {
            let x = self.field.element(BigUint::from(i))?;
            let y = self.evaluate(&coefficients, &x)?;
            shares.push(Share::new(x, y));
        }
        Ok(shares)
    }

    /// Horner evaluation of the polynomial with the given ascending
    /// coefficients.
    fn evaluate(&self, coefficients: &[Element], x: &Element) -> Result<Element, Error> {
        let mut y = coefficients
            .last()
            .ok_or(Error::Internal("empty coefficient list"))?
            .clone();
        for coefficient in coefficients.iter().rev().skip(1) {
            y = self.field.field_mul(&y, x)?;
            y = self.field.apply(&y, coefficient)?;
        }
        Ok(y)
    }

    /// Recover the secret by Lagrange interpolation at x = 0 over exactly
    /// the supplied shares.
    ///
    /// At least `t` and at most `n` shares must be supplied, every
    /// coordinate must belong to the field, and share indices must be
    /// distinct.
    pub fn recover(&self, shares: &[Share]) -> Result<Element, Error> {
        if shares.len() < self.t {
            return Err(Error::NotEnoughShares {
                needed: self.t,
                got: shares.len(),
            });
        }
        if shares.len() > self.n {
            return Err(Error::TooManyShares {
                max: self.n,
                got: shares.len(),
            });
        }
        for share in shares {
            if !self.field.contains(share.index()) || !self.field.contains(share.value()) {
                return Err(Error::NotAMember("share"));
            }
        }
        for (i, share) in shares.iter().enumerate() {
            if shares[..i].iter().any(|s| s.index() == share.index()) {
                return Err(Error::DuplicateShareIndex);
            }
        }

        let mut secret = self.field.identity()?;
        for (j, share) in shares.iter().enumerate() {
            // L_j = prod_{l != j} x_l / (x_l - x_j)
            let mut numerator = None;
            let mut denominator = None;
            for (l, other) in shares.iter().enumerate() {
                if l == j {
                    continue;
                }
                let difference = self
                    .field
                    .apply(other.index(), &self.field.invert(share.index())?)?;
                numerator = Some(match numerator {
                    None => other.index().clone(),
                    Some(acc) => self.field.field_mul(&acc, other.index())?,
                });
                denominator = Some(match denominator {
                    None => difference,
                    Some(acc) => self.field.field_mul(&acc, &difference)?,
                });
            }
            let coefficient = match (numerator, denominator) {
                (Some(num), Some(den)) => self.field.field_div(&num, &den)?,
                // t = 1: the polynomial is the constant secret.
                _ => self.field.element(1u32)?,
            };
            let term = self.field.field_mul(share.value(), &coefficient)?;
            secret = self.field.apply(&secret, &term)?;
        }
        Ok(secret)
    }
}
