use crate::element::Value;
use crate::encoding::ByteTree;
use crate::math;
use crate::Element;
use crate::Error;
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand::{CryptoRng, Rng};
use rand_core::RngCore;
use std::fmt;
use std::sync::Arc;

/// Algebraic capability of a set, ordered from weakest to strongest.
///
/// Generic code gates stronger operations on this tag instead of probing
/// the concrete set kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Structure {
    /// Membership and equality only.
    Set,
    /// Closed associative binary operation.
    Semigroup,
    /// Semigroup with an identity element.
    Monoid,
    /// Monoid with inverses.
    Group,
    /// Group generated by a single element.
    CyclicGroup,
}

/// Number of elements in a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cardinality {
    Finite(BigUint),
    Infinite,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SetRepr {
    /// Additive cyclic group of integers modulo n.
    IntegersMod { modulus: BigUint },
    /// Z_p for prime p: additive group contract plus field extras.
    PrimeField { modulus: BigUint },
    /// Cyclic subgroup of Z_modulus* of the given order.
    MultiplicativeGroup {
        modulus: BigUint,
        order: BigUint,
        generator: BigUint,
    },
    /// Free monoid of finite strings over an alphabet, under concatenation.
    Strings { alphabet: Vec<char> },
    /// Symmetric group on `size` positions.
    Permutations { size: usize },
    /// Ordered product of component sets.
    Product { components: Vec<Set> },
}

/// A mathematical domain of values.
///
/// Sets are immutable, cheap to clone and safe to share across threads.
/// Two sets are equal iff they denote the same domain (same kind, same
/// parameters). Elements are produced only by their owning set: through
/// canonical constructors, random sampling or operation results.
#[derive(Clone)]
pub struct Set {
    repr: Arc<SetRepr>,
}

impl PartialEq for Set {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.repr, &other.repr) || self.repr == other.repr
    }
}

impl Eq for Set {}

impl fmt::Debug for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Set({})", self)
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.repr {
            SetRepr::IntegersMod { modulus } => write!(f, "Z_{}", modulus),
            SetRepr::PrimeField { modulus } => write!(f, "F_{}", modulus),
            SetRepr::MultiplicativeGroup { modulus, order, .. } => {
                write!(f, "G*_{}(order {})", modulus, order)
            }
            SetRepr::Strings { alphabet } => {
                write!(f, "Strings{{{}}}", alphabet.iter().collect::<String>())
            }
            SetRepr::Permutations { size } => write!(f, "S_{}", size),
            SetRepr::Product { components } => {
                write!(f, "(")?;
                for (i, c) in components.iter().enumerate() {
                    if i > 0 {
                        write!(f, " x ")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Set {
    fn from_repr(repr: SetRepr) -> Self {
        Set { repr: Arc::new(repr) }
    }

    // ------------------------------------------------------------------
    // Factories
    // ------------------------------------------------------------------

    /// The additive cyclic group Z_n, n >= 2.
    pub fn integers_mod(modulus: impl Into<BigUint>) -> Result<Self, Error> {
        let modulus = modulus.into();
        if modulus < BigUint::from(2u32) {
            return Err(Error::InvalidModulus);
        }
        Ok(Set::from_repr(SetRepr::IntegersMod { modulus }))
    }

    /// The prime field Z_p. Rejects composite moduli.
    pub fn prime_field(modulus: impl Into<BigUint>) -> Result<Self, Error> {
        let modulus = modulus.into();
        if !math::is_prime(&modulus) {
            return Err(Error::NotPrime(modulus));
        }
        Ok(Set::from_repr(SetRepr::PrimeField { modulus }))
    }

    /// The cyclic subgroup of Z_modulus* generated by `generator`, of the
    /// given order.
    pub fn multiplicative_group(
        modulus: impl Into<BigUint>,
        order: impl Into<BigUint>,
        generator: impl Into<BigUint>,
    ) -> Result<Self, Error> {
        let modulus = modulus.into();
        let order = order.into();
        let generator = generator.into();
        if modulus < BigUint::from(3u32) {
            return Err(Error::InvalidModulus);
        }
        if order.is_zero() {
            return Err(Error::InvalidGroupParameters("order must be positive"));
        }
        if generator.is_zero() || generator >= modulus {
            return Err(Error::InvalidGroupParameters(
                "generator must lie in [1, modulus)",
            ));
        }
        if !generator.gcd(&modulus).is_one() {
            return Err(Error::InvalidGroupParameters(
                "generator must be a unit modulo the modulus",
            ));
        }
        if !generator.modpow(&order, &modulus).is_one() {
            return Err(Error::InvalidGroupParameters(
                "generator order does not divide the declared order",
            ));
        }
        if order > BigUint::one() && generator.is_one() {
            return Err(Error::InvalidGroupParameters(
                "the identity cannot generate a non-trivial group",
            ));
        }
        Ok(Set::from_repr(SetRepr::MultiplicativeGroup {
            modulus,
            order,
            generator,
        }))
    }

    /// The full multiplicative group Z_p* for prime p, of order p - 1,
    /// with its smallest generator.
    pub fn multiplicative_group_mod_prime(modulus: impl Into<BigUint>) -> Result<Self, Error> {
        let modulus = modulus.into();
        if !math::is_prime(&modulus) {
            return Err(Error::NotPrime(modulus));
        }
        let order = &modulus - 1u32;
        let factors = math::prime_factors(&order);
        let mut candidate = BigUint::from(2u32);
        while candidate < modulus {
            let is_generator = factors
                .iter()
                .all(|f| !candidate.modpow(&(&order / f), &modulus).is_one());
            if is_generator {
                return Set::multiplicative_group(modulus.clone(), order.clone(), candidate);
            }
            candidate += 1u32;
        }
        Err(Error::InvalidGroupParameters("no generator found"))
    }

    /// The free monoid of finite strings over `alphabet`, under
    /// concatenation.
    pub fn strings(alphabet: &str) -> Result<Self, Error> {
        let alphabet: Vec<char> = alphabet.chars().collect();
        if alphabet.is_empty() {
            return Err(Error::InvalidAlphabet);
        }
        for (i, c) in alphabet.iter().enumerate() {
            if alphabet[..i].contains(c) {
                return Err(Error::InvalidAlphabet);
            }
        }
        Ok(Set::from_repr(SetRepr::Strings { alphabet }))
    }

    /// The symmetric group on `size` positions.
    pub fn permutations(size: usize) -> Result<Self, Error> {
        if size == 0 {
            return Err(Error::InvalidGroupParameters("size must be positive"));
        }
        Ok(Set::from_repr(SetRepr::Permutations { size }))
    }

    /// The ordered product of the given component sets.
    ///
    /// Nested products are not flattened: the factors given here are the
    /// slots of the resulting tuples.
    pub fn product(components: Vec<Set>) -> Result<Self, Error> {
        if components.is_empty() {
            return Err(Error::InvalidGroupParameters(
                "a product needs at least one component",
            ));
        }
        Ok(Set::from_repr(SetRepr::Product { components }))
    }

    /// This set's factor list repeated `k` times, as a product.
    ///
    /// A non-product set contributes itself as a single factor, so
    /// `Z.power(3)` has arity 3 and `(A x B).power(3)` has arity 6.
    pub fn power(&self, k: usize) -> Result<Self, Error> {
        if k == 0 {
            return Err(Error::InvalidGroupParameters(
                "a product needs at least one component",
            ));
        }
        let factors = self.factors();
        let mut components = Vec::with_capacity(factors.len() * k);
        for _ in 0..k {
            components.extend(factors.iter().cloned());
        }
        Set::product(components)
    }

    /// The product whose factors are this set's factors followed by
    /// `other`'s.
    pub fn concat(&self, other: &Set) -> Result<Self, Error> {
        let mut components = self.factors();
        components.extend(other.factors());
        Set::product(components)
    }

    fn factors(&self) -> Vec<Set> {
        match &*self.repr {
            SetRepr::Product { components } => components.clone(),
            _ => vec![self.clone()],
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// The algebraic capability of this set.
    pub fn structure(&self) -> Structure {
        match &*self.repr {
            SetRepr::IntegersMod { .. } | SetRepr::PrimeField { .. } => Structure::CyclicGroup,
            SetRepr::MultiplicativeGroup { .. } => Structure::CyclicGroup,
            SetRepr::Strings { .. } => Structure::Monoid,
            SetRepr::Permutations { size } => {
                if *size <= 2 {
                    Structure::CyclicGroup
                } else {
                    Structure::Group
                }
            }
            SetRepr::Product { components } => {
                let weakest = components
                    .iter()
                    .map(|c| c.structure())
                    .min()
                    .unwrap_or(Structure::Set);
                // A product of cyclic groups is not cyclic in general.
                weakest.min(Structure::Group)
            }
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match &*self.repr {
            SetRepr::IntegersMod { modulus } | SetRepr::PrimeField { modulus } => {
                Cardinality::Finite(modulus.clone())
            }
            SetRepr::MultiplicativeGroup { order, .. } => Cardinality::Finite(order.clone()),
            SetRepr::Strings { .. } => Cardinality::Infinite,
            SetRepr::Permutations { size } => {
                let mut n = BigUint::one();
                for i in 2..=*size {
                    n *= BigUint::from(i);
                }
                Cardinality::Finite(n)
            }
            SetRepr::Product { components } => {
                let mut n = BigUint::one();
                for c in components {
                    match c.cardinality() {
                        Cardinality::Finite(k) => n *= k,
                        Cardinality::Infinite => return Cardinality::Infinite,
                    }
                }
                Cardinality::Finite(n)
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self.cardinality(), Cardinality::Finite(_))
    }

    /// Membership test. Total and side-effect free: an element belongs to
    /// exactly the set that produced it, or to an equal set.
    pub fn contains(&self, element: &Element) -> bool {
        element.set() == self
    }

    /// Number of tuple slots: the component count for products, 1
    /// otherwise.
    pub fn arity(&self) -> usize {
        match &*self.repr {
            SetRepr::Product { components } => components.len(),
            _ => 1,
        }
    }

    /// The component sets of a product.
    pub fn components(&self) -> Option<&[Set]> {
        match &*self.repr {
            SetRepr::Product { components } => Some(components),
            _ => None,
        }
    }

    /// The component set at slot `index` of a product.
    pub fn component(&self, index: usize) -> Result<&Set, Error> {
        let components = self
            .components()
            .ok_or(Error::UnsupportedOperation("tuple indexing"))?;
        components.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            arity: components.len(),
        })
    }

    /// The modulus of an integer-residue set.
    pub fn modulus(&self) -> Result<&BigUint, Error> {
        match &*self.repr {
            SetRepr::IntegersMod { modulus }
            | SetRepr::PrimeField { modulus }
            | SetRepr::MultiplicativeGroup { modulus, .. } => Ok(modulus),
            _ => Err(Error::UnsupportedOperation("modulus")),
        }
    }

    pub(crate) fn is_prime_field(&self) -> bool {
        matches!(&*self.repr, SetRepr::PrimeField { .. })
    }

    /// An additive residue class Z_m (either kind of modulus).
    pub(crate) fn is_residue_class(&self) -> bool {
        matches!(
            &*self.repr,
            SetRepr::IntegersMod { .. } | SetRepr::PrimeField { .. }
        )
    }

    pub(crate) fn is_integer_kind(&self) -> bool {
        matches!(
            &*self.repr,
            SetRepr::IntegersMod { .. }
                | SetRepr::PrimeField { .. }
                | SetRepr::MultiplicativeGroup { .. }
        )
    }

    // ------------------------------------------------------------------
    // Element construction
    // ------------------------------------------------------------------

    pub(crate) fn make(&self, value: Value) -> Element {
        Element::raw(self.clone(), value)
    }

    /// The element canonically encoded by `value`, for integer-residue
    /// sets. The value must already be a member: residues are not reduced.
    pub fn element(&self, value: impl Into<BigUint>) -> Result<Element, Error> {
        let value = value.into();
        match &*self.repr {
            SetRepr::IntegersMod { modulus } | SetRepr::PrimeField { modulus } => {
                if value >= *modulus {
                    return Err(Error::ValueOutOfRange);
                }
                Ok(self.make(Value::Integer(value)))
            }
            SetRepr::MultiplicativeGroup { modulus, order, .. } => {
                if value.is_zero() || value >= *modulus {
                    return Err(Error::ValueOutOfRange);
                }
                if !value.modpow(order, modulus).is_one() {
                    return Err(Error::ValueOutOfRange);
                }
                Ok(self.make(Value::Integer(value)))
            }
            _ => Err(Error::UnsupportedOperation("integer element construction")),
        }
    }

    /// The element wrapping `s`, for string monoids.
    pub fn string_element(&self, s: &str) -> Result<Element, Error> {
        match &*self.repr {
            SetRepr::Strings { alphabet } => {
                if !s.chars().all(|c| alphabet.contains(&c)) {
                    return Err(Error::ValueOutOfRange);
                }
                Ok(self.make(Value::Str(s.to_string())))
            }
            _ => Err(Error::UnsupportedOperation("string element construction")),
        }
    }

    /// The permutation sending position `i` to `images[i]`.
    pub fn permutation_element(&self, images: Vec<usize>) -> Result<Element, Error> {
        match &*self.repr {
            SetRepr::Permutations { size } => {
                if images.len() != *size {
                    return Err(Error::InvalidPermutation(*size));
                }
                let mut seen = vec![false; *size];
                for &image in &images {
                    if image >= *size || seen[image] {
                        return Err(Error::InvalidPermutation(*size));
                    }
                    seen[image] = true;
                }
                Ok(self.make(Value::Permutation(images)))
            }
            _ => Err(Error::UnsupportedOperation(
                "permutation element construction",
            )),
        }
    }

    /// The tuple of the given components, for product sets. Arity and
    /// per-slot membership must match.
    pub fn tuple(&self, elements: Vec<Element>) -> Result<Element, Error> {
        match &*self.repr {
            SetRepr::Product { components } => {
                if elements.len() != components.len() {
                    return Err(Error::ArityMismatch {
                        expected: components.len(),
                        got: elements.len(),
                    });
                }
                for (component, element) in components.iter().zip(&elements) {
                    if !component.contains(element) {
                        return Err(Error::NotAMember("tuple slot"));
                    }
                }
                Ok(self.make(Value::Tuple(elements)))
            }
            _ => Err(Error::UnsupportedOperation("tuple construction")),
        }
    }

    // ------------------------------------------------------------------
    // Operation contracts
    // ------------------------------------------------------------------

    /// The binary operation applied to `a` and `b`.
    pub fn apply(&self, a: &Element, b: &Element) -> Result<Element, Error> {
        if !self.contains(a) {
            return Err(Error::NotAMember("left operand"));
        }
        if !self.contains(b) {
            return Err(Error::NotAMember("right operand"));
        }
        match &*self.repr {
            SetRepr::IntegersMod { modulus } | SetRepr::PrimeField { modulus } => {
                let sum = (a.integer()? + b.integer()?) % modulus;
                Ok(self.make(Value::Integer(sum)))
            }
            SetRepr::MultiplicativeGroup { modulus, .. } => {
                let product = (a.integer()? * b.integer()?) % modulus;
                Ok(self.make(Value::Integer(product)))
            }
            SetRepr::Strings { .. } => {
                let mut s = a.str_value()?.to_string();
                s.push_str(b.str_value()?);
                Ok(self.make(Value::Str(s)))
            }
            SetRepr::Permutations { .. } => {
                // (a . b)(i) = a(b(i))
                let a = a.permutation()?;
                let b = b.permutation()?;
                let composed: Vec<usize> = b.iter().map(|&i| a[i]).collect();
                Ok(self.make(Value::Permutation(composed)))
            }
            SetRepr::Product { components } => {
                let mut slots = Vec::with_capacity(components.len());
                for (i, component) in components.iter().enumerate() {
                    slots.push(component.apply(a.get(i)?, b.get(i)?)?);
                }
                Ok(self.make(Value::Tuple(slots)))
            }
        }
    }

    /// The operation applied to `a` with itself `n` times, by repeated
    /// squaring. `n = 0` yields the identity; negative `n` inverts and is
    /// defined for groups only.
    pub fn self_apply(&self, a: &Element, n: &BigInt) -> Result<Element, Error> {
        if !self.contains(a) {
            return Err(Error::NotAMember("operand"));
        }
        if n.is_zero() && self.structure() < Structure::Monoid {
            return Err(Error::UnsupportedOperation("identity element"));
        }
        if n.sign() == num_bigint::Sign::Minus && self.structure() < Structure::Group {
            return Err(Error::UnsupportedOperation("inversion"));
        }
        match &*self.repr {
            SetRepr::IntegersMod { modulus } | SetRepr::PrimeField { modulus } => {
                let k = math::reduce_signed(n, modulus)?;
                Ok(self.make(Value::Integer((a.integer()? * k) % modulus)))
            }
            SetRepr::MultiplicativeGroup { modulus, order, .. } => {
                let k = math::reduce_signed(n, order)?;
                Ok(self.make(Value::Integer(a.integer()?.modpow(&k, modulus))))
            }
            SetRepr::Strings { .. } => {
                let k = n
                    .to_usize()
                    .ok_or(Error::ValueOutOfRange)?;
                Ok(self.make(Value::Str(a.str_value()?.repeat(k))))
            }
            SetRepr::Permutations { .. } => {
                // Square-and-multiply over composition; the exponent is
                // signed, so invert the base first when negative.
                let base = if n.sign() == num_bigint::Sign::Minus {
                    self.invert(a)?
                } else {
                    a.clone()
                };
                let mut result = self.identity()?;
                let mut square = base;
                let mut k = n.magnitude().clone();
                while !k.is_zero() {
                    if k.is_odd() {
                        result = self.apply(&result, &square)?;
                    }
                    square = self.apply(&square, &square)?;
                    k >>= 1;
                }
                Ok(result)
            }
            SetRepr::Product { components } => {
                let mut slots = Vec::with_capacity(components.len());
                for (i, component) in components.iter().enumerate() {
                    slots.push(component.self_apply(a.get(i)?, n)?);
                }
                Ok(self.make(Value::Tuple(slots)))
            }
        }
    }

    /// The identity element. Defined for monoids and stronger.
    pub fn identity(&self) -> Result<Element, Error> {
        if self.structure() < Structure::Monoid {
            return Err(Error::UnsupportedOperation("identity element"));
        }
        match &*self.repr {
            SetRepr::IntegersMod { .. } | SetRepr::PrimeField { .. } => {
                Ok(self.make(Value::Integer(BigUint::zero())))
            }
            SetRepr::MultiplicativeGroup { .. } => Ok(self.make(Value::Integer(BigUint::one()))),
            SetRepr::Strings { .. } => Ok(self.make(Value::Str(String::new()))),
            SetRepr::Permutations { size } => {
                Ok(self.make(Value::Permutation((0..*size).collect())))
            }
            SetRepr::Product { components } => {
                let slots = components
                    .iter()
                    .map(|c| c.identity())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.make(Value::Tuple(slots)))
            }
        }
    }

    /// Whether `a` is the identity element.
    pub fn is_identity(&self, a: &Element) -> Result<bool, Error> {
        if !self.contains(a) {
            return Err(Error::NotAMember("operand"));
        }
        Ok(*a == self.identity()?)
    }

    /// The inverse of `a`. Defined for groups only.
    pub fn invert(&self, a: &Element) -> Result<Element, Error> {
        if self.structure() < Structure::Group {
            return Err(Error::UnsupportedOperation("inversion"));
        }
        if !self.contains(a) {
            return Err(Error::NotAMember("operand"));
        }
        match &*self.repr {
            SetRepr::IntegersMod { modulus } | SetRepr::PrimeField { modulus } => {
                let value = a.integer()?;
                let negated = if value.is_zero() {
                    BigUint::zero()
                } else {
                    modulus - value
                };
                Ok(self.make(Value::Integer(negated)))
            }
            SetRepr::MultiplicativeGroup { modulus, .. } => {
                let inv = math::mod_inverse(a.integer()?, modulus)?;
                Ok(self.make(Value::Integer(inv)))
            }
            SetRepr::Strings { .. } => Err(Error::UnsupportedOperation("inversion")),
            SetRepr::Permutations { size } => {
                let images = a.permutation()?;
                let mut inverse = vec![0usize; *size];
                for (i, &image) in images.iter().enumerate() {
                    inverse[image] = i;
                }
                Ok(self.make(Value::Permutation(inverse)))
            }
            SetRepr::Product { components } => {
                let mut slots = Vec::with_capacity(components.len());
                for (i, component) in components.iter().enumerate() {
                    slots.push(component.invert(a.get(i)?)?);
                }
                Ok(self.make(Value::Tuple(slots)))
            }
        }
    }

    /// A uniformly random element, drawn from the supplied source.
    pub fn random_element<R: Rng + CryptoRng>(&self, rng: &mut R) -> Result<Element, Error> {
        self.random_element_dyn(rng)
    }

    pub(crate) fn random_element_dyn(&self, rng: &mut dyn RngCore) -> Result<Element, Error> {
        match &*self.repr {
            SetRepr::IntegersMod { modulus } | SetRepr::PrimeField { modulus } => {
                let value = (&mut *rng).gen_biguint_below(modulus);
                Ok(self.make(Value::Integer(value)))
            }
            SetRepr::MultiplicativeGroup {
                modulus,
                order,
                generator,
            } => {
                // Uniform by cyclicity: g^k for uniform k below the order.
                let k = (&mut *rng).gen_biguint_below(order);
                Ok(self.make(Value::Integer(generator.modpow(&k, modulus))))
            }
            SetRepr::Strings { .. } => Err(Error::InfiniteSet),
            SetRepr::Permutations { size } => {
                // Fisher-Yates
                let mut images: Vec<usize> = (0..*size).collect();
                for i in (1..*size).rev() {
                    let j = (&mut *rng).gen_range(0..=i);
                    images.swap(i, j);
                }
                Ok(self.make(Value::Permutation(images)))
            }
            SetRepr::Product { components } => {
                let slots = components
                    .iter()
                    .map(|c| c.random_element_dyn(rng))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.make(Value::Tuple(slots)))
            }
        }
    }

    // ------------------------------------------------------------------
    // Capability views
    // ------------------------------------------------------------------

    /// A group-typed view of this set, or an unsupported-operation error
    /// if the set is not a group.
    pub fn as_group(&self) -> Result<GroupView<'_>, Error> {
        if self.structure() < Structure::Group {
            return Err(Error::UnsupportedOperation("group operations"));
        }
        Ok(GroupView { set: self })
    }

    /// A cyclic-group-typed view of this set.
    pub fn as_cyclic_group(&self) -> Result<CyclicGroupView<'_>, Error> {
        if self.structure() < Structure::CyclicGroup {
            return Err(Error::UnsupportedOperation("cyclic group operations"));
        }
        Ok(CyclicGroupView { set: self })
    }

    /// The canonical generator of a cyclic group.
    pub fn generator(&self) -> Result<Element, Error> {
        if self.structure() < Structure::CyclicGroup {
            return Err(Error::UnsupportedOperation("generator"));
        }
        match &*self.repr {
            SetRepr::IntegersMod { .. } | SetRepr::PrimeField { .. } => {
                Ok(self.make(Value::Integer(BigUint::one())))
            }
            SetRepr::MultiplicativeGroup { generator, .. } => {
                Ok(self.make(Value::Integer(generator.clone())))
            }
            SetRepr::Permutations { size } => {
                // S_1 and S_2 only; the single transposition generates S_2.
                let images = if *size == 1 { vec![0] } else { vec![1, 0] };
                Ok(self.make(Value::Permutation(images)))
            }
            _ => Err(Error::UnsupportedOperation("generator")),
        }
    }

    /// Whether `a` generates this cyclic group.
    pub fn is_generator(&self, a: &Element) -> Result<bool, Error> {
        if self.structure() < Structure::CyclicGroup {
            return Err(Error::UnsupportedOperation("generator test"));
        }
        if !self.contains(a) {
            return Err(Error::NotAMember("operand"));
        }
        match &*self.repr {
            SetRepr::IntegersMod { modulus } | SetRepr::PrimeField { modulus } => {
                Ok(a.integer()?.gcd(modulus).is_one())
            }
            SetRepr::MultiplicativeGroup { modulus, order, .. } => {
                if order.is_one() {
                    return Ok(true);
                }
                if a.integer()?.is_one() {
                    return Ok(false);
                }
                if math::is_prime(order) {
                    // Every non-identity element of a prime-order group
                    // generates it.
                    return Ok(true);
                }
                let value = a.integer()?;
                Ok(math::prime_factors(order)
                    .iter()
                    .all(|f| !value.modpow(&(order / f), modulus).is_one()))
            }
            SetRepr::Permutations { size } => {
                if *size == 1 {
                    return Ok(true);
                }
                Ok(!self.is_identity(a)?)
            }
            _ => Err(Error::UnsupportedOperation("generator test")),
        }
    }

    // ------------------------------------------------------------------
    // Field extras (prime fields only)
    // ------------------------------------------------------------------

    /// Field multiplication in Z_p.
    pub fn field_mul(&self, a: &Element, b: &Element) -> Result<Element, Error> {
        let modulus = self.require_prime_field()?;
        if !self.contains(a) {
            return Err(Error::NotAMember("left operand"));
        }
        if !self.contains(b) {
            return Err(Error::NotAMember("right operand"));
        }
        let product = (a.integer()? * b.integer()?) % modulus;
        Ok(self.make(Value::Integer(product)))
    }

    /// Multiplicative inverse in Z_p. Fails on zero.
    pub fn field_invert(&self, a: &Element) -> Result<Element, Error> {
        let modulus = self.require_prime_field()?;
        if !self.contains(a) {
            return Err(Error::NotAMember("operand"));
        }
        let inv = math::mod_inverse(a.integer()?, modulus)?;
        Ok(self.make(Value::Integer(inv)))
    }

    /// Field division in Z_p. Fails on a zero divisor.
    pub fn field_div(&self, a: &Element, b: &Element) -> Result<Element, Error> {
        let inv = self.field_invert(b)?;
        self.field_mul(a, &inv)
    }

    fn require_prime_field(&self) -> Result<&BigUint, Error> {
        match &*self.repr {
            SetRepr::PrimeField { modulus } => Ok(modulus),
            _ => Err(Error::UnsupportedOperation("field arithmetic")),
        }
    }

    /// Map an arbitrary non-negative integer into this finite integer
    /// set: residues by reduction, multiplicative groups through their
    /// generator. Uniform input gives (statistically) uniform output.
    pub(crate) fn element_from_uniform_integer(&self, value: &BigUint) -> Result<Element, Error> {
        match &*self.repr {
            SetRepr::IntegersMod { modulus } | SetRepr::PrimeField { modulus } => {
                Ok(self.make(Value::Integer(value % modulus)))
            }
            SetRepr::MultiplicativeGroup {
                modulus,
                order,
                generator,
            } => {
                let k = value % order;
                Ok(self.make(Value::Integer(generator.modpow(&k, modulus))))
            }
            _ => Err(Error::UnsupportedOperation("integer reduction")),
        }
    }

    // ------------------------------------------------------------------
    // Canonical decoding
    // ------------------------------------------------------------------

    /// Decode a canonical byte tree into an element of this set.
    /// Inverse of [`Element::byte_tree`].
    pub fn element_from_byte_tree(&self, tree: &ByteTree) -> Result<Element, Error> {
        match &*self.repr {
            SetRepr::IntegersMod { .. }
            | SetRepr::PrimeField { .. }
            | SetRepr::MultiplicativeGroup { .. } => {
                let bytes = tree
                    .as_leaf()
                    .ok_or(Error::MalformedByteTree("expected a leaf"))?;
                if bytes.is_empty() || (bytes.len() > 1 && bytes[0] == 0) {
                    return Err(Error::MalformedByteTree("non-minimal integer encoding"));
                }
                self.element(BigUint::from_bytes_be(bytes))
            }
            SetRepr::Strings { .. } => {
                let bytes = tree
                    .as_leaf()
                    .ok_or(Error::MalformedByteTree("expected a leaf"))?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|_| Error::MalformedByteTree("invalid utf-8"))?;
                self.string_element(s)
            }
            SetRepr::Permutations { size } => {
                let bytes = tree
                    .as_leaf()
                    .ok_or(Error::MalformedByteTree("expected a leaf"))?;
                if bytes.len() != size * 4 {
                    return Err(Error::MalformedByteTree("wrong permutation length"));
                }
                let images = bytes
                    .chunks(4)
                    .map(|chunk| {
                        let mut buf = [0u8; 4];
                        buf.copy_from_slice(chunk);
                        u32::from_be_bytes(buf) as usize
                    })
                    .collect();
                self.permutation_element(images)
            }
            SetRepr::Product { components } => {
                let children = tree
                    .as_node()
                    .ok_or(Error::MalformedByteTree("expected a node"))?;
                if children.len() != components.len() {
                    return Err(Error::ArityMismatch {
                        expected: components.len(),
                        got: children.len(),
                    });
                }
                let slots = components
                    .iter()
                    .zip(children)
                    .map(|(component, child)| component.element_from_byte_tree(child))
                    .collect::<Result<Vec<_>, _>>()?;
                self.tuple(slots)
            }
        }
    }
}

/// Typed view carrying the group-only operations.
#[derive(Clone, Copy)]
pub struct GroupView<'a> {
    set: &'a Set,
}

impl<'a> GroupView<'a> {
    pub fn set(&self) -> &'a Set {
        self.set
    }

    pub fn invert(&self, a: &Element) -> Result<Element, Error> {
        self.set.invert(a)
    }

    pub fn identity(&self) -> Result<Element, Error> {
        self.set.identity()
    }
}

/// Typed view carrying the cyclic-group-only operations.
#[derive(Clone, Copy)]
pub struct CyclicGroupView<'a> {
    set: &'a Set,
}

impl<'a> CyclicGroupView<'a> {
    pub fn set(&self) -> &'a Set {
        self.set
    }

    pub fn generator(&self) -> Result<Element, Error> {
        self.set.generator()
    }

    pub fn is_generator(&self, a: &Element) -> Result<bool, Error> {
        self.set.is_generator(a)
    }
}
