use crate::encoding::ByteTree;
use crate::Error;
use crate::Set;
use num_bigint::{BigInt, BigUint};
use std::fmt;

/// The wrapped semantic value of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Integer(BigUint),
    Str(String),
    Permutation(Vec<usize>),
    Tuple(Vec<Element>),
}

/// An immutable value owned by exactly one [`Set`].
///
/// Elements are produced only by their set, via canonical constructors,
/// random sampling or operation results. Equality is structural: the
/// owning sets must be equal and the wrapped values must be equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    set: Set,
    value: Value,
}

impl Element {
    pub(crate) fn raw(set: Set, value: Value) -> Self {
        Element { set, value }
    }

    /// The set this element belongs to.
    pub fn set(&self) -> &Set {
        &self.set
    }

    // ------------------------------------------------------------------
    // Canonical operation contract, delegated to the owning set
    // ------------------------------------------------------------------

    /// The set's binary operation applied to `self` and `other`.
    pub fn apply(&self, other: &Element) -> Result<Element, Error> {
        self.set.apply(self, other)
    }

    /// The operation applied to `self` with itself `n` times.
    pub fn self_apply(&self, n: &BigInt) -> Result<Element, Error> {
        self.set.self_apply(self, n)
    }

    /// The inverse of `self` (groups only).
    pub fn invert(&self) -> Result<Element, Error> {
        self.set.invert(self)
    }

    /// Whether `self` is the identity of its set (monoids and stronger).
    pub fn is_identity(&self) -> Result<bool, Error> {
        self.set.is_identity(self)
    }

    // ------------------------------------------------------------------
    // Additive vocabulary
    //
    // Renaming wrappers only: the algebra lives in the canonical contract
    // above, the notation is cosmetic.
    // ------------------------------------------------------------------

    pub fn add(&self, other: &Element) -> Result<Element, Error> {
        self.apply(other)
    }

    pub fn times(&self, n: &BigInt) -> Result<Element, Error> {
        self.self_apply(n)
    }

    pub fn negate(&self) -> Result<Element, Error> {
        self.invert()
    }

    // ------------------------------------------------------------------
    // Multiplicative vocabulary
    // ------------------------------------------------------------------

    pub fn multiply(&self, other: &Element) -> Result<Element, Error> {
        self.apply(other)
    }

    pub fn power(&self, n: &BigInt) -> Result<Element, Error> {
        self.self_apply(n)
    }

    pub fn inverse(&self) -> Result<Element, Error> {
        self.invert()
    }

    // ------------------------------------------------------------------
    // Value accessors
    // ------------------------------------------------------------------

    /// The integer residue, for elements of integer sets.
    pub fn to_biguint(&self) -> Option<&BigUint> {
        match &self.value {
            Value::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// The string value, for elements of string monoids.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The image table, for permutation elements.
    pub fn as_permutation(&self) -> Option<&[usize]> {
        match &self.value {
            Value::Permutation(images) => Some(images),
            _ => None,
        }
    }

    /// Number of tuple slots; 1 for non-tuple elements.
    pub fn arity(&self) -> usize {
        match &self.value {
            Value::Tuple(elements) => elements.len(),
            _ => 1,
        }
    }

    /// The component at slot `index` of a tuple element. 0-based,
    /// bounds-checked.
    pub fn get(&self, index: usize) -> Result<&Element, Error> {
        match &self.value {
            Value::Tuple(elements) => elements.get(index).ok_or(Error::IndexOutOfBounds {
                index,
                arity: elements.len(),
            }),
            _ => Err(Error::UnsupportedOperation("tuple indexing")),
        }
    }

    /// All components of a tuple element.
    pub fn as_tuple(&self) -> Option<&[Element]> {
        match &self.value {
            Value::Tuple(elements) => Some(elements),
            _ => None,
        }
    }

    pub(crate) fn integer(&self) -> Result<&BigUint, Error> {
        self.to_biguint()
            .ok_or(Error::Internal("expected an integer value"))
    }

    pub(crate) fn str_value(&self) -> Result<&str, Error> {
        self.as_str().ok_or(Error::Internal("expected a string value"))
    }

    pub(crate) fn permutation(&self) -> Result<&[usize], Error> {
        self.as_permutation()
            .ok_or(Error::Internal("expected a permutation value"))
    }

    // ------------------------------------------------------------------
    // Canonical encoding
    // ------------------------------------------------------------------

    /// The canonical byte tree of this element. Unique per value within
    /// its set; inverse of [`Set::element_from_byte_tree`].
    pub fn byte_tree(&self) -> ByteTree {
        match &self.value {
            Value::Integer(v) => ByteTree::leaf(v.to_bytes_be()),
            Value::Str(s) => ByteTree::leaf(s.as_bytes().to_vec()),
            Value::Permutation(images) => {
                let mut bytes = Vec::with_capacity(images.len() * 4);
                for &image in images {
                    bytes.extend_from_slice(&(image as u32).to_be_bytes());
                }
                ByteTree::leaf(bytes)
            }
            Value::Tuple(elements) => {
                ByteTree::node(elements.iter().map(|e| e.byte_tree()).collect())
            }
        }
    }

    /// The serialized canonical byte tree.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.byte_tree().encode()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Permutation(images) => write!(f, "{:?}", images),
            Value::Tuple(elements) => {
                write!(f, "(")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_requires_the_same_set() {
        let z20 = Set::integers_mod(20u32).unwrap();
        let z30 = Set::integers_mod(30u32).unwrap();
        let a = z20.element(7u32).unwrap();
        let b = z30.element(7u32).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, z20.element(7u32).unwrap());
    }

    #[test]
    fn vocabularies_are_renamings() {
        let field = Set::prime_field(29u32).unwrap();
        let a = field.element(11u32).unwrap();
        let b = field.element(20u32).unwrap();
        assert_eq!(a.add(&b).unwrap(), a.apply(&b).unwrap());
        assert_eq!(a.multiply(&b).unwrap(), a.apply(&b).unwrap());
        let n = BigInt::from(5);
        assert_eq!(a.times(&n).unwrap(), a.self_apply(&n).unwrap());
        assert_eq!(a.power(&n).unwrap(), a.self_apply(&n).unwrap());
        assert_eq!(a.negate().unwrap(), a.invert().unwrap());
        assert_eq!(a.inverse().unwrap(), a.invert().unwrap());
    }

    #[test]
    fn operands_from_a_foreign_set_are_rejected() {
        let z20 = Set::integers_mod(20u32).unwrap();
        let z30 = Set::integers_mod(30u32).unwrap();
        let a = z20.element(7u32).unwrap();
        let b = z30.element(7u32).unwrap();
        let err = a.apply(&b).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn tuple_indexing_is_bounds_checked() {
        let product = Set::product(vec![
            Set::integers_mod(20u32).unwrap(),
            Set::strings("ab").unwrap(),
        ])
        .unwrap();
        let tuple = product
            .tuple(vec![
                product.component(0).unwrap().element(3u32).unwrap(),
                product.component(1).unwrap().string_element("ba").unwrap(),
            ])
            .unwrap();
        assert_eq!(tuple.arity(), 2);
        assert_eq!(tuple.get(1).unwrap().as_str(), Some("ba"));
        assert!(tuple.get(2).is_err());

        // Slot membership is enforced at construction.
        let wrong = product.tuple(vec![
            product.component(1).unwrap().string_element("a").unwrap(),
            product.component(1).unwrap().string_element("b").unwrap(),
        ]);
        assert!(wrong.is_err());
    }

    #[test]
    fn byte_tree_round_trip() {
        let product = Set::product(vec![
            Set::prime_field(29u32).unwrap(),
            Set::permutations(4).unwrap(),
            Set::strings("abc").unwrap(),
        ])
        .unwrap();
        let tuple = product
            .tuple(vec![
                product.component(0).unwrap().element(0u32).unwrap(),
                product
                    .component(1)
                    .unwrap()
                    .permutation_element(vec![3, 1, 0, 2])
                    .unwrap(),
                product.component(2).unwrap().string_element("cab").unwrap(),
            ])
            .unwrap();
        let decoded = product
            .element_from_byte_tree(&ByteTree::decode(&tuple.to_bytes()).unwrap())
            .unwrap();
        assert_eq!(decoded, tuple);
    }

    #[test]
    fn distinct_elements_encode_distinctly() {
        let field = Set::prime_field(29u32).unwrap();
        let mut seen = std::collections::HashSet::new();
        for v in 0u32..29 {
            let bytes = field.element(v).unwrap().to_bytes();
            assert!(seen.insert(bytes));
        }
    }

    #[test]
    fn decoding_rejects_non_canonical_integers() {
        let field = Set::prime_field(29u32).unwrap();
        // 5 encoded with a padding zero byte
        let padded = ByteTree::leaf(vec![0, 5]);
        assert!(field.element_from_byte_tree(&padded).is_err());
        // out of range
        let big = ByteTree::leaf(vec![29]);
        assert!(field.element_from_byte_tree(&big).is_err());
    }
}
