use crate::Element;
use crate::Error;
use crate::Set;
use num_bigint::BigInt;
use num_bigint::Sign;
use rand::{CryptoRng, Rng};
use rand_core::RngCore;
use std::sync::Arc;

type RawFn =
    dyn Fn(&Element, Option<&mut dyn RngCore>) -> Result<Element, Error> + Send + Sync;

/// Reborrow an optional RNG for a shorter lifetime so it can be threaded
/// through multiple recursive calls. Unlike `Option::as_deref_mut`, the
/// returned trait object's lifetime matches the fresh reference, which keeps
/// the borrow checker happy when the value is reused.
fn reborrow_rng<'b>(
    rng: &'b mut Option<&mut dyn RngCore>,
) -> Option<&'b mut dyn RngCore> {
    match rng {
        Some(r) => Some(&mut **r),
        None => None,
    }
}

enum FunctionKind {
    Closure(Box<RawFn>),
    Identity,
    /// (a, b) -> a * b on a 2-tuple domain.
    ApplyOp,
    /// (x, n) -> x^n; slot 1 is an integer-residue exponent.
    SelfApplyOp,
    /// x -> x^-1 on a group.
    InvertOp,
    /// (a, b) -> 1 if a == b else 0, into Z_2.
    EqualityCheck,
    /// g . f: apply `first`, then `second`.
    Composition { first: Function, second: Function },
    /// `inner` with tuple-domain slot `index` fixed to `fixed`.
    PartialApplication {
        inner: Function,
        index: usize,
        fixed: Element,
    },
    /// x -> (left(x), right(x)) over a shared domain.
    SharedDomain { left: Function, right: Function },
}

struct FunctionRepr {
    domain: Set,
    codomain: Set,
    randomized: bool,
    kind: FunctionKind,
}

/// A mapping between sets, as a first-class value.
///
/// Functions compose sequentially, can have one tuple-domain slot fixed
/// (partial application) and can be paired over a shared domain. All
/// compatibility checks happen at construction time; `apply` only checks
/// membership of the actual input.
///
/// A function is either deterministic or randomized. Every function can be
/// applied through [`Function::apply_with`] with a random source
/// (deterministic ones ignore it); only deterministic functions can be
/// applied through [`Function::apply`].
#[derive(Clone)]
pub struct Function {
    repr: Arc<FunctionRepr>,
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("domain", self.domain())
            .field("codomain", self.codomain())
            .field("randomized", &self.is_randomized())
            .finish()
    }
}

impl Function {
    fn from_repr(repr: FunctionRepr) -> Self {
        Function { repr: Arc::new(repr) }
    }

    pub fn domain(&self) -> &Set {
        &self.repr.domain
    }

    pub fn codomain(&self) -> &Set {
        &self.repr.codomain
    }

    pub fn is_randomized(&self) -> bool {
        self.repr.randomized
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    /// Wrap a deterministic closure. The result of every application is
    /// checked for codomain membership.
    pub fn from_fn<F>(domain: Set, codomain: Set, f: F) -> Function
    where
        F: Fn(&Element) -> Result<Element, Error> + Send + Sync + 'static,
    {
        Function::from_repr(FunctionRepr {
            domain,
            codomain,
            randomized: false,
            kind: FunctionKind::Closure(Box::new(move |x, _| f(x))),
        })
    }

    /// Wrap a randomized closure.
    pub fn from_randomized_fn<F>(domain: Set, codomain: Set, f: F) -> Function
    where
        F: Fn(&Element, &mut dyn RngCore) -> Result<Element, Error> + Send + Sync + 'static,
    {
        Function::from_repr(FunctionRepr {
            domain,
            codomain,
            randomized: true,
            kind: FunctionKind::Closure(Box::new(move |x, rng| {
                let rng = rng.ok_or(Error::RandomSourceRequired)?;
                f(x, rng)
            })),
        })
    }

    /// The identity function on `set`.
    pub fn identity(set: &Set) -> Function {
        Function::from_repr(FunctionRepr {
            domain: set.clone(),
            codomain: set.clone(),
            randomized: false,
            kind: FunctionKind::Identity,
        })
    }

    /// The binary operation of `set` as a function (set x set) -> set.
    pub fn apply_op(set: &Set) -> Result<Function, Error> {
        if set.structure() < crate::Structure::Semigroup {
            return Err(Error::UnsupportedOperation("binary operation"));
        }
        // Two slots of the whole set, even when the set is itself a product.
        Ok(Function::from_repr(FunctionRepr {
            domain: Set::product(vec![set.clone(), set.clone()])?,
            codomain: set.clone(),
            randomized: false,
            kind: FunctionKind::ApplyOp,
        }))
    }

    /// Repeated application as a function (set x exponents) -> set, with
    /// `exponents` a residue class Z_m. This is the identity mixer's
    /// shuffle function.
    pub fn self_apply_op(set: &Set, exponents: &Set) -> Result<Function, Error> {
        if set.structure() < crate::Structure::Semigroup {
            return Err(Error::UnsupportedOperation("binary operation"));
        }
        if !exponents.is_residue_class() {
            return Err(Error::SetMismatch(
                "exponents must come from a residue class Z_m",
            ));
        }
        Ok(Function::from_repr(FunctionRepr {
            domain: Set::product(vec![set.clone(), exponents.clone()])?,
            codomain: set.clone(),
            randomized: false,
            kind: FunctionKind::SelfApplyOp,
        }))
    }

    /// Group inversion as a function.
    pub fn invert_op(group: &Set) -> Result<Function, Error> {
        group.as_group()?;
        Ok(Function::from_repr(FunctionRepr {
            domain: group.clone(),
            codomain: group.clone(),
            randomized: false,
            kind: FunctionKind::InvertOp,
        }))
    }

    /// Equality of two slots as a function (set x set) -> Z_2, the
    /// "compare" half of hash-and-compare checks.
    pub fn equality_check(set: &Set) -> Result<Function, Error> {
        Ok(Function::from_repr(FunctionRepr {
            domain: Set::product(vec![set.clone(), set.clone()])?,
            codomain: Set::integers_mod(2u32)?,
            randomized: false,
            kind: FunctionKind::EqualityCheck,
        }))
    }

    /// Sequential composition: apply `self`, then `then`.
    /// Fails unless `self`'s codomain equals `then`'s domain.
    pub fn compose(&self, then: &Function) -> Result<Function, Error> {
        if self.codomain() != then.domain() {
            return Err(Error::SetMismatch(
                "codomain of the first function must equal the domain of the second",
            ));
        }
        Ok(Function::from_repr(FunctionRepr {
            domain: self.domain().clone(),
            codomain: then.codomain().clone(),
            randomized: self.is_randomized() || then.is_randomized(),
            kind: FunctionKind::Composition {
                first: self.clone(),
                second: then.clone(),
            },
        }))
    }

    /// Fix tuple-domain slot `index` to `fixed`, yielding a function of
    /// arity one less. A remaining arity of one collapses to the bare
    /// component set.
    pub fn partial_apply(&self, index: usize, fixed: &Element) -> Result<Function, Error> {
        let components = self
            .domain()
            .components()
            .ok_or(Error::SetMismatch("partial application needs a tuple domain"))?;
        if index >= components.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                arity: components.len(),
            });
        }
        if !components[index].contains(fixed) {
            return Err(Error::NotAMember("fixed slot"));
        }
        let remaining: Vec<Set> = components
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, c)| c.clone())
            .collect();
        let domain = if remaining.len() == 1 {
            remaining
                .into_iter()
                .next()
                .ok_or(Error::Internal("partial application arity"))?
        } else {
            Set::product(remaining)?
        };
        Ok(Function::from_repr(FunctionRepr {
            domain,
            codomain: self.codomain().clone(),
            randomized: self.is_randomized(),
            kind: FunctionKind::PartialApplication {
                inner: self.clone(),
                index,
                fixed: fixed.clone(),
            },
        }))
    }

    /// Combine two functions over a shared domain into one that evaluates
    /// both on the same input: x -> (self(x), other(x)).
    pub fn pair(&self, other: &Function) -> Result<Function, Error> {
        if self.domain() != other.domain() {
            return Err(Error::SetMismatch(
                "paired functions must share a domain",
            ));
        }
        Ok(Function::from_repr(FunctionRepr {
            domain: self.domain().clone(),
            codomain: Set::product(vec![
                self.codomain().clone(),
                other.codomain().clone(),
            ])?,
            randomized: self.is_randomized() || other.is_randomized(),
            kind: FunctionKind::SharedDomain {
                left: self.clone(),
                right: other.clone(),
            },
        }))
    }

    // ------------------------------------------------------------------
    // Application
    // ------------------------------------------------------------------

    /// Apply a deterministic function.
    pub fn apply(&self, x: &Element) -> Result<Element, Error> {
        if self.is_randomized() {
            return Err(Error::RandomSourceRequired);
        }
        self.apply_dyn(x, None)
    }

    /// Apply with a random source; deterministic functions ignore it.
    pub fn apply_with<R: Rng + CryptoRng>(
        &self,
        x: &Element,
        rng: &mut R,
    ) -> Result<Element, Error> {
        self.apply_dyn(x, Some(rng))
    }

    pub(crate) fn apply_dyn(
        &self,
        x: &Element,
        mut rng: Option<&mut dyn RngCore>,
    ) -> Result<Element, Error> {
        if !self.domain().contains(x) {
            return Err(Error::NotAMember("function input"));
        }
        match &self.repr.kind {
            FunctionKind::Closure(f) => {
                let result = f(x, rng)?;
                if !self.codomain().contains(&result) {
                    return Err(Error::ResultOutsideCodomain);
                }
                Ok(result)
            }
            FunctionKind::Identity => Ok(x.clone()),
            FunctionKind::ApplyOp => self.codomain().apply(x.get(0)?, x.get(1)?),
            FunctionKind::SelfApplyOp => {
                let exponent = x.get(1)?.integer()?;
                let exponent = BigInt::from_biguint(Sign::Plus, exponent.clone());
                self.codomain().self_apply(x.get(0)?, &exponent)
            }
            FunctionKind::InvertOp => self.codomain().invert(x),
            FunctionKind::EqualityCheck => {
                let bit = if x.get(0)? == x.get(1)? { 1u32 } else { 0u32 };
                self.codomain().element(bit)
            }
            FunctionKind::Composition { first, second } => {
                let mid = first.apply_dyn(x, reborrow_rng(&mut rng))?;
                second.apply_dyn(&mid, reborrow_rng(&mut rng))
            }
            FunctionKind::PartialApplication {
                inner,
                index,
                fixed,
            } => {
                let inner_domain = inner.domain();
                let inner_arity = inner_domain.arity();
                let mut slots = Vec::with_capacity(inner_arity);
                if inner_arity == 2 {
                    // The remaining slot is the bare input.
                    for i in 0..inner_arity {
                        if i == *index {
                            slots.push(fixed.clone());
                        } else {
                            slots.push(x.clone());
                        }
                    }
                } else {
                    let parts = x
                        .as_tuple()
                        .ok_or(Error::Internal("expected a tuple input"))?;
                    let mut parts = parts.iter();
                    for i in 0..inner_arity {
                        if i == *index {
                            slots.push(fixed.clone());
                        } else {
                            let part = parts
                                .next()
                                .ok_or(Error::Internal("partial application arity"))?;
                            slots.push(part.clone());
                        }
                    }
                }
                let input = inner_domain.tuple(slots)?;
                inner.apply_dyn(&input, rng)
            }
            FunctionKind::SharedDomain { left, right } => {
                let first = left.apply_dyn(x, reborrow_rng(&mut rng))?;
                let second = right.apply_dyn(x, reborrow_rng(&mut rng))?;
                self.codomain().tuple(vec![first, second])
            }
        }
    }
}
