use crate::encoding::ByteTree;
use crate::Element;
use crate::Error;
use crate::Set;
use digest::Digest;
use num_bigint::BigUint;
use std::sync::Arc;

/// The closed set of interchangeable digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn digest(&self, bytes: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha224 => sha2::Sha224::digest(bytes).to_vec(),
            HashAlgorithm::Sha256 => sha2::Sha256::digest(bytes).to_vec(),
            HashAlgorithm::Sha384 => sha2::Sha384::digest(bytes).to_vec(),
            HashAlgorithm::Sha512 => sha2::Sha512::digest(bytes).to_vec(),
        }
    }
}

#[derive(Clone)]
enum Mapping {
    Digest(HashAlgorithm),
    Custom(Arc<dyn Fn(&[u8]) -> BigUint + Send + Sync>),
}

/// Non-interactive challenge generator (the Fiat-Shamir transform).
///
/// Replaces an interactive verifier's random challenge with a
/// deterministic pseudorandom value computed from the proof transcript:
/// the input element's canonical byte tree (paired with a prover
/// identifier when one is bound) is mapped into the challenge space.
///
/// The contract is determinism plus uniformity, not a specific digest:
/// the bytes-to-integer mapping is pluggable via
/// [`with_mapping`](ChallengeGenerator::with_mapping).
#[derive(Clone)]
pub struct ChallengeGenerator {
    challenge_space: Set,
    prover_id: Option<Vec<u8>>,
    mapping: Mapping,
}

impl ChallengeGenerator {
    /// A generator hashing canonical encodings with `hash` and reducing
    /// the digest into `challenge_space`, which must be a finite integer
    /// set.
    pub fn fiat_shamir(challenge_space: Set, hash: HashAlgorithm) -> Result<Self, Error> {
        if !challenge_space.is_integer_kind() {
            return Err(Error::SetMismatch(
                "the challenge space must be a finite integer set",
            ));
        }
        Ok(ChallengeGenerator {
            challenge_space,
            prover_id: None,
            mapping: Mapping::Digest(hash),
        })
    }

    /// A generator with a caller-supplied deterministic bytes-to-integer
    /// mapping in place of the digest.
    pub fn with_mapping<F>(challenge_space: Set, mapping: F) -> Result<Self, Error>
    where
        F: Fn(&[u8]) -> BigUint + Send + Sync + 'static,
    {
        if !challenge_space.is_integer_kind() {
            return Err(Error::SetMismatch(
                "the challenge space must be a finite integer set",
            ));
        }
        Ok(ChallengeGenerator {
            challenge_space,
            prover_id: None,
            mapping: Mapping::Custom(Arc::new(mapping)),
        })
    }

    /// Bind a prover identity: the generated challenge then depends on
    /// the pair (input, prover id), preventing challenge reuse across
    /// provers.
    pub fn with_prover_id(mut self, id: impl Into<Vec<u8>>) -> Self {
        self.prover_id = Some(id.into());
        self
    }

    pub fn challenge_space(&self) -> &Set {
        &self.challenge_space
    }

    /// The challenge for `input`: same input (and same prover id), same
    /// challenge.
    pub fn generate(&self, input: &Element) -> Result<Element, Error> {
        let tree = match &self.prover_id {
            Some(id) => ByteTree::node(vec![input.byte_tree(), ByteTree::leaf(id.clone())]),
            None => input.byte_tree(),
        };
        let bytes = tree.encode();
        let value = match &self.mapping {
            Mapping::Digest(hash) => BigUint::from_bytes_be(&hash.digest(&bytes)),
            Mapping::Custom(f) => f(&bytes),
        };
        self.challenge_space.element_from_uniform_integer(&value)
    }
}
