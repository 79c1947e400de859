use crate::Cardinality;
use crate::Element;
use crate::Error;
use crate::Function;
use crate::Set;
use rand::{CryptoRng, Rng};

/// The randomness that fully determines how a mixer transformed its input:
/// a permutation of the positions and a per-position randomization value.
///
/// Retain this if a zero-knowledge proof of correct shuffling is to be
/// built later; the mixer itself does not build proofs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleWitness {
    pub permutation: Element,
    pub randomizations: Vec<Element>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RandomizationMode {
    /// One value drawn and reused at every position.
    Identical,
    /// One value drawn independently per position.
    Independent,
}

/// A verifiable shuffle: the anonymization step of a mix-net tally.
///
/// A mixer produces a permuted, per-element re-randomized copy of a tuple
/// of values. The canonical operation is
/// [`shuffle_with`](Mixer::shuffle_with), which takes the permutation and
/// randomizations explicitly so the caller can retain them as the witness;
/// [`shuffle`](Mixer::shuffle) samples both and returns the witness
/// alongside the output.
///
/// Re-randomization happens before the positions are scrambled, so the
/// witness is checkable position-by-position against the original input
/// ordering: `output[i] = f(input[permutation[i]], r[permutation[i]])`.
#[derive(Debug)]
pub struct Mixer {
    shuffle_function: Function,
    shuffle_space: Set,
    randomization_space: Set,
    permutation_group: Set,
    size: usize,
    mode: RandomizationMode,
}

impl Mixer {
    /// A mixer over a cyclic group that re-randomizes by exponentiation:
    /// `f(x, r) = x^r`.
    ///
    /// Exponentiation preserves discrete-log linkage within the input
    /// vector only if every position is raised to the same power, so
    /// [`generate_randomizations`](Mixer::generate_randomizations) draws
    /// one exponent and reuses it across all positions.
    pub fn identity(group: &Set, size: usize) -> Result<Self, Error> {
        group.as_cyclic_group()?;
        if size == 0 {
            return Err(Error::InvalidGroupParameters("size must be positive"));
        }
        let order = match group.cardinality() {
            Cardinality::Finite(order) => order,
            Cardinality::Infinite => return Err(Error::InfiniteSet),
        };
        let randomization_space = Set::integers_mod(order)?;
        let shuffle_function = Function::self_apply_op(group, &randomization_space)?;
        Ok(Mixer {
            shuffle_function,
            shuffle_space: group.clone(),
            randomization_space,
            permutation_group: Set::permutations(size)?,
            size,
            mode: RandomizationMode::Identical,
        })
    }

    /// A mixer that re-randomizes through an externally supplied
    /// re-encryption scheme, consumed via its function interface:
    /// `re_encrypt` must be a deterministic function
    /// (key, message, randomization) -> message.
    ///
    /// The public key is fixed by partial application; construction fails
    /// if it is not a member of the scheme's key space.
    pub fn re_encryption(
        re_encrypt: &Function,
        public_key: &Element,
        size: usize,
    ) -> Result<Self, Error> {
        if size == 0 {
            return Err(Error::InvalidGroupParameters("size must be positive"));
        }
        if re_encrypt.is_randomized() {
            return Err(Error::SetMismatch(
                "re-encryption must be deterministic in (key, message, randomization)",
            ));
        }
        let components = re_encrypt.domain().components().ok_or(Error::SetMismatch(
            "re-encryption must take a (key, message, randomization) tuple",
        ))?;
        if components.len() != 3 {
            return Err(Error::SetMismatch(
                "re-encryption must take a (key, message, randomization) tuple",
            ));
        }
        let message_space = components[1].clone();
        let randomization_space = components[2].clone();
        if re_encrypt.codomain() != &message_space {
            return Err(Error::SetMismatch(
                "re-encryption must map back into the message space",
            ));
        }
        let shuffle_function = re_encrypt.partial_apply(0, public_key)?;
        Ok(Mixer {
            shuffle_function,
            shuffle_space: message_space,
            randomization_space,
            permutation_group: Set::permutations(size)?,
            size,
            mode: RandomizationMode::Independent,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The set the shuffled values belong to.
    pub fn shuffle_space(&self) -> &Set {
        &self.shuffle_space
    }

    /// The set the per-position randomization values belong to.
    pub fn randomization_space(&self) -> &Set {
        &self.randomization_space
    }

    /// Sample the per-position randomization values: independently per
    /// position for re-encryption mixers, one value replicated across all
    /// positions for identity mixers.
    pub fn generate_randomizations<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<Vec<Element>, Error> {
        match self.mode {
            RandomizationMode::Identical => {
                let r = self.randomization_space.random_element(rng)?;
                Ok(vec![r; self.size])
            }
            RandomizationMode::Independent => (0..self.size)
                .map(|_| self.randomization_space.random_element(rng))
                .collect(),
        }
    }

    /// Sample a permutation uniformly from the symmetric group on `size`
    /// positions.
    pub fn generate_permutation<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<Element, Error> {
        self.permutation_group.random_element(rng)
    }

    /// Shuffle with freshly sampled permutation and randomizations,
    /// returning both as the witness.
    pub fn shuffle<R: Rng + CryptoRng>(
        &self,
        elements: &[Element],
        rng: &mut R,
    ) -> Result<(Vec<Element>, ShuffleWitness), Error> {
        let permutation = self.generate_permutation(rng)?;
        let randomizations = self.generate_randomizations(rng)?;
        let shuffled = self.shuffle_with(elements, &permutation, &randomizations)?;
        Ok((
            shuffled,
            ShuffleWitness {
                permutation,
                randomizations,
            },
        ))
    }

    /// The canonical, auditable shuffle: re-randomize every position in
    /// input order, then reorder by the permutation.
    pub fn shuffle_with(
        &self,
        elements: &[Element],
        permutation: &Element,
        randomizations: &[Element],
    ) -> Result<Vec<Element>, Error> {
        if elements.len() != self.size {
            return Err(Error::WrongLength {
                expected: self.size,
                got: elements.len(),
            });
        }
        if randomizations.len() != self.size {
            return Err(Error::WrongLength {
                expected: self.size,
                got: randomizations.len(),
            });
        }
        for element in elements {
            if !self.shuffle_space.contains(element) {
                return Err(Error::NotAMember("shuffled element"));
            }
        }
        for randomization in randomizations {
            if !self.randomization_space.contains(randomization) {
                return Err(Error::NotAMember("randomization"));
            }
        }
        if !self.permutation_group.contains(permutation) {
            return Err(Error::NotAMember("permutation"));
        }

        let domain = self.shuffle_function.domain();
        let mut rerandomized = Vec::with_capacity(self.size);
        for (element, randomization) in elements.iter().zip(randomizations) {
            let input = domain.tuple(vec![element.clone(), randomization.clone()])?;
            rerandomized.push(self.shuffle_function.apply(&input)?);
        }

        let images = permutation
            .as_permutation()
            .ok_or(Error::Internal("expected a permutation element"))?;
        Ok(images.iter().map(|&i| rerandomized[i].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(1234)
    }

    /// ElGamal re-encryption over the order-11 subgroup of Z_23*:
    /// (pk, (a, b), r) -> (a * g^r, b * pk^r).
    fn elgamal_re_encryption(group: &Set) -> Function {
        let ciphertexts = group.power(2).unwrap();
        let exponents = Set::integers_mod(11u32).unwrap();
        let domain = Set::product(vec![
            group.clone(),
            ciphertexts.clone(),
            exponents.clone(),
        ])
        .unwrap();
        let g = group.generator().unwrap();
        let group = group.clone();
        Function::from_fn(domain, ciphertexts, move |input| {
            let pk = input.get(0)?;
            let ciphertext = input.get(1)?;
            let r = BigInt::from(input.get(2)?.to_biguint().expect("exponent").clone());
            let a = group.apply(ciphertext.get(0)?, &g.self_apply(&r)?)?;
            let b = group.apply(ciphertext.get(1)?, &pk.self_apply(&r)?)?;
            ciphertext.set().tuple(vec![a, b])
        })
    }

    fn order_11_group() -> Set {
        Set::multiplicative_group(23u32, 11u32, 2u32).unwrap()
    }

    #[test]
    fn identity_mixer_shuffles_in_the_expected_order() {
        let group = Set::multiplicative_group(11u32, 10u32, 2u32).unwrap();
        let mixer = Mixer::identity(&group, 4).unwrap();

        let g = group.generator().unwrap();
        let elements: Vec<Element> = (1..=4)
            .map(|k| g.self_apply(&BigInt::from(k)).unwrap())
            .collect();
        let permutation = Set::permutations(4)
            .unwrap()
            .permutation_element(vec![2, 0, 3, 1])
            .unwrap();
        let r = mixer.randomization_space().element(3u32).unwrap();
        let randomizations = vec![r.clone(), r.clone(), r.clone(), r];

        let shuffled = mixer
            .shuffle_with(&elements, &permutation, &randomizations)
            .unwrap();

        let exponent = BigInt::from(3);
        let expected: Vec<Element> = [2usize, 0, 3, 1]
            .iter()
            .map(|&i| elements[i].self_apply(&exponent).unwrap())
            .collect();
        assert_eq!(shuffled, expected);
    }

    #[test]
    fn identity_mixer_replicates_one_randomization() {
        let group = order_11_group();
        let mixer = Mixer::identity(&group, 5).unwrap();
        let randomizations = mixer.generate_randomizations(&mut rng()).unwrap();
        assert_eq!(randomizations.len(), 5);
        assert!(randomizations.iter().all(|r| r == &randomizations[0]));
    }

    #[test]
    fn witness_is_checkable_against_the_input_ordering() {
        let group = order_11_group();
        let mixer = Mixer::identity(&group, 6).unwrap();
        let mut rng = rng();
        let elements: Vec<Element> = (0..6)
            .map(|_| group.random_element(&mut rng).unwrap())
            .collect();
        let (shuffled, witness) = mixer.shuffle(&elements, &mut rng).unwrap();

        let images = witness.permutation.as_permutation().unwrap();
        let domain = Set::product(vec![
            mixer.shuffle_space().clone(),
            mixer.randomization_space().clone(),
        ])
        .unwrap();
        let f = Function::self_apply_op(mixer.shuffle_space(), mixer.randomization_space()).unwrap();
        for (i, output) in shuffled.iter().enumerate() {
            let j = images[i];
            let input = domain
                .tuple(vec![elements[j].clone(), witness.randomizations[j].clone()])
                .unwrap();
            assert_eq!(output, &f.apply(&input).unwrap());
        }
    }

    #[test]
    fn shuffling_twice_differs_with_fresh_randomness() {
        let group = order_11_group();
        let mixer = Mixer::identity(&group, 6).unwrap();
        let mut rng = rng();
        let elements: Vec<Element> = (0..6)
            .map(|_| group.random_element(&mut rng).unwrap())
            .collect();
        let outputs: Vec<Vec<Element>> = (10u64..13)
            .map(|seed| {
                mixer
                    .shuffle(&elements, &mut ChaCha20Rng::seed_from_u64(seed))
                    .unwrap()
                    .0
            })
            .collect();
        assert!(outputs.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn shuffle_validates_its_inputs() {
        let group = order_11_group();
        let mixer = Mixer::identity(&group, 3).unwrap();
        let mut rng = rng();
        let elements: Vec<Element> = (0..3)
            .map(|_| group.random_element(&mut rng).unwrap())
            .collect();
        let permutation = Set::permutations(3)
            .unwrap()
            .permutation_element(vec![1, 2, 0])
            .unwrap();
        let randomizations = mixer.generate_randomizations(&mut rng).unwrap();

        // Wrong element count.
        assert!(mixer
            .shuffle_with(&elements[..2], &permutation, &randomizations)
            .is_err());
        // Wrong randomization count.
        assert!(mixer
            .shuffle_with(&elements, &permutation, &randomizations[..2])
            .is_err());
        // Permutation of the wrong size.
        let small = Set::permutations(2)
            .unwrap()
            .permutation_element(vec![1, 0])
            .unwrap();
        assert!(mixer
            .shuffle_with(&elements, &small, &randomizations)
            .is_err());
        // Element from the wrong group.
        let mut foreign = elements.clone();
        foreign[0] = Set::multiplicative_group(11u32, 10u32, 2u32)
            .unwrap()
            .element(2u32)
            .unwrap();
        assert!(mixer
            .shuffle_with(&foreign, &permutation, &randomizations)
            .is_err());
    }

    #[test]
    fn re_encryption_mixer_preserves_the_plaintext_multiset() {
        let group = order_11_group();
        let re_encrypt = elgamal_re_encryption(&group);
        let g = group.generator().unwrap();
        let sk = BigInt::from(7);
        let pk = g.self_apply(&sk).unwrap();
        let mixer = Mixer::re_encryption(&re_encrypt, &pk, 4).unwrap();

        let mut rng = rng();
        let exponents = Set::integers_mod(11u32).unwrap();
        let ciphertext_space = group.power(2).unwrap();

        // Encrypt four known messages.
        let messages: Vec<Element> = (1..=4)
            .map(|k| g.self_apply(&BigInt::from(3 * k)).unwrap())
            .collect();
        let ciphertexts: Vec<Element> = messages
            .iter()
            .map(|m| {
                let k = BigInt::from(exponents.random_element(&mut rng).unwrap()
                    .to_biguint()
                    .unwrap()
                    .clone());
                let a = g.self_apply(&k).unwrap();
                let b = group.apply(m, &pk.self_apply(&k).unwrap()).unwrap();
                ciphertext_space.tuple(vec![a, b]).unwrap()
            })
            .collect();

        let (shuffled, witness) = mixer.shuffle(&ciphertexts, &mut rng).unwrap();
        assert_eq!(shuffled.len(), 4);

        // Decrypt the mixed ciphertexts: b / a^sk.
        let mut decrypted: Vec<Element> = shuffled
            .iter()
            .map(|c| {
                let a_sk = c.get(0).unwrap().self_apply(&sk).unwrap();
                group
                    .apply(c.get(1).unwrap(), &a_sk.invert().unwrap())
                    .unwrap()
            })
            .collect();

        // Same multiset as the original messages, in witness order.
        let images = witness.permutation.as_permutation().unwrap();
        for (i, plaintext) in decrypted.iter().enumerate() {
            assert_eq!(plaintext, &messages[images[i]]);
        }
        decrypted.sort_by_key(|m| m.to_biguint().unwrap().clone());
        let mut expected = messages;
        expected.sort_by_key(|m| m.to_biguint().unwrap().clone());
        assert_eq!(decrypted, expected);
    }

    #[test]
    fn re_encryption_mixer_rejects_a_foreign_public_key() {
        let group = order_11_group();
        let re_encrypt = elgamal_re_encryption(&group);
        // 5 generates the full group Z_23*, not the order-11 subgroup.
        let full_group = Set::multiplicative_group_mod_prime(23u32).unwrap();
        let bad_key = full_group.element(5u32).unwrap();
        let err = Mixer::re_encryption(&re_encrypt, &bad_key, 3).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn re_encryption_mixer_samples_independent_randomizations() {
        let group = order_11_group();
        let re_encrypt = elgamal_re_encryption(&group);
        let pk = group.generator().unwrap();
        let mixer = Mixer::re_encryption(&re_encrypt, &pk, 8).unwrap();
        let randomizations = mixer.generate_randomizations(&mut rng()).unwrap();
        assert_eq!(randomizations.len(), 8);
        assert!(randomizations.iter().any(|r| r != &randomizations[0]));
    }
}
