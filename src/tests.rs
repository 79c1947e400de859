use super::*;
use num_bigint::BigInt;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[test]
fn end_to_end_trustee_secret_sharing() {
    let mut rng = ChaCha20Rng::seed_from_u64(2026);

    // The election secret lives in Z_29
    let field = Set::prime_field(29u32).unwrap();
    let secret = field.element(5u32).unwrap();

    // Split it among 5 trustees, any 3 of whom can recover it
    let scheme = ShamirSecretSharing::new(field.clone(), 5, 3).unwrap();
    let shares = scheme.share(&secret, &mut rng).unwrap();
    assert_eq!(shares.len(), 5);

    // Trustees 2, 3 and 4 cooperate
    let quorum = vec![shares[1].clone(), shares[2].clone(), shares[3].clone()];
    assert_eq!(scheme.recover(&quorum).unwrap(), secret);

    // A different quorum reaches the same secret
    let other_quorum = vec![shares[4].clone(), shares[0].clone(), shares[2].clone()];
    assert_eq!(scheme.recover(&other_quorum).unwrap(), secret);

    // Trustees 1 and 2 alone learn nothing and recovery fails loudly
    let below_threshold = vec![shares[0].clone(), shares[1].clone()];
    let err = scheme.recover(&below_threshold).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    // Shares survive the canonical encoding used for the audit log
    let logged = shares[1].byte_tree().encode();
    let recovered_share =
        Share::from_byte_tree(&field, &ByteTree::decode(&logged).unwrap()).unwrap();
    assert_eq!(&recovered_share, &shares[1]);
}

#[test]
fn end_to_end_mixnet_with_audit() {
    let mut rng = ChaCha20Rng::seed_from_u64(4096);

    // ElGamal over the order-11 subgroup of Z_23*
    let group = Set::multiplicative_group(23u32, 11u32, 2u32).unwrap();
    let exponents = Set::integers_mod(11u32).unwrap();
    let ciphertext_space = group.power(2).unwrap();
    let g = group.generator().unwrap();

    let sk = BigInt::from(6);
    let pk = g.self_apply(&sk).unwrap();

    // The re-encryption scheme enters through its function interface:
    // (key, (a, b), r) -> (a * g^r, b * key^r)
    let re_encrypt = {
        let domain = Set::product(vec![
            group.clone(),
            ciphertext_space.clone(),
            exponents.clone(),
        ])
        .unwrap();
        let group = group.clone();
        let g = g.clone();
        Function::from_fn(domain, ciphertext_space.clone(), move |input| {
            let key = input.get(0)?;
            let ciphertext = input.get(1)?;
            let r = BigInt::from(input.get(2)?.to_biguint().expect("exponent").clone());
            let a = group.apply(ciphertext.get(0)?, &g.self_apply(&r)?)?;
            let b = group.apply(ciphertext.get(1)?, &key.self_apply(&r)?)?;
            ciphertext.set().tuple(vec![a, b])
        })
    };

    // Four voters encrypt their ballots
    let ballots: Vec<Element> = [3i64, 5, 7, 9]
        .iter()
        .map(|&m| g.self_apply(&BigInt::from(m)).unwrap())
        .collect();
    let ciphertexts: Vec<Element> = ballots
        .iter()
        .map(|ballot| {
            let k = BigInt::from(
                exponents
                    .random_element(&mut rng)
                    .unwrap()
                    .to_biguint()
                    .unwrap()
                    .clone(),
            );
            let a = g.self_apply(&k).unwrap();
            let b = group.apply(ballot, &pk.self_apply(&k).unwrap()).unwrap();
            ciphertext_space.tuple(vec![a, b]).unwrap()
        })
        .collect();

    // A mix authority shuffles them, keeping the witness for its proof
    let mixer = Mixer::re_encryption(&re_encrypt, &pk, 4).unwrap();
    let (mixed, witness) = mixer.shuffle(&ciphertexts, &mut rng).unwrap();

    // An auditor with the witness checks every output position against
    // the original input ordering
    let shuffle_function = re_encrypt.partial_apply(0, &pk).unwrap();
    let images = witness.permutation.as_permutation().unwrap();
    for (i, output) in mixed.iter().enumerate() {
        let j = images[i];
        let input = shuffle_function
            .domain()
            .tuple(vec![
                ciphertexts[j].clone(),
                witness.randomizations[j].clone(),
            ])
            .unwrap();
        assert_eq!(output, &shuffle_function.apply(&input).unwrap());
    }

    // Decrypting the mix yields the original ballots, anonymized
    let mut decrypted: Vec<Element> = mixed
        .iter()
        .map(|c| {
            let a_sk = c.get(0).unwrap().self_apply(&sk).unwrap();
            group
                .apply(c.get(1).unwrap(), &a_sk.invert().unwrap())
                .unwrap()
        })
        .collect();
    let mut expected = ballots.clone();
    decrypted.sort_by_key(|m| m.to_biguint().unwrap().clone());
    expected.sort_by_key(|m| m.to_biguint().unwrap().clone());
    assert_eq!(decrypted, expected);

    // The transcript (inputs, outputs) binds a reproducible Fiat-Shamir
    // challenge for the shuffle proof the authority would publish
    let vector_space = Set::product(vec![ciphertext_space.clone(); 4]).unwrap();
    let transcript_space =
        Set::product(vec![vector_space.clone(), vector_space.clone()]).unwrap();
    let transcript = transcript_space
        .tuple(vec![
            vector_space.tuple(ciphertexts.clone()).unwrap(),
            vector_space.tuple(mixed.clone()).unwrap(),
        ])
        .unwrap();
    let challenger = ChallengeGenerator::fiat_shamir(exponents.clone(), HashAlgorithm::Sha256)
        .unwrap()
        .with_prover_id(b"mix-authority-1".to_vec());
    let challenge = challenger.generate(&transcript).unwrap();
    assert!(exponents.contains(&challenge));
    // The auditor recomputes the identical challenge
    assert_eq!(challenge, challenger.generate(&transcript).unwrap());
}

#[test]
fn end_to_end_identity_mix_of_dlog_linked_values() {
    let mut rng = ChaCha20Rng::seed_from_u64(777);

    // A cyclic group with 10 elements
    let group = Set::multiplicative_group(11u32, 10u32, 2u32).unwrap();
    let g = group.generator().unwrap();
    let mixer = Mixer::identity(&group, 4).unwrap();

    let elements: Vec<Element> = (1i64..=4)
        .map(|k| g.self_apply(&BigInt::from(k)).unwrap())
        .collect();
    let (mixed, witness) = mixer.shuffle(&elements, &mut rng).unwrap();

    // The identity mixer reuses one exponent across all positions, so the
    // discrete-log relations between the inputs survive the mix
    assert!(witness
        .randomizations
        .iter()
        .all(|r| r == &witness.randomizations[0]));
    let images = witness.permutation.as_permutation().unwrap();
    let r = BigInt::from(witness.randomizations[0].to_biguint().unwrap().clone());
    for (i, output) in mixed.iter().enumerate() {
        assert_eq!(output, &elements[images[i]].self_apply(&r).unwrap());
    }
}
