//! Key rotation through the keyset router.

use fpeset::registry::{FfxKeyType, KeyTemplate};
use fpeset::{
    Fpe, FpeError, FpeParams, KeyStatus, KeysetHandle, OutputPrefixType, Registry,
    UnknownCharacterStrategy, PREFIX_LEN,
};

const PLAINTEXT: &[u8] = b"Call me Ishmael, 1851";

fn skip() -> FpeParams {
    FpeParams::from(UnknownCharacterStrategy::Skip)
}

#[test]
fn test_rotation_keeps_old_ciphertexts_readable() {
    let registry = Registry::with_defaults();
    let template = FfxKeyType::Ff31_256Alphanumeric.template();

    // 1. Encrypt under the original raw primary.
    let mut handle = KeysetHandle::generate(&registry, &template).unwrap();
    let old_primary = handle.primary_id();
    let old_ct = handle.primitive(&registry).unwrap().encrypt_with(PLAINTEXT, &skip()).unwrap();
    assert_eq!(old_ct.len(), PLAINTEXT.len());

    // 2. Rotate to a prefixed primary.
    let new_primary = handle
        .generate_key(&registry, &KeyTemplate::tink(template.format.clone()))
        .unwrap();
    handle.set_primary(new_primary).unwrap();
    let fpe = handle.primitive(&registry).unwrap();
    assert_eq!(fpe.primary_key_id(), new_primary);

    let new_ct = fpe.encrypt_with(PLAINTEXT, &skip()).unwrap();
    assert_eq!(new_ct.len(), PREFIX_LEN + PLAINTEXT.len());
    assert_eq!(new_ct[0], 0x01);
    assert_eq!(&new_ct[1..PREFIX_LEN], &new_primary.to_be_bytes());

    // 3. Both ciphertexts decrypt: the new one by prefix, the old one by
    //    raw fallback.
    assert_eq!(fpe.decrypt_with(&new_ct, &skip()).unwrap(), PLAINTEXT);
    assert_eq!(fpe.decrypt_with(&old_ct, &skip()).unwrap(), PLAINTEXT);

    // 4. Retire the old key. Its ciphertexts can no longer be read.
    handle.disable(old_primary).unwrap();
    let fpe = handle.primitive(&registry).unwrap();
    assert!(matches!(
        fpe.decrypt_with(&old_ct, &skip()),
        Err(FpeError::DecryptionFailed)
    ));
    assert_eq!(fpe.decrypt_with(&new_ct, &skip()).unwrap(), PLAINTEXT);

    let info = handle.info();
    assert_eq!(info.primary_key_id, new_primary);
    let old_info = info.key_info.iter().find(|k| k.key_id == old_primary).unwrap();
    assert_eq!(old_info.status, KeyStatus::Disabled);
    assert_eq!(old_info.output_prefix_type, OutputPrefixType::Raw);
}

#[test]
fn test_prefixed_keys_with_the_same_alphabet_route_exactly() {
    let registry = Registry::with_defaults();
    let template = KeyTemplate::tink(FfxKeyType::Ff31_128Digits.template().format);

    let mut handle = KeysetHandle::generate(&registry, &template).unwrap();
    let first_ct = handle.primitive(&registry).unwrap().encrypt(b"4111111111111111").unwrap();

    let second = handle.generate_key(&registry, &template).unwrap();
    handle.set_primary(second).unwrap();
    let fpe = handle.primitive(&registry).unwrap();
    let second_ct = fpe.encrypt(b"4111111111111111").unwrap();

    assert_ne!(first_ct[..PREFIX_LEN], second_ct[..PREFIX_LEN]);
    assert_eq!(fpe.decrypt(&first_ct).unwrap(), b"4111111111111111");
    assert_eq!(fpe.decrypt(&second_ct).unwrap(), b"4111111111111111");
}

#[test]
fn test_unknown_keyset_cannot_decrypt() {
    let registry = Registry::with_defaults();
    let template = KeyTemplate::tink(FfxKeyType::Ff31_256Alphanumeric.template().format);

    let a = KeysetHandle::generate(&registry, &template).unwrap().primitive(&registry).unwrap();
    let b = KeysetHandle::generate(&registry, &template).unwrap().primitive(&registry).unwrap();

    let ciphertext = a.encrypt(b"Foobar").unwrap();
    let err = b.decrypt(&ciphertext).unwrap_err();
    assert!(matches!(err, FpeError::DecryptionFailed));
}

#[test]
fn test_encrypt_error_propagates_from_primary() {
    let registry = Registry::with_defaults();
    let handle = KeysetHandle::generate(&registry, &FfxKeyType::Ff31_256Digits.template()).unwrap();
    let fpe = handle.primitive(&registry).unwrap();
    assert!(matches!(
        fpe.encrypt(b"4111-1111"),
        Err(FpeError::IncompatiblePlaintext { .. })
    ));
}

#[test]
fn test_keyset_shared_across_threads() {
    let registry = Registry::with_defaults();
    let handle =
        KeysetHandle::generate(&registry, &FfxKeyType::Ff31_192Alphanumeric.template()).unwrap();
    let fpe = std::sync::Arc::new(handle.primitive(&registry).unwrap());

    let threads: Vec<_> = (0..4)
        .map(|i| {
            let fpe = std::sync::Arc::clone(&fpe);
            std::thread::spawn(move || {
                let plaintext = format!("thread {} says hello", i);
                let ct = fpe.encrypt_with(plaintext.as_bytes(), &skip()).unwrap();
                assert_eq!(fpe.decrypt_with(&ct, &skip()).unwrap(), plaintext.as_bytes());
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }
}
