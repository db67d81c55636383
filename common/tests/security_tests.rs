use common::encryption::{hybrid_decrypt, hybrid_encrypt, EnvelopeCodec, KeyPairProvider, KeyWrapping};
use common::{AsymmetricKeyPair, DECRYPTION_FAILED_MESSAGE};
use serde_json::json;
use std::sync::OnceLock;

fn pair() -> &'static AsymmetricKeyPair {
    static PAIR: OnceLock<AsymmetricKeyPair> = OnceLock::new();
    PAIR.get_or_init(|| KeyPairProvider::default().generate().expect("Failed to generate key pair"))
}

#[test]
fn test_tamper_sensitivity_every_byte() {
    let pair = pair();
    let envelope = hybrid_encrypt(&json!({"vaccine": "Pfizer", "batchNumber": "B-100"}), &pair.public_key)
        .unwrap();
    let original = base64::decode(&envelope.encrypted_data).unwrap();

    for index in 0..original.len() {
        let mut tampered = original.clone();
        tampered[index] ^= 0x01;

        let result = hybrid_decrypt(
            &base64::encode(&tampered),
            &envelope.encrypted_key,
            &pair.private_key,
        );
        let err = result.expect_err("tampered ciphertext must not decrypt");
        assert!(err.is_decryption_failure(), "byte {}: {:?}", index, err);
    }
}

#[test]
fn test_truncated_ciphertext_rejected() {
    let pair = pair();
    let envelope = hybrid_encrypt(&json!({"quantity": 50}), &pair.public_key).unwrap();
    let mut data = base64::decode(&envelope.encrypted_data).unwrap();
    data.truncate(data.len() - 16);

    let err = hybrid_decrypt(&base64::encode(&data), &envelope.encrypted_key, &pair.private_key)
        .unwrap_err();
    assert!(err.is_decryption_failure());
}

#[test]
fn test_tampered_key_rejected() {
    let pair = pair();
    let envelope = hybrid_encrypt(&json!({"quantity": 50}), &pair.public_key).unwrap();
    let mut wrapped = base64::decode(&envelope.encrypted_key).unwrap();
    wrapped[10] ^= 0x80;

    let err = hybrid_decrypt(&envelope.encrypted_data, &base64::encode(&wrapped), &pair.private_key)
        .unwrap_err();
    assert!(err.is_decryption_failure());
}

#[test]
fn test_failures_do_not_reveal_stage() {
    let pair = pair();
    let other = KeyPairProvider::default().generate().unwrap();
    let envelope = hybrid_encrypt(&json!({"quantity": 50}), &pair.public_key).unwrap();

    let wrong_key = hybrid_decrypt(&envelope.encrypted_data, &envelope.encrypted_key, &other.private_key)
        .unwrap_err();

    let mut data = base64::decode(&envelope.encrypted_data).unwrap();
    let last = data.len() - 1;
    data[last] ^= 0xff;
    let bad_payload = hybrid_decrypt(&base64::encode(&data), &envelope.encrypted_key, &pair.private_key)
        .unwrap_err();

    assert_eq!(wrong_key.to_string(), DECRYPTION_FAILED_MESSAGE);
    assert_eq!(bad_payload.to_string(), DECRYPTION_FAILED_MESSAGE);
    assert_eq!(wrong_key.user_message(), bad_payload.user_message());
}

#[test]
fn test_ciphertext_hides_plaintext() {
    let pair = pair();
    let envelope = hybrid_encrypt(&json!({"vaccine": "Pfizer"}), &pair.public_key).unwrap();
    let data = base64::decode(&envelope.encrypted_data).unwrap();

    assert!(!data.windows(6).any(|w| w == b"Pfizer"));
    assert!(!envelope.encrypted_data.contains("Pfizer"));
}

/// Legacy envelopes carry no digest, so an IV bit flip turns into a
/// matching plaintext bit flip in the first block and still decrypts.
/// The same flip on a default envelope is rejected.
#[test]
fn test_legacy_wrapping_does_not_detect_iv_tampering() {
    let pair = pair();
    let payload = json!({"quantity": 50, "vaccine": "Pfizer"});

    let legacy = EnvelopeCodec::new(KeyWrapping::Legacy);
    assert_eq!(legacy.wrapping(), KeyWrapping::Legacy);
    let envelope = legacy.encrypt(&payload, &pair.public_key).unwrap();
    let mut tampered = base64::decode(&envelope.encrypted_data).unwrap();
    // plaintext byte 2 is the 'q' of "quantity"
    tampered[2] ^= 0x01;

    let decrypted = hybrid_decrypt(
        &base64::encode(&tampered),
        &envelope.encrypted_key,
        &pair.private_key,
    )
    .unwrap();
    assert_eq!(decrypted, r#"{"puantity":50,"vaccine":"Pfizer"}"#);

    let bound = EnvelopeCodec::default();
    assert_eq!(bound.wrapping(), KeyWrapping::Bound);
    let envelope = bound.encrypt(&payload, &pair.public_key).unwrap();
    let mut tampered = base64::decode(&envelope.encrypted_data).unwrap();
    tampered[2] ^= 0x01;

    let err = bound
        .decrypt(&base64::encode(&tampered), &envelope.encrypted_key, &pair.private_key)
        .unwrap_err();
    assert!(err.is_decryption_failure());
}
