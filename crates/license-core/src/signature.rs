//! # Signature Engine
//!
//! RSA-PSS-SHA256 signing and verification over the canonical byte encoding
//! produced by [`crate::canonical`]. The salt length is not the RSA crate's
//! default — it is pinned to the exact value already-issued licenses were
//! signed with: `key_size_bytes - hash_len - 2` (the maximum PSS salt length
//! for a SHA-256 digest), so verification of an externally-issued license
//! never depends on guessing the issuer's salt policy.
//!
//! A bad signature here is never surfaced as a typed error to the caller
//! that only wants a yes/no answer — [`verify`] collapses every failure mode
//! (malformed hex, wrong length, cryptographic mismatch) to `false`. Callers
//! that need the distinction use [`crate::verifier::Verifier`], which
//! records the reason via its diagnostic hook before downgrading to `bool`.

use rsa::pss::{Signature, SigningKey, VerifyingKey};
use rsa::sha2::{Digest, Sha256};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier as _};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

/// The maximum PSS salt length for a SHA-256 digest under a modulus of
/// `key_size_bytes` octets: `key_size_bytes - hash_len - 2`.
fn max_salt_len(key_size_bytes: usize) -> usize {
    key_size_bytes - Sha256::output_size() - 2
}

/// Signs `message` with `private_key`, returning lowercase hex of the raw
/// PSS signature octets.
///
/// Uses the maximum salt length for a SHA-256 digest under this key's
/// modulus size — not the `rsa` crate's own default of a digest-sized salt —
/// matching the salt length already-issued licenses were signed with.
#[must_use]
pub fn sign(private_key: &RsaPrivateKey, message: &[u8]) -> String {
    let salt_len = max_salt_len(private_key.size());
    let signing_key = SigningKey::<Sha256>::new_with_salt_len(private_key.clone(), salt_len);
    let signature = signing_key.sign_with_rng(&mut rand::thread_rng(), message);
    hex::encode(signature.to_bytes())
}

/// Verifies that `signature_hex` is a valid RSA-PSS-SHA256 signature of
/// `message` under `public_key`.
///
/// Returns `false` — never an error — for any failure: malformed hex,
/// wrong-length signature, or a cryptographic mismatch.
#[must_use]
pub fn verify(public_key: &RsaPublicKey, message: &[u8], signature_hex: &str) -> bool {
    let Ok(raw) = hex::decode(signature_hex) else { return false };
    let Ok(signature) = Signature::try_from(raw.as_slice()) else { return false };
    let salt_len = max_salt_len(public_key.size());
    let verifying_key = VerifyingKey::<Sha256>::new_with_salt_len(public_key.clone(), salt_len);
    verifying_key.verify(message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let private_key =
            RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("2048-bit RSA keygen");
        let public_key = RsaPublicKey::from(&private_key);
        (private_key, public_key)
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let (sk, pk) = keypair();
        let message = b"license bytes go here";
        let signature = sign(&sk, message);
        assert!(verify(&pk, message, &signature));
    }

    #[test]
    fn tampered_message_fails_verification() {
        let (sk, pk) = keypair();
        let signature = sign(&sk, b"original message");
        assert!(!verify(&pk, b"tampered message", &signature));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let (sk, _) = keypair();
        let (_, other_pk) = keypair();
        let message = b"some license bytes";
        let signature = sign(&sk, message);
        assert!(!verify(&other_pk, message, &signature));
    }

    #[test]
    fn malformed_hex_fails_closed_without_panicking() {
        let (_, pk) = keypair();
        assert!(!verify(&pk, b"message", "not-valid-hex!!"));
    }

    #[test]
    fn empty_signature_fails_closed() {
        let (_, pk) = keypair();
        assert!(!verify(&pk, b"message", ""));
    }

    #[test]
    fn salt_length_is_maximal_for_the_key_size() {
        let (sk, pk) = keypair();
        let message = b"salt length probe";
        let signature_hex = sign(&sk, message);
        let raw = hex::decode(&signature_hex).unwrap();
        assert_eq!(raw.len(), pk.size());
        assert!(verify(&pk, message, &signature_hex));
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(8))]

        /// Property 1: for any message, `verify(sign(message, sk), pk) = ok`.
        #[test]
        fn sign_then_verify_round_trips_for_arbitrary_messages(message in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256)) {
            let (sk, pk) = keypair();
            let signature_hex = sign(&sk, &message);
            proptest::prop_assert!(verify(&pk, &message, &signature_hex));
        }
    }
}
