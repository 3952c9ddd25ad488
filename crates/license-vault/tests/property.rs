use license_vault::fernet::{self, FernetKey};
use proptest::prelude::*;

proptest! {
    /// Any byte payload, sealed then opened under the same key, must come
    /// back unchanged regardless of length or content.
    #[test]
    fn seal_then_open_roundtrips_arbitrary_payloads(
        secret in proptest::array::uniform32(any::<u8>()),
        issued_at in any::<u64>(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let key = FernetKey::from_secret(&secret);
        let token = fernet::seal(&key, &plaintext, issued_at).unwrap();
        let recovered = fernet::open(&key, &token).unwrap();
        prop_assert_eq!(recovered, plaintext);
    }

    /// Opening a token under any key other than the one it was sealed with
    /// must fail closed, never panic and never return a plaintext.
    #[test]
    fn opening_with_a_different_key_never_succeeds(
        secret_a in proptest::array::uniform32(any::<u8>()),
        secret_b in proptest::array::uniform32(any::<u8>()),
        plaintext in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        // secret_a != secret_b guarantees the 32-byte secrets differ, not
        // that the signing halves (the first 16 bytes) do — a case where
        // only the encryption half differs would still fail to open, just
        // not via the HMAC check this test means to exercise. Sound here
        // because a 16-byte collision between two random secrets is
        // astronomically unlikely.
        prop_assume!(secret_a != secret_b);
        let key_a = FernetKey::from_secret(&secret_a);
        let key_b = FernetKey::from_secret(&secret_b);
        let token = fernet::seal(&key_a, &plaintext, 0).unwrap();
        prop_assert!(fernet::open(&key_b, &token).is_err());
    }
}
