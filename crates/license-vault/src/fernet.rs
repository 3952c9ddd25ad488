//! # Fernet Token Codec
//!
//! Implements the reference [Fernet](https://github.com/fernet/spec) token
//! format byte-for-byte: AES-128-CBC encryption under one half of the key,
//! HMAC-SHA256 authentication under the other half, base64url encoding.
//!
//! ```text
//! token = base64url( version(1) || timestamp(8, big-endian) || iv(16) || ciphertext || hmac(32) )
//! ```
//!
//! This is *not* the vault crate's own `[V][FLAGS][NONCE][CT][TAG]` payload
//! format — it deliberately matches the public Fernet spec so that sealed
//! checkpoint files can be inspected or produced by any standard Fernet
//! implementation, since the on-disk format is a documented external
//! interface rather than an internal detail.

use crate::error::CheckpointError;
use aes::Aes128;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE as BASE64_URL_SAFE;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

const VERSION: u8 = 0x80;
const IV_LEN: usize = 16;
const HMAC_LEN: usize = 32;
/// `version(1) + timestamp(8)`
const HEADER_LEN: usize = 9;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// A split Fernet key: one half signs, one half encrypts.
///
/// Zeroized on drop so key material does not linger in memory longer than
/// the store needs it.
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct FernetKey {
    signing_key: [u8; 16],
    encryption_key: [u8; 16],
}

impl FernetKey {
    /// Splits a raw 32-byte secret into Fernet's signing/encryption halves.
    ///
    /// Per the Fernet spec, the first 16 bytes sign (HMAC) and the last 16
    /// bytes encrypt (AES-128).
    #[must_use]
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let mut signing_key = [0u8; 16];
        let mut encryption_key = [0u8; 16];
        signing_key.copy_from_slice(&secret[..16]);
        encryption_key.copy_from_slice(&secret[16..]);
        Self { signing_key, encryption_key }
    }
}

/// Encrypts `plaintext` into a Fernet token using a fresh random IV.
///
/// # Errors
/// This function is infallible in practice (AES-CBC with PKCS7 padding
/// cannot fail for any input length); it returns `Result` only to keep the
/// call sites uniform with [`open`].
pub fn seal(key: &FernetKey, plaintext: &[u8], issued_at: u64) -> Result<String, CheckpointError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    seal_with_iv(key, plaintext, issued_at, iv)
}

/// Encrypts `plaintext` into a Fernet token using an explicit IV.
///
/// Exposed separately so tests can assert against a known ciphertext; real
/// callers should use [`seal`].
pub fn seal_with_iv(
    key: &FernetKey,
    plaintext: &[u8],
    issued_at: u64,
    iv: [u8; IV_LEN],
) -> Result<String, CheckpointError> {
    let mut buf = vec![0u8; HEADER_LEN + IV_LEN + plaintext.len() + 16];
    buf[0] = VERSION;
    buf[1..9].copy_from_slice(&issued_at.to_be_bytes());
    buf[9..9 + IV_LEN].copy_from_slice(&iv);

    let ct_start = HEADER_LEN + IV_LEN;
    buf[ct_start..ct_start + plaintext.len()].copy_from_slice(plaintext);

    let encryptor = Aes128CbcEnc::new_from_slices(&key.encryption_key, &iv)
        .expect("16-byte key and IV are always valid for AES-128-CBC");
    let ciphertext_len = encryptor
        .encrypt_padded_mut::<Pkcs7>(&mut buf[ct_start..], plaintext.len())
        .map_err(|e| CheckpointError::Encryption { message: e.to_string().into() })?
        .len();
    buf.truncate(ct_start + ciphertext_len);

    let mut mac = <HmacSha256 as Mac>::new_from_slice(&key.signing_key)
        .expect("HMAC-SHA256 accepts any key length");
    mac.update(&buf);
    buf.extend_from_slice(&mac.finalize().into_bytes());

    Ok(BASE64_URL_SAFE.encode(buf))
}

/// Decrypts and authenticates a Fernet token, returning its plaintext.
///
/// Verifies the HMAC in constant time before touching the ciphertext, and
/// never distinguishes "bad base64" from "bad HMAC" from "bad padding" in
/// its success/failure outcome beyond the error variant — all three are
/// equally "this token is not trustworthy".
///
/// # Errors
/// Returns [`CheckpointError::Decryption`] if the token is not valid
/// base64url, too short to contain a header/IV/HMAC, carries an unknown
/// version byte, fails HMAC verification, or fails to decrypt/unpad.
pub fn open(key: &FernetKey, token: &str) -> Result<Vec<u8>, CheckpointError> {
    let raw = BASE64_URL_SAFE
        .decode(token.trim())
        .map_err(|e| CheckpointError::Decryption { message: format!("invalid base64: {e}").into() })?;

    if raw.len() < HEADER_LEN + IV_LEN + HMAC_LEN {
        return Err(CheckpointError::Decryption { message: "token too short".into() });
    }

    let (signed, mac_bytes) = raw.split_at(raw.len() - HMAC_LEN);
    if signed[0] != VERSION {
        return Err(CheckpointError::Decryption { message: "unsupported token version".into() });
    }

    let mut mac = <HmacSha256 as Mac>::new_from_slice(&key.signing_key)
        .expect("HMAC-SHA256 accepts any key length");
    mac.update(signed);
    let expected = mac.finalize().into_bytes();
    if expected.as_slice().ct_eq(mac_bytes).unwrap_u8() != 1 {
        return Err(CheckpointError::Decryption { message: "HMAC authentication failed".into() });
    }

    let iv: [u8; IV_LEN] = signed[HEADER_LEN..HEADER_LEN + IV_LEN]
        .try_into()
        .expect("slice length fixed above");
    let mut ciphertext = signed[HEADER_LEN + IV_LEN..].to_vec();

    let decryptor = Aes128CbcDec::new_from_slices(&key.encryption_key, &iv)
        .expect("16-byte key and IV are always valid for AES-128-CBC");
    let plaintext_len = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut ciphertext)
        .map_err(|_| CheckpointError::Decryption { message: "padding or ciphertext invalid".into() })?
        .len();
    ciphertext.truncate(plaintext_len);

    Ok(ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> FernetKey {
        FernetKey::from_secret(&[7u8; 32])
    }

    #[test]
    fn seal_then_open_roundtrips() {
        let k = key();
        let token = seal(&k, b"1700000000.125", 1_700_000_000).unwrap();
        let plaintext = open(&k, &token).unwrap();
        assert_eq!(plaintext, b"1700000000.125");
    }

    #[test]
    fn tampered_token_fails_hmac() {
        let k = key();
        let mut token = seal(&k, b"hello", 1).unwrap();
        token.push('A');
        assert!(open(&k, &token).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let k1 = FernetKey::from_secret(&[1u8; 32]);
        let k2 = FernetKey::from_secret(&[2u8; 32]);
        let token = seal(&k1, b"payload", 1).unwrap();
        assert!(open(&k2, &token).is_err());
    }

    #[test]
    fn deterministic_with_fixed_iv() {
        let k = key();
        let iv = [9u8; IV_LEN];
        let a = seal_with_iv(&k, b"same", 5, iv).unwrap();
        let b = seal_with_iv(&k, b"same", 5, iv).unwrap();
        assert_eq!(a, b);
    }
}
