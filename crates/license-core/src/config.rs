//! # Configuration
//!
//! `VerifierConfig` is deserialized with the `config` crate, layered from a
//! base file plus environment-variable overrides. This crate owns only the
//! shape and the defaults — locating the config file on disk is left to the
//! caller.

use crate::error::LicenseError;
use crate::ntp::DEFAULT_EXTERNAL_TIME_SOURCES;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE as BASE64_URL_SAFE;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Where to load PEM key bytes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl KeySource {
    /// Reads the raw PEM bytes, from disk or the embedded vector.
    ///
    /// # Errors
    /// Returns [`LicenseError::Io`] if `Path` cannot be read.
    pub fn load(&self) -> Result<Vec<u8>, LicenseError> {
        match self {
            Self::Path(path) => {
                std::fs::read(path).map_err(|source| LicenseError::Io { path: path.clone(), source })
            }
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Verifier-side configuration: everything needed to construct a
/// [`crate::verifier::Verifier`] — the public key to check signatures
/// against, and the sealed checkpoint directory/secret the trusted-time
/// oracle anchors to.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifierConfig {
    pub public_key_source: KeySource,
    pub checkpoint_dir: PathBuf,
    /// 32-byte URL-safe base64-encoded symmetric key for the sealed
    /// checkpoint store.
    pub checkpoint_secret: String,
    #[serde(default = "default_external_time_sources")]
    pub external_time_sources: Vec<String>,
    #[serde(default = "default_max_clock_skew_seconds")]
    pub max_clock_skew_seconds: u64,
    #[serde(default = "default_checkpoint_agreement_tolerance_seconds")]
    pub checkpoint_agreement_tolerance_seconds: u64,
    #[serde(default = "default_external_reprobe_interval_seconds")]
    pub external_reprobe_interval_seconds: u64,
}

fn default_external_time_sources() -> Vec<String> {
    DEFAULT_EXTERNAL_TIME_SOURCES.iter().map(|&s| s.to_owned()).collect()
}

const fn default_max_clock_skew_seconds() -> u64 {
    300
}

const fn default_checkpoint_agreement_tolerance_seconds() -> u64 {
    1
}

const fn default_external_reprobe_interval_seconds() -> u64 {
    300
}

impl VerifierConfig {
    /// Loads configuration layered from a base file plus `LICENSE__`
    /// prefixed environment variable overrides.
    ///
    /// # Errors
    /// Returns any [`config::ConfigError`] the underlying loader raises,
    /// including a missing/malformed file or a failed deserialization.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("LICENSE").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Decodes `checkpoint_secret` into its raw 32 bytes.
    ///
    /// # Errors
    /// Returns [`LicenseError::InvalidKey`] if the string is not valid
    /// URL-safe base64 or does not decode to exactly 32 bytes.
    pub fn checkpoint_secret_bytes(&self) -> Result<[u8; 32], LicenseError> {
        let raw = BASE64_URL_SAFE.decode(self.checkpoint_secret.trim()).map_err(|e| LicenseError::InvalidKey {
            message: format!("checkpoint_secret is not valid URL-safe base64: {e}").into(),
        })?;
        raw.try_into().map_err(|raw: Vec<u8>| LicenseError::InvalidKey {
            message: format!("checkpoint_secret must decode to exactly 32 bytes, got {}", raw.len()).into(),
        })
    }

    pub(crate) fn max_clock_skew(&self) -> Duration {
        Duration::from_secs(self.max_clock_skew_seconds)
    }

    pub(crate) fn checkpoint_agreement_tolerance(&self) -> Duration {
        Duration::from_secs(self.checkpoint_agreement_tolerance_seconds)
    }

    pub(crate) fn external_reprobe_interval(&self) -> Duration {
        Duration::from_secs(self.external_reprobe_interval_seconds)
    }
}

/// Issuer-side configuration: the private key used to sign newly issued
/// licenses. Gated behind the `issuance` feature, mirroring
/// [`crate::issuer`]'s own feature gate, so a verifier-only build never
/// deserializes a config shape that names a private key source at all.
#[cfg(feature = "issuance")]
#[derive(Debug, Clone, Deserialize)]
pub struct IssuerConfig {
    pub private_key_source: KeySource,
}

#[cfg(feature = "issuance")]
impl IssuerConfig {
    /// Loads configuration layered from a base file plus `LICENSE__`
    /// prefixed environment variable overrides, the same layering
    /// [`VerifierConfig::load_from`] uses.
    ///
    /// # Errors
    /// Returns any [`config::ConfigError`] the underlying loader raises.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("LICENSE").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Decodes the configured PEM bytes into an `RsaPrivateKey`.
    ///
    /// # Errors
    /// Returns [`LicenseError::InvalidKey`] if the source cannot be read, is
    /// not valid UTF-8 PEM, or is not a valid unencrypted PKCS#8 RSA key.
    pub fn load_private_key(&self) -> Result<rsa::RsaPrivateKey, LicenseError> {
        use rsa::pkcs8::DecodePrivateKey;

        let pem_bytes = self.private_key_source.load()?;
        let pem = String::from_utf8(pem_bytes).map_err(|e| LicenseError::InvalidKey {
            message: format!("private key is not valid UTF-8 PEM: {e}").into(),
        })?;
        rsa::RsaPrivateKey::from_pkcs8_pem(pem.trim()).map_err(|e| LicenseError::InvalidKey {
            message: format!("failed to parse PEM private key: {e}").into(),
        })
    }
}
