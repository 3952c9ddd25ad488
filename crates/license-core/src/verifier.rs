//! # Verifier Facade
//!
//! Orchestrates the canonical serializer, signature engine, trusted-time
//! oracle, sealed checkpoint, and entitlement matcher behind a single
//! predicate-shaped query surface. Construction performs the full
//! oracle/checkpoint initialization and is the only place this module
//! raises a typed error; every query method after that is an infallible
//! `bool`.

use crate::canonical::{canonical_bytes, truncate_to_seconds};
use crate::config::VerifierConfig;
use crate::error::{LicenseError, RejectReason};
use crate::matcher::{self, FeatureKind};
use crate::model::License;
use crate::signature;
use crate::time_oracle::{TimeOracleConfig, TrustedTimeOracle};
use chrono::{DateTime, Utc};
use license_vault::CheckpointStore;
use rsa::RsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use std::fmt;

/// Holds the public key, the sealed checkpoint, and the trusted-time oracle
/// for one verification context.
///
/// Not cheaply clonable by design: the checkpoint/oracle state is mutable
/// and must not fork across copies. `Verifier` is `Send` but not internally
/// synchronized — callers sharing an instance across threads must wrap it
/// themselves (e.g. in a `Mutex`).
pub struct Verifier {
    public_key: RsaPublicKey,
    oracle: TrustedTimeOracle,
    on_reject: Option<Box<dyn Fn(RejectReason) + Send + Sync>>,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier").field("oracle", &self.oracle).finish_non_exhaustive()
    }
}

impl Verifier {
    /// Builds a verifier with no diagnostic hook.
    ///
    /// # Errors
    /// See [`Self::with_reject_hook`].
    pub fn new(config: VerifierConfig) -> Result<Self, LicenseError> {
        Self::with_reject_hook(config, None)
    }

    /// Builds a verifier, optionally wired to an `on_reject` diagnostic
    /// callback invoked with the typed reason behind every `false` return.
    /// The callback never changes the boolean answer a caller sees — it
    /// exists only for logs/metrics and never changes the boolean answer.
    ///
    /// # Errors
    /// Returns [`LicenseError::InvalidKey`] if the configured public key is
    /// not valid UTF-8 PEM or not a valid `SubjectPublicKeyInfo`. Returns
    /// [`LicenseError::SystemTimeTampered`] or
    /// [`LicenseError::CheckpointCorrupt`] if trusted-time oracle
    /// initialization fails — see [`TrustedTimeOracle::new`].
    pub fn with_reject_hook(
        config: VerifierConfig,
        on_reject: Option<Box<dyn Fn(RejectReason) + Send + Sync>>,
    ) -> Result<Self, LicenseError> {
        let pem_bytes = config.public_key_source.load()?;
        let pem = String::from_utf8(pem_bytes).map_err(|e| LicenseError::InvalidKey {
            message: format!("public key is not valid UTF-8 PEM: {e}").into(),
        })?;
        let public_key = RsaPublicKey::from_public_key_pem(pem.trim()).map_err(|e| LicenseError::InvalidKey {
            message: format!("failed to parse PEM public key: {e}").into(),
        })?;

        let checkpoint_secret = config.checkpoint_secret_bytes()?;
        let checkpoint = CheckpointStore::new(
            config.checkpoint_dir.clone(),
            &checkpoint_secret,
            config.checkpoint_agreement_tolerance(),
        );

        let oracle_config = TimeOracleConfig {
            external_time_sources: config.external_time_sources.clone(),
            max_clock_skew: config.max_clock_skew(),
            external_reprobe_interval: config.external_reprobe_interval(),
            checkpoint_agreement_tolerance: config.checkpoint_agreement_tolerance(),
        };
        let oracle = TrustedTimeOracle::new(oracle_config, checkpoint)?;

        Ok(Self { public_key, oracle, on_reject })
    }

    /// Assembles a verifier from an already-constructed public key and
    /// trusted-time oracle, bypassing [`VerifierConfig`] loading entirely.
    ///
    /// This is the escape hatch callers (and this crate's own integration
    /// tests) use to drive a [`Verifier`] against an oracle built with
    /// injected clock/external-time sources instead of the real OS clock —
    /// see [`TrustedTimeOracle::with_sources`].
    #[must_use]
    pub fn from_parts(
        public_key: RsaPublicKey,
        oracle: TrustedTimeOracle,
        on_reject: Option<Box<dyn Fn(RejectReason) + Send + Sync>>,
    ) -> Self {
        Self { public_key, oracle, on_reject }
    }

    fn reject(&self, reason: RejectReason) -> bool {
        if let Some(hook) = &self.on_reject {
            hook(reason);
        }
        tracing::debug!(reason = %reason, "license validation rejected");
        false
    }

    /// Checks the trusted-time oracle, the validity window, and the signature
    /// in order, then — only on full success — ratchets the sealed checkpoint
    /// forward to `trusted_now`.
    /// The ratchet happens even if a later entitlement query on this same
    /// license turns out to return `false`; it is tied to *this* successful
    /// `validate` call, not to the caller's eventual use of the result.
    pub fn validate(&mut self, license: &License) -> bool {
        let assessment = self.oracle.assess();
        if !assessment.trusted {
            return self.reject(RejectReason::LicenseClockUntrusted);
        }

        let trusted_now: DateTime<Utc> = truncate_to_seconds(assessment.now.into());
        let not_before = truncate_to_seconds(license.not_before);
        let not_after = truncate_to_seconds(license.not_after);
        if trusted_now < not_before || trusted_now > not_after {
            return self.reject(RejectReason::LicenseExpired);
        }

        let Some(signature_hex) = license.signature.as_deref() else {
            return self.reject(RejectReason::LicenseSignatureInvalid);
        };
        let canonical = canonical_bytes(license);
        if !signature::verify(&self.public_key, &canonical, signature_hex) {
            return self.reject(RejectReason::LicenseSignatureInvalid);
        }

        if let Err(error) = self.oracle.ratchet(assessment.now) {
            tracing::warn!(%error, "failed to ratchet sealed checkpoint after successful validation");
        }
        true
    }

    /// `validate(license) AND check_api(license, method, path)`.
    pub fn check_api(&mut self, license: &License, method: &str, path: &str) -> bool {
        self.validate(license) && matcher::check_api(license, method, path)
    }

    /// `validate(license) AND check_service(license, service_name, endpoint)`.
    pub fn check_service(&mut self, license: &License, service_name: &str, endpoint: &str) -> bool {
        self.validate(license) && matcher::check_service(license, service_name, endpoint)
    }

    /// `validate(license) AND check_ui(license, component_id)`.
    pub fn check_ui(&mut self, license: &License, component_id: &str) -> bool {
        self.validate(license) && matcher::check_ui(license, component_id)
    }

    /// `validate(license) AND check_button(license, button_id)`.
    pub fn check_button(&mut self, license: &License, button_id: &str) -> bool {
        self.validate(license) && matcher::check_button(license, button_id)
    }

    /// `validate(license) AND check_feature(license, feature_id, kind)`.
    pub fn check_feature(&mut self, license: &License, feature_id: &str, kind: FeatureKind) -> bool {
        self.validate(license) && matcher::check_feature(license, feature_id, kind)
    }

    /// `validate(license) AND check_usage_limit(license, metric_type, delta)`.
    pub fn check_usage_limit(&mut self, license: &License, metric_type: &str, delta: u64) -> bool {
        self.validate(license) && matcher::check_usage_limit(license, metric_type, delta)
    }
}
