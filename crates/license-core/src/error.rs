//! # Error Taxonomy
//!
//! Construction-time failures propagate as a typed [`LicenseError`]; query-time
//! failures never do — [`crate::verifier::Verifier`] collapses every one of
//! them to `false`, surfacing the distinction only through an optional
//! diagnostic hook via [`RejectReason`]. The boolean contract must never
//! leak this distinction to an untrusted caller.

use std::borrow::Cow;
use std::path::PathBuf;

/// Fatal construction-time and fallback runtime error kinds.
#[derive(Debug, thiserror::Error)]
pub enum LicenseError {
    /// PEM decode failure, or the PEM held the wrong key kind.
    #[error("invalid key material: {message}")]
    InvalidKey { message: Cow<'static, str> },

    /// A trusted-time source failed during oracle construction: the host
    /// clock read before the computed boot instant, a reachable external
    /// source diverged beyond tolerance, or the sealed checkpoint could not
    /// be read.
    #[error("system time appears tampered: {message}")]
    SystemTimeTampered { message: Cow<'static, str> },

    /// Fewer than two sealed-checkpoint files decrypted, or the decrypted
    /// timestamps disagreed beyond tolerance.
    #[error("sealed checkpoint store is corrupt: {source}")]
    CheckpointCorrupt {
        #[source]
        source: license_vault::CheckpointError,
    },

    /// An I/O failure reading a configured key file from disk.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single `validate`/query call returned `false`.
///
/// Never returned to callers directly — only reachable through the
/// diagnostic hook a [`crate::verifier::Verifier`] is optionally configured
/// with at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// `trusted_now` fell outside `[not_before, not_after]`.
    LicenseExpired,
    /// Canonical bytes did not match the signature under the public key, or
    /// the signature was missing or malformed.
    LicenseSignatureInvalid,
    /// The trusted-time oracle reported the host clock as untrustworthy.
    LicenseClockUntrusted,
}

impl RejectReason {
    /// A short machine-stable tag, useful for structured log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LicenseExpired => "license_expired",
            Self::LicenseSignatureInvalid => "license_signature_invalid",
            Self::LicenseClockUntrusted => "license_clock_untrusted",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
