//! Offline cryptographic software-license verification engine.
//!
//! A license is a signed, canonical JSON artifact enumerating feature
//! entitlements and usage caps over a validity window. This crate verifies
//! such artifacts on customer premises under adversarial conditions where
//! the local clock cannot be trusted: [`verifier::Verifier`] combines a
//! deterministic canonical serialization ([`canonical`]), an RSA-PSS
//! signature check ([`signature`]), a multi-source trusted-time oracle
//! resistant to clock rollback ([`time_oracle`]), and a pure entitlement
//! matcher ([`matcher`]) into a single predicate-shaped query surface.
//!
//! Construction can fail — a bad key, a tampered clock, a corrupt
//! checkpoint store are all fatal at that point — but every query after
//! construction is an infallible `bool`; cryptographic or timing failures
//! never propagate as exceptions to a caller asking "is this license still
//! good".

pub mod canonical;
pub mod config;
pub mod error;
#[cfg(feature = "issuance")]
pub mod issuer;
pub mod matcher;
pub mod model;
pub mod ntp;
pub mod signature;
pub mod time_oracle;
pub mod verifier;

#[cfg(feature = "issuance")]
pub use config::IssuerConfig;
pub use config::{KeySource, VerifierConfig};
pub use error::{LicenseError, RejectReason};
#[cfg(feature = "issuance")]
pub use issuer::{IssuanceRequest, issue_license};
pub use matcher::FeatureKind;
pub use model::{FeatureCommon, FeatureEntitlement, License, UsageLimit};
pub use verifier::Verifier;
