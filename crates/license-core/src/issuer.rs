//! # Issuer
//!
//! A thin mirror of the verifier's canonicalization and signing contract.
//! `issue_license` assigns a random license id, signs the canonical bytes,
//! and returns the completed artifact — it never touches the filesystem;
//! writing the result to disk is left to the caller.
//!
//! Gated behind the `issuance` feature so a verifier-only build never links
//! private-key handling code.

use crate::canonical::canonical_bytes;
use crate::model::{FeatureEntitlement, License, UsageLimit};
use crate::signature;
use chrono::{DateTime, Utc};
use rsa::RsaPrivateKey;
use std::collections::BTreeMap;
use uuid::Uuid;

/// The caller-supplied fields of a new license; `license_id` and
/// `signature` are computed by [`issue_license`].
#[derive(Debug, Clone)]
pub struct IssuanceRequest {
    pub customer_id: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub features: Vec<FeatureEntitlement>,
    pub usage_limits: Vec<UsageLimit>,
    pub metadata: BTreeMap<String, String>,
}

/// Assigns a random 128-bit hex-with-hyphens license id, signs the
/// canonical bytes of the resulting license under `private_key`, and
/// returns the completed, signed artifact.
#[must_use]
pub fn issue_license(request: IssuanceRequest, private_key: &RsaPrivateKey) -> License {
    let mut license = License {
        license_id: Uuid::new_v4().to_string(),
        customer_id: request.customer_id,
        not_before: request.not_before,
        not_after: request.not_after,
        features: request.features,
        usage_limits: request.usage_limits,
        metadata: request.metadata,
        signature: None,
    };

    let canonical = canonical_bytes(&license);
    license.signature = Some(signature::sign(private_key, &canonical));
    license
}
