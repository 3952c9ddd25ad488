//! # License Data Model
//!
//! The license is a plain data tree: a [`License`] root, an ordered list of
//! polymorphic [`FeatureEntitlement`] variants, and an ordered list of
//! [`UsageLimit`]s. There is no behavior attached to these types beyond
//! field access — matching happens in [`crate::matcher`], a
//! dictionary-of-handlers-over-pure-data shape instead of a class hierarchy
//! with virtual methods.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The root entity: a single issued license artifact.
///
/// Equality, ordering, and hashing are intentionally not derived — a
/// license is identified by its `license_id`, not by structural equality of
/// every field, and nothing in this crate needs to put licenses in a set or
/// map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    /// Opaque license identifier, typically a random 128-bit value rendered
    /// as hex with hyphens (e.g. a UUID).
    pub license_id: String,
    /// Opaque customer identifier.
    pub customer_id: String,
    /// Start of the validity window, inclusive, at second granularity.
    pub not_before: DateTime<Utc>,
    /// End of the validity window, inclusive, at second granularity.
    pub not_after: DateTime<Utc>,
    /// Ordered list of feature entitlements. List order is semantic: the
    /// matcher uses first-match-wins when `feature_id`s collide.
    #[serde(default)]
    pub features: Vec<FeatureEntitlement>,
    /// Ordered list of usage caps. List order is semantic for the same
    /// reason as `features`.
    #[serde(default)]
    pub usage_limits: Vec<UsageLimit>,
    /// Free-form metadata, not interpreted by this crate.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Lowercase hex of the raw RSA-PSS signature octets. `None` means the
    /// license is unsigned and therefore invalid for any query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Fields shared by every feature entitlement variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCommon {
    /// Stable identifier, unique within the license's feature list.
    pub feature_id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether the entitlement is turned on.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Free-form per-feature metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

const fn default_enabled() -> bool {
    true
}

/// A single feature entitlement. The `feature_type` discriminator is
/// serialized as a lowercase token (`api`, `service`, `ui`, `button`) to
/// stay byte-compatible with already-issued licenses — see
/// [`crate::canonical`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "feature_type", rename_all = "lowercase")]
pub enum FeatureEntitlement {
    /// A single REST/HTTP endpoint, matched on `(method, path)`.
    Api {
        #[serde(flatten)]
        common: FeatureCommon,
        method: String,
        path: String,
        /// Advisory only — the matcher never reads this field.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate_limit: Option<i64>,
    },
    /// A microservice endpoint, matched on `service_name` plus membership
    /// in `endpoints`.
    Service {
        #[serde(flatten)]
        common: FeatureCommon,
        service_name: String,
        version: String,
        #[serde(default)]
        endpoints: Vec<String>,
    },
    /// A UI component, matched on `component_id`. Uniquely among the four
    /// variants, the matcher consults `visibility`, not `enabled`.
    Ui {
        #[serde(flatten)]
        common: FeatureCommon,
        component_id: String,
        component_type: String,
        #[serde(default = "default_enabled")]
        visibility: bool,
    },
    /// A UI button, matched on `button_id`.
    Button {
        #[serde(flatten)]
        common: FeatureCommon,
        button_id: String,
        action_type: String,
    },
}

impl FeatureEntitlement {
    /// The shared identifier, regardless of variant.
    #[must_use]
    pub fn feature_id(&self) -> &str {
        &self.common().feature_id
    }

    /// The shared `enabled` flag. Note that [`FeatureEntitlement::Ui`]'s
    /// matching answer comes from `visibility`, not this flag — see
    /// [`crate::matcher::check_ui`].
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.common().enabled
    }

    fn common(&self) -> &FeatureCommon {
        match self {
            Self::Api { common, .. }
            | Self::Service { common, .. }
            | Self::Ui { common, .. }
            | Self::Button { common, .. } => common,
        }
    }
}

/// A single named usage cap with its current consumption.
///
/// Duplicate `metric_type`s across a license's `usage_limits` are left
/// undefined at this layer; this crate's matcher pins the behavior to
/// first-match, same as feature entitlements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLimit {
    pub metric_type: String,
    pub max_value: u64,
    #[serde(default)]
    pub current_value: u64,
}
