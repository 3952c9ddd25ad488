//! # Entitlement Matcher
//!
//! Pure first-match-wins lookups over an already-validated license.
//! None of these functions touch the clock, the signature, or the
//! checkpoint — that is [`crate::verifier::Verifier`]'s job; a license
//! handed here is assumed to already be trusted.

use crate::model::{FeatureEntitlement, License};

/// Returns the `enabled` flag of the first API-variant feature whose
/// `(method, path)` equals the query, or `false` if none matches.
#[must_use]
pub fn check_api(license: &License, method: &str, path: &str) -> bool {
    license.features.iter().find_map(|f| match f {
        FeatureEntitlement::Api { common, method: m, path: p, .. } if m == method && p == path => {
            Some(common.enabled)
        }
        _ => None,
    }) == Some(true)
}

/// Returns the `enabled` flag of the first Service-variant feature whose
/// `service_name` matches and whose `endpoints` contains `endpoint`.
#[must_use]
pub fn check_service(license: &License, service_name: &str, endpoint: &str) -> bool {
    license.features.iter().find_map(|f| match f {
        FeatureEntitlement::Service { common, service_name: s, endpoints, .. }
            if s == service_name && endpoints.iter().any(|e| e == endpoint) =>
        {
            Some(common.enabled)
        }
        _ => None,
    }) == Some(true)
}

/// Returns the `visibility` flag — not `enabled` — of the first UI-variant
/// feature whose `component_id` equals the query.
#[must_use]
pub fn check_ui(license: &License, component_id: &str) -> bool {
    license.features.iter().find_map(|f| match f {
        FeatureEntitlement::Ui { component_id: c, visibility, .. } if c == component_id => Some(*visibility),
        _ => None,
    }) == Some(true)
}

/// Returns the `enabled` flag of the first Button-variant feature whose
/// `button_id` equals the query.
#[must_use]
pub fn check_button(license: &License, button_id: &str) -> bool {
    license.features.iter().find_map(|f| match f {
        FeatureEntitlement::Button { common, button_id: b, .. } if b == button_id => Some(common.enabled),
        _ => None,
    }) == Some(true)
}

/// A feature-type discriminator for [`check_feature`], independent of the
/// payload a query cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Api,
    Service,
    Ui,
    Button,
}

fn kind_of(feature: &FeatureEntitlement) -> FeatureKind {
    match feature {
        FeatureEntitlement::Api { .. } => FeatureKind::Api,
        FeatureEntitlement::Service { .. } => FeatureKind::Service,
        FeatureEntitlement::Ui { .. } => FeatureKind::Ui,
        FeatureEntitlement::Button { .. } => FeatureKind::Button,
    }
}

/// Returns the `enabled` flag of the first feature matching both
/// `feature_id` and `kind`.
#[must_use]
pub fn check_feature(license: &License, feature_id: &str, kind: FeatureKind) -> bool {
    license
        .features
        .iter()
        .find(|f| f.feature_id() == feature_id && kind_of(f) == kind)
        .is_some_and(FeatureEntitlement::enabled)
}

/// True iff `current_value + delta <= max_value` for the first usage limit
/// matching `metric_type`. A metric with no declared limit is unlimited.
#[must_use]
pub fn check_usage_limit(license: &License, metric_type: &str, delta: u64) -> bool {
    license
        .usage_limits
        .iter()
        .find(|limit| limit.metric_type == metric_type)
        .is_none_or(|limit| limit.current_value.saturating_add(delta) <= limit.max_value)
}
