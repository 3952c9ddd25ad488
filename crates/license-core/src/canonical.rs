//! # Canonical Serializer
//!
//! Produces the deterministic byte-exact encoding of a license that the
//! signature engine signs and verifies — the compatibility surface with
//! every already-issued license. This is total over any well-typed
//! [`License`]; there is no failure mode.
//!
//! Key sorting falls out of `serde_json`'s default `Map` representation: we
//! don't enable the `preserve_order` feature, so `serde_json::Value::Object`
//! is backed by a `BTreeMap` and is lexicographically key-sorted at every
//! nesting level for free. List order (`features`, `usage_limits`) is
//! preserved because `Vec` serializes to a JSON array regardless.

use crate::model::License;
use chrono::{DateTime, TimeZone, Utc};

/// Truncates an instant to whole seconds, discarding sub-second precision.
///
/// This truncation applies only to the canonicalization path; callers that
/// persist a license to disk may keep the issuer's original sub-second
/// precision.
#[must_use]
pub fn truncate_to_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(instant.timestamp(), 0)
        .single()
        .expect("a valid DateTime<Utc> always has a valid whole-second timestamp")
}

fn format_instant(instant: DateTime<Utc>) -> String {
    truncate_to_seconds(instant).format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Produces the canonical signing preimage for `license`.
///
/// # Panics
/// Never, for any well-typed `License` — see module docs.
#[must_use]
pub fn canonical_bytes(license: &License) -> Vec<u8> {
    let mut value =
        serde_json::to_value(license).expect("License fields are all JSON-representable");
    let object = value.as_object_mut().expect("License serializes to a JSON object");

    object.remove("signature");
    object.insert("not_before".to_owned(), serde_json::Value::String(format_instant(license.not_before)));
    object.insert("not_after".to_owned(), serde_json::Value::String(format_instant(license.not_after)));

    serde_json::to_vec(&value).expect("a JSON Value always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeatureCommon, FeatureEntitlement, UsageLimit};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn sample() -> License {
        License {
            license_id: "abc-123".into(),
            customer_id: "acme".into(),
            not_before: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap(),
            features: vec![FeatureEntitlement::Api {
                common: FeatureCommon {
                    feature_id: "f1".into(),
                    name: "Users API".into(),
                    enabled: true,
                    metadata: BTreeMap::new(),
                },
                method: "POST".into(),
                path: "/api/v1/users".into(),
                rate_limit: None,
            }],
            usage_limits: vec![UsageLimit { metric_type: "nodes".into(), max_value: 10, current_value: 0 }],
            metadata: BTreeMap::new(),
            signature: Some("deadbeef".into()),
        }
    }

    #[test]
    fn omits_signature_field_entirely() {
        let bytes = canonical_bytes(&sample());
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("signature"));
    }

    #[test]
    fn truncates_instants_and_drops_timezone_suffix() {
        let mut license = sample();
        license.not_before = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::nanoseconds(999_999_999);
        let bytes = canonical_bytes(&license);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"2024-01-02T03:04:05\""));
        assert!(!text.contains('Z'));
        assert!(!text.contains('+'));
    }

    #[test]
    fn is_compact_with_no_surrounding_whitespace() {
        let bytes = canonical_bytes(&sample());
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains(", "));
        assert!(!text.contains(": "));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn preserves_non_ascii_verbatim() {
        let mut license = sample();
        license.customer_id = "株式会社アクメ".into();
        let bytes = canonical_bytes(&license);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("株式会社アクメ"));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn object_keys_are_sorted_at_every_level() {
        let bytes = canonical_bytes(&sample());
        let text = String::from_utf8(bytes).unwrap();
        let customer_pos = text.find("\"customer_id\"").unwrap();
        let license_pos = text.find("\"license_id\"").unwrap();
        let feature_pos = text.find("\"features\"").unwrap();
        assert!(customer_pos < feature_pos);
        assert!(feature_pos < license_pos);
    }

    #[test]
    fn canonicalization_is_stable_across_reparse() {
        let license = sample();
        let json = serde_json::to_string(&license).unwrap();
        let reparsed: License = serde_json::from_str(&json).unwrap();
        assert_eq!(canonical_bytes(&license), canonical_bytes(&reparsed));
    }

    proptest::proptest! {
        /// Property 2: `canonical(L) = canonical(parse(serialize(L)))` for
        /// any customer id, after second-truncation of instants.
        #[test]
        fn canonicalization_is_stable_across_reparse_for_arbitrary_customer_ids(customer_id in ".*") {
            let mut license = sample();
            license.customer_id = customer_id;
            let json = serde_json::to_string(&license).unwrap();
            let reparsed: License = serde_json::from_str(&json).unwrap();
            proptest::prop_assert_eq!(canonical_bytes(&license), canonical_bytes(&reparsed));
        }
    }
}
