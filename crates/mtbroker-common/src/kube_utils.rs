//! Shared Kubernetes helpers: ownership, naming, API versions and semantic
//! spec comparison.

use kube::api::GroupVersionKind;
use kube::{Resource, ResourceExt};
use serde_json::Value;

/// Default cluster domain for in-cluster service hostnames
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";

/// Split an apiVersion into (group, version)
///
/// Core resources have no group: `v1` -> ("", "v1").
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Build a GroupVersionKind from an apiVersion and kind
pub fn gvk_for(api_version: &str, kind: &str) -> GroupVersionKind {
    let (group, version) = parse_api_version(api_version);
    GroupVersionKind::gvk(&group, &version, kind)
}

/// Fully qualified in-cluster hostname of a Service
pub fn service_hostname(name: &str, namespace: &str, cluster_domain: &str) -> String {
    format!("{}.{}.svc.{}", name, namespace, cluster_domain)
}

/// Whether `owner` is the controller owner of `obj`
///
/// Matches on UID, like the garbage collector does.
pub fn is_controlled_by<O, K>(obj: &O, owner: &K) -> bool
where
    O: Resource,
    K: Resource,
{
    let Some(owner_uid) = owner.meta().uid.as_deref() else {
        return false;
    };
    obj.owner_references()
        .iter()
        .any(|r| r.controller == Some(true) && r.uid == owner_uid)
}

/// Semantic "derivative" comparison of two JSON documents
///
/// Returns true when every field set in `expected` has the same value in
/// `actual`. Unset fields in `expected` (null, empty strings, empty
/// collections) match anything, so defaults filled in by the API server or
/// by other controllers on `actual` don't count as drift. Numbers and
/// booleans compare exactly.
pub fn is_semantic_derivative(expected: &Value, actual: &Value) -> bool {
    match expected {
        Value::Null => true,
        Value::String(s) if s.is_empty() => true,
        Value::Array(items) if items.is_empty() => true,
        Value::Object(fields) if fields.is_empty() => true,
        Value::Object(fields) => fields.iter().all(|(key, value)| {
            is_semantic_derivative(value, actual.get(key).unwrap_or(&Value::Null))
        }),
        Value::Array(items) => match actual {
            Value::Array(actual_items) if actual_items.len() >= items.len() => items
                .iter()
                .zip(actual_items)
                .all(|(e, a)| is_semantic_derivative(e, a)),
            _ => false,
        },
        other => other == actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use serde_json::json;

    fn config_map(uid: &str, owners: Vec<OwnerReference>) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(format!("cm-{uid}")),
                uid: Some(uid.to_string()),
                owner_references: Some(owners),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn owner_ref(uid: &str, controller: bool) -> OwnerReference {
        OwnerReference {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            name: "owner".to_string(),
            uid: uid.to_string(),
            controller: Some(controller),
            block_owner_deletion: Some(true),
        }
    }

    #[test]
    fn test_parse_api_version() {
        assert_eq!(
            parse_api_version("messaging.knative.dev/v1"),
            ("messaging.knative.dev".to_string(), "v1".to_string())
        );
        assert_eq!(parse_api_version("v1"), (String::new(), "v1".to_string()));
    }

    #[test]
    fn test_gvk_for() {
        let gvk = gvk_for("sources.knative.dev/v1beta2", "PingSource");
        assert_eq!(gvk.group, "sources.knative.dev");
        assert_eq!(gvk.version, "v1beta2");
        assert_eq!(gvk.kind, "PingSource");
    }

    #[test]
    fn test_service_hostname() {
        assert_eq!(
            service_hostname("broker-filter", "knative-testing", DEFAULT_CLUSTER_DOMAIN),
            "broker-filter.knative-testing.svc.cluster.local"
        );
    }

    #[test]
    fn test_is_controlled_by() {
        let owner = config_map("owner-uid", vec![]);
        let owned = config_map("child", vec![owner_ref("owner-uid", true)]);
        let referenced = config_map("child", vec![owner_ref("owner-uid", false)]);
        let foreign = config_map("child", vec![owner_ref("other-uid", true)]);

        assert!(is_controlled_by(&owned, &owner));
        assert!(!is_controlled_by(&referenced, &owner));
        assert!(!is_controlled_by(&foreign, &owner));
    }

    #[test]
    fn test_derivative_ignores_defaults_on_actual() {
        let expected = json!({"channel": {"kind": "InMemoryChannel", "name": "c"}});
        let actual = json!({
            "channel": {"kind": "InMemoryChannel", "name": "c", "apiVersion": "v1"},
            "delivery": {"retry": 3}
        });
        assert!(is_semantic_derivative(&expected, &actual));
    }

    #[test]
    fn test_derivative_detects_changed_values() {
        let expected = json!({"subscriber": {"uri": "http://a"}});
        let actual = json!({"subscriber": {"uri": "http://b"}});
        assert!(!is_semantic_derivative(&expected, &actual));

        let expected = json!({"delivery": {"retry": 5}});
        let actual = json!({});
        assert!(!is_semantic_derivative(&expected, &actual));
    }

    #[test]
    fn test_derivative_arrays_compare_prefix() {
        assert!(is_semantic_derivative(&json!([1]), &json!([1, 2])));
        assert!(!is_semantic_derivative(&json!([1, 2]), &json!([1])));
        assert!(is_semantic_derivative(&json!([]), &json!(null)));
    }
}
