//! Shared duck types used across the eventing resources

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Conditions
// =============================================================================

/// Condition status following Kubernetes conventions
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
///
/// Reason and message are optional on the wire because conditions written by
/// other controllers (Broker, Subscription, sources) frequently omit them.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., Ready, BrokerReady)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Last time the condition transitioned
    #[serde(
        rename = "lastTransitionTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Some(Utc::now()),
        }
    }

    /// Whether the condition is True
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    /// Same status, reason and message, ignoring the transition time
    pub fn same_state(&self, other: &Condition) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Look up a condition by type in a condition list
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

// =============================================================================
// Destinations
// =============================================================================

/// Reference to a Kubernetes object by apiVersion, kind and name
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct KReference {
    /// Kind of the referent
    pub kind: String,
    /// Namespace of the referent (defaults to the referrer's namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Name of the referent
    pub name: String,
    /// API version of the referent
    pub api_version: String,
}

/// Where events are delivered: an addressable reference, a URI, or a
/// reference with a URI relative to it
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Reference to an addressable object
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_: Option<KReference>,
    /// Absolute URI, or a URI relative to the resolved reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Destination {
    /// Destination pointing at a URI only
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            ref_: None,
            uri: Some(uri.into()),
        }
    }

    /// Destination pointing at an object reference only
    pub fn from_ref(reference: KReference) -> Self {
        Self {
            ref_: Some(reference),
            uri: None,
        }
    }
}

/// Backoff policy applied between delivery retries
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BackoffPolicy {
    /// Delay grows linearly with the retry count
    Linear,
    /// Delay doubles on every retry
    Exponential,
}

/// Delivery options for events sent to a subscriber
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySpec {
    /// Sink for events that could not be delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_sink: Option<Destination>,
    /// Minimum number of retries before the event goes to the dead letter sink
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<i32>,
    /// Backoff policy between retries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_policy: Option<BackoffPolicy>,
    /// Delay before retrying, as an ISO-8601 duration (e.g. "PT1S")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_delay: Option<String>,
}

/// Address advertised by an addressable resource
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Addressable {
    /// URL events should be sent to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_status_display() {
        assert_eq!(ConditionStatus::True.to_string(), "True");
        assert_eq!(ConditionStatus::False.to_string(), "False");
        assert_eq!(ConditionStatus::Unknown.to_string(), "Unknown");
        assert_eq!(ConditionStatus::default(), ConditionStatus::Unknown);
    }

    #[test]
    fn test_condition_new_sets_timestamp() {
        let before = Utc::now();
        let condition = Condition::new("Ready", ConditionStatus::True, "", "");
        let stamp = condition.last_transition_time.unwrap();
        assert!(stamp >= before);
        assert!(condition.is_true());
    }

    #[test]
    fn test_foreign_condition_without_reason_parses() {
        let condition: Condition =
            serde_json::from_str(r#"{"type":"Ready","status":"True"}"#).unwrap();
        assert_eq!(condition.reason, "");
        assert!(condition.last_transition_time.is_none());
    }

    #[test]
    fn test_same_state_ignores_time() {
        let mut a = Condition::new("Ready", ConditionStatus::False, "Boom", "it broke");
        let b = Condition::new("Ready", ConditionStatus::False, "Boom", "it broke");
        a.last_transition_time = None;
        assert!(a.same_state(&b));
        let c = Condition::new("Ready", ConditionStatus::False, "Other", "it broke");
        assert!(!a.same_state(&c));
    }

    #[test]
    fn test_destination_uses_ref_key() {
        let dest = Destination::from_ref(KReference {
            kind: "Service".to_string(),
            namespace: None,
            name: "subscriber".to_string(),
            api_version: "v1".to_string(),
        });
        let json = serde_json::to_value(&dest).unwrap();
        assert_eq!(json["ref"]["apiVersion"], "v1");
        assert!(json.get("uri").is_none());
    }

    #[test]
    fn test_delivery_spec_wire_format() {
        let delivery: DeliverySpec = serde_json::from_str(
            r#"{"retry":5,"backoffPolicy":"exponential","backoffDelay":"PT1S"}"#,
        )
        .unwrap();
        assert_eq!(delivery.retry, Some(5));
        assert_eq!(delivery.backoff_policy, Some(BackoffPolicy::Exponential));
        assert!(delivery.dead_letter_sink.is_none());
    }
}
