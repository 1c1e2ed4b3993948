//! Broker CRD as seen by the Trigger reconciler
//!
//! Brokers are reconciled elsewhere. The Trigger reconciler only reads the
//! class annotation, readiness, delivery defaults, the resolved dead letter
//! sink and the trigger channel advertised in status annotations.

use std::collections::BTreeMap;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{find_condition, Addressable, Condition, DeliverySpec, KReference};
use crate::conditions::CONDITION_READY;

/// Annotation selecting the controller responsible for a Broker
pub const BROKER_CLASS_ANNOTATION: &str = "eventing.knative.dev/broker.class";
/// Broker class handled by this controller
pub const MT_CHANNEL_BROKER_CLASS: &str = "MTChannelBasedBroker";

/// Status annotation carrying the trigger channel kind
pub const CHANNEL_KIND_STATUS_ANNOTATION: &str = "knative.dev/channelKind";
/// Status annotation carrying the trigger channel apiVersion
pub const CHANNEL_API_VERSION_STATUS_ANNOTATION: &str = "knative.dev/channelAPIVersion";
/// Status annotation carrying the trigger channel name
pub const CHANNEL_NAME_STATUS_ANNOTATION: &str = "knative.dev/channelName";

/// Spec for a Broker
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "eventing.knative.dev",
    version = "v1",
    kind = "Broker",
    plural = "brokers",
    namespaced,
    status = "BrokerStatus",
    printcolumn = r#"{"name":"URL","type":"string","jsonPath":".status.address.url"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BrokerSpec {
    /// Reference to the broker's configuration (e.g. a ConfigMap)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<KReference>,

    /// Delivery defaults for Triggers that don't set their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliverySpec>,
}

/// Observed state of a Broker
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrokerStatus {
    /// Generation last processed by the broker controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Broker conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Free-form status annotations (carries the trigger channel reference)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Ingress address of the broker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Addressable>,

    /// Resolved dead letter sink URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_sink_uri: Option<String>,
}

impl Broker {
    /// The broker class annotation, if any
    pub fn class(&self) -> Option<&str> {
        self.annotations()
            .get(BROKER_CLASS_ANNOTATION)
            .map(String::as_str)
    }

    /// Top-level `Ready` condition
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| find_condition(&s.conditions, CONDITION_READY))
    }

    /// Whether the Broker reports Ready
    pub fn is_ready(&self) -> bool {
        self.ready_condition().is_some_and(Condition::is_true)
    }

    /// Whether the spec declares a dead letter sink
    pub fn declares_dead_letter_sink(&self) -> bool {
        self.spec
            .delivery
            .as_ref()
            .is_some_and(|d| d.dead_letter_sink.is_some())
    }

    /// The dead letter sink URI resolved by the broker controller
    pub fn resolved_dead_letter_sink_uri(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.dead_letter_sink_uri.as_deref())
    }
}
