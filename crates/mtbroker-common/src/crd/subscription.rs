//! Subscription CRD: binds a channel to a subscriber

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{find_condition, Condition, DeliverySpec, Destination};
use crate::conditions::CONDITION_READY;

/// Label carrying the Broker a Subscription was created for
pub const BROKER_LABEL: &str = "eventing.knative.dev/broker";
/// Label carrying the Trigger a Subscription was created for
pub const TRIGGER_LABEL: &str = "eventing.knative.dev/trigger";

/// Spec for a Subscription
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "messaging.knative.dev",
    version = "v1",
    kind = "Subscription",
    plural = "subscriptions",
    shortname = "sub",
    namespaced,
    status = "SubscriptionStatus",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    /// Channel the subscription reads from (immutable)
    pub channel: ChannelReference,

    /// Where events are delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber: Option<Destination>,

    /// Where subscriber replies are sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Destination>,

    /// Delivery options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliverySpec>,
}

/// Reference to a channel in the Subscription's namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelReference {
    /// API version of the channel
    pub api_version: String,
    /// Kind of the channel
    pub kind: String,
    /// Name of the channel
    pub name: String,
}

/// Observed state of a Subscription
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    /// Generation last processed by the subscription controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Subscription conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Subscription {
    /// Top-level `Ready` condition
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| find_condition(&s.conditions, CONDITION_READY))
    }
}
