//! Trigger CRD: routes events from a Broker to a subscriber
//!
//! The status methods mirror the lifecycle of a Trigger as the reconciler
//! walks through it: broker readiness, subscriber resolution, dead letter
//! sink resolution, subscription, and the optional dependency gate.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{find_condition, Condition, ConditionStatus, DeliverySpec, Destination};
use crate::conditions::{ConditionManager, ConditionSet};

/// Trigger condition: the parent Broker is ready
pub const TRIGGER_CONDITION_BROKER: &str = "BrokerReady";
/// Trigger condition: the Subscription to the broker channel is ready
pub const TRIGGER_CONDITION_SUBSCRIBED: &str = "Subscribed";
/// Trigger condition: the dependency named by annotation is ready
pub const TRIGGER_CONDITION_DEPENDENCY: &str = "DependencyReady";
/// Trigger condition: the subscriber destination resolved to a URI
pub const TRIGGER_CONDITION_SUBSCRIBER_RESOLVED: &str = "SubscriberResolved";
/// Trigger condition: the dead letter sink resolved (or is not configured)
pub const TRIGGER_CONDITION_DEAD_LETTER_SINK_RESOLVED: &str = "DeadLetterSinkResolved";

/// Conditions rolled up into a Trigger's `Ready`
pub static TRIGGER_CONDITION_SET: ConditionSet = ConditionSet::living(&[
    TRIGGER_CONDITION_BROKER,
    TRIGGER_CONDITION_SUBSCRIBER_RESOLVED,
    TRIGGER_CONDITION_DEAD_LETTER_SINK_RESOLVED,
    TRIGGER_CONDITION_SUBSCRIBED,
    TRIGGER_CONDITION_DEPENDENCY,
]);

// =============================================================================
// CRD
// =============================================================================

/// Spec for a Trigger
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "eventing.knative.dev",
    version = "v1",
    kind = "Trigger",
    plural = "triggers",
    namespaced,
    status = "TriggerStatus",
    printcolumn = r#"{"name":"Broker","type":"string","jsonPath":".spec.broker"}"#,
    printcolumn = r#"{"name":"Subscriber_URI","type":"string","jsonPath":".status.subscriberUri"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Reason","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].reason"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSpec {
    /// Name of the Broker in the Trigger's namespace
    pub broker: String,

    /// Attribute filter applied by the broker filter before delivery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<TriggerFilter>,

    /// Where matching events are delivered
    pub subscriber: Destination,

    /// Delivery options; falls back to the Broker's when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliverySpec>,
}

/// Exact-match filter on CloudEvent attributes
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct TriggerFilter {
    /// Attribute name to required value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

// =============================================================================
// Status
// =============================================================================

/// Observed state of a Trigger
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerStatus {
    /// Generation last processed by the controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Ready plus the sub-conditions it summarizes
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Resolved subscriber URI
    ///
    /// Serialized as `null` when unset so a merge patch clears it.
    #[serde(default)]
    pub subscriber_uri: Option<String>,

    /// Resolved dead letter sink URI
    #[serde(default)]
    pub dead_letter_sink_uri: Option<String>,
}

impl TriggerStatus {
    fn manager(&mut self) -> ConditionManager<'_> {
        TRIGGER_CONDITION_SET.manage(&mut self.conditions)
    }

    /// Look up a condition by type
    pub fn get_condition(&self, type_: &str) -> Option<&Condition> {
        find_condition(&self.conditions, type_)
    }

    /// Whether the Trigger is Ready
    pub fn is_ready(&self) -> bool {
        self.get_condition(crate::conditions::CONDITION_READY)
            .is_some_and(Condition::is_true)
    }

    /// Add every missing condition as Unknown
    pub fn initialize_conditions(&mut self) {
        self.manager().initialize();
    }

    // --- Broker ---------------------------------------------------------

    /// Copy the Broker's top-level condition onto `BrokerReady`
    pub fn propagate_broker_condition(&mut self, broker_ready: Option<&Condition>) {
        match broker_ready {
            None => self.manager().mark_unknown(
                TRIGGER_CONDITION_BROKER,
                "BrokerNotConfigured",
                "Broker has not yet been reconciled.",
            ),
            Some(c) => match c.status {
                ConditionStatus::True => self.manager().mark_true(TRIGGER_CONDITION_BROKER),
                ConditionStatus::False => self.mark_broker_failed(&c.reason, &c.message),
                ConditionStatus::Unknown => {
                    self.manager()
                        .mark_unknown(TRIGGER_CONDITION_BROKER, &c.reason, &c.message)
                }
            },
        }
    }

    /// Mark `BrokerReady` False
    pub fn mark_broker_failed(&mut self, reason: &str, message: &str) {
        self.manager()
            .mark_false(TRIGGER_CONDITION_BROKER, reason, message);
    }

    // --- Subscriber -----------------------------------------------------

    /// Mark the subscriber resolved
    pub fn mark_subscriber_resolved_succeeded(&mut self) {
        self.manager()
            .mark_true(TRIGGER_CONDITION_SUBSCRIBER_RESOLVED);
    }

    /// Mark the subscriber unresolvable
    pub fn mark_subscriber_resolved_failed(&mut self, reason: &str, message: &str) {
        self.manager()
            .mark_false(TRIGGER_CONDITION_SUBSCRIBER_RESOLVED, reason, message);
    }

    // --- Dead letter sink -------------------------------------------------

    /// Mark the dead letter sink resolved
    pub fn mark_dead_letter_sink_resolved_succeeded(&mut self) {
        self.manager()
            .mark_true(TRIGGER_CONDITION_DEAD_LETTER_SINK_RESOLVED);
    }

    /// Mark the dead letter sink as intentionally absent
    pub fn mark_dead_letter_sink_not_configured(&mut self) {
        self.manager().mark_true_with_reason(
            TRIGGER_CONDITION_DEAD_LETTER_SINK_RESOLVED,
            "DeadLetterSinkNotConfigured",
            "No dead letter sink is configured.",
        );
    }

    /// Mark the dead letter sink unresolvable
    pub fn mark_dead_letter_sink_resolved_failed(&mut self, reason: &str, message: &str) {
        self.manager()
            .mark_false(TRIGGER_CONDITION_DEAD_LETTER_SINK_RESOLVED, reason, message);
    }

    // --- Subscription -----------------------------------------------------

    /// Copy the Subscription's top-level condition onto `Subscribed`
    pub fn propagate_subscription_condition(&mut self, subscription_ready: Option<&Condition>) {
        match subscription_ready {
            None => self.mark_subscription_not_configured(),
            Some(c) => match c.status {
                ConditionStatus::True => self.manager().mark_true(TRIGGER_CONDITION_SUBSCRIBED),
                ConditionStatus::False => self.mark_not_subscribed(&c.reason, &c.message),
                ConditionStatus::Unknown => {
                    self.manager()
                        .mark_unknown(TRIGGER_CONDITION_SUBSCRIBED, &c.reason, &c.message)
                }
            },
        }
    }

    /// Mark `Subscribed` False
    pub fn mark_not_subscribed(&mut self, reason: &str, message: &str) {
        self.manager()
            .mark_false(TRIGGER_CONDITION_SUBSCRIBED, reason, message);
    }

    /// Mark `Subscribed` Unknown until the Subscription reports a condition
    pub fn mark_subscription_not_configured(&mut self) {
        self.manager().mark_unknown(
            TRIGGER_CONDITION_SUBSCRIBED,
            "SubscriptionNotConfigured",
            "Subscription has not yet been reconciled.",
        );
    }

    // --- Dependency -------------------------------------------------------

    /// Mark the dependency satisfied
    pub fn mark_dependency_succeeded(&mut self) {
        self.manager().mark_true(TRIGGER_CONDITION_DEPENDENCY);
    }

    /// Mark the dependency failed
    pub fn mark_dependency_failed(&mut self, reason: &str, message: &str) {
        self.manager()
            .mark_false(TRIGGER_CONDITION_DEPENDENCY, reason, message);
    }

    /// Mark the dependency state unknown
    pub fn mark_dependency_unknown(&mut self, reason: &str, message: &str) {
        self.manager()
            .mark_unknown(TRIGGER_CONDITION_DEPENDENCY, reason, message);
    }

    /// Copy the dependency's `Ready` condition onto `DependencyReady`
    pub fn propagate_dependency_status(&mut self, dependency_ready: Option<&Condition>) {
        match dependency_ready {
            None => self.mark_dependency_unknown(
                "DependencyNotConfigured",
                "Dependency has not yet been reconciled.",
            ),
            Some(c) => match c.status {
                ConditionStatus::True => self.mark_dependency_succeeded(),
                ConditionStatus::False => self.mark_dependency_failed(&c.reason, &c.message),
                ConditionStatus::Unknown => self.mark_dependency_unknown(&c.reason, &c.message),
            },
        }
    }
}
