//! Kubernetes Event recording for the mtbroker controllers.
//!
//! Provides a trait-based abstraction over `kube::runtime::events::Recorder`
//! so that reconcilers can emit standard Kubernetes Events visible via
//! `kubectl describe trigger` and `kubectl get events`.
//!
//! Events are **fire-and-forget**: failures are logged as warnings and never
//! propagate errors. A failed event must never break reconciliation.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Trait for publishing Kubernetes Events.
///
/// Implementations are expected to be fire-and-forget: `publish()` logs a
/// warning on failure but never returns an error.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a Kubernetes Event on the given resource.
    ///
    /// # Arguments
    ///
    /// * `resource_ref` - The Kubernetes object this event is about
    /// * `type_` - Normal or Warning
    /// * `reason` - Machine-readable reason string (e.g. "SubscriptionCreateFailed")
    /// * `action` - What action was taken (e.g. "Reconcile")
    /// * `note` - Optional human-readable message
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Production implementation wrapping `kube::runtime::events::Recorder`.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a new publisher for the given controller name.
    ///
    /// The controller name appears as the "reportingComponent" on Events
    /// (e.g. "mt-broker-controller").
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = kube::runtime::events::Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(
                reason,
                action,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

/// No-op implementation for tests.
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Well-known event reason strings.
///
/// These appear in `kubectl get events` under the REASON column.
pub mod reasons {
    /// The Trigger names a Broker that does not exist
    pub const BROKER_DOES_NOT_EXIST: &str = "BrokerDoesNotExist";
    /// The Broker has no trigger channel in its status annotations
    pub const MISSING_BROKER_CHANNEL: &str = "MissingBrokerChannel";
    /// Reading the Trigger's Subscription failed
    pub const SUBSCRIPTION_GET_FAILED: &str = "SubscriptionGetFailed";
    /// Creating the Trigger's Subscription failed
    pub const SUBSCRIPTION_CREATE_FAILED: &str = "SubscriptionCreateFailed";
    /// Deleting an outdated Subscription failed
    pub const SUBSCRIPTION_DELETE_FAILED: &str = "SubscriptionDeleteFailed";
    /// The Trigger could not be subscribed to its Broker
    pub const NOT_SUBSCRIBED: &str = "NotSubscribed";
    /// A Subscription was created for the Trigger
    pub const SUBSCRIPTION_CREATED: &str = "SubscriptionCreated";
    /// An outdated Subscription was replaced
    pub const SUBSCRIPTION_RECREATED: &str = "SubscriptionRecreated";
    /// Reconciliation returned an error
    pub const INTERNAL_ERROR: &str = "InternalError";
}

/// Well-known event action strings.
///
/// These appear in `kubectl get events` under the ACTION column.
pub mod actions {
    /// Standard reconciliation loop
    pub const RECONCILE: &str = "Reconcile";
    /// Creating a child resource
    pub const CREATE: &str = "Create";
    /// Deleting a child resource
    pub const DELETE: &str = "Delete";
    /// Reading a related resource
    pub const GET: &str = "Get";
}
