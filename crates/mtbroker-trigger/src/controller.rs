//! Trigger controller implementation
//!
//! A Trigger is reconciled into a Subscription on its Broker's trigger
//! channel. The Subscription delivers to the broker filter, which applies the
//! Trigger's filter and forwards to the resolved subscriber. Every step of the
//! walk is reflected in the Trigger's conditions:
//!
//! 1. `BrokerReady` follows the Broker
//! 2. `SubscriberResolved` once the subscriber has an address
//! 3. `DeadLetterSinkResolved` once the dead letter sink (if any) has one
//! 4. `Subscribed` follows the Subscription
//! 5. `DependencyReady` follows the object named by the dependency annotation
//!
//! Conditions that can only change when another object changes end the
//! reconcile without an error; the watches on Brokers, Subscriptions and
//! tracked objects bring the Trigger back. Everything else returns an error
//! and is retried with backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::runtime::reflector::ObjectRef;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use mtbroker_common::crd::{
    Broker, Destination, Subscription, Trigger, TriggerStatus, MT_CHANNEL_BROKER_CLASS,
};
use mtbroker_common::events::{actions, reasons, EventPublisher, KubeEventPublisher};
use mtbroker_common::kube_utils::{is_controlled_by, is_semantic_derivative};
use mtbroker_common::{Error, CONTROLLER_NAME, DEPENDENCY_ANNOTATION};

use crate::resolver::{DestinationResolver, UriResolver};
use crate::resources;
use crate::tracker::{DynamicTracker, SourceTracker};

/// First retry delay after a failed reconcile
const BASE_BACKOFF: Duration = Duration::from_secs(1);
/// Longest retry delay after repeated failures
const MAX_BACKOFF: Duration = Duration::from_secs(300);

// =============================================================================
// Traits for dependency injection and testability
// =============================================================================

/// Trait abstracting Kubernetes client operations for Triggers
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TriggerKubeClient: Send + Sync {
    /// Get a Broker by namespace and name
    async fn get_broker(&self, namespace: &str, name: &str) -> Result<Option<Broker>, Error>;

    /// Get a Subscription by namespace and name
    async fn get_subscription(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Subscription>, Error>;

    /// Create a Subscription
    async fn create_subscription(&self, subscription: &Subscription)
        -> Result<Subscription, Error>;

    /// Delete a Subscription
    async fn delete_subscription(&self, namespace: &str, name: &str) -> Result<(), Error>;

    /// Patch the status of a Trigger
    async fn patch_trigger_status(
        &self,
        namespace: &str,
        name: &str,
        status: &TriggerStatus,
    ) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct TriggerKubeClientImpl {
    client: Client,
}

impl TriggerKubeClientImpl {
    /// Create a new TriggerKubeClientImpl wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TriggerKubeClient for TriggerKubeClientImpl {
    async fn get_broker(&self, namespace: &str, name: &str) -> Result<Option<Broker>, Error> {
        let api: Api<Broker> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(broker) => Ok(Some(broker)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_subscription(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Subscription>, Error> {
        let api: Api<Subscription> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(sub) => Ok(Some(sub)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, Error> {
        let namespace = subscription.namespace().unwrap_or_default();
        let api: Api<Subscription> = Api::namespaced(self.client.clone(), &namespace);
        Ok(api.create(&PostParams::default(), subscription).await?)
    }

    async fn delete_subscription(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let api: Api<Subscription> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn patch_trigger_status(
        &self,
        namespace: &str,
        name: &str,
        status: &TriggerStatus,
    ) -> Result<(), Error> {
        let api: Api<Trigger> = Api::namespaced(self.client.clone(), namespace);
        let status_patch = status_patch(status);

        api.patch_status(
            name,
            &PatchParams::apply(CONTROLLER_NAME),
            &Patch::Merge(&status_patch),
        )
        .await?;

        Ok(())
    }
}

/// Merge patch body for a Trigger's status
///
/// Unset URIs go out as `null`, which removes them from the stored status.
pub fn status_patch(status: &TriggerStatus) -> serde_json::Value {
    serde_json::json!({ "status": status })
}

// =============================================================================
// Controller context
// =============================================================================

/// Controller context shared across all Trigger reconciliations
pub struct TriggerContext {
    /// Kubernetes client for API operations
    pub kube: Arc<dyn TriggerKubeClient>,
    /// Resolves subscriber and dead letter sink destinations
    pub resolver: Arc<dyn UriResolver>,
    /// Tracks dependencies named by annotation
    pub tracker: Arc<dyn SourceTracker>,
    /// Event publisher for emitting Kubernetes Events
    pub events: Arc<dyn EventPublisher>,
    /// Namespace of the broker filter service
    pub system_namespace: String,
    /// Cluster DNS domain
    pub cluster_domain: String,
    /// Consecutive failures per Trigger, reset on success
    failures: DashMap<ObjectRef<Trigger>, u32>,
}

impl TriggerContext {
    /// Create a new TriggerContext with the given dependencies
    pub fn new(
        kube: Arc<dyn TriggerKubeClient>,
        resolver: Arc<dyn UriResolver>,
        tracker: Arc<dyn SourceTracker>,
        events: Arc<dyn EventPublisher>,
        system_namespace: impl Into<String>,
        cluster_domain: impl Into<String>,
    ) -> Self {
        Self {
            kube,
            resolver,
            tracker,
            events,
            system_namespace: system_namespace.into(),
            cluster_domain: cluster_domain.into(),
            failures: DashMap::new(),
        }
    }

    /// Create a TriggerContext backed by the cluster
    ///
    /// The tracker serves both dependency readiness and addressable lookups.
    pub fn from_client(
        client: Client,
        tracker: Arc<DynamicTracker>,
        system_namespace: impl Into<String>,
        cluster_domain: impl Into<String>,
    ) -> Self {
        let cluster_domain = cluster_domain.into();
        let resolver = Arc::new(DestinationResolver::new(
            tracker.clone(),
            cluster_domain.clone(),
        ));
        let events = Arc::new(KubeEventPublisher::new(client.clone(), CONTROLLER_NAME));
        Self::new(
            Arc::new(TriggerKubeClientImpl::new(client)),
            resolver,
            tracker,
            events,
            system_namespace,
            cluster_domain,
        )
    }

    /// Create a context for testing with mock collaborators
    #[cfg(test)]
    pub fn for_testing(
        kube: Arc<dyn TriggerKubeClient>,
        resolver: Arc<dyn UriResolver>,
        tracker: Arc<dyn SourceTracker>,
    ) -> Self {
        Self::new(
            kube,
            resolver,
            tracker,
            Arc::new(mtbroker_common::events::NoopEventPublisher),
            "knative-testing",
            "cluster.local",
        )
    }

    async fn warn_event(&self, trigger: &Trigger, reason: &str, action: &str, note: String) {
        self.events
            .publish(
                &trigger.object_ref(&()),
                EventType::Warning,
                reason,
                action,
                Some(note),
            )
            .await;
    }

    async fn normal_event(&self, trigger: &Trigger, reason: &str, action: &str, note: String) {
        self.events
            .publish(
                &trigger.object_ref(&()),
                EventType::Normal,
                reason,
                action,
                Some(note),
            )
            .await;
    }

    fn record_failure(&self, trigger: &ObjectRef<Trigger>) -> u32 {
        let mut attempts = self.failures.entry(trigger.clone()).or_insert(0);
        *attempts = attempts.saturating_add(1);
        *attempts
    }

    fn reset_failures(&self, trigger: &ObjectRef<Trigger>) {
        self.failures.remove(trigger);
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Outcome of a reconcile that didn't fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Status was computed and should be written
    Reconciled,
    /// The Trigger isn't ours to touch right now; leave it as is
    Skipped,
}

/// Reconcile a Trigger
///
/// Status is written whenever it changed, including when the reconcile
/// fails, so the conditions always explain the last attempt.
#[instrument(
    skip(trigger, ctx),
    fields(trigger = %trigger.name_any(), namespace = %trigger.namespace().unwrap_or_default())
)]
pub async fn reconcile(trigger: Arc<Trigger>, ctx: Arc<TriggerContext>) -> Result<Action, Error> {
    debug!("reconciling trigger");

    let original = trigger.status.clone();
    let mut status = original.clone().unwrap_or_default();

    let result = reconcile_kind(&trigger, &mut status, &ctx).await;

    if matches!(result, Ok(Disposition::Skipped)) {
        ctx.reset_failures(&ObjectRef::from_obj(trigger.as_ref()));
        return Ok(Action::await_change());
    }

    status.observed_generation = trigger.metadata.generation;
    let write = if original.as_ref() != Some(&status) {
        update_status(&trigger, &status, &ctx).await
    } else {
        Ok(())
    };

    match (result, write) {
        (Ok(_), Ok(())) => {
            ctx.reset_failures(&ObjectRef::from_obj(trigger.as_ref()));
            if status.is_ready() {
                debug!("trigger ready");
            }
            Ok(Action::await_change())
        }
        (Ok(_), Err(e)) => {
            warn!(error = %e, "failed to update trigger status");
            ctx.warn_event(
                &trigger,
                reasons::INTERNAL_ERROR,
                actions::RECONCILE,
                e.to_string(),
            )
            .await;
            Err(e)
        }
        (Err(e), write) => {
            if let Err(write_err) = write {
                warn!(error = %write_err, "failed to update trigger status");
            }
            ctx.warn_event(
                &trigger,
                reasons::INTERNAL_ERROR,
                actions::RECONCILE,
                e.to_string(),
            )
            .await;
            Err(e)
        }
    }
}

/// Error policy for the Trigger controller
///
/// Retryable errors back off exponentially per Trigger; permanent errors
/// wait for the Trigger to change.
pub fn error_policy(trigger: Arc<Trigger>, error: &Error, ctx: Arc<TriggerContext>) -> Action {
    let key = ObjectRef::from_obj(trigger.as_ref());
    let attempts = ctx.record_failure(&key);

    error!(
        ?error,
        trigger = %trigger.name_any(),
        attempts,
        retryable = error.is_retryable(),
        "reconciliation failed"
    );

    if error.is_retryable() {
        Action::requeue(backoff_delay(attempts))
    } else {
        Action::await_change()
    }
}

/// Delay before the given retry attempt (1-based), doubling up to a cap
fn backoff_delay(attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(16);
    BASE_BACKOFF
        .saturating_mul(1u32 << exponent)
        .min(MAX_BACKOFF)
}

async fn update_status(
    trigger: &Trigger,
    status: &TriggerStatus,
    ctx: &TriggerContext,
) -> Result<(), Error> {
    let namespace = trigger.namespace().unwrap_or_default();
    ctx.kube
        .patch_trigger_status(&namespace, &trigger.name_any(), status)
        .await?;
    debug!(ready = status.is_ready(), "updated trigger status");
    Ok(())
}

async fn reconcile_kind(
    trigger: &Trigger,
    status: &mut TriggerStatus,
    ctx: &TriggerContext,
) -> Result<Disposition, Error> {
    status.initialize_conditions();

    // Whatever this pass still depends on is tracked again below.
    let trigger_ref = ObjectRef::from_obj(trigger);
    ctx.tracker.untrack(&trigger_ref);

    if trigger.metadata.deletion_timestamp.is_some() {
        // Owner references clean up the Subscription.
        return Ok(Disposition::Skipped);
    }

    let namespace = trigger.namespace().ok_or_else(|| {
        Error::internal_with_context("reconciler", "Trigger is missing namespace")
    })?;
    let broker_name = &trigger.spec.broker;

    let broker = match ctx.kube.get_broker(&namespace, broker_name).await {
        Ok(Some(broker)) => broker,
        Ok(None) => {
            let message = format!("Broker {:?} does not exist", broker_name);
            debug!(broker = %broker_name, "broker does not exist");
            status.mark_broker_failed(reasons::BROKER_DOES_NOT_EXIST, &message);
            ctx.warn_event(trigger, reasons::BROKER_DOES_NOT_EXIST, actions::GET, message)
                .await;
            return Ok(Disposition::Reconciled);
        }
        Err(e) => {
            status.mark_broker_failed(
                "FailedToGetBroker",
                &format!("Failed to get broker {:?} : {}", broker_name, e),
            );
            return Err(e);
        }
    };

    if broker.class() != Some(MT_CHANNEL_BROKER_CLASS) {
        debug!(class = ?broker.class(), "ignoring trigger on broker of another class");
        return Ok(Disposition::Skipped);
    }

    status.propagate_broker_condition(broker.ready_condition());
    if !broker.is_ready() {
        debug!(broker = %broker_name, "broker is not ready");
        return Ok(Disposition::Reconciled);
    }

    let channel = match resources::broker_channel_ref(&broker) {
        Ok(channel) => channel,
        Err(e) => {
            let cause = match &e {
                Error::MissingBrokerChannel { message } => message.clone(),
                other => other.to_string(),
            };
            let message = format!("Failed to get broker {:?} annotations: {}", broker_name, cause);
            status.mark_broker_failed(reasons::MISSING_BROKER_CHANNEL, &message);
            ctx.warn_event(trigger, reasons::MISSING_BROKER_CHANNEL, actions::GET, message)
                .await;
            return Err(e);
        }
    };

    resolve_subscriber(trigger, &namespace, &trigger_ref, status, ctx).await?;
    resolve_dead_letter_sink(trigger, &broker, &namespace, &trigger_ref, status, ctx).await?;

    let subscription = match subscribe_to_broker_channel(trigger, &broker, &channel, ctx).await {
        Ok(subscription) => subscription,
        Err(e) => {
            error!(error = %e, "failed to subscribe trigger to broker channel");
            status.mark_not_subscribed(reasons::NOT_SUBSCRIBED, &e.to_string());
            return Err(e);
        }
    };
    status.propagate_subscription_condition(subscription.ready_condition());

    check_dependency_annotation(trigger, &namespace, &trigger_ref, status, ctx).await?;

    Ok(Disposition::Reconciled)
}

// =============================================================================
// Destinations
// =============================================================================

async fn resolve_subscriber(
    trigger: &Trigger,
    namespace: &str,
    trigger_ref: &ObjectRef<Trigger>,
    status: &mut TriggerStatus,
    ctx: &TriggerContext,
) -> Result<(), Error> {
    let subscriber = subscriber_with_namespace(&trigger.spec.subscriber, namespace);

    match ctx
        .resolver
        .uri_from_destination(&subscriber, namespace, trigger_ref)
        .await
    {
        Ok(uri) => {
            debug!(subscriber = %uri, "resolved subscriber");
            status.subscriber_uri = Some(uri);
            status.mark_subscriber_resolved_succeeded();
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "unable to get the subscriber's URI");
            status.subscriber_uri = None;
            status.mark_subscriber_resolved_failed(
                "Unable to get the Subscriber's URI",
                &e.to_string(),
            );
            Err(e)
        }
    }
}

/// A subscriber reference without a namespace lives next to the Trigger
fn subscriber_with_namespace(subscriber: &Destination, namespace: &str) -> Destination {
    let mut subscriber = subscriber.clone();
    if let Some(reference) = subscriber.ref_.as_mut() {
        if reference.namespace.as_deref().unwrap_or_default().is_empty() {
            reference.namespace = Some(namespace.to_string());
        }
    }
    subscriber
}

/// Resolve the dead letter sink: the Trigger's own wins over the Broker's
async fn resolve_dead_letter_sink(
    trigger: &Trigger,
    broker: &Broker,
    namespace: &str,
    trigger_ref: &ObjectRef<Trigger>,
    status: &mut TriggerStatus,
    ctx: &TriggerContext,
) -> Result<(), Error> {
    let trigger_sink = trigger
        .spec
        .delivery
        .as_ref()
        .and_then(|d| d.dead_letter_sink.as_ref());

    if let Some(sink) = trigger_sink {
        return match ctx
            .resolver
            .uri_from_destination(sink, namespace, trigger_ref)
            .await
        {
            Ok(uri) => {
                status.dead_letter_sink_uri = Some(uri);
                status.mark_dead_letter_sink_resolved_succeeded();
                Ok(())
            }
            Err(e) => {
                status.dead_letter_sink_uri = None;
                status.mark_dead_letter_sink_resolved_failed(
                    "Unable to get the dead letter sink's URI",
                    &e.to_string(),
                );
                Err(e)
            }
        };
    }

    if broker.declares_dead_letter_sink() {
        return match broker.resolved_dead_letter_sink_uri() {
            Some(uri) => {
                status.dead_letter_sink_uri = Some(uri.to_string());
                status.mark_dead_letter_sink_resolved_succeeded();
                Ok(())
            }
            None => {
                status.dead_letter_sink_uri = None;
                status.mark_dead_letter_sink_resolved_failed(
                    &format!(
                        "Broker {} didn't set status.deadLetterSinkURI",
                        broker.name_any()
                    ),
                    "",
                );
                Err(Error::DeadLetterSinkUnresolved {
                    broker: broker.name_any(),
                })
            }
        };
    }

    status.dead_letter_sink_uri = None;
    status.mark_dead_letter_sink_not_configured();
    Ok(())
}

// =============================================================================
// Subscription
// =============================================================================

async fn subscribe_to_broker_channel(
    trigger: &Trigger,
    broker: &Broker,
    channel: &ObjectReference,
    ctx: &TriggerContext,
) -> Result<Subscription, Error> {
    let subscriber_uri =
        resources::filter_subscriber_uri(trigger, &ctx.system_namespace, &ctx.cluster_domain)?;
    let delivery = trigger
        .spec
        .delivery
        .as_ref()
        .or(broker.spec.delivery.as_ref());
    let expected = resources::new_subscription(
        trigger,
        channel,
        &resources::broker_reference(broker),
        &subscriber_uri,
        delivery,
    )?;

    let namespace = expected.namespace().unwrap_or_default();
    let name = expected.name_any();

    let actual = match ctx.kube.get_subscription(&namespace, &name).await {
        Ok(Some(actual)) => actual,
        Ok(None) => {
            let created = match ctx.kube.create_subscription(&expected).await {
                Ok(created) => created,
                Err(e) => {
                    ctx.warn_event(
                        trigger,
                        reasons::SUBSCRIPTION_CREATE_FAILED,
                        actions::CREATE,
                        format!("Create Trigger's subscription failed: {}", e),
                    )
                    .await;
                    return Err(e);
                }
            };
            info!(subscription = %name, "created subscription");
            ctx.normal_event(
                trigger,
                reasons::SUBSCRIPTION_CREATED,
                actions::CREATE,
                format!("Created subscription {:?}", name),
            )
            .await;
            return Ok(created);
        }
        Err(e) => {
            ctx.warn_event(
                trigger,
                reasons::SUBSCRIPTION_GET_FAILED,
                actions::GET,
                format!("Getting the Trigger's Subscription failed: {}", e),
            )
            .await;
            return Err(e);
        }
    };

    if !is_controlled_by(&actual, trigger) {
        return Err(Error::subscription_not_owned(trigger.name_any(), name));
    }

    reconcile_subscription(trigger, expected, actual, ctx).await
}

/// Replace `actual` when it no longer matches `expected`
///
/// The channel of a Subscription is immutable, so a changed Subscription is
/// deleted and created again rather than updated.
async fn reconcile_subscription(
    trigger: &Trigger,
    expected: Subscription,
    actual: Subscription,
    ctx: &TriggerContext,
) -> Result<Subscription, Error> {
    let expected_spec = serde_json::to_value(&expected.spec)?;
    let actual_spec = serde_json::to_value(&actual.spec)?;
    if is_semantic_derivative(&expected_spec, &actual_spec) {
        return Ok(actual);
    }

    let namespace = actual.namespace().unwrap_or_default();
    let name = actual.name_any();
    info!(subscription = %name, "subscription differs from expected, recreating");

    if let Err(e) = ctx.kube.delete_subscription(&namespace, &name).await {
        ctx.warn_event(
            trigger,
            reasons::SUBSCRIPTION_DELETE_FAILED,
            actions::DELETE,
            format!("Delete Trigger's subscription failed: {}", e),
        )
        .await;
        return Err(e);
    }

    match ctx.kube.create_subscription(&expected).await {
        Ok(created) => {
            ctx.normal_event(
                trigger,
                reasons::SUBSCRIPTION_RECREATED,
                actions::CREATE,
                format!("Recreated subscription {:?}", name),
            )
            .await;
            Ok(created)
        }
        Err(e) => {
            ctx.warn_event(
                trigger,
                reasons::SUBSCRIPTION_CREATE_FAILED,
                actions::CREATE,
                format!("Create Trigger's subscription failed: {}", e),
            )
            .await;
            Err(e)
        }
    }
}

// =============================================================================
// Dependency
// =============================================================================

async fn check_dependency_annotation(
    trigger: &Trigger,
    namespace: &str,
    trigger_ref: &ObjectRef<Trigger>,
    status: &mut TriggerStatus,
    ctx: &TriggerContext,
) -> Result<(), Error> {
    let Some(annotation) = trigger.annotations().get(DEPENDENCY_ANNOTATION) else {
        status.mark_dependency_succeeded();
        return Ok(());
    };

    let reference: ObjectReference = match serde_json::from_str(annotation) {
        Ok(reference) => reference,
        Err(e) => {
            status.mark_dependency_failed(
                "ReferenceError",
                &format!(
                    "Unable to unmarshal objectReference from dependency annotation of trigger: {}",
                    e
                ),
            );
            return Err(Error::DependencyAnnotation {
                annotation: annotation.clone(),
                message: e.to_string(),
            });
        }
    };

    ctx.tracker
        .track_in_namespace(trigger_ref, namespace, &reference)
        .map_err(|e| match e {
            Error::Tracking { .. } => e,
            other => Error::tracking(other.to_string()),
        })?;

    propagate_dependency_readiness(namespace, &reference, status, ctx)
        .await
        .map_err(Error::dependency_readiness)
}

/// Copy the dependency's readiness onto `DependencyReady`
///
/// Errors are returned as messages; the caller wraps them.
async fn propagate_dependency_readiness(
    namespace: &str,
    reference: &ObjectReference,
    status: &mut TriggerStatus,
    ctx: &TriggerContext,
) -> Result<(), String> {
    let reader = match ctx.tracker.reader_for(reference).await {
        Ok(reader) => reader,
        Err(e) => {
            status.mark_dependency_unknown(
                "ListerDoesNotExist",
                &format!("Failed to retrieve lister: {}", e),
            );
            return Err(format!("retrieving lister: {}", e));
        }
    };

    let name = reference.name.as_deref().unwrap_or_default();
    let dependency = match reader.get(namespace, name).await {
        Ok(Some(dependency)) => dependency,
        Ok(None) => {
            let cause = format!(
                "{} {:?} not found",
                reference.kind.as_deref().unwrap_or_default(),
                name
            );
            status.mark_dependency_failed(
                "DependencyDoesNotExist",
                &format!("Dependency does not exist: {}", cause),
            );
            return Err(format!("getting the dependency: {}", cause));
        }
        Err(e) => {
            status.mark_dependency_unknown(
                "DependencyGetFailed",
                &format!("Failed to get dependency: {}", e),
            );
            return Err(format!("getting the dependency: {}", e));
        }
    };

    if !dependency.is_generation_observed() {
        status.mark_dependency_unknown(
            "GenerationNotEqual",
            &format!(
                "The dependency's metadata.generation, \"{}\", is not equal to its status.observedGeneration, \"{}\".",
                dependency.generation, dependency.observed_generation
            ),
        );
        return Ok(());
    }

    status.propagate_dependency_status(dependency.ready_condition.as_ref());
    Ok(())
}
