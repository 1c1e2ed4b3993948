//! Builders for the resources a Trigger owns or points at
//!
//! Pure functions: everything here derives from the Trigger and its Broker
//! without touching the API server.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};

use mtbroker_common::crd::{
    Broker, ChannelReference, DeliverySpec, Destination, KReference, Subscription,
    SubscriptionSpec, Trigger, BROKER_LABEL, CHANNEL_API_VERSION_STATUS_ANNOTATION,
    CHANNEL_KIND_STATUS_ANNOTATION, CHANNEL_NAME_STATUS_ANNOTATION, TRIGGER_LABEL,
};
use mtbroker_common::kube_utils::service_hostname;
use mtbroker_common::{Error, BROKER_FILTER_SERVICE_NAME};

/// Message used when the Broker doesn't advertise its trigger channel
pub const MISSING_CHANNEL_ANNOTATIONS: &str = "Broker.Status.Annotations nil or missing values";

fn uid_of(trigger: &Trigger) -> Result<String, Error> {
    trigger.uid().ok_or_else(|| {
        Error::internal_with_context(
            "resources",
            format!("trigger {} has no uid", trigger.name_any()),
        )
    })
}

/// Path on the broker filter that serves a single Trigger
pub fn filter_path(trigger: &Trigger) -> Result<String, Error> {
    Ok(format!(
        "/triggers/{}/{}/{}",
        trigger.namespace().unwrap_or_default(),
        trigger.name_any(),
        uid_of(trigger)?
    ))
}

/// URI the Trigger's Subscription delivers to
pub fn filter_subscriber_uri(
    trigger: &Trigger,
    system_namespace: &str,
    cluster_domain: &str,
) -> Result<String, Error> {
    Ok(format!(
        "http://{}{}",
        service_hostname(BROKER_FILTER_SERVICE_NAME, system_namespace, cluster_domain),
        filter_path(trigger)?
    ))
}

/// Name of the Subscription backing a Trigger: `{broker}-{trigger}-{uid}`
pub fn subscription_name(trigger: &Trigger) -> Result<String, Error> {
    Ok(format!(
        "{}-{}-{}",
        trigger.spec.broker,
        trigger.name_any(),
        uid_of(trigger)?
    ))
}

/// Channel the Broker fans events out on, read from its status annotations
pub fn broker_channel_ref(broker: &Broker) -> Result<ObjectReference, Error> {
    let annotation = |key: &str| {
        broker
            .status
            .as_ref()
            .and_then(|s| s.annotations.get(key))
            .filter(|v| !v.is_empty())
            .cloned()
    };

    match (
        annotation(CHANNEL_KIND_STATUS_ANNOTATION),
        annotation(CHANNEL_API_VERSION_STATUS_ANNOTATION),
        annotation(CHANNEL_NAME_STATUS_ANNOTATION),
        broker.namespace().filter(|ns| !ns.is_empty()),
    ) {
        (Some(kind), Some(api_version), Some(name), Some(namespace)) => Ok(ObjectReference {
            kind: Some(kind),
            api_version: Some(api_version),
            name: Some(name),
            namespace: Some(namespace),
            ..Default::default()
        }),
        _ => Err(Error::missing_broker_channel(MISSING_CHANNEL_ANNOTATIONS)),
    }
}

/// Reference to a Broker used as the Subscription reply
///
/// Hard coded group/version/kind: TypeMeta isn't reliably populated on
/// objects read from a cache.
pub fn broker_reference(broker: &Broker) -> KReference {
    KReference {
        kind: Broker::kind(&()).to_string(),
        namespace: broker.namespace(),
        name: broker.name_any(),
        api_version: Broker::api_version(&()).to_string(),
    }
}

/// The Subscription a Trigger should own
pub fn new_subscription(
    trigger: &Trigger,
    channel: &ObjectReference,
    broker: &KReference,
    subscriber_uri: &str,
    delivery: Option<&DeliverySpec>,
) -> Result<Subscription, Error> {
    let owner = trigger.controller_owner_ref(&()).ok_or_else(|| {
        Error::internal_with_context(
            "resources",
            format!("trigger {} has no name or uid", trigger.name_any()),
        )
    })?;

    let labels = BTreeMap::from([
        (BROKER_LABEL.to_string(), trigger.spec.broker.clone()),
        (TRIGGER_LABEL.to_string(), trigger.name_any()),
    ]);

    Ok(Subscription {
        metadata: ObjectMeta {
            name: Some(subscription_name(trigger)?),
            namespace: trigger.namespace(),
            labels: Some(labels),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: SubscriptionSpec {
            channel: ChannelReference {
                api_version: channel.api_version.clone().unwrap_or_default(),
                kind: channel.kind.clone().unwrap_or_default(),
                name: channel.name.clone().unwrap_or_default(),
            },
            subscriber: Some(Destination::from_uri(subscriber_uri)),
            reply: Some(Destination::from_ref(broker.clone())),
            delivery: delivery.cloned(),
        },
        status: None,
    })
}
