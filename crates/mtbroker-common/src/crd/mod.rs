//! Custom Resource Definitions consumed and produced by the Trigger reconciler
//!
//! Triggers and Brokers live in `eventing.knative.dev/v1`, Subscriptions in
//! `messaging.knative.dev/v1`. The duck module reads arbitrary kinds.

mod broker;
mod duck;
mod subscription;
mod trigger;
mod types;

pub use broker::{
    Broker, BrokerSpec, BrokerStatus, BROKER_CLASS_ANNOTATION,
    CHANNEL_API_VERSION_STATUS_ANNOTATION, CHANNEL_KIND_STATUS_ANNOTATION,
    CHANNEL_NAME_STATUS_ANNOTATION, MT_CHANNEL_BROKER_CLASS,
};
pub use duck::{address_url, GenericStatusObject};
pub use subscription::{
    ChannelReference, Subscription, SubscriptionSpec, SubscriptionStatus, BROKER_LABEL,
    TRIGGER_LABEL,
};
pub use trigger::{
    Trigger, TriggerFilter, TriggerSpec, TriggerStatus, TRIGGER_CONDITION_BROKER,
    TRIGGER_CONDITION_DEAD_LETTER_SINK_RESOLVED, TRIGGER_CONDITION_DEPENDENCY,
    TRIGGER_CONDITION_SET, TRIGGER_CONDITION_SUBSCRIBED, TRIGGER_CONDITION_SUBSCRIBER_RESOLVED,
};
pub use types::{
    find_condition, Addressable, BackoffPolicy, Condition, ConditionStatus, DeliverySpec,
    Destination, KReference,
};
