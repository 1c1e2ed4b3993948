//! Trigger reconciler for the multi-tenant channel-based broker
//!
//! Reconciles each Trigger into a Subscription on its Broker's trigger
//! channel and keeps the Trigger's status conditions in step with the
//! Broker, the Subscription, the resolved destinations and the optional
//! dependency named by annotation.

pub mod controller;
pub mod resolver;
pub mod resources;
pub mod tracker;

pub use controller::{
    error_policy, reconcile, TriggerContext, TriggerKubeClient, TriggerKubeClientImpl,
};
pub use resolver::{AddressLookup, DestinationResolver, UriResolver};
pub use tracker::{DynamicTracker, ResourceReader, SourceTracker};
