//! Common types for mtbroker: CRDs, conditions, errors, events and telemetry

#![deny(missing_docs)]

pub mod conditions;
pub mod crd;
pub mod error;
pub mod events;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default namespace of the eventing system components
pub const DEFAULT_SYSTEM_NAMESPACE: &str = "knative-eventing";

/// Name of the broker filter Service that Subscriptions deliver to
pub const BROKER_FILTER_SERVICE_NAME: &str = "broker-filter";

/// Annotation naming a resource whose readiness gates a Trigger
pub const DEPENDENCY_ANNOTATION: &str = "knative.dev/dependency";

/// Controller name reported on events and used as field manager
pub const CONTROLLER_NAME: &str = "mt-broker-controller";
