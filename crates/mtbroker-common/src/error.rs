//! Error types for the mtbroker controllers
//!
//! Variants carry the context needed to explain a failed reconciliation in
//! the Trigger status and in the warning events recorded against it. The
//! `Display` output of each variant is what ends up in condition messages,
//! so the wording is kept stable.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for mtbroker operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// The Broker does not advertise the channel its Triggers subscribe to
    #[error("failed to find Broker's Trigger channel: {message}")]
    MissingBrokerChannel {
        /// Why the channel reference could not be built
        message: String,
    },

    /// A Subscription with the expected name exists but belongs to someone else
    #[error("trigger {trigger:?} does not own subscription {subscription:?}")]
    SubscriptionNotOwned {
        /// Name of the Trigger being reconciled
        trigger: String,
        /// Name of the conflicting Subscription
        subscription: String,
    },

    /// The Broker declares a dead letter sink but has not resolved it yet
    #[error("broker {broker} didn't set status.deadLetterSinkURI")]
    DeadLetterSinkUnresolved {
        /// Name of the Broker
        broker: String,
    },

    /// A destination could not be resolved to an absolute URI
    #[error("{message}")]
    Resolution {
        /// Description of what failed
        message: String,
    },

    /// The dependency annotation does not hold a valid object reference
    #[error("getting object ref from dependency annotation {annotation:?}: {message}")]
    DependencyAnnotation {
        /// Raw annotation value
        annotation: String,
        /// Parser error
        message: String,
    },

    /// Registering interest in a dependency failed
    #[error("tracking dependency: {message}")]
    Tracking {
        /// Description of what failed
        message: String,
    },

    /// The dependency could not be read
    #[error("propagating dependency readiness: {message}")]
    DependencyReadiness {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "reconciler", "tracker")
        context: String,
    },
}

impl Error {
    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error for a specific resource kind
    pub fn serialization_for(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a missing broker channel error
    pub fn missing_broker_channel(msg: impl Into<String>) -> Self {
        Self::MissingBrokerChannel {
            message: msg.into(),
        }
    }

    /// Create an ownership conflict error
    pub fn subscription_not_owned(
        trigger: impl Into<String>,
        subscription: impl Into<String>,
    ) -> Self {
        Self::SubscriptionNotOwned {
            trigger: trigger.into(),
            subscription: subscription.into(),
        }
    }

    /// Create a resolution error with the given message
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution {
            message: msg.into(),
        }
    }

    /// Create a tracking error with the given message
    pub fn tracking(msg: impl Into<String>) -> Self {
        Self::Tracking {
            message: msg.into(),
        }
    }

    /// Create a dependency readiness error with the given message
    pub fn dependency_readiness(msg: impl Into<String>) -> Self {
        Self::DependencyReadiness {
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Whether this error is a Kubernetes 404
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Kube {
                source: kube::Error::Api(ae)
            } if ae.code == 404
        )
    }

    /// Check if this error is retryable
    ///
    /// Every error a Trigger reconciliation returns is retried with backoff.
    /// Only serialization errors are permanent: the same object will fail the
    /// same way until it changes.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Serialization { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}
