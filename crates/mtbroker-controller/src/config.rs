//! Controller configuration from flags and environment

use std::time::Duration;

use clap::Args;

use mtbroker_common::kube_utils::DEFAULT_CLUSTER_DOMAIN;
use mtbroker_common::DEFAULT_SYSTEM_NAMESPACE;

/// Settings for the Trigger controller
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace of the broker filter service
    #[arg(long, env = "SYSTEM_NAMESPACE", default_value = DEFAULT_SYSTEM_NAMESPACE)]
    pub system_namespace: String,

    /// DNS domain of the cluster
    #[arg(long, env = "CLUSTER_DOMAIN", default_value = DEFAULT_CLUSTER_DOMAIN)]
    pub cluster_domain: String,

    /// Only watch resources in this namespace
    #[arg(long = "namespace", env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// How long a dependency lookup waits for its cache to sync
    #[arg(long, default_value_t = 10)]
    pub cache_sync_timeout_secs: u64,
}

impl ControllerConfig {
    /// Cache sync timeout as a Duration
    pub fn cache_sync_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_sync_timeout_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            system_namespace: DEFAULT_SYSTEM_NAMESPACE.to_string(),
            cluster_domain: DEFAULT_CLUSTER_DOMAIN.to_string(),
            watch_namespace: None,
            cache_sync_timeout_secs: 10,
        }
    }
}
