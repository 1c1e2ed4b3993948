//! Shared helpers for the kind integration tests

use std::time::Duration;

use kube::api::{Api, DeleteParams, ObjectMeta, PostParams};
use kube::Client;

use mtbroker_common::crd::{Condition, Destination, Trigger, TriggerSpec};

/// Namespace the tests create their resources in
pub const TEST_NAMESPACE: &str = "default";

/// Client for the current kubeconfig context
pub async fn client() -> Client {
    Client::try_default()
        .await
        .expect("kubeconfig should point at the kind cluster")
}

/// A Trigger delivering to a fixed URI
pub fn sample_trigger(name: &str, broker: &str) -> Trigger {
    Trigger {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: TriggerSpec {
            broker: broker.to_string(),
            filter: None,
            subscriber: Destination::from_uri("http://example.com"),
            delivery: None,
        },
        status: None,
    }
}

/// Create `trigger`, replacing a leftover from an earlier run
pub async fn create_trigger(api: &Api<Trigger>, trigger: &Trigger) {
    let name = trigger.metadata.name.clone().unwrap_or_default();
    let _ = api.delete(&name, &DeleteParams::default()).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    api.create(&PostParams::default(), trigger)
        .await
        .expect("trigger should be created");
}

/// Poll until the Trigger carries condition `type_`, or time out
pub async fn wait_for_condition(
    api: &Api<Trigger>,
    name: &str,
    type_: &str,
    timeout: Duration,
) -> Option<Condition> {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if let Ok(trigger) = api.get(name).await {
            if let Some(condition) = trigger
                .status
                .as_ref()
                .and_then(|s| s.get_condition(type_))
                .filter(|c| !c.reason.is_empty())
            {
                return Some(condition.clone());
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    None
}
