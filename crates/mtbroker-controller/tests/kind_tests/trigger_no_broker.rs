//! Story: a Trigger is created before the Broker it names

use std::time::Duration;

use kube::api::{Api, DeleteParams};

use mtbroker_common::crd::{ConditionStatus, Trigger, TRIGGER_CONDITION_BROKER};

use super::helpers::{client, create_trigger, sample_trigger, wait_for_condition, TEST_NAMESPACE};

#[tokio::test]
#[ignore = "requires a kind cluster with the eventing CRDs and a running controller"]
async fn story_trigger_without_broker_reports_missing_broker() {
    let client = client().await;
    let triggers: Api<Trigger> = Api::namespaced(client, TEST_NAMESPACE);

    let trigger = sample_trigger("e2e-no-broker", "e2e-missing-broker");
    create_trigger(&triggers, &trigger).await;

    let condition = wait_for_condition(
        &triggers,
        "e2e-no-broker",
        TRIGGER_CONDITION_BROKER,
        Duration::from_secs(60),
    )
    .await
    .expect("controller should report on the broker");

    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason, "BrokerDoesNotExist");
    assert_eq!(
        condition.message,
        r#"Broker "e2e-missing-broker" does not exist"#
    );

    let _ = triggers
        .delete("e2e-no-broker", &DeleteParams::default())
        .await;
}
