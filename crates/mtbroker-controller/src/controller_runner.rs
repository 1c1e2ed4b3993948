//! Controller runner - builds the Trigger controller future
//!
//! Returns boxed futures so the caller decides how to drive them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;

use mtbroker_common::crd::{Broker, Subscription, Trigger};
use mtbroker_trigger::{error_policy, reconcile, DynamicTracker, TriggerContext};

use crate::config::ControllerConfig;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope> + DeserializeOwned,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Build Trigger controller futures
///
/// Triggers are reconciled when they change, when the Subscription they own
/// changes, when the Broker they name changes, and when an object tracked on
/// their behalf changes.
pub fn build_trigger_controllers(
    client: Client,
    config: &ControllerConfig,
) -> Vec<Pin<Box<dyn Future<Output = ()> + Send>>> {
    let namespace = config.watch_namespace.as_deref();
    let triggers: Api<Trigger> = scoped_api(&client, namespace);
    let subscriptions: Api<Subscription> = scoped_api(&client, namespace);
    let brokers: Api<Broker> = scoped_api(&client, namespace);

    let controller = Controller::new(triggers, watcher_config());
    let trigger_store = controller.store();

    let (tracker, requeues) = DynamicTracker::new(
        client.clone(),
        trigger_store.clone(),
        config.watch_namespace.clone(),
        config.cache_sync_timeout(),
    );
    let ctx = Arc::new(TriggerContext::from_client(
        client.clone(),
        Arc::new(tracker),
        config.system_namespace.clone(),
        config.cluster_domain.clone(),
    ));

    let trigger_ctrl = controller
        .owns(subscriptions, watcher_config())
        .watches(brokers, watcher_config(), move |broker| {
            triggers_for_broker(&trigger_store, &broker)
        })
        .reconcile_on(requeues)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(log_reconcile_result("Trigger"));

    tracing::info!(
        namespace = namespace.unwrap_or("<all>"),
        system_namespace = %config.system_namespace,
        "- Trigger controller"
    );

    vec![Box::pin(trigger_ctrl)]
}

/// Triggers in the Broker's namespace that name it
fn triggers_for_broker(store: &Store<Trigger>, broker: &Broker) -> Vec<ObjectRef<Trigger>> {
    let namespace = broker.namespace();
    let name = broker.name_any();

    let affected: Vec<ObjectRef<Trigger>> = store
        .state()
        .into_iter()
        .filter(|t| t.namespace() == namespace && t.spec.broker == name)
        .map(|t| ObjectRef::from_obj(t.as_ref()))
        .collect();

    tracing::debug!(
        broker = %name,
        affected_count = affected.len(),
        "Triggering re-reconciliation of triggers on broker"
    );
    affected
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
