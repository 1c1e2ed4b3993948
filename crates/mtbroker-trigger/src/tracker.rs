//! Dynamic tracking of arbitrary resources a Trigger depends on
//!
//! A Trigger can name any kind of resource in its dependency annotation, and
//! its subscriber can be any addressable kind. Neither is known at compile
//! time, so this module:
//!
//! - resolves the kind through API discovery and starts one reflector per
//!   group/version/kind on first use, serving reads from its cache;
//! - records which Triggers care about which objects, and pushes those
//!   Triggers onto the controller's trigger stream whenever a tracked object
//!   is applied or deleted.
//!
//! A Trigger's entries are dropped at the start of each of its reconciles and
//! recorded again as the reconcile touches objects, so references it no
//! longer names stop requeuing it. Triggers gone from the controller's cache
//! are dropped the next time one of their objects changes.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::StreamExt;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind};
use kube::discovery::{ApiCapabilities, Scope};
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, ResourceExt};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use mtbroker_common::crd::{GenericStatusObject, Trigger};
use mtbroker_common::kube_utils::gvk_for;
use mtbroker_common::Error;

/// Watcher timeout (seconds), kept below the client read timeout
const WATCH_TIMEOUT_SECS: u32 = 25;

// =============================================================================
// Traits for dependency injection and testability
// =============================================================================

/// Read access to one kind of resource, projected onto its readiness
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceReader: Send + Sync {
    /// Get an object by namespace and name; `Ok(None)` when it doesn't exist
    async fn get(&self, namespace: &str, name: &str)
        -> Result<Option<GenericStatusObject>, Error>;
}

/// Tracks resources of arbitrary kinds on behalf of Triggers
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SourceTracker: Send + Sync {
    /// Requeue `trigger` whenever the referenced object in `namespace` changes
    fn track_in_namespace(
        &self,
        trigger: &ObjectRef<Trigger>,
        namespace: &str,
        reference: &ObjectReference,
    ) -> Result<(), Error>;

    /// Forget every object tracked on behalf of `trigger`
    fn untrack(&self, trigger: &ObjectRef<Trigger>);

    /// A reader for the kind named by `reference`
    async fn reader_for(
        &self,
        reference: &ObjectReference,
    ) -> Result<Arc<dyn ResourceReader>, Error>;
}

// =============================================================================
// Tracking index
// =============================================================================

/// Identity of a tracked object
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackedKey {
    /// Group/version/kind of the object
    pub gvk: GroupVersionKind,
    /// Namespace of the object
    pub namespace: String,
    /// Name of the object
    pub name: String,
}

impl TrackedKey {
    /// Build a key from an object reference, using `namespace` for the object
    pub fn from_reference(reference: &ObjectReference, namespace: &str) -> Result<Self, Error> {
        let (Some(api_version), Some(kind), Some(name)) = (
            reference.api_version.as_deref().filter(|s| !s.is_empty()),
            reference.kind.as_deref().filter(|s| !s.is_empty()),
            reference.name.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(Error::tracking(format!(
                "reference must set apiVersion, kind and name: {:?}",
                reference
            )));
        };

        Ok(Self {
            gvk: gvk_for(api_version, kind),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

/// Which Triggers watch which objects, plus the channel that requeues them
#[derive(Clone)]
pub struct TrackingIndex {
    watchers: Arc<DashMap<TrackedKey, HashSet<ObjectRef<Trigger>>>>,
    tracked: Arc<DashMap<ObjectRef<Trigger>, HashSet<TrackedKey>>>,
    live_triggers: Option<Store<Trigger>>,
    sender: UnboundedSender<ObjectRef<Trigger>>,
}

impl TrackingIndex {
    /// Create an index and the stream of Triggers it requeues
    pub fn new() -> (Self, UnboundedReceiverStream<ObjectRef<Trigger>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                watchers: Arc::new(DashMap::new()),
                tracked: Arc::new(DashMap::new()),
                live_triggers: None,
                sender,
            },
            UnboundedReceiverStream::new(receiver),
        )
    }

    /// Drop Triggers missing from `store` instead of requeuing them
    pub fn with_live_triggers(mut self, store: Store<Trigger>) -> Self {
        self.live_triggers = Some(store);
        self
    }

    /// Record that `trigger` depends on `key`
    pub fn track(&self, key: TrackedKey, trigger: ObjectRef<Trigger>) {
        self.watchers
            .entry(key.clone())
            .or_default()
            .insert(trigger.clone());
        self.tracked.entry(trigger).or_default().insert(key);
    }

    /// Forget every key recorded for `trigger`
    pub fn untrack(&self, trigger: &ObjectRef<Trigger>) {
        let Some((_, keys)) = self.tracked.remove(trigger) else {
            return;
        };
        for key in keys {
            if let Entry::Occupied(mut watchers) = self.watchers.entry(key) {
                watchers.get_mut().remove(trigger);
                if watchers.get().is_empty() {
                    watchers.remove();
                }
            }
        }
    }

    /// Requeue every Trigger tracking the object identified by `key`
    ///
    /// Returns how many Triggers were requeued.
    pub fn notify(&self, key: &TrackedKey) -> usize {
        // Copied out so untracking below doesn't contend with the read guard.
        let triggers: Vec<ObjectRef<Trigger>> = match self.watchers.get(key) {
            Some(triggers) => triggers.iter().cloned().collect(),
            None => return 0,
        };
        let mut sent = 0;
        for trigger in triggers {
            if self.is_gone(&trigger) {
                debug!(trigger = %trigger, "trigger no longer exists, untracking");
                self.untrack(&trigger);
                continue;
            }
            if self.sender.send(trigger.clone()).is_err() {
                debug!(trigger = %trigger, "trigger stream closed, dropping requeue");
                break;
            }
            sent += 1;
        }
        sent
    }

    fn is_gone(&self, trigger: &ObjectRef<Trigger>) -> bool {
        self.live_triggers
            .as_ref()
            .is_some_and(|store| store.get(trigger).is_none())
    }

    /// Keys currently recorded for `trigger`
    pub fn keys_for(&self, trigger: &ObjectRef<Trigger>) -> usize {
        self.tracked.get(trigger).map_or(0, |keys| keys.len())
    }

    /// Number of distinct tracked objects
    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}

// =============================================================================
// Cache-backed reader
// =============================================================================

/// Reader over a reflector store for one group/version/kind
#[derive(Clone)]
pub struct StoreReader {
    api_resource: ApiResource,
    store: Store<DynamicObject>,
    sync_timeout: Duration,
}

impl StoreReader {
    /// Get the raw object, waiting for the cache's initial sync first
    pub async fn get_object(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Arc<DynamicObject>>, Error> {
        tokio::time::timeout(self.sync_timeout, self.store.wait_until_ready())
            .await
            .map_err(|_| {
                Error::internal_with_context(
                    "tracker",
                    format!(
                        "cache for {} not synced after {:?}",
                        self.api_resource.kind, self.sync_timeout
                    ),
                )
            })?
            .map_err(|e| Error::internal_with_context("tracker", e.to_string()))?;

        let key = ObjectRef::new_with(name, self.api_resource.clone()).within(namespace);
        Ok(self.store.get(&key))
    }
}

#[async_trait]
impl ResourceReader for StoreReader {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<GenericStatusObject>, Error> {
        match self.get_object(namespace, name).await? {
            Some(obj) => GenericStatusObject::from_dynamic(&obj).map(Some),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Production tracker
// =============================================================================

/// Discovery-driven tracker with one reflector per group/version/kind
pub struct DynamicTracker {
    client: Client,
    readers: DashMap<GroupVersionKind, StoreReader>,
    index: TrackingIndex,
    watch_namespace: Option<String>,
    sync_timeout: Duration,
}

impl DynamicTracker {
    /// Create a tracker and the stream of Triggers it requeues
    ///
    /// The stream must be handed to the Trigger controller; requeues are
    /// dropped once it is gone. `triggers` is the controller's Trigger cache,
    /// used to forget deleted Triggers.
    pub fn new(
        client: Client,
        triggers: Store<Trigger>,
        watch_namespace: Option<String>,
        sync_timeout: Duration,
    ) -> (Self, UnboundedReceiverStream<ObjectRef<Trigger>>) {
        let (index, stream) = TrackingIndex::new();
        let index = index.with_live_triggers(triggers);
        (
            Self {
                client,
                readers: DashMap::new(),
                index,
                watch_namespace,
                sync_timeout,
            },
            stream,
        )
    }

    /// The cache-backed reader for `reference`'s kind, starting it if needed
    pub async fn store_reader(&self, reference: &ObjectReference) -> Result<StoreReader, Error> {
        let api_version = reference.api_version.as_deref().unwrap_or_default();
        let kind = reference.kind.as_deref().unwrap_or_default();
        if api_version.is_empty() || kind.is_empty() {
            return Err(Error::internal_with_context(
                "tracker",
                format!("reference must set apiVersion and kind: {:?}", reference),
            ));
        }
        let gvk = gvk_for(api_version, kind);

        if let Some(reader) = self.readers.get(&gvk) {
            return Ok(reader.clone());
        }

        let (api_resource, capabilities) = kube::discovery::pinned_kind(&self.client, &gvk)
            .await
            .map_err(|e| {
                Error::internal_with_context(
                    "tracker",
                    format!("discovering {}/{}: {}", api_version, kind, e),
                )
            })?;

        // Two Triggers can race through discovery; only the first starts a reflector.
        let reader = match self.readers.entry(gvk.clone()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                let reader = self.start_reflector(gvk, api_resource, capabilities);
                slot.insert(reader.clone());
                reader
            }
        };
        Ok(reader)
    }

    fn start_reflector(
        &self,
        gvk: GroupVersionKind,
        api_resource: ApiResource,
        capabilities: ApiCapabilities,
    ) -> StoreReader {
        let api: Api<DynamicObject> = match (&self.watch_namespace, capabilities.scope) {
            (Some(ns), Scope::Namespaced) => {
                Api::namespaced_with(self.client.clone(), ns, &api_resource)
            }
            _ => Api::all_with(self.client.clone(), &api_resource),
        };

        let writer = reflector::store::Writer::new(api_resource.clone());
        let store = writer.as_reader();
        let index = self.index.clone();
        let stream = reflector::reflector(
            writer,
            watcher(api, watcher::Config::default().timeout(WATCH_TIMEOUT_SECS)),
        )
        .default_backoff()
        .touched_objects();

        info!(group = %gvk.group, version = %gvk.version, kind = %gvk.kind, "starting dependency reflector");

        tokio::spawn(async move {
            let mut stream = stream.boxed();
            while let Some(event) = stream.next().await {
                match event {
                    Ok(obj) => {
                        let key = TrackedKey {
                            gvk: gvk.clone(),
                            namespace: obj.namespace().unwrap_or_default(),
                            name: obj.name_any(),
                        };
                        let requeued = index.notify(&key);
                        if requeued > 0 {
                            debug!(kind = %gvk.kind, name = %key.name, requeued, "tracked object changed");
                        }
                    }
                    Err(e) => warn!(kind = %gvk.kind, error = %e, "dependency watch error"),
                }
            }
        });

        StoreReader {
            api_resource,
            store,
            sync_timeout: self.sync_timeout,
        }
    }
}

#[async_trait]
impl SourceTracker for DynamicTracker {
    fn track_in_namespace(
        &self,
        trigger: &ObjectRef<Trigger>,
        namespace: &str,
        reference: &ObjectReference,
    ) -> Result<(), Error> {
        let key = TrackedKey::from_reference(reference, namespace)?;
        self.index.track(key, trigger.clone());
        Ok(())
    }

    fn untrack(&self, trigger: &ObjectRef<Trigger>) {
        self.index.untrack(trigger);
    }

    async fn reader_for(
        &self,
        reference: &ObjectReference,
    ) -> Result<Arc<dyn ResourceReader>, Error> {
        Ok(Arc::new(self.store_reader(reference).await?))
    }
}
