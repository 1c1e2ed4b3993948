//! Destination to URI resolution
//!
//! A destination is a reference to an addressable object, an absolute URI, or
//! a reference plus a URI relative to the object's address. Kubernetes
//! Services resolve to their cluster DNS name; every other kind must publish
//! `status.address.url`.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::reflector::ObjectRef;
use tracing::debug;
use url::Url;

#[cfg(test)]
use mockall::automock;

use mtbroker_common::crd::{address_url, Destination, KReference, Trigger};
use mtbroker_common::kube_utils::service_hostname;
use mtbroker_common::Error;

use crate::tracker::{DynamicTracker, SourceTracker};

// =============================================================================
// Traits for dependency injection and testability
// =============================================================================

/// Resolves destinations to absolute URIs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UriResolver: Send + Sync {
    /// Resolve `destination` within `namespace` on behalf of `trigger`
    ///
    /// The Trigger is requeued when a referenced addressable changes.
    async fn uri_from_destination(
        &self,
        destination: &Destination,
        namespace: &str,
        trigger: &ObjectRef<Trigger>,
    ) -> Result<String, Error>;
}

/// Looks up the address an addressable object publishes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// `status.address.url` of the referenced object
    async fn address_of(
        &self,
        reference: &KReference,
        namespace: &str,
        trigger: &ObjectRef<Trigger>,
    ) -> Result<String, Error>;
}

// =============================================================================
// Resolver
// =============================================================================

/// Production [`UriResolver`]
pub struct DestinationResolver {
    lookup: Arc<dyn AddressLookup>,
    cluster_domain: String,
}

impl DestinationResolver {
    /// Create a resolver using `lookup` for non-Service references
    pub fn new(lookup: Arc<dyn AddressLookup>, cluster_domain: impl Into<String>) -> Self {
        Self {
            lookup,
            cluster_domain: cluster_domain.into(),
        }
    }

    async fn uri_from_reference(
        &self,
        reference: &KReference,
        namespace: &str,
        trigger: &ObjectRef<Trigger>,
    ) -> Result<String, Error> {
        let namespace = reference.namespace.as_deref().unwrap_or(namespace);

        if is_core_service(reference) {
            return Ok(format!(
                "http://{}",
                service_hostname(&reference.name, namespace, &self.cluster_domain)
            ));
        }

        self.lookup.address_of(reference, namespace, trigger).await
    }
}

#[async_trait]
impl UriResolver for DestinationResolver {
    async fn uri_from_destination(
        &self,
        destination: &Destination,
        namespace: &str,
        trigger: &ObjectRef<Trigger>,
    ) -> Result<String, Error> {
        match (&destination.ref_, &destination.uri) {
            (Some(reference), uri) => {
                let base = self.uri_from_reference(reference, namespace, trigger).await?;
                match uri {
                    Some(relative) => join_relative(&base, relative),
                    None => Ok(base),
                }
            }
            (None, Some(uri)) => require_absolute(uri),
            (None, None) => Err(Error::resolution(
                "destination missing Ref and URI, expected at least one",
            )),
        }
    }
}

fn is_core_service(reference: &KReference) -> bool {
    reference.api_version == "v1" && reference.kind == "Service"
}

/// Accept `uri` only when it has both a scheme and a host
pub fn require_absolute(uri: &str) -> Result<String, Error> {
    match Url::parse(uri) {
        Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => Ok(uri.to_string()),
        _ => Err(Error::resolution(format!(
            "URI is not absolute (both scheme and host should be non-empty): {:?}",
            uri
        ))),
    }
}

/// Resolve a relative URI against the address of a referenced object
pub fn join_relative(base: &str, relative: &str) -> Result<String, Error> {
    if Url::parse(relative).is_ok() {
        return Err(Error::resolution(
            "absolute URI is not allowed when Ref or [apiVersion, kind, name] exists",
        ));
    }
    let base = Url::parse(base)
        .map_err(|e| Error::resolution(format!("invalid address {:?}: {}", base, e)))?;
    base.join(relative)
        .map(|joined| joined.to_string())
        .map_err(|e| Error::resolution(format!("invalid relative URI {:?}: {}", relative, e)))
}

// =============================================================================
// Cache-backed address lookup
// =============================================================================

#[async_trait]
impl AddressLookup for DynamicTracker {
    async fn address_of(
        &self,
        reference: &KReference,
        namespace: &str,
        trigger: &ObjectRef<Trigger>,
    ) -> Result<String, Error> {
        let object_ref = ObjectReference {
            api_version: Some(reference.api_version.clone()),
            kind: Some(reference.kind.clone()),
            name: Some(reference.name.clone()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        };

        self.track_in_namespace(trigger, namespace, &object_ref)?;

        let object = self
            .store_reader(&object_ref)
            .await?
            .get_object(namespace, &reference.name)
            .await?
            .ok_or_else(|| {
                Error::resolution(format!(
                    "failed to get object {}/{}: {} {:?} not found",
                    namespace, reference.name, reference.kind, reference.name
                ))
            })?;

        let url = address_url(&object)?.filter(|u| !u.is_empty());
        debug!(kind = %reference.kind, name = %reference.name, ?url, "resolved addressable");
        url.ok_or_else(|| {
            Error::resolution(format!(
                "address not set for {} {}/{}",
                reference.kind, namespace, reference.name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_NS: &str = "test-namespace";

    fn trigger_ref() -> ObjectRef<Trigger> {
        ObjectRef::new("test-trigger").within(TEST_NS)
    }

    fn addressable_ref() -> KReference {
        KReference {
            kind: "Service".to_string(),
            namespace: Some("subscriber-namespace".to_string()),
            name: "subscriber-name".to_string(),
            api_version: "serving.knative.dev/v1".to_string(),
        }
    }

    fn k8s_service_ref() -> KReference {
        KReference {
            kind: "Service".to_string(),
            namespace: None,
            name: "subscriber-name".to_string(),
            api_version: "v1".to_string(),
        }
    }

    fn resolver_with_address(address: &'static str) -> DestinationResolver {
        let mut lookup = MockAddressLookup::new();
        lookup
            .expect_address_of()
            .returning(move |_, _, _| Ok(address.to_string()));
        DestinationResolver::new(Arc::new(lookup), "cluster.local")
    }

    fn resolver_without_lookups() -> DestinationResolver {
        let mut lookup = MockAddressLookup::new();
        lookup.expect_address_of().never();
        DestinationResolver::new(Arc::new(lookup), "cluster.local")
    }

    #[tokio::test]
    async fn test_kubernetes_service_resolves_to_cluster_dns() {
        let resolver = resolver_without_lookups();
        let uri = resolver
            .uri_from_destination(&Destination::from_ref(k8s_service_ref()), TEST_NS, &trigger_ref())
            .await
            .unwrap();
        assert_eq!(uri, "http://subscriber-name.test-namespace.svc.cluster.local");
    }

    #[tokio::test]
    async fn test_addressable_reference_uses_published_address() {
        let resolver = resolver_with_address("http://example.com/subscriber/");
        let uri = resolver
            .uri_from_destination(&Destination::from_ref(addressable_ref()), TEST_NS, &trigger_ref())
            .await
            .unwrap();
        assert_eq!(uri, "http://example.com/subscriber/");
    }

    #[tokio::test]
    async fn test_reference_with_relative_uri_is_joined() {
        let resolver = resolver_with_address("http://example.com/subscriber/");
        let destination = Destination {
            ref_: Some(addressable_ref()),
            uri: Some("foo".to_string()),
        };
        let uri = resolver
            .uri_from_destination(&destination, TEST_NS, &trigger_ref())
            .await
            .unwrap();
        assert_eq!(uri, "http://example.com/subscriber/foo");
    }

    #[tokio::test]
    async fn test_reference_with_absolute_uri_is_rejected() {
        let resolver = resolver_with_address("http://example.com/subscriber/");
        let destination = Destination {
            ref_: Some(addressable_ref()),
            uri: Some("http://other.example.com".to_string()),
        };
        let err = resolver
            .uri_from_destination(&destination, TEST_NS, &trigger_ref())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("absolute URI is not allowed"));
    }

    #[tokio::test]
    async fn test_plain_uri_must_be_absolute() {
        let resolver = resolver_without_lookups();
        let ok = resolver
            .uri_from_destination(&Destination::from_uri("http://example.com"), TEST_NS, &trigger_ref())
            .await
            .unwrap();
        assert_eq!(ok, "http://example.com");

        let err = resolver
            .uri_from_destination(&Destination::from_uri("/relative"), TEST_NS, &trigger_ref())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"URI is not absolute (both scheme and host should be non-empty): "/relative""#
        );
    }

    #[tokio::test]
    async fn test_empty_destination_is_rejected() {
        let resolver = resolver_without_lookups();
        let err = resolver
            .uri_from_destination(&Destination::default(), TEST_NS, &trigger_ref())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "destination missing Ref and URI, expected at least one"
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let mut lookup = MockAddressLookup::new();
        lookup
            .expect_address_of()
            .returning(|_, _, _| Err(Error::resolution("address not set for Service ns/x")));
        let resolver = DestinationResolver::new(Arc::new(lookup), "cluster.local");
        let err = resolver
            .uri_from_destination(&Destination::from_ref(addressable_ref()), TEST_NS, &trigger_ref())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "address not set for Service ns/x");
    }

    #[test]
    fn test_mailto_is_not_absolute() {
        assert!(require_absolute("mailto:someone@example.com").is_err());
    }
}
