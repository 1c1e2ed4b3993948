//! Duck-typed views over arbitrary resources
//!
//! Dependencies and addressables can be of any kind, so they are read as
//! `DynamicObject`s and projected onto the few fields the reconciler needs.

use kube::api::DynamicObject;
use serde::Deserialize;

use super::types::{find_condition, Addressable, Condition};
use crate::conditions::CONDITION_READY;
use crate::Error;

/// Readiness view of any resource following the source duck type
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenericStatusObject {
    /// `metadata.generation`
    pub generation: i64,
    /// `status.observedGeneration`
    pub observed_generation: i64,
    /// `Ready` condition from `status.conditions`
    pub ready_condition: Option<Condition>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DuckStatus {
    #[serde(default)]
    observed_generation: i64,
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default)]
    address: Option<Addressable>,
}

fn duck_status(obj: &DynamicObject) -> Result<DuckStatus, Error> {
    match obj.data.get("status") {
        None | Some(serde_json::Value::Null) => Ok(DuckStatus::default()),
        Some(status) => serde_json::from_value(status.clone()).map_err(|e| {
            Error::serialization_for(
                obj.types
                    .as_ref()
                    .map(|t| t.kind.clone())
                    .unwrap_or_default(),
                format!("malformed status: {}", e),
            )
        }),
    }
}

impl GenericStatusObject {
    /// Project a dynamic object onto its generation and readiness
    pub fn from_dynamic(obj: &DynamicObject) -> Result<Self, Error> {
        let status = duck_status(obj)?;
        Ok(Self {
            generation: obj.metadata.generation.unwrap_or_default(),
            observed_generation: status.observed_generation,
            ready_condition: find_condition(&status.conditions, CONDITION_READY).cloned(),
        })
    }

    /// Whether the object's controller has caught up with its spec
    pub fn is_generation_observed(&self) -> bool {
        self.generation == self.observed_generation
    }
}

/// `status.address.url` of an addressable resource
pub fn address_url(obj: &DynamicObject) -> Result<Option<String>, Error> {
    Ok(duck_status(obj)?.address.and_then(|a| a.url))
}
