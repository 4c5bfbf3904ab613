// meridian_core/src/capability.rs

//! The capability registry: which named series an algorithm may declare as
//! inputs or outputs.

use std::collections::BTreeMap;

use crate::container::{ContainerRole, ContainerStore};
use crate::error::SimError;

/// The catalog a capability name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    ConstantInput,
    VaryingInput,
    Output,
    Unknown,
}

/// Three disjoint catalogs of capability name -> description, built once by
/// scanning the engine's owned containers. Feature gating (GPS,
/// magnetometer) happens before the scan: disabled sensors simply have no
/// containers, so their capabilities never appear here.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    constant_inputs: BTreeMap<String, String>,
    varying_inputs: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
}

impl CapabilityRegistry {
    /// Scans `store` and sorts each non-internal container into its catalog.
    /// A name appearing in more than one catalog is a construction failure.
    pub fn from_containers(store: &ContainerStore) -> Result<Self, SimError> {
        let mut registry = Self::default();
        for container in store.iter() {
            let catalog = match container.role() {
                ContainerRole::ConstantInput => &mut registry.constant_inputs,
                ContainerRole::VaryingInput => &mut registry.varying_inputs,
                ContainerRole::Output => &mut registry.outputs,
                ContainerRole::Internal => continue,
            };
            catalog.insert(
                container.name().to_string(),
                container.description().to_string(),
            );
        }
        registry.check_disjoint()?;
        Ok(registry)
    }

    /// Pure lookup of the catalog a name belongs to.
    pub fn category_of(&self, name: &str) -> Category {
        if self.constant_inputs.contains_key(name) {
            Category::ConstantInput
        } else if self.varying_inputs.contains_key(name) {
            Category::VaryingInput
        } else if self.outputs.contains_key(name) {
            Category::Output
        } else {
            Category::Unknown
        }
    }

    pub fn describe(&self, name: &str) -> Option<&str> {
        self.constant_inputs
            .get(name)
            .or_else(|| self.varying_inputs.get(name))
            .or_else(|| self.outputs.get(name))
            .map(String::as_str)
    }

    pub fn constant_inputs(&self) -> &BTreeMap<String, String> {
        &self.constant_inputs
    }

    pub fn varying_inputs(&self) -> &BTreeMap<String, String> {
        &self.varying_inputs
    }

    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    fn check_disjoint(&self) -> Result<(), SimError> {
        for name in self.constant_inputs.keys() {
            if self.varying_inputs.contains_key(name) || self.outputs.contains_key(name) {
                return Err(Self::overlap(name));
            }
        }
        for name in self.varying_inputs.keys() {
            if self.outputs.contains_key(name) {
                return Err(Self::overlap(name));
            }
        }
        Ok(())
    }

    fn overlap(name: &str) -> SimError {
        SimError::Configuration(format!(
            "capability '{name}' appears in more than one registry catalog"
        ))
    }
}
