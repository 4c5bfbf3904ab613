// meridian_core/src/binding.rs

//! Binding an algorithm's declared capability names to concrete containers.
//!
//! The plan is compiled exactly once, at bind time, into slot indices. Trial
//! execution then builds call arguments and stores results by direct indexed
//! lookup; nothing is re-resolved or re-parsed per trial.

use crate::algorithm::NavAlgorithm;
use crate::capability::{CapabilityRegistry, Category};
use crate::container::ContainerStore;
use crate::error::{BindingDirection, SimError};
use crate::types::{SampleData, TrialIndex};

/// One planned input: the container slot plus how its payload is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundInput {
    pub slot: usize,
    pub category: Category,
}

/// The immutable result of a successful bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPlan {
    inputs: Vec<BoundInput>,
    outputs: Vec<usize>,
}

impl BindingPlan {
    pub fn inputs(&self) -> &[BoundInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }
}

/// Validates an algorithm's declared capability names and translates between
/// the plugin boundary and the engine's container model.
#[derive(Debug, Clone)]
pub struct AlgorithmAdapter {
    plan: BindingPlan,
}

impl AlgorithmAdapter {
    /// Compiles the binding plan. Every input name must resolve to a
    /// constant or varying input capability, every output name to an output
    /// capability; an unknown or miscategorized name aborts the bind and no
    /// partial plan is retained. Zero declared inputs or outputs is invalid.
    pub fn bind(
        registry: &CapabilityRegistry,
        store: &ContainerStore,
        algorithm: &dyn NavAlgorithm,
    ) -> Result<Self, SimError> {
        let input_names = algorithm.input_names();
        let output_names = algorithm.output_names();
        if input_names.is_empty() {
            return Err(SimError::InvalidAlgorithm("algorithm declares no inputs"));
        }
        if output_names.is_empty() {
            return Err(SimError::InvalidAlgorithm("algorithm declares no outputs"));
        }

        let mut inputs = Vec::with_capacity(input_names.len());
        for name in &input_names {
            let category = registry.category_of(name);
            match category {
                Category::ConstantInput | Category::VaryingInput => {}
                Category::Output | Category::Unknown => {
                    return Err(SimError::CapabilityBinding {
                        name: name.clone(),
                        direction: BindingDirection::Input,
                    });
                }
            }
            inputs.push(BoundInput {
                slot: Self::slot(store, name)?,
                category,
            });
        }

        let mut outputs = Vec::with_capacity(output_names.len());
        for name in &output_names {
            if registry.category_of(name) != Category::Output {
                return Err(SimError::CapabilityBinding {
                    name: name.clone(),
                    direction: BindingDirection::Output,
                });
            }
            outputs.push(Self::slot(store, name)?);
        }

        Ok(Self {
            plan: BindingPlan { inputs, outputs },
        })
    }

    pub fn plan(&self) -> &BindingPlan {
        &self.plan
    }

    /// Collects the ordered call arguments for one trial: the constant
    /// payload (trial index ignored) or the specific trial's payload.
    pub fn build_inputs<'a>(
        &self,
        store: &'a ContainerStore,
        trial: TrialIndex,
    ) -> Result<Vec<&'a SampleData>, SimError> {
        self.plan
            .inputs
            .iter()
            .map(|input| {
                let container = store.get(input.slot);
                let data = match input.category {
                    Category::ConstantInput => container.get_constant(),
                    Category::VaryingInput => container.get_trial(trial),
                    // Unreachable by construction of the plan.
                    Category::Output | Category::Unknown => None,
                };
                data.ok_or_else(|| SimError::MissingData {
                    container: container.name().to_string(),
                    trial: matches!(input.category, Category::VaryingInput).then_some(trial),
                })
            })
            .collect()
    }

    /// Writes one trial's results into the planned output containers, in
    /// output-declaration order.
    pub fn store_outputs(
        &self,
        store: &mut ContainerStore,
        trial: TrialIndex,
        values: Vec<SampleData>,
    ) -> Result<(), SimError> {
        if values.len() != self.plan.outputs.len() {
            return Err(SimError::OutputArity {
                expected: self.plan.outputs.len(),
                actual: values.len(),
            });
        }
        for (&slot, value) in self.plan.outputs.iter().zip(values) {
            store.get_mut(slot).set_trial(trial, value)?;
        }
        Ok(())
    }

    fn slot(store: &ContainerStore, name: &str) -> Result<usize, SimError> {
        // The registry was built from this store, so the lookup cannot miss;
        // treat a miss as a configuration fault rather than panicking.
        store.slot_of(name).ok_or_else(|| {
            SimError::Configuration(format!("capability '{name}' has no backing container"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerRole, DataContainer};
    use crate::types::SampleMatrix;

    struct FakeAlgorithm {
        inputs: Vec<String>,
        outputs: Vec<String>,
    }

    impl FakeAlgorithm {
        fn new(inputs: &[&str], outputs: &[&str]) -> Self {
            Self {
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl NavAlgorithm for FakeAlgorithm {
        fn input_names(&self) -> Vec<String> {
            self.inputs.clone()
        }

        fn output_names(&self) -> Vec<String> {
            self.outputs.clone()
        }

        fn run(&mut self, _inputs: &[&SampleData]) -> Result<(), SimError> {
            Ok(())
        }

        fn take_results(&mut self) -> Result<Vec<SampleData>, SimError> {
            Ok(Vec::new())
        }
    }

    fn fixture() -> (CapabilityRegistry, ContainerStore) {
        let mut store = ContainerStore::default();
        store
            .insert(DataContainer::constant("fs", "rate", ContainerRole::ConstantInput))
            .unwrap();
        store
            .insert(DataContainer::constant(
                "ref_gyro",
                "true angular velocity",
                ContainerRole::ConstantInput,
            ))
            .unwrap();
        store
            .insert(DataContainer::per_trial(
                "gyro",
                "gyro measurements",
                ContainerRole::VaryingInput,
            ))
            .unwrap();
        store
            .insert(DataContainer::per_trial("pos", "sim pos", ContainerRole::Output))
            .unwrap();
        let registry = CapabilityRegistry::from_containers(&store).unwrap();
        (registry, store)
    }

    #[test]
    fn test_bind_compiles_categories_in_order() {
        let (registry, store) = fixture();
        let algo = FakeAlgorithm::new(&["gyro", "fs"], &["pos"]);
        let adapter = AlgorithmAdapter::bind(&registry, &store, &algo).unwrap();

        let plan = adapter.plan();
        assert_eq!(plan.inputs().len(), 2);
        assert_eq!(plan.inputs()[0].category, Category::VaryingInput);
        assert_eq!(plan.inputs()[1].category, Category::ConstantInput);
        assert_eq!(plan.outputs().len(), 1);
    }

    #[test]
    fn test_bind_rejects_unknown_input() {
        let (registry, store) = fixture();
        let algo = FakeAlgorithm::new(&["unknown_sensor"], &["pos"]);
        let err = AlgorithmAdapter::bind(&registry, &store, &algo).unwrap_err();
        assert!(matches!(
            err,
            SimError::CapabilityBinding {
                direction: BindingDirection::Input,
                ..
            }
        ));
    }

    #[test]
    fn test_bind_rejects_output_used_as_input() {
        let (registry, store) = fixture();
        let algo = FakeAlgorithm::new(&["pos"], &["pos"]);
        let err = AlgorithmAdapter::bind(&registry, &store, &algo).unwrap_err();
        assert!(matches!(
            err,
            SimError::CapabilityBinding {
                direction: BindingDirection::Input,
                ..
            }
        ));
    }

    #[test]
    fn test_bind_rejects_input_used_as_output() {
        let (registry, store) = fixture();
        let algo = FakeAlgorithm::new(&["gyro"], &["gyro"]);
        let err = AlgorithmAdapter::bind(&registry, &store, &algo).unwrap_err();
        assert!(matches!(
            err,
            SimError::CapabilityBinding {
                direction: BindingDirection::Output,
                ..
            }
        ));
    }

    #[test]
    fn test_bind_requires_inputs_and_outputs() {
        let (registry, store) = fixture();
        assert!(matches!(
            AlgorithmAdapter::bind(&registry, &store, &FakeAlgorithm::new(&[], &["pos"])),
            Err(SimError::InvalidAlgorithm(_))
        ));
        assert!(matches!(
            AlgorithmAdapter::bind(&registry, &store, &FakeAlgorithm::new(&["gyro"], &[])),
            Err(SimError::InvalidAlgorithm(_))
        ));
    }

    #[test]
    fn test_build_inputs_fetches_constant_and_trial_payloads() {
        let (registry, mut store) = fixture();
        let algo = FakeAlgorithm::new(&["fs", "gyro"], &["pos"]);
        let adapter = AlgorithmAdapter::bind(&registry, &store, &algo).unwrap();

        store.by_name_mut("fs").unwrap().set_constant(100.0).unwrap();
        store
            .by_name_mut("gyro")
            .unwrap()
            .set_trial(1, SampleMatrix::from_element(2, 3, 7.0))
            .unwrap();

        let inputs = adapter.build_inputs(&store, 1).unwrap();
        assert_eq!(inputs[0].as_scalar(), Some(100.0));
        assert_eq!(inputs[1].as_matrix().unwrap()[(0, 0)], 7.0);

        // Trial 0 was never synthesized.
        let err = adapter.build_inputs(&store, 0).unwrap_err();
        assert!(matches!(err, SimError::MissingData { trial: Some(0), .. }));
    }

    #[test]
    fn test_store_outputs_checks_arity() {
        let (registry, mut store) = fixture();
        let algo = FakeAlgorithm::new(&["gyro"], &["pos"]);
        let adapter = AlgorithmAdapter::bind(&registry, &store, &algo).unwrap();

        let err = adapter.store_outputs(&mut store, 0, Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            SimError::OutputArity {
                expected: 1,
                actual: 0
            }
        ));

        adapter
            .store_outputs(
                &mut store,
                0,
                vec![SampleData::Matrix(SampleMatrix::from_element(2, 3, 0.5))],
            )
            .unwrap();
        assert_eq!(store.by_name("pos").unwrap().trial_count(), 1);
    }
}
