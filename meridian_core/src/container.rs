// meridian_core/src/container.rs

//! Named, typed holders for one result series each.
//!
//! A container's payload category is fixed at registration: data that is
//! identical across trials lives in a `Constant` payload, data that differs
//! per stochastic realization lives in a `PerTrial` payload. The category
//! never changes for the container's lifetime.

use std::collections::BTreeMap;

use crate::error::SimError;
use crate::plot::{ChartSeries, ChartSpec};
use crate::types::{SampleData, TrialIndex};

/// Which capability catalog a container belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRole {
    /// Algorithm input that stays the same for every trial.
    ConstantInput,
    /// Algorithm input that varies per stochastic realization.
    VaryingInput,
    /// Algorithm output, one entry per trial.
    Output,
    /// Engine-internal series (time bases); not a capability.
    Internal,
}

/// Payload storage for one container.
#[derive(Debug, Clone)]
pub enum Payload {
    Constant(Option<SampleData>),
    PerTrial(BTreeMap<TrialIndex, SampleData>),
}

/// Element-wise transform applied to a payload before rendering, e.g. square
/// root to display an Allan variance as an Allan deviation.
pub type RenderTransform = fn(f64) -> f64;

#[derive(Debug, Clone)]
pub struct DataContainer {
    name: String,
    description: String,
    role: ContainerRole,
    plottable: bool,
    log_scale_x: bool,
    log_scale_y: bool,
    legend: Vec<String>,
    transform: Option<RenderTransform>,
    payload: Payload,
}

impl DataContainer {
    /// A container whose payload is populated once per run.
    pub fn constant(name: &str, description: &str, role: ContainerRole) -> Self {
        Self::new(name, description, role, Payload::Constant(None))
    }

    /// A container whose payload holds one entry per trial.
    pub fn per_trial(name: &str, description: &str, role: ContainerRole) -> Self {
        Self::new(name, description, role, Payload::PerTrial(BTreeMap::new()))
    }

    fn new(name: &str, description: &str, role: ContainerRole, payload: Payload) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            role,
            plottable: true,
            log_scale_x: false,
            log_scale_y: false,
            legend: Vec::new(),
            transform: None,
            payload,
        }
    }

    /// Fixes the per-column labels. Once set, payload column counts are
    /// checked against the legend length.
    pub fn with_legend<S: Into<String>>(mut self, legend: impl IntoIterator<Item = S>) -> Self {
        self.legend = legend.into_iter().map(Into::into).collect();
        self
    }

    /// Excludes the container from plot listings (sampling rate,
    /// reference-frame id).
    pub fn not_plottable(mut self) -> Self {
        self.plottable = false;
        self
    }

    /// Requests log scaling on both axes when rendered.
    pub fn log_log(mut self) -> Self {
        self.log_scale_x = true;
        self.log_scale_y = true;
        self
    }

    pub fn with_transform(mut self, transform: RenderTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    // --- Accessors ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn role(&self) -> ContainerRole {
        self.role
    }

    pub fn plottable(&self) -> bool {
        self.plottable
    }

    pub fn is_per_trial(&self) -> bool {
        matches!(self.payload, Payload::PerTrial(_))
    }

    // --- Payload operations ---

    /// Stores the run-constant payload. Fails on a `PerTrial` container or
    /// when the column count disagrees with a fixed legend.
    pub fn set_constant(&mut self, data: impl Into<SampleData>) -> Result<(), SimError> {
        let data = data.into();
        self.check_shape(&data)?;
        match &mut self.payload {
            Payload::Constant(slot) => {
                *slot = Some(data);
                Ok(())
            }
            Payload::PerTrial(_) => Err(SimError::Configuration(format!(
                "container '{}' holds per-trial data, not a constant",
                self.name
            ))),
        }
    }

    /// Stores one trial's payload. Fails on a `Constant` container or when
    /// the column count disagrees with a fixed legend.
    pub fn set_trial(
        &mut self,
        trial: TrialIndex,
        data: impl Into<SampleData>,
    ) -> Result<(), SimError> {
        let data = data.into();
        self.check_shape(&data)?;
        match &mut self.payload {
            Payload::PerTrial(map) => {
                map.insert(trial, data);
                Ok(())
            }
            Payload::Constant(_) => Err(SimError::Configuration(format!(
                "container '{}' holds a constant, not per-trial data",
                self.name
            ))),
        }
    }

    pub fn get_constant(&self) -> Option<&SampleData> {
        match &self.payload {
            Payload::Constant(slot) => slot.as_ref(),
            Payload::PerTrial(_) => None,
        }
    }

    pub fn get_trial(&self, trial: TrialIndex) -> Option<&SampleData> {
        match &self.payload {
            Payload::PerTrial(map) => map.get(&trial),
            Payload::Constant(_) => None,
        }
    }

    /// Drops all stored trial entries. Re-running a simulation clears first
    /// so a shorter run cannot leave stale slots behind.
    pub fn clear_trials(&mut self) {
        if let Payload::PerTrial(map) = &mut self.payload {
            map.clear();
        }
    }

    /// Number of stored trial entries (0 for constants).
    pub fn trial_count(&self) -> usize {
        match &self.payload {
            Payload::PerTrial(map) => map.len(),
            Payload::Constant(_) => 0,
        }
    }

    fn check_shape(&self, data: &SampleData) -> Result<(), SimError> {
        if self.legend.is_empty() {
            return Ok(());
        }
        if let SampleData::Matrix(m) = data {
            if m.ncols() != self.legend.len() {
                return Err(SimError::Shape {
                    container: self.name.clone(),
                    expected: self.legend.len(),
                    actual: m.ncols(),
                });
            }
        }
        Ok(())
    }

    // --- Rendering ---

    /// Produces one chart per selected trial (`PerTrial`) or one chart
    /// (`Constant`), applying the transform when present. Non-plottable
    /// containers and scalar payloads produce nothing. Trials without data
    /// are silently absent from the output.
    pub fn render(&self, x_axis: &[f64], trials: &[TrialIndex]) -> Vec<ChartSpec> {
        if !self.plottable {
            return Vec::new();
        }
        match &self.payload {
            Payload::Constant(slot) => slot
                .iter()
                .filter_map(|data| self.spec_for(self.name.clone(), data, x_axis))
                .collect(),
            Payload::PerTrial(map) => trials
                .iter()
                .filter_map(|&trial| {
                    let data = map.get(&trial)?;
                    self.spec_for(format!("{}_{}", self.name, trial), data, x_axis)
                })
                .collect(),
        }
    }

    fn spec_for(&self, title: String, data: &SampleData, x_axis: &[f64]) -> Option<ChartSpec> {
        let matrix = data.as_matrix()?;
        let rows = matrix.nrows().min(x_axis.len());
        let series = (0..matrix.ncols())
            .map(|col| {
                let label = self
                    .legend
                    .get(col)
                    .cloned()
                    .unwrap_or_else(|| format!("{}[{}]", self.name, col));
                let values = (0..rows)
                    .map(|row| {
                        let v = matrix[(row, col)];
                        self.transform.map_or(v, |f| f(v))
                    })
                    .collect();
                ChartSeries { label, values }
            })
            .collect();
        Some(ChartSpec {
            title,
            x: x_axis[..rows].to_vec(),
            series,
            log_x: self.log_scale_x,
            log_y: self.log_scale_y,
            grid: true,
        })
    }
}

/// The engine's table of owned containers: slot-indexed storage plus a
/// name lookup. Binding plans refer to containers by slot index, so a
/// compiled plan never repeats a name lookup at trial time.
#[derive(Debug, Default)]
pub struct ContainerStore {
    containers: Vec<DataContainer>,
    index: BTreeMap<String, usize>,
}

impl ContainerStore {
    /// Registers a container and returns its slot. Names are unique.
    pub fn insert(&mut self, container: DataContainer) -> Result<usize, SimError> {
        let name = container.name().to_string();
        if self.index.contains_key(&name) {
            return Err(SimError::Configuration(format!(
                "duplicate container name '{name}'"
            )));
        }
        let slot = self.containers.len();
        self.containers.push(container);
        self.index.insert(name, slot);
        Ok(slot)
    }

    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, slot: usize) -> &DataContainer {
        &self.containers[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut DataContainer {
        &mut self.containers[slot]
    }

    pub fn by_name(&self, name: &str) -> Option<&DataContainer> {
        self.slot_of(name).map(|slot| self.get(slot))
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut DataContainer> {
        self.slot_of(name).map(|slot| self.get_mut(slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataContainer> {
        self.containers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DataContainer> {
        self.containers.iter_mut()
    }

    /// Convenience lookup used by the trial loop: the constant matrix payload
    /// of `name`.
    pub fn constant_matrix(&self, name: &str) -> Result<&crate::types::SampleMatrix, SimError> {
        self.by_name(name)
            .and_then(|c| c.get_constant())
            .and_then(|d| d.as_matrix())
            .ok_or_else(|| SimError::MissingData {
                container: name.to_string(),
                trial: None,
            })
    }
}
