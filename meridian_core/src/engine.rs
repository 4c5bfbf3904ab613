// meridian_core/src/engine.rs

//! The orchestration engine: owns every result container and the capability
//! registry, drives the multi-trial loop, and exposes the query/plot
//! surface.
//!
//! Execution is single-threaded and sequential: trial `i + 1` starts only
//! after trial `i` finished. Trials read the same constant reference series
//! and write disjoint per-trial slots, so there is no data dependency
//! between them; a parallel reimplementation would additionally need an
//! independently seeded noise stream per trial and one algorithm instance
//! per trial. `run` takes `&mut self`, so it cannot race itself.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::abstractions::{
    MobilityProfile, MotionPlan, ReferenceTrajectory, SamplingConfig, SensorSuite,
    SensorSynthesizer, TrajectoryGenerator,
};
use crate::algorithm::NavAlgorithm;
use crate::binding::AlgorithmAdapter;
use crate::capability::CapabilityRegistry;
use crate::container::{ContainerRole, ContainerStore, DataContainer};
use crate::error::SimError;
use crate::plot::{ChartBackend, PlotDispatcher};
use crate::types::{names, SampleData, SampleMatrix, TrialIndex, NED_FRAME};

// =========================================================================
// == Run State & Control ==
// =========================================================================

/// Lifecycle of the engine across runs.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    NotStarted,
    Running,
    Complete,
    /// A trial failed (or the run was cancelled / timed out). Data from
    /// earlier trials is preserved; later trials were not executed.
    Failed { trial: TrialIndex, reason: String },
}

/// Which trials a plot request covers.
#[derive(Debug, Clone)]
pub enum TrialSelector {
    All,
    Single(TrialIndex),
    Subset(Vec<TrialIndex>),
}

impl From<TrialIndex> for TrialSelector {
    fn from(trial: TrialIndex) -> Self {
        TrialSelector::Single(trial)
    }
}

impl From<Vec<TrialIndex>> for TrialSelector {
    fn from(trials: Vec<TrialIndex>) -> Self {
        TrialSelector::Subset(trials)
    }
}

/// Optional cooperative controls for one run, checked between trials.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    /// Raised by another thread to abort remaining trials.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Wall-clock budget for the whole run.
    pub deadline: Option<Duration>,
}

impl RunControl {
    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

// =========================================================================
// == Engine ==
// =========================================================================

pub struct OrchestrationEngine {
    plan: MotionPlan,
    sampling: SamplingConfig,
    suite: SensorSuite,
    mobility: MobilityProfile,
    store: ContainerStore,
    registry: CapabilityRegistry,
    generator: Box<dyn TrajectoryGenerator>,
    synthesizer: Box<dyn SensorSynthesizer>,
    algorithm: Option<(Box<dyn NavAlgorithm>, AlgorithmAdapter)>,
    state: RunState,
    trial_count: usize,
}

impl OrchestrationEngine {
    /// Builds the engine: containers gated by the sensor suite, the
    /// capability registry derived from them, and the validated motion plan.
    /// All configuration problems surface here, never mid-run.
    pub fn new(
        plan: MotionPlan,
        sampling: SamplingConfig,
        suite: SensorSuite,
        mobility: MobilityProfile,
        generator: Box<dyn TrajectoryGenerator>,
        synthesizer: Box<dyn SensorSynthesizer>,
    ) -> Result<Self, SimError> {
        sampling.validate(&suite)?;
        let store = build_containers(&suite)?;
        let registry = CapabilityRegistry::from_containers(&store)?;
        Ok(Self {
            plan,
            sampling,
            suite,
            mobility,
            store,
            registry,
            generator,
            synthesizer,
            algorithm: None,
            state: RunState::NotStarted,
            trial_count: 0,
        })
    }

    /// Binds an algorithm plugin. Fails (leaving no algorithm attached) when
    /// a declared capability name is unknown or the declaration is empty.
    pub fn attach_algorithm(&mut self, algorithm: Box<dyn NavAlgorithm>) -> Result<(), SimError> {
        let adapter = AlgorithmAdapter::bind(&self.registry, &self.store, algorithm.as_ref())?;
        self.algorithm = Some((algorithm, adapter));
        Ok(())
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Trial count of the most recent run (0 before any run).
    pub fn trial_count(&self) -> usize {
        self.trial_count
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn container(&self, name: &str) -> Option<&DataContainer> {
        self.store.by_name(name)
    }

    // --- Run ---

    /// Runs the simulation. Trial counts below 1 are coerced to 1.
    pub fn run(&mut self, trial_count: usize) -> Result<(), SimError> {
        self.run_with(trial_count, RunControl::default())
    }

    /// Like [`run`](Self::run), with cooperative cancellation and an
    /// optional wall-clock deadline, both checked between trials. An aborted
    /// run keeps the data of every completed trial.
    pub fn run_with(&mut self, trial_count: usize, control: RunControl) -> Result<(), SimError> {
        if matches!(self.state, RunState::Running) {
            return Err(SimError::Busy);
        }
        let trial_count = trial_count.max(1);
        self.trial_count = trial_count;
        self.state = RunState::Running;
        info!(trials = trial_count, "starting simulation run");
        match self.execute(trial_count, &control) {
            Ok(()) => {
                self.state = RunState::Complete;
                info!(trials = trial_count, "simulation run complete");
                Ok(())
            }
            Err(err) => {
                let trial = match &err {
                    SimError::Trial { index, .. }
                    | SimError::Cancelled { index }
                    | SimError::DeadlineExceeded { index } => *index,
                    _ => 0,
                };
                self.state = RunState::Failed {
                    trial,
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }

    fn execute(&mut self, trial_count: usize, control: &RunControl) -> Result<(), SimError> {
        let started = Instant::now();

        // Stale per-trial data from a previous run is cleared up front so a
        // shorter re-run cannot leave orphan slots behind.
        for container in self.store.iter_mut() {
            container.clear_trials();
        }

        // The trajectory generator runs exactly once per run; its output
        // populates every constant container.
        let reference = self.generator.generate(
            &self.plan,
            &self.mobility,
            &self.sampling,
            &self.suite,
        )?;
        reference.validate(&self.suite)?;
        self.populate_constants(reference)?;

        for trial in 0..trial_count {
            if control.cancelled() {
                return Err(SimError::Cancelled { index: trial });
            }
            if let Some(deadline) = control.deadline {
                if started.elapsed() > deadline {
                    return Err(SimError::DeadlineExceeded { index: trial });
                }
            }
            debug!(trial, "running trial");
            self.run_trial(trial).map_err(|source| SimError::Trial {
                index: trial,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    fn populate_constants(&mut self, reference: ReferenceTrajectory) -> Result<(), SimError> {
        self.set_constant(names::FS, self.sampling.imu_hz)?;
        self.set_constant(names::REF_FRAME, NED_FRAME)?;
        self.set_constant(names::TIME, column(&reference.time))?;
        self.set_constant(names::REF_POS, reference.pos)?;
        self.set_constant(names::REF_VEL, reference.vel)?;
        self.set_constant(names::REF_ATT, reference.att)?;
        self.set_constant(names::REF_GYRO, reference.gyro)?;
        self.set_constant(names::REF_ACCEL, reference.accel)?;
        if self.suite.has_gps {
            // Presence was checked by ReferenceTrajectory::validate.
            if let Some(gps_time) = &reference.gps_time {
                self.set_constant(names::GPS_TIME, column(gps_time))?;
            }
            if let Some(gps) = reference.gps {
                self.set_constant(names::REF_GPS, gps)?;
            }
        }
        if self.suite.has_magnetometer {
            if let Some(mag) = reference.mag {
                self.set_constant(names::REF_MAG, mag)?;
            }
        }
        Ok(())
    }

    fn run_trial(&mut self, trial: TrialIndex) -> Result<(), SimError> {
        let fs = self.sampling.imu_hz;

        let accel = {
            let reference = self.store.constant_matrix(names::REF_ACCEL)?;
            self.synthesizer.accelerometer(trial, fs, reference)?
        };
        self.set_trial(names::ACCEL, trial, accel)?;

        let gyro = {
            let reference = self.store.constant_matrix(names::REF_GYRO)?;
            self.synthesizer.gyroscope(trial, fs, reference)?
        };
        self.set_trial(names::GYRO, trial, gyro)?;

        if self.suite.has_gps {
            let gps = {
                let reference = self.store.constant_matrix(names::REF_GPS)?;
                self.synthesizer.gps(trial, reference)?
            };
            self.set_trial(names::GPS, trial, gps)?;
        }

        if self.suite.has_magnetometer {
            let mag = {
                let reference = self.store.constant_matrix(names::REF_MAG)?;
                self.synthesizer.magnetometer(trial, reference)?
            };
            self.set_trial(names::MAG, trial, mag)?;
        }

        if let Some((algorithm, adapter)) = &mut self.algorithm {
            let inputs = adapter.build_inputs(&self.store, trial)?;
            algorithm.run(&inputs)?;
            let values = algorithm.take_results()?;
            adapter.store_outputs(&mut self.store, trial, values)?;
        }
        Ok(())
    }

    // --- Query / Plot Surface ---

    /// The catalog of available result series, name -> description.
    ///
    /// A pure projection over current state: the constant and varying input
    /// catalogs are always present; entries for the bound algorithm's
    /// declared outputs appear only once a run is `Complete`. Nothing is
    /// cached or synthesized.
    pub fn results(&self) -> BTreeMap<String, String> {
        let mut results = self.registry.constant_inputs().clone();
        results.extend(self.registry.varying_inputs().clone());
        if matches!(self.state, RunState::Complete) {
            if let Some((algorithm, _)) = &self.algorithm {
                for name in algorithm.output_names() {
                    if let Some(description) = self.registry.outputs().get(&name) {
                        results.insert(name, description.clone());
                    }
                }
            }
        }
        results
    }

    /// Renders the requested series through `backend`.
    ///
    /// Out-of-range trial indices are dropped with a warning; names outside
    /// the plottable subset of [`results`](Self::results) are skipped with a
    /// warning. Neither aborts the batch. Backend failures do abort: partial
    /// data is recoverable, a broken renderer is not.
    pub fn plot(
        &self,
        what_to_plot: &[&str],
        selector: TrialSelector,
        backend: &mut dyn ChartBackend,
    ) -> Result<(), SimError> {
        if matches!(self.state, RunState::Running) {
            return Err(SimError::Busy);
        }
        let trials = self.resolve_trials(selector);
        let results = self.results();
        for &name in what_to_plot {
            let plottable = results.contains_key(name)
                && self.store.by_name(name).is_some_and(|c| c.plottable());
            if !plottable {
                warn!(name, "unsupported plot: not in the plottable result set");
                continue;
            }
            PlotDispatcher::dispatch(&self.store, name, &trials, backend)?;
        }
        Ok(())
    }

    fn resolve_trials(&self, selector: TrialSelector) -> Vec<TrialIndex> {
        let requested = match selector {
            TrialSelector::All => (0..self.trial_count).collect(),
            TrialSelector::Single(trial) => vec![trial],
            TrialSelector::Subset(trials) => trials,
        };
        requested
            .into_iter()
            .filter(|&trial| {
                let in_range = trial < self.trial_count;
                if !in_range {
                    warn!(
                        trial,
                        max = self.trial_count,
                        "dropping out-of-range plot trial index"
                    );
                }
                in_range
            })
            .collect()
    }

    // --- Helpers ---

    fn set_constant(&mut self, name: &str, data: impl Into<SampleData>) -> Result<(), SimError> {
        self.named_container(name)?.set_constant(data)
    }

    fn set_trial(
        &mut self,
        name: &str,
        trial: TrialIndex,
        data: impl Into<SampleData>,
    ) -> Result<(), SimError> {
        self.named_container(name)?.set_trial(trial, data)
    }

    fn named_container(&mut self, name: &str) -> Result<&mut DataContainer, SimError> {
        self.store
            .by_name_mut(name)
            .ok_or_else(|| SimError::Configuration(format!("missing container '{name}'")))
    }
}

fn column(v: &nalgebra::DVector<f64>) -> SampleMatrix {
    SampleMatrix::from_column_slice(v.len(), 1, v.as_slice())
}

// =========================================================================
// == Container Catalog ==
// =========================================================================

/// Builds every container the engine owns. GPS and magnetometer containers
/// exist only when the suite enables them, which is what keeps their
/// capabilities out of the registry for disabled sensors.
fn build_containers(suite: &SensorSuite) -> Result<ContainerStore, SimError> {
    use ContainerRole::{ConstantInput, Internal, Output, VaryingInput};

    let mut store = ContainerStore::default();

    // Non-plottable configuration scalars.
    store.insert(
        DataContainer::constant(names::FS, "sample frequency of imu", ConstantInput)
            .not_plottable(),
    )?;
    store.insert(
        DataContainer::constant(names::REF_FRAME, "reference frame", ConstantInput)
            .not_plottable(),
    )?;

    // The primary time base is engine-internal: it drives x-axes but is not
    // a capability.
    store.insert(DataContainer::constant(names::TIME, "sample time", Internal))?;

    // Reference (truth) series.
    store.insert(
        DataContainer::constant(names::REF_POS, "true pos", ConstantInput)
            .with_legend(["ref_pos_x", "ref_pos_y", "ref_pos_z"]),
    )?;
    store.insert(
        DataContainer::constant(names::REF_VEL, "true vel", ConstantInput)
            .with_legend(["ref_vel_x", "ref_vel_y", "ref_vel_z"]),
    )?;
    store.insert(
        DataContainer::constant(names::REF_ATT, "true attitude (Euler angles, ZYX)", ConstantInput)
            .with_legend(["ref_Yaw", "ref_Pitch", "ref_Roll"]),
    )?;
    store.insert(
        DataContainer::constant(names::REF_GYRO, "true angular velocity", ConstantInput)
            .with_legend(["ref_gyro_x", "ref_gyro_y", "ref_gyro_z"]),
    )?;
    store.insert(
        DataContainer::constant(names::REF_ACCEL, "true accel", ConstantInput)
            .with_legend(["ref_accel_x", "ref_accel_y", "ref_accel_z"]),
    )?;

    // Synthesized sensor streams.
    store.insert(
        DataContainer::per_trial(names::ACCEL, "accel measurements", VaryingInput)
            .with_legend(["accel_x", "accel_y", "accel_z"]),
    )?;
    store.insert(
        DataContainer::per_trial(names::GYRO, "gyro measurements", VaryingInput)
            .with_legend(["gyro_x", "gyro_y", "gyro_z"]),
    )?;

    if suite.has_gps {
        store.insert(DataContainer::constant(
            names::GPS_TIME,
            "GPS sample time",
            ConstantInput,
        ))?;
        store.insert(
            DataContainer::constant(names::REF_GPS, "true GPS pos/vel", ConstantInput)
                .with_legend([
                    "ref_gps_x",
                    "ref_gps_y",
                    "ref_gps_z",
                    "ref_gps_vx",
                    "ref_gps_vy",
                    "ref_gps_vz",
                ]),
        )?;
        store.insert(
            DataContainer::per_trial(names::GPS, "GPS measurements", VaryingInput)
                .with_legend(["gps_x", "gps_y", "gps_z", "gps_vx", "gps_vy", "gps_vz"]),
        )?;
    }

    if suite.has_magnetometer {
        store.insert(
            DataContainer::constant(names::REF_MAG, "true magnetic field", ConstantInput)
                .with_legend(["ref_mag_x", "ref_mag_y", "ref_mag_z"]),
        )?;
        store.insert(
            DataContainer::per_trial(names::MAG, "magnetometer measurements", VaryingInput)
                .with_legend(["mag_x", "mag_y", "mag_z"]),
        )?;
    }

    // Algorithm outputs the engine knows how to collect.
    store.insert(
        DataContainer::per_trial(names::POS, "sim pos", Output)
            .with_legend(["pos_x", "pos_y", "pos_z"]),
    )?;
    store.insert(
        DataContainer::per_trial(names::VEL, "sim vel", Output)
            .with_legend(["vel_x", "vel_y", "vel_z"]),
    )?;
    store.insert(
        DataContainer::per_trial(names::ATT_QUAT, "sim att (quaternion)", Output)
            .with_legend(["q0", "q1", "q2", "q3"]),
    )?;
    store.insert(
        DataContainer::per_trial(names::ATT_EULER, "sim att (Euler angles, ZYX)", Output)
            .with_legend(["Yaw", "Pitch", "Roll"]),
    )?;
    store.insert(
        DataContainer::per_trial(names::WB, "gyro bias estimation", Output)
            .with_legend(["gyro_bias_x", "gyro_bias_y", "gyro_bias_z"]),
    )?;
    store.insert(
        DataContainer::per_trial(names::AB, "accel bias estimation", Output)
            .with_legend(["accel_bias_x", "accel_bias_y", "accel_bias_z"]),
    )?;
    store.insert(DataContainer::per_trial(names::AV_T, "Allan var time", Output))?;
    store.insert(
        DataContainer::per_trial(names::AV_GYRO, "Allan var of gyro", Output)
            .with_legend(["av_wx", "av_wy", "av_wz"])
            .log_log()
            .with_transform(f64::sqrt),
    )?;
    store.insert(
        DataContainer::per_trial(names::AV_ACCEL, "Allan var of accel", Output)
            .with_legend(["av_ax", "av_ay", "av_az"])
            .log_log()
            .with_transform(f64::sqrt),
    )?;

    Ok(store)
}

// =========================================================================
// == Tests ==
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::plot::ChartSpec;
    use nalgebra::DVector;

    const SAMPLES: usize = 5;
    const GPS_SAMPLES: usize = 2;

    // --- Stub collaborators ---

    struct StubGenerator;

    impl TrajectoryGenerator for StubGenerator {
        fn generate(
            &mut self,
            _plan: &MotionPlan,
            _mobility: &MobilityProfile,
            _sampling: &SamplingConfig,
            suite: &SensorSuite,
        ) -> Result<ReferenceTrajectory, SimError> {
            let series = |fill: f64| SampleMatrix::from_element(SAMPLES, 3, fill);
            Ok(ReferenceTrajectory {
                time: DVector::from_fn(SAMPLES, |i, _| i as f64 * 0.01),
                pos: series(1.0),
                vel: series(0.0),
                att: series(0.0),
                gyro: series(0.02),
                accel: series(-9.8),
                gps_time: suite
                    .has_gps
                    .then(|| DVector::from_fn(GPS_SAMPLES, |i, _| i as f64 * 0.1)),
                gps: suite
                    .has_gps
                    .then(|| SampleMatrix::from_element(GPS_SAMPLES, 6, 1.0)),
                mag: suite
                    .has_magnetometer
                    .then(|| SampleMatrix::from_element(SAMPLES, 3, 30.0)),
            })
        }
    }

    /// Adds the trial index to every reference sample; optionally fails at a
    /// chosen trial.
    struct StubSynthesizer {
        fail_at: Option<TrialIndex>,
    }

    impl StubSynthesizer {
        fn healthy() -> Self {
            Self { fail_at: None }
        }

        fn offset(trial: TrialIndex, reference: &SampleMatrix) -> SampleMatrix {
            reference.map(|v| v + trial as f64)
        }
    }

    impl SensorSynthesizer for StubSynthesizer {
        fn accelerometer(
            &mut self,
            trial: TrialIndex,
            _imu_hz: f64,
            reference: &SampleMatrix,
        ) -> Result<SampleMatrix, SimError> {
            if self.fail_at == Some(trial) {
                return Err(SimError::Collaborator {
                    collaborator: "sensor synthesizer",
                    message: "injected failure".to_string(),
                });
            }
            Ok(Self::offset(trial, reference))
        }

        fn gyroscope(
            &mut self,
            trial: TrialIndex,
            _imu_hz: f64,
            reference: &SampleMatrix,
        ) -> Result<SampleMatrix, SimError> {
            Ok(Self::offset(trial, reference))
        }

        fn gps(
            &mut self,
            trial: TrialIndex,
            reference: &SampleMatrix,
        ) -> Result<SampleMatrix, SimError> {
            Ok(Self::offset(trial, reference))
        }

        fn magnetometer(
            &mut self,
            trial: TrialIndex,
            reference: &SampleMatrix,
        ) -> Result<SampleMatrix, SimError> {
            Ok(Self::offset(trial, reference))
        }
    }

    /// Writes one 3-column row per trial, tagged with the trial index.
    struct StubAlgorithm {
        inputs: Vec<String>,
        outputs: Vec<String>,
        pending: Option<SampleData>,
    }

    impl StubAlgorithm {
        fn new(inputs: &[&str], outputs: &[&str]) -> Box<Self> {
            Box::new(Self {
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
                pending: None,
            })
        }
    }

    impl NavAlgorithm for StubAlgorithm {
        fn input_names(&self) -> Vec<String> {
            self.inputs.clone()
        }

        fn output_names(&self) -> Vec<String> {
            self.outputs.clone()
        }

        fn run(&mut self, inputs: &[&SampleData]) -> Result<(), SimError> {
            let gyro = inputs
                .iter()
                .find_map(|d| d.as_matrix())
                .expect("stub expects at least one matrix input");
            self.pending = Some(SampleData::Matrix(gyro.clone()));
            Ok(())
        }

        fn take_results(&mut self) -> Result<Vec<SampleData>, SimError> {
            let data = self.pending.take().ok_or(SimError::InvalidAlgorithm(
                "take_results called before run",
            ))?;
            Ok(vec![data])
        }
    }

    struct RecordingBackend {
        specs: Vec<ChartSpec>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self { specs: Vec::new() }
        }
    }

    impl ChartBackend for RecordingBackend {
        fn draw(&mut self, spec: &ChartSpec) -> Result<(), SimError> {
            self.specs.push(spec.clone());
            Ok(())
        }
    }

    // --- Fixtures ---

    fn sampling() -> SamplingConfig {
        SamplingConfig {
            imu_hz: 100.0,
            gps_hz: 10.0,
            mag_hz: 0.0,
        }
    }

    fn motion_plan() -> MotionPlan {
        MotionPlan::from_table(&[
            [34.0, 108.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 10.0, 0.0],
        ])
        .unwrap()
    }

    fn engine(suite: SensorSuite) -> OrchestrationEngine {
        OrchestrationEngine::new(
            motion_plan(),
            sampling(),
            suite,
            MobilityProfile::flight(),
            Box::new(StubGenerator),
            Box::new(StubSynthesizer::healthy()),
        )
        .unwrap()
    }

    fn engine_no_gps() -> OrchestrationEngine {
        engine(SensorSuite::default())
    }

    // --- Tests ---

    #[test]
    fn test_constants_are_empty_until_run() {
        let engine = engine_no_gps();
        for name in [names::FS, names::REF_FRAME, names::REF_POS, names::TIME] {
            assert!(
                engine.container(name).unwrap().get_constant().is_none(),
                "{name} should be empty before run"
            );
        }
    }

    #[test]
    fn test_run_zero_behaves_like_run_one() {
        let mut engine = engine_no_gps();
        engine.run(0).unwrap();
        assert_eq!(engine.trial_count(), 1);
        assert_eq!(engine.container(names::ACCEL).unwrap().trial_count(), 1);
    }

    #[test]
    fn test_run_populates_exactly_n_trial_slots() {
        let mut engine = engine_no_gps();
        engine.run(3).unwrap();
        assert_eq!(*engine.state(), RunState::Complete);
        for name in [names::ACCEL, names::GYRO] {
            let container = engine.container(name).unwrap();
            assert_eq!(container.trial_count(), 3, "{name}");
            for trial in 0..3 {
                let rows = container.get_trial(trial).unwrap().rows();
                assert_eq!(rows, SAMPLES, "{name} trial {trial}");
            }
        }
        // Constants were filled once.
        assert_eq!(
            engine
                .container(names::FS)
                .unwrap()
                .get_constant()
                .unwrap()
                .as_scalar(),
            Some(100.0)
        );
    }

    #[test]
    fn test_gps_capabilities_follow_the_suite() {
        let no_gps = engine_no_gps();
        assert!(no_gps.container(names::GPS).is_none());
        assert!(!no_gps.results().contains_key(names::REF_GPS));

        let with_gps = engine(SensorSuite {
            has_gps: true,
            has_magnetometer: false,
        });
        assert!(with_gps.container(names::GPS).is_some());
        assert!(with_gps.results().contains_key(names::REF_GPS));
        assert!(!with_gps.results().contains_key(names::MAG));
    }

    #[test]
    fn test_binding_rejects_unknown_capability() {
        let mut engine = engine_no_gps();
        let err = engine
            .attach_algorithm(StubAlgorithm::new(&["unknown_sensor"], &["pos"]))
            .unwrap_err();
        assert!(matches!(err, SimError::CapabilityBinding { .. }));
        // Nothing was attached; a run executes without an algorithm step.
        engine.run(1).unwrap();
        assert_eq!(engine.container(names::POS).unwrap().trial_count(), 0);
    }

    #[test]
    fn test_results_grow_outputs_only_after_complete() {
        let mut engine = engine_no_gps();
        engine
            .attach_algorithm(StubAlgorithm::new(&["fs", "gyro"], &["pos"]))
            .unwrap();

        let before = engine.results();
        assert!(before.contains_key(names::REF_GYRO));
        assert!(before.contains_key(names::GYRO));
        assert!(!before.contains_key(names::POS));

        engine.run(2).unwrap();
        let after = engine.results();
        assert!(after.contains_key(names::POS));
        // Only declared outputs appear, not the whole output catalog.
        assert!(!after.contains_key(names::VEL));
        assert_eq!(engine.container(names::POS).unwrap().trial_count(), 2);
    }

    #[test]
    fn test_trial_failure_keeps_earlier_trials() {
        let mut engine = OrchestrationEngine::new(
            motion_plan(),
            sampling(),
            SensorSuite::default(),
            MobilityProfile::flight(),
            Box::new(StubGenerator),
            Box::new(StubSynthesizer { fail_at: Some(1) }),
        )
        .unwrap();

        let err = engine.run(3).unwrap_err();
        assert!(matches!(err, SimError::Trial { index: 1, .. }));
        assert!(matches!(engine.state(), RunState::Failed { trial: 1, .. }));
        // Trial 0 data is intact, trial 1 and 2 were never stored.
        assert_eq!(engine.container(names::ACCEL).unwrap().trial_count(), 1);
        // Failed is not Complete: no outputs in the result catalog.
        assert!(!engine.results().contains_key(names::POS));
    }

    #[test]
    fn test_cancellation_between_trials() {
        let mut engine = engine_no_gps();
        let cancel = Arc::new(AtomicBool::new(true));
        let control = RunControl {
            cancel: Some(cancel),
            deadline: None,
        };
        let err = engine.run_with(2, control).unwrap_err();
        assert!(matches!(err, SimError::Cancelled { index: 0 }));
        assert!(matches!(engine.state(), RunState::Failed { .. }));
    }

    #[test]
    fn test_rerun_clears_stale_trials() {
        let mut engine = engine_no_gps();
        engine.run(3).unwrap();
        engine.run(1).unwrap();
        assert_eq!(engine.container(names::ACCEL).unwrap().trial_count(), 1);
        assert_eq!(engine.trial_count(), 1);
    }

    #[test]
    fn test_plot_drops_out_of_range_trials() {
        let mut engine = engine_no_gps();
        engine.run(1).unwrap();

        let mut backend = RecordingBackend::new();
        engine
            .plot(&[names::GYRO], TrialSelector::Subset(vec![0, 1]), &mut backend)
            .unwrap();
        // Index 1 is out of range and dropped; trial 0 still renders.
        assert_eq!(backend.specs.len(), 1);
        assert_eq!(backend.specs[0].title, "gyro_0");
    }

    #[test]
    fn test_plot_skips_unsupported_names() {
        let mut engine = engine_no_gps();
        engine.run(1).unwrap();

        let mut backend = RecordingBackend::new();
        engine
            .plot(
                &["not_a_series", names::FS, names::GYRO],
                TrialSelector::All,
                &mut backend,
            )
            .unwrap();
        // Unknown and non-plottable names are skipped, the valid one renders.
        assert_eq!(backend.specs.len(), 1);
    }

    #[test]
    fn test_gps_series_use_gps_time_base() {
        let mut engine = engine(SensorSuite {
            has_gps: true,
            has_magnetometer: false,
        });
        engine.run(1).unwrap();

        let mut backend = RecordingBackend::new();
        engine
            .plot(&[names::GPS, names::GYRO], TrialSelector::All, &mut backend)
            .unwrap();
        assert_eq!(backend.specs.len(), 2);
        assert_eq!(backend.specs[0].x.len(), GPS_SAMPLES);
        assert_eq!(backend.specs[1].x.len(), SAMPLES);
    }
}
