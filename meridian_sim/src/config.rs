// meridian_sim/src/config.rs

//! Scenario configuration: the TOML schema, the motion-definition CSV
//! loader, and the helpers that turn a parsed scenario into engine
//! collaborators.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Format, Toml},
    Figment,
};
use nalgebra::Vector3;
use serde::Deserialize;
use walkdir::WalkDir;

use meridian_core::abstractions::{MobilityProfile, MotionPlan, SamplingConfig, SensorSuite};
use meridian_core::algorithm::NavAlgorithm;
use meridian_core::engine::OrchestrationEngine;
use meridian_core::error::SimError;

use crate::algorithms::{AllanAnalysis, FreeIntegration};
use crate::pathgen::{field_ned, WaypointTrajectoryGenerator};
use crate::sensors::{
    GpsErrorModel, MagnetometerErrorModel, StochasticSynthesizer, TriadErrorModel, VibrationModel,
};

// =========================================================================
// == Top-Level Scenario Schema ==
// =========================================================================

/// The root of the data parsed from a scenario TOML file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: Simulation,

    pub sampling: SamplingConfig,

    pub trajectory: Trajectory,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub sensors: Sensors,

    pub algorithm: Option<AlgorithmChoice>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Simulation {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// How many stochastic realizations to run.
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Where rendered charts land.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_trials() -> usize {
    1
}

fn default_output_dir() -> PathBuf {
    "output".into()
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: None,
            trials: default_trials(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trajectory {
    /// Path to the motion-definition CSV, relative to the scenario file.
    pub motion_file: PathBuf,
    #[serde(default)]
    pub mobility: MobilityChoice,
}

/// Either a named built-in profile or explicit limits.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MobilityChoice {
    Builtin(String),
    Custom(MobilityProfile),
}

impl Default for MobilityChoice {
    fn default() -> Self {
        MobilityChoice::Builtin("flight".to_string())
    }
}

impl MobilityChoice {
    pub fn to_profile(&self) -> Result<MobilityProfile, SimError> {
        match self {
            MobilityChoice::Builtin(name) if name == "flight" => Ok(MobilityProfile::flight()),
            MobilityChoice::Builtin(name) => Err(SimError::Configuration(format!(
                "unknown mobility profile '{name}'"
            ))),
            MobilityChoice::Custom(profile) => Ok(*profile),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    #[serde(default)]
    pub vibration: VibrationModel,
    #[serde(default)]
    pub magnetic_field: MagneticField,
}

/// The local geomagnetic field as intensity / declination / inclination.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MagneticField {
    #[serde(default = "default_field_intensity")]
    pub intensity_ut: f64,
    #[serde(default)]
    pub declination_deg: f64,
    #[serde(default = "default_field_inclination")]
    pub inclination_deg: f64,
}

fn default_field_intensity() -> f64 {
    50.0
}

fn default_field_inclination() -> f64 {
    60.0
}

impl Default for MagneticField {
    fn default() -> Self {
        Self {
            intensity_ut: default_field_intensity(),
            declination_deg: 0.0,
            inclination_deg: default_field_inclination(),
        }
    }
}

impl MagneticField {
    pub fn ned(&self) -> Vector3<f64> {
        field_ned(
            self.intensity_ut,
            self.declination_deg.to_radians(),
            self.inclination_deg.to_radians(),
        )
    }
}

/// Sensor presence doubles as the feature flag: a `[sensors.gps]` section
/// enables GPS, `[sensors.magnetometer]` enables the magnetometer.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sensors {
    #[serde(default)]
    pub imu: Imu,
    pub gps: Option<GpsErrorModel>,
    pub magnetometer: Option<MagnetometerErrorModel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Imu {
    #[serde(default)]
    pub accel: TriadErrorModel,
    #[serde(default)]
    pub gyro: TriadErrorModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind")]
#[serde(rename_all = "PascalCase")]
pub enum AlgorithmChoice {
    AllanVariance,
    FreeIntegration,
}

impl AlgorithmChoice {
    pub fn build(&self) -> Box<dyn NavAlgorithm> {
        match self {
            AlgorithmChoice::AllanVariance => AllanAnalysis::new(),
            AlgorithmChoice::FreeIntegration => FreeIntegration::new(),
        }
    }
}

// =========================================================================
// == Loading ==
// =========================================================================

/// Parses a scenario TOML file.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, SimError> {
    Figment::new()
        .merge(Toml::file(path))
        .extract::<ScenarioConfig>()
        .map_err(|e| SimError::Configuration(format!("{}: {e}", path.display())))
}

/// Reads a motion-definition CSV into a validated [`MotionPlan`].
///
/// The table must have exactly 9 columns per row and at least 2 rows; both
/// violations are configuration errors, reported before anything runs.
pub fn load_motion_file(path: &Path) -> Result<MotionPlan, SimError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| SimError::Configuration(format!("{}: {e}", path.display())))?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| SimError::Configuration(format!("{}: {e}", path.display())))?;
        if record.len() != 9 {
            return Err(SimError::Configuration(format!(
                "motion definition row {} has {} columns, expected 9",
                line + 1,
                record.len()
            )));
        }
        let mut row = [0.0_f64; 9];
        for (col, field) in record.iter().enumerate() {
            row[col] = field.parse().map_err(|_| {
                SimError::Configuration(format!(
                    "motion definition row {}, column {}: '{field}' is not a number",
                    line + 1,
                    col + 1
                ))
            })?;
        }
        rows.push(row);
    }
    MotionPlan::from_table(&rows)
}

/// Lists every scenario TOML under `dir`, sorted.
pub fn scenario_catalog(dir: &Path) -> Vec<PathBuf> {
    let mut scenarios: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| {
            !e.file_type().is_dir() && e.path().extension().is_some_and(|ext| ext == "toml")
        })
        .map(|e| e.into_path())
        .collect();
    scenarios.sort();
    scenarios
}

// =========================================================================
// == Engine Assembly ==
// =========================================================================

impl ScenarioConfig {
    pub fn suite(&self) -> SensorSuite {
        SensorSuite {
            has_gps: self.sensors.gps.is_some(),
            has_magnetometer: self.sensors.magnetometer.is_some(),
        }
    }

    pub fn synthesizer(&self, seed: u64) -> StochasticSynthesizer {
        let mut synthesizer = StochasticSynthesizer::new(seed);
        synthesizer.accel_model = self.sensors.imu.accel.clone();
        synthesizer.gyro_model = self.sensors.imu.gyro.clone();
        synthesizer.vibration = self.environment.vibration.clone();
        if let Some(gps) = &self.sensors.gps {
            synthesizer.gps_model = gps.clone();
        }
        if let Some(mag) = &self.sensors.magnetometer {
            synthesizer.mag_model = mag.clone();
        }
        synthesizer
    }

    pub fn generator(&self) -> WaypointTrajectoryGenerator {
        WaypointTrajectoryGenerator {
            local_field_ned: self.environment.magnetic_field.ned(),
        }
    }

    /// Builds the fully wired engine. `base_dir` anchors the motion-file
    /// path (normally the scenario file's directory).
    pub fn build_engine(&self, base_dir: &Path, seed: u64) -> Result<OrchestrationEngine, SimError> {
        let motion_path = base_dir.join(&self.trajectory.motion_file);
        let plan = load_motion_file(&motion_path)?;
        let mut engine = OrchestrationEngine::new(
            plan,
            self.sampling,
            self.suite(),
            self.trajectory.mobility.to_profile()?,
            Box::new(self.generator()),
            Box::new(self.synthesizer(seed)),
        )?;
        if let Some(choice) = &self.algorithm {
            engine.attach_algorithm(choice.build())?;
        }
        Ok(engine)
    }
}
