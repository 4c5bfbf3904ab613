// meridian_core/src/abstractions.rs

//! Motion-definition types and the collaborator traits the engine delegates
//! to: trajectory generation and sensor synthesis. The concrete
//! implementations live in the simulation crate; the engine only sees these
//! seams.

use nalgebra::{DVector, Vector3};
use serde::Deserialize;

use crate::error::SimError;
use crate::types::{SampleMatrix, TrialIndex};

const D2R: f64 = std::f64::consts::PI / 180.0;

// =========================================================================
// == Motion Definition ==
// =========================================================================

/// Row 1 of a motion-definition table: where the vehicle starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialState {
    /// Geodetic position: latitude (rad), longitude (rad), altitude (m).
    pub pos_lla: Vector3<f64>,
    /// Body-frame velocity (m/s).
    pub vel_body: Vector3<f64>,
    /// Euler attitude, ZYX order: yaw, pitch, roll (rad).
    pub att_euler: Vector3<f64>,
}

/// How columns 2-7 of a command row are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionType {
    /// Attitude change rates plus body-frame velocity change rate.
    Rate,
    /// Absolute attitude and absolute velocity to reach.
    AbsoluteAttVel,
    /// Relative attitude and velocity change.
    RelativeAttVel,
    /// Absolute attitude, relative velocity.
    AbsoluteAttRelativeVel,
    /// Relative attitude, absolute velocity.
    RelativeAttAbsoluteVel,
}

impl MotionType {
    fn from_code(code: f64) -> Result<Self, SimError> {
        match code as i64 {
            1 => Ok(MotionType::Rate),
            2 => Ok(MotionType::AbsoluteAttVel),
            3 => Ok(MotionType::RelativeAttVel),
            4 => Ok(MotionType::AbsoluteAttRelativeVel),
            5 => Ok(MotionType::RelativeAttAbsoluteVel),
            other => Err(SimError::Configuration(format!(
                "unknown motion type {other} (expected 1-5)"
            ))),
        }
    }
}

/// One motion command (row >= 2 of the table).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCommand {
    pub kind: MotionType,
    /// Yaw, pitch, roll targets or rates (rad or rad/s, per `kind`).
    pub attitude: Vector3<f64>,
    /// Body-x velocity target or rate (m/s or m/s^2, per `kind`).
    pub velocity_x: f64,
    /// Maximum duration of this segment (s).
    pub duration_s: f64,
}

/// A validated motion definition: the initial state plus the command list.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPlan {
    pub initial: InitialState,
    pub commands: Vec<MotionCommand>,
}

impl MotionPlan {
    /// Validates and converts a raw waypoint table.
    ///
    /// The table must have at least 2 rows of exactly 9 columns. Row 1 is
    /// the initial state (lat/lon in degrees, altitude in meters, body
    /// velocity in m/s, ZYX Euler attitude in degrees); rows >= 2 are motion
    /// commands (type code, yaw/pitch/roll values in degrees or deg/s, body-x
    /// velocity in m/s, two reserved columns, max duration in seconds, one
    /// reserved column). All angles are converted to radians here.
    pub fn from_table(rows: &[[f64; 9]]) -> Result<Self, SimError> {
        if rows.len() < 2 {
            return Err(SimError::Configuration(format!(
                "motion definition needs at least 2 rows, got {}",
                rows.len()
            )));
        }
        let first = &rows[0];
        let initial = InitialState {
            pos_lla: Vector3::new(first[0] * D2R, first[1] * D2R, first[2]),
            vel_body: Vector3::new(first[3], first[4], first[5]),
            att_euler: Vector3::new(first[6] * D2R, first[7] * D2R, first[8] * D2R),
        };
        let commands = rows[1..]
            .iter()
            .map(|row| {
                let kind = MotionType::from_code(row[0])?;
                if row[7] <= 0.0 {
                    return Err(SimError::Configuration(format!(
                        "motion segment duration must be positive, got {}",
                        row[7]
                    )));
                }
                Ok(MotionCommand {
                    kind,
                    attitude: Vector3::new(row[1] * D2R, row[2] * D2R, row[3] * D2R),
                    velocity_x: row[4],
                    duration_s: row[7],
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { initial, commands })
    }
}

// =========================================================================
// == Run Configuration ==
// =========================================================================

/// Maneuver capability limits used when approaching command targets.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MobilityProfile {
    /// Maximum linear acceleration (m/s^2).
    pub max_accel: f64,
    /// Maximum angular acceleration (rad/s^2).
    pub max_angular_accel: f64,
    /// Maximum angular rate (rad/s).
    pub max_angular_rate: f64,
}

impl MobilityProfile {
    /// The built-in flight profile.
    pub fn flight() -> Self {
        Self {
            max_accel: 1.0,
            max_angular_accel: 0.5,
            max_angular_rate: 2.0,
        }
    }
}

impl Default for MobilityProfile {
    fn default() -> Self {
        Self::flight()
    }
}

/// Sample rates of the three sensor groups, in Hz. GPS and magnetometer
/// rates are only meaningful when the corresponding sensor is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingConfig {
    pub imu_hz: f64,
    #[serde(default)]
    pub gps_hz: f64,
    #[serde(default)]
    pub mag_hz: f64,
}

impl SamplingConfig {
    pub fn validate(&self, suite: &SensorSuite) -> Result<(), SimError> {
        if !(self.imu_hz.is_finite() && self.imu_hz > 0.0) {
            return Err(SimError::Configuration(format!(
                "IMU sample rate must be positive, got {}",
                self.imu_hz
            )));
        }
        if suite.has_gps && !(self.gps_hz.is_finite() && self.gps_hz > 0.0) {
            return Err(SimError::Configuration(format!(
                "GPS is enabled but its sample rate is {}",
                self.gps_hz
            )));
        }
        if suite.has_magnetometer && !(self.mag_hz.is_finite() && self.mag_hz > 0.0) {
            return Err(SimError::Configuration(format!(
                "magnetometer is enabled but its sample rate is {}",
                self.mag_hz
            )));
        }
        Ok(())
    }
}

/// The immutable feature flags of the sensor configuration, consumed once at
/// engine construction to decide which containers and capabilities exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorSuite {
    pub has_gps: bool,
    pub has_magnetometer: bool,
}

// =========================================================================
// == Collaborator Seams ==
// =========================================================================

/// The trajectory generator's result: every reference series of one run.
/// `time` drives the primary x-axis; GPS and magnetometer series are present
/// exactly when the suite enables them.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTrajectory {
    /// Sample times (s), one per IMU sample, starting at 0.
    pub time: DVector<f64>,
    /// Geodetic position: lat (rad), lon (rad), alt (m).
    pub pos: SampleMatrix,
    /// NED velocity (m/s).
    pub vel: SampleMatrix,
    /// Euler attitude, ZYX: yaw, pitch, roll (rad).
    pub att: SampleMatrix,
    /// Body angular rate (rad/s).
    pub gyro: SampleMatrix,
    /// Body specific force (m/s^2).
    pub accel: SampleMatrix,
    /// GPS sample times (s).
    pub gps_time: Option<DVector<f64>>,
    /// GPS position/velocity: lat, lon, alt, vN, vE, vD.
    pub gps: Option<SampleMatrix>,
    /// Body-frame magnetic field (uT).
    pub mag: Option<SampleMatrix>,
}

impl ReferenceTrajectory {
    /// Checks internal consistency against the enabled sensor suite before
    /// the engine accepts the data.
    pub fn validate(&self, suite: &SensorSuite) -> Result<(), SimError> {
        let n = self.time.len();
        let imu_series = [
            ("pos", &self.pos),
            ("vel", &self.vel),
            ("att", &self.att),
            ("gyro", &self.gyro),
            ("accel", &self.accel),
        ];
        for (label, series) in imu_series {
            if series.nrows() != n {
                return Err(Self::inconsistent(label, series.nrows(), n));
            }
        }
        if suite.has_gps {
            let gps_time = self.gps_time.as_ref().ok_or_else(|| Self::missing("gps_time"))?;
            let gps = self.gps.as_ref().ok_or_else(|| Self::missing("gps"))?;
            if gps.nrows() != gps_time.len() {
                return Err(Self::inconsistent("gps", gps.nrows(), gps_time.len()));
            }
        }
        if suite.has_magnetometer {
            let mag = self.mag.as_ref().ok_or_else(|| Self::missing("mag"))?;
            if mag.nrows() != n {
                return Err(Self::inconsistent("mag", mag.nrows(), n));
            }
        }
        Ok(())
    }

    fn missing(label: &str) -> SimError {
        SimError::Collaborator {
            collaborator: "trajectory generator",
            message: format!("{label} reference series is enabled but missing"),
        }
    }

    fn inconsistent(label: &str, got: usize, expected: usize) -> SimError {
        SimError::Collaborator {
            collaborator: "trajectory generator",
            message: format!("{label} reference has {got} rows, expected {expected}"),
        }
    }
}

/// Converts an initial state and motion commands into reference series.
/// Invoked exactly once per run.
pub trait TrajectoryGenerator: Send {
    fn generate(
        &mut self,
        plan: &MotionPlan,
        mobility: &MobilityProfile,
        sampling: &SamplingConfig,
        suite: &SensorSuite,
    ) -> Result<ReferenceTrajectory, SimError>;
}

/// Turns a reference series into one trial's synthetic measurements. The
/// four operations are independent; each receives the trial index so
/// implementations can derive an independently seeded noise stream per trial
/// and per sensor.
pub trait SensorSynthesizer: Send {
    fn accelerometer(
        &mut self,
        trial: TrialIndex,
        imu_hz: f64,
        ref_accel: &SampleMatrix,
    ) -> Result<SampleMatrix, SimError>;

    fn gyroscope(
        &mut self,
        trial: TrialIndex,
        imu_hz: f64,
        ref_gyro: &SampleMatrix,
    ) -> Result<SampleMatrix, SimError>;

    /// `ref_gps` columns: lat (rad), lon (rad), alt (m), vN, vE, vD (m/s).
    fn gps(&mut self, trial: TrialIndex, ref_gps: &SampleMatrix) -> Result<SampleMatrix, SimError>;

    fn magnetometer(
        &mut self,
        trial: TrialIndex,
        ref_mag: &SampleMatrix,
    ) -> Result<SampleMatrix, SimError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn valid_table() -> Vec<[f64; 9]> {
        vec![
            [34.0, 108.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 10.0, 0.0],
        ]
    }

    #[test]
    fn test_from_table_converts_degrees() {
        let plan = MotionPlan::from_table(&valid_table()).unwrap();
        assert_abs_diff_eq!(plan.initial.pos_lla[0], 34.0 * D2R, epsilon = 1e-12);
        assert_abs_diff_eq!(plan.initial.pos_lla[1], 108.0 * D2R, epsilon = 1e-12);
        assert_eq!(plan.commands.len(), 1);
        assert_eq!(plan.commands[0].kind, MotionType::Rate);
        assert_abs_diff_eq!(plan.commands[0].velocity_x, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(plan.commands[0].duration_s, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_table_rejects_short_tables() {
        let rows = vec![[0.0; 9]];
        assert!(matches!(
            MotionPlan::from_table(&rows),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_table_rejects_bad_motion_type() {
        let mut rows = valid_table();
        rows[1][0] = 9.0;
        assert!(matches!(
            MotionPlan::from_table(&rows),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn test_sampling_validation_tracks_suite() {
        let sampling = SamplingConfig {
            imu_hz: 100.0,
            gps_hz: 0.0,
            mag_hz: 0.0,
        };
        let no_gps = SensorSuite::default();
        sampling.validate(&no_gps).unwrap();

        let with_gps = SensorSuite {
            has_gps: true,
            has_magnetometer: false,
        };
        assert!(sampling.validate(&with_gps).is_err());
    }
}
