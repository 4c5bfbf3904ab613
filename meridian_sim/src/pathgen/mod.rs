// meridian_sim/src/pathgen/mod.rs

//! Reference trajectory generation from waypoint motion commands.
//!
//! The generator integrates each motion segment at the IMU rate: attitude
//! and body velocity move toward the command (rate commands apply directly;
//! target commands approach under the mobility limits and end the segment
//! early once reached), NED velocity follows from the ZYX rotation, and the
//! geodetic position is transported through the WGS-84 curvature radii.
//! The output includes the initial sample, so a single 10 s segment at
//! 100 Hz yields 1001 rows.

pub mod earth;

use nalgebra::{DVector, Rotation3, Vector3};

use meridian_core::abstractions::{
    MobilityProfile, MotionPlan, MotionType, ReferenceTrajectory, SamplingConfig, SensorSuite,
    TrajectoryGenerator,
};
use meridian_core::error::SimError;
use meridian_core::types::SampleMatrix;

/// Convergence threshold for target-style motion commands.
const TARGET_EPS: f64 = 1e-6;

/// Generates reference series by integrating waypoint motion commands.
#[derive(Debug, Clone)]
pub struct WaypointTrajectoryGenerator {
    /// Local magnetic field in NED coordinates (uT). Rotated into the body
    /// frame for the magnetometer reference series.
    pub local_field_ned: Vector3<f64>,
}

impl Default for WaypointTrajectoryGenerator {
    fn default() -> Self {
        // A mid-latitude field: 50 uT at 60 degrees inclination, no
        // declination.
        Self {
            local_field_ned: field_ned(50.0, 0.0, 60.0_f64.to_radians()),
        }
    }
}

/// Builds a NED field vector from intensity (uT), declination and
/// inclination (rad, positive down).
pub fn field_ned(intensity: f64, declination: f64, inclination: f64) -> Vector3<f64> {
    let horizontal = intensity * inclination.cos();
    Vector3::new(
        horizontal * declination.cos(),
        horizontal * declination.sin(),
        intensity * inclination.sin(),
    )
}

/// Accumulates the generated series row by row.
struct SeriesBuilder {
    time: Vec<f64>,
    pos: Vec<f64>,
    vel: Vec<f64>,
    att: Vec<f64>,
    gyro: Vec<f64>,
    accel: Vec<f64>,
    mag: Vec<f64>,
}

impl SeriesBuilder {
    fn new() -> Self {
        Self {
            time: Vec::new(),
            pos: Vec::new(),
            vel: Vec::new(),
            att: Vec::new(),
            gyro: Vec::new(),
            accel: Vec::new(),
            mag: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        t: f64,
        pos: Vector3<f64>,
        vel_n: Vector3<f64>,
        att: Vector3<f64>,
        gyro: Vector3<f64>,
        accel: Vector3<f64>,
        mag: Vector3<f64>,
    ) {
        self.time.push(t);
        self.pos.extend(pos.iter());
        self.vel.extend(vel_n.iter());
        self.att.extend(att.iter());
        self.gyro.extend(gyro.iter());
        self.accel.extend(accel.iter());
        self.mag.extend(mag.iter());
    }

    fn rows(&self) -> usize {
        self.time.len()
    }
}

impl TrajectoryGenerator for WaypointTrajectoryGenerator {
    fn generate(
        &mut self,
        plan: &MotionPlan,
        mobility: &MobilityProfile,
        sampling: &SamplingConfig,
        suite: &SensorSuite,
    ) -> Result<ReferenceTrajectory, SimError> {
        let dt = 1.0 / sampling.imu_hz;
        let mut att = plan.initial.att_euler; // yaw, pitch, roll
        let mut vel_b = plan.initial.vel_body;
        let mut pos = plan.initial.pos_lla;
        let mut t = 0.0;
        let mut series = SeriesBuilder::new();

        for command in &plan.commands {
            let steps = (command.duration_s * sampling.imu_hz).round() as usize;

            // Targets are resolved once, at segment entry.
            let (att_target, vel_target) = match command.kind {
                MotionType::Rate => (att, vel_b.x), // unused
                MotionType::AbsoluteAttVel => (command.attitude, command.velocity_x),
                MotionType::RelativeAttVel => (att + command.attitude, vel_b.x + command.velocity_x),
                MotionType::AbsoluteAttRelativeVel => {
                    (command.attitude, vel_b.x + command.velocity_x)
                }
                MotionType::RelativeAttAbsoluteVel => {
                    (att + command.attitude, command.velocity_x)
                }
            };

            for _ in 0..steps {
                let (att_dot, vel_b_dot) = match command.kind {
                    MotionType::Rate => (command.attitude, Vector3::new(command.velocity_x, 0.0, 0.0)),
                    _ => {
                        let att_err = Vector3::from_fn(|i, _| wrap_angle(att_target[i] - att[i]));
                        let vel_err = vel_target - vel_b.x;
                        if att_err.amax() < TARGET_EPS && vel_err.abs() < TARGET_EPS {
                            break;
                        }
                        let max_rate = mobility.max_angular_rate;
                        let att_dot = att_err.map(|e| (e / dt).clamp(-max_rate, max_rate));
                        let ax = (vel_err / dt).clamp(-mobility.max_accel, mobility.max_accel);
                        (att_dot, Vector3::new(ax, 0.0, 0.0))
                    }
                };

                self.emit(&mut series, t, pos, vel_b, att, att_dot, vel_b_dot);

                // Integrate to the next sample.
                let vel_n = body_to_ned(att) * vel_b;
                att += att_dot * dt;
                vel_b += vel_b_dot * dt;
                pos += pos_rate(pos, vel_n) * dt;
                t += dt;
            }
        }

        // Final sample: the state reached at the end of the last segment.
        self.emit(
            &mut series,
            t,
            pos,
            vel_b,
            att,
            Vector3::zeros(),
            Vector3::zeros(),
        );

        self.assemble(series, sampling, suite)
    }
}

impl WaypointTrajectoryGenerator {
    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        series: &mut SeriesBuilder,
        t: f64,
        pos: Vector3<f64>,
        vel_b: Vector3<f64>,
        att: Vector3<f64>,
        att_dot: Vector3<f64>,
        vel_b_dot: Vector3<f64>,
    ) {
        let c_b2n = body_to_ned(att);
        let c_n2b = c_b2n.inverse();
        let vel_n = c_b2n * vel_b;
        let w_b = body_rates(att, att_dot);
        let g_n = Vector3::new(0.0, 0.0, earth::gravity(pos.x, pos.z));
        // Specific force: f_b = v̇_b + ω×v_b - C_n2b·g_n.
        let f_b = vel_b_dot + w_b.cross(&vel_b) - c_n2b * g_n;
        let m_b = c_n2b * self.local_field_ned;
        series.push(t, pos, vel_n, att, w_b, f_b, m_b);
    }

    fn assemble(
        &self,
        series: SeriesBuilder,
        sampling: &SamplingConfig,
        suite: &SensorSuite,
    ) -> Result<ReferenceTrajectory, SimError> {
        let n = series.rows();
        let matrix = |data: &[f64], cols: usize| SampleMatrix::from_row_slice(n, cols, data);

        let pos = matrix(&series.pos, 3);
        let vel = matrix(&series.vel, 3);

        let (gps_time, gps) = if suite.has_gps {
            let stride = ((sampling.imu_hz / sampling.gps_hz).round() as usize).max(1);
            let indices: Vec<usize> = (0..n).step_by(stride).collect();
            let gps_time = DVector::from_iterator(
                indices.len(),
                indices.iter().map(|&i| series.time[i]),
            );
            let mut gps = SampleMatrix::zeros(indices.len(), 6);
            for (row, &i) in indices.iter().enumerate() {
                for col in 0..3 {
                    gps[(row, col)] = pos[(i, col)];
                    gps[(row, col + 3)] = vel[(i, col)];
                }
            }
            (Some(gps_time), Some(gps))
        } else {
            (None, None)
        };

        Ok(ReferenceTrajectory {
            time: DVector::from_vec(series.time),
            pos,
            vel,
            att: matrix(&series.att, 3),
            gyro: matrix(&series.gyro, 3),
            accel: matrix(&series.accel, 3),
            gps_time,
            gps,
            mag: suite.has_magnetometer.then(|| matrix(&series.mag, 3)),
        })
    }
}

/// Rotation from the body frame to NED for a ZYX (yaw, pitch, roll) Euler
/// attitude.
fn body_to_ned(att: Vector3<f64>) -> Rotation3<f64> {
    // nalgebra's from_euler_angles builds Rz(yaw) * Ry(pitch) * Rx(roll).
    Rotation3::from_euler_angles(att.z, att.y, att.x)
}

/// Body angular rate from ZYX Euler angles and their rates.
fn body_rates(att: Vector3<f64>, att_dot: Vector3<f64>) -> Vector3<f64> {
    let (yaw_dot, pitch_dot, roll_dot) = (att_dot.x, att_dot.y, att_dot.z);
    let (pitch, roll) = (att.y, att.z);
    Vector3::new(
        roll_dot - yaw_dot * pitch.sin(),
        pitch_dot * roll.cos() + yaw_dot * pitch.cos() * roll.sin(),
        -pitch_dot * roll.sin() + yaw_dot * pitch.cos() * roll.cos(),
    )
}

/// Geodetic position rate for a NED velocity: latitude and longitude advance
/// through the curvature radii, altitude against the down component.
fn pos_rate(pos: Vector3<f64>, vel_n: Vector3<f64>) -> Vector3<f64> {
    let (lat, alt) = (pos.x, pos.z);
    Vector3::new(
        vel_n.x / (earth::meridian_radius(lat) + alt),
        vel_n.y / ((earth::transverse_radius(lat) + alt) * lat.cos()),
        -vel_n.z,
    )
}

/// Wraps an angle difference into [-pi, pi].
fn wrap_angle(angle: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let wrapped = angle % two_pi;
    if wrapped > std::f64::consts::PI {
        wrapped - two_pi
    } else if wrapped < -std::f64::consts::PI {
        wrapped + two_pi
    } else {
        wrapped
    }
}
