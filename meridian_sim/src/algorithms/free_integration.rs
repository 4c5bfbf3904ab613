// meridian_sim/src/algorithms/free_integration.rs

//! Free strapdown integration: dead-reckons attitude, velocity and geodetic
//! position from the raw IMU stream, initialized from the reference initial
//! state. No aiding, so errors grow with time; useful as a baseline and for
//! validating sensor error models.

use nalgebra::{UnitQuaternion, Vector3};

use meridian_core::algorithm::NavAlgorithm;
use meridian_core::error::SimError;
use meridian_core::types::{names, SampleData, SampleMatrix};

use crate::pathgen::earth;

pub struct FreeIntegration {
    pending: Option<[SampleData; 3]>,
}

impl FreeIntegration {
    pub fn new() -> Box<Self> {
        Box::new(Self { pending: None })
    }
}

impl NavAlgorithm for FreeIntegration {
    fn input_names(&self) -> Vec<String> {
        vec![
            names::FS.to_string(),
            names::REF_POS.to_string(),
            names::REF_VEL.to_string(),
            names::REF_ATT.to_string(),
            names::GYRO.to_string(),
            names::ACCEL.to_string(),
        ]
    }

    fn output_names(&self) -> Vec<String> {
        vec![
            names::POS.to_string(),
            names::VEL.to_string(),
            names::ATT_EULER.to_string(),
        ]
    }

    fn run(&mut self, inputs: &[&SampleData]) -> Result<(), SimError> {
        let fs = inputs[0]
            .as_scalar()
            .ok_or(SimError::InvalidAlgorithm("fs input must be a scalar"))?;
        let ref_pos = matrix(inputs[1], "ref_pos")?;
        let ref_vel = matrix(inputs[2], "ref_vel")?;
        let ref_att = matrix(inputs[3], "ref_att")?;
        let gyro = matrix(inputs[4], "gyro")?;
        let accel = matrix(inputs[5], "accel")?;

        let n = gyro.nrows();
        let dt = 1.0 / fs;

        // Initialize from the reference initial state; the integration is
        // re-seeded on every trial, so the plugin carries no state across
        // trials.
        let mut pos = Vector3::new(ref_pos[(0, 0)], ref_pos[(0, 1)], ref_pos[(0, 2)]);
        let mut vel_n = Vector3::new(ref_vel[(0, 0)], ref_vel[(0, 1)], ref_vel[(0, 2)]);
        let mut q = UnitQuaternion::from_euler_angles(
            ref_att[(0, 2)],
            ref_att[(0, 1)],
            ref_att[(0, 0)],
        );

        let mut pos_out = SampleMatrix::zeros(n, 3);
        let mut vel_out = SampleMatrix::zeros(n, 3);
        let mut att_out = SampleMatrix::zeros(n, 3);

        for row in 0..n {
            let (roll, pitch, yaw) = q.euler_angles();
            for col in 0..3 {
                pos_out[(row, col)] = pos[col];
                vel_out[(row, col)] = vel_n[col];
            }
            att_out[(row, 0)] = yaw;
            att_out[(row, 1)] = pitch;
            att_out[(row, 2)] = roll;

            let w_b = Vector3::new(gyro[(row, 0)], gyro[(row, 1)], gyro[(row, 2)]);
            let f_b = Vector3::new(accel[(row, 0)], accel[(row, 1)], accel[(row, 2)]);

            // Velocity: rotate the specific force into NED and restore gravity.
            let g_n = Vector3::new(0.0, 0.0, earth::gravity(pos.x, pos.z));
            let a_n = q * f_b + g_n;
            vel_n += a_n * dt;

            // Position transport through the curvature radii.
            let (lat, alt) = (pos.x, pos.z);
            pos.x += vel_n.x / (earth::meridian_radius(lat) + alt) * dt;
            pos.y += vel_n.y / ((earth::transverse_radius(lat) + alt) * lat.cos()) * dt;
            pos.z -= vel_n.z * dt;

            // Attitude: body-rate increment.
            q *= UnitQuaternion::from_scaled_axis(w_b * dt);
        }

        self.pending = Some([pos_out.into(), vel_out.into(), att_out.into()]);
        Ok(())
    }

    fn take_results(&mut self) -> Result<Vec<SampleData>, SimError> {
        let results = self.pending.take().ok_or(SimError::InvalidAlgorithm(
            "take_results called before run",
        ))?;
        Ok(results.into())
    }
}

fn matrix<'a>(data: &'a SampleData, label: &'static str) -> Result<&'a SampleMatrix, SimError> {
    data.as_matrix()
        .ok_or(SimError::InvalidAlgorithm(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use meridian_core::abstractions::{
        MobilityProfile, MotionPlan, SamplingConfig, SensorSuite, TrajectoryGenerator,
    };

    use crate::pathgen::WaypointTrajectoryGenerator;

    #[test]
    fn test_perfect_stationary_data_stays_at_rest() {
        let plan = MotionPlan::from_table(&[
            [34.0, 108.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0],
        ])
        .unwrap();
        let sampling = SamplingConfig {
            imu_hz: 100.0,
            gps_hz: 0.0,
            mag_hz: 0.0,
        };
        let reference = WaypointTrajectoryGenerator::default()
            .generate(
                &plan,
                &MobilityProfile::flight(),
                &sampling,
                &SensorSuite::default(),
            )
            .unwrap();

        let mut algo = FreeIntegration::new();
        let fs = SampleData::Scalar(100.0);
        let ref_pos = SampleData::Matrix(reference.pos.clone());
        let ref_vel = SampleData::Matrix(reference.vel.clone());
        let ref_att = SampleData::Matrix(reference.att.clone());
        // Perfect sensors: the measurements are the reference series.
        let gyro = SampleData::Matrix(reference.gyro.clone());
        let accel = SampleData::Matrix(reference.accel.clone());
        algo.run(&[&fs, &ref_pos, &ref_vel, &ref_att, &gyro, &accel])
            .unwrap();
        let results = algo.take_results().unwrap();

        let vel = results[1].as_matrix().unwrap();
        let pos = results[0].as_matrix().unwrap();
        let last = vel.nrows() - 1;
        for col in 0..3 {
            assert_abs_diff_eq!(vel[(last, col)], 0.0, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(pos[(last, 0)], reference.pos[(0, 0)], epsilon = 1e-12);
        assert_abs_diff_eq!(pos[(last, 2)], reference.pos[(0, 2)], epsilon = 1e-9);
    }

    #[test]
    fn test_take_results_requires_a_prior_run() {
        let mut algo = FreeIntegration::new();
        assert!(algo.take_results().is_err());
    }
}
