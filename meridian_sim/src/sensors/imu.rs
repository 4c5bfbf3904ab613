// meridian_sim/src/sensors/imu.rs

//! IMU (accelerometer / gyroscope) error models.
//!
//! Each axis is corrupted with a constant bias, a first-order Gauss-Markov
//! bias instability and white noise whose per-sample deviation is the noise
//! density scaled by the square root of the sample rate. The accelerometer
//! additionally carries the environment's vibration model.

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use meridian_core::error::SimError;
use meridian_core::types::SampleMatrix;

/// Error model for one three-axis sensor. Units are those of the sensor
/// (m/s^2 for the accelerometer, rad/s for the gyroscope).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriadErrorModel {
    /// Constant per-axis bias.
    #[serde(default)]
    pub bias: [f64; 3],
    /// White-noise density, unit / sqrt(Hz).
    #[serde(default)]
    pub noise_density: [f64; 3],
    /// Standard deviation of the Gauss-Markov bias instability.
    #[serde(default)]
    pub bias_instability: [f64; 3],
    /// Correlation time of the bias instability (s).
    #[serde(default = "default_correlation_time")]
    pub correlation_time_s: f64,
}

fn default_correlation_time() -> f64 {
    3600.0
}

impl Default for TriadErrorModel {
    fn default() -> Self {
        Self {
            bias: [0.0; 3],
            noise_density: [0.0; 3],
            bias_instability: [0.0; 3],
            correlation_time_s: default_correlation_time(),
        }
    }
}

/// Vibration felt by the accelerometer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "PascalCase")]
pub enum VibrationModel {
    #[default]
    None,
    /// Broadband vibration: white noise per axis.
    Random { stddev_mps2: [f64; 3] },
    /// A single-tone vibration at a fixed frequency.
    Sinusoidal { amplitude_mps2: [f64; 3], freq_hz: f64 },
}

/// Applies `model` to every axis of `reference`.
pub fn corrupt_triad(
    rng: &mut impl Rng,
    imu_hz: f64,
    reference: &SampleMatrix,
    model: &TriadErrorModel,
) -> Result<SampleMatrix, SimError> {
    check_columns("imu reference", reference, 3)?;
    let dt = 1.0 / imu_hz;
    let beta = (-dt / model.correlation_time_s).exp();
    let mut out = reference.clone();
    for axis in 0..3 {
        let white = normal(model.noise_density[axis] * imu_hz.sqrt())?;
        let drive = normal(model.bias_instability[axis] * (1.0 - beta * beta).sqrt())?;
        let mut markov = 0.0;
        for row in 0..out.nrows() {
            markov = beta * markov + drive.sample(rng);
            out[(row, axis)] += model.bias[axis] + markov + white.sample(rng);
        }
    }
    Ok(out)
}

/// Adds the vibration model on top of an already-corrupted accelerometer
/// series.
pub fn apply_vibration(
    rng: &mut impl Rng,
    imu_hz: f64,
    out: &mut SampleMatrix,
    model: &VibrationModel,
) -> Result<(), SimError> {
    match model {
        VibrationModel::None => Ok(()),
        VibrationModel::Random { stddev_mps2 } => {
            for axis in 0..3 {
                let dist = normal(stddev_mps2[axis])?;
                for row in 0..out.nrows() {
                    out[(row, axis)] += dist.sample(rng);
                }
            }
            Ok(())
        }
        VibrationModel::Sinusoidal {
            amplitude_mps2,
            freq_hz,
        } => {
            let amplitude = Vector3::from(*amplitude_mps2);
            let omega = 2.0 * std::f64::consts::PI * freq_hz;
            for row in 0..out.nrows() {
                let phase = (omega * row as f64 / imu_hz).sin();
                for axis in 0..3 {
                    out[(row, axis)] += amplitude[axis] * phase;
                }
            }
            Ok(())
        }
    }
}

pub(crate) fn normal(stddev: f64) -> Result<Normal<f64>, SimError> {
    Normal::new(0.0, stddev).map_err(|e| {
        SimError::Configuration(format!("invalid noise standard deviation {stddev}: {e}"))
    })
}

pub(crate) fn check_columns(
    label: &str,
    matrix: &SampleMatrix,
    expected: usize,
) -> Result<(), SimError> {
    if matrix.ncols() != expected {
        return Err(SimError::Collaborator {
            collaborator: "sensor synthesizer",
            message: format!(
                "{label} has {} columns, expected {expected}",
                matrix.ncols()
            ),
        });
    }
    Ok(())
}
