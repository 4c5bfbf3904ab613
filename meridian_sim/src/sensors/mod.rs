// meridian_sim/src/sensors/mod.rs

//! Stochastic sensor synthesis: turning reference series into one trial's
//! noisy measurements.
//!
//! Every trial draws from its own deterministic ChaCha stream derived from
//! the scenario seed, the trial index and a per-sensor tag, so trials are
//! statistically independent and a run is reproducible sample for sample.

pub mod gps;
pub mod imu;
pub mod magnetometer;

pub use gps::GpsErrorModel;
pub use imu::{TriadErrorModel, VibrationModel};
pub use magnetometer::MagnetometerErrorModel;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use meridian_core::abstractions::SensorSynthesizer;
use meridian_core::error::SimError;
use meridian_core::types::{SampleMatrix, TrialIndex};

// Per-sensor stream tags; combined with the trial index below.
const ACCEL_STREAM: u64 = 0;
const GYRO_STREAM: u64 = 1;
const GPS_STREAM: u64 = 2;
const MAG_STREAM: u64 = 3;

/// The deterministic, per-trial-seeded sensor error synthesizer.
#[derive(Debug, Clone)]
pub struct StochasticSynthesizer {
    seed: u64,
    pub accel_model: TriadErrorModel,
    pub gyro_model: TriadErrorModel,
    pub vibration: VibrationModel,
    pub gps_model: GpsErrorModel,
    pub mag_model: MagnetometerErrorModel,
}

impl StochasticSynthesizer {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            accel_model: TriadErrorModel::default(),
            gyro_model: TriadErrorModel::default(),
            vibration: VibrationModel::default(),
            gps_model: GpsErrorModel::default(),
            mag_model: MagnetometerErrorModel::default(),
        }
    }

    /// A synthesizer with all error models zeroed; measurements equal the
    /// reference. Used by tests and dry runs.
    pub fn quiet(seed: u64) -> Self {
        Self::new(seed)
    }

    /// One independent ChaCha stream per (trial, sensor) pair.
    fn stream_rng(&self, trial: TrialIndex, stream: u64) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(((trial as u64) << 2) | stream);
        rng
    }
}

impl SensorSynthesizer for StochasticSynthesizer {
    fn accelerometer(
        &mut self,
        trial: TrialIndex,
        imu_hz: f64,
        ref_accel: &SampleMatrix,
    ) -> Result<SampleMatrix, SimError> {
        let mut rng = self.stream_rng(trial, ACCEL_STREAM);
        let mut out = imu::corrupt_triad(&mut rng, imu_hz, ref_accel, &self.accel_model)?;
        imu::apply_vibration(&mut rng, imu_hz, &mut out, &self.vibration)?;
        Ok(out)
    }

    fn gyroscope(
        &mut self,
        trial: TrialIndex,
        imu_hz: f64,
        ref_gyro: &SampleMatrix,
    ) -> Result<SampleMatrix, SimError> {
        let mut rng = self.stream_rng(trial, GYRO_STREAM);
        imu::corrupt_triad(&mut rng, imu_hz, ref_gyro, &self.gyro_model)
    }

    fn gps(&mut self, trial: TrialIndex, ref_gps: &SampleMatrix) -> Result<SampleMatrix, SimError> {
        let mut rng = self.stream_rng(trial, GPS_STREAM);
        gps::corrupt_gps(&mut rng, ref_gps, &self.gps_model)
    }

    fn magnetometer(
        &mut self,
        trial: TrialIndex,
        ref_mag: &SampleMatrix,
    ) -> Result<SampleMatrix, SimError> {
        let mut rng = self.stream_rng(trial, MAG_STREAM);
        magnetometer::corrupt(&mut rng, ref_mag, &self.mag_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn reference() -> SampleMatrix {
        SampleMatrix::from_fn(200, 3, |row, col| (row as f64) * 0.01 + col as f64)
    }

    #[test]
    fn test_quiet_synthesizer_is_identity() {
        let mut synth = StochasticSynthesizer::quiet(1);
        let reference = reference();
        let out = synth.gyroscope(0, 100.0, &reference).unwrap();
        for row in 0..reference.nrows() {
            for col in 0..3 {
                assert_abs_diff_eq!(out[(row, col)], reference[(row, col)], epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_same_trial_is_reproducible() {
        let mut synth = StochasticSynthesizer::new(7);
        synth.gyro_model.noise_density = [0.01; 3];
        let reference = reference();
        let a = synth.gyroscope(2, 100.0, &reference).unwrap();
        let b = synth.gyroscope(2, 100.0, &reference).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_trials_draw_independent_streams() {
        let mut synth = StochasticSynthesizer::new(7);
        synth.accel_model.noise_density = [0.01; 3];
        let reference = reference();
        let trial0 = synth.accelerometer(0, 100.0, &reference).unwrap();
        let trial1 = synth.accelerometer(1, 100.0, &reference).unwrap();
        assert_ne!(trial0, trial1);
    }

    #[test]
    fn test_sensors_draw_independent_streams() {
        let mut synth = StochasticSynthesizer::new(7);
        synth.accel_model.noise_density = [0.01; 3];
        synth.gyro_model.noise_density = [0.01; 3];
        let reference = reference();
        let accel = synth.accelerometer(0, 100.0, &reference).unwrap();
        let gyro = synth.gyroscope(0, 100.0, &reference).unwrap();
        assert_ne!(accel, gyro);
    }

    #[test]
    fn test_constant_bias_shifts_the_mean() {
        let mut synth = StochasticSynthesizer::new(7);
        synth.accel_model.bias = [0.5, 0.0, 0.0];
        let reference = SampleMatrix::zeros(100, 3);
        let out = synth.accelerometer(0, 100.0, &reference).unwrap();
        let mean_x: f64 = out.column(0).iter().sum::<f64>() / 100.0;
        assert_abs_diff_eq!(mean_x, 0.5, epsilon = 1e-12);
    }
}
