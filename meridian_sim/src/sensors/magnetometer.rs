// meridian_sim/src/sensors/magnetometer.rs

//! Magnetometer error model: a hard-iron offset plus white noise.

use rand::Rng;
use rand_distr::Distribution;
use serde::Deserialize;

use meridian_core::error::SimError;
use meridian_core::types::SampleMatrix;

use crate::sensors::imu::{check_columns, normal};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MagnetometerErrorModel {
    /// White noise standard deviation per axis (uT).
    #[serde(default)]
    pub noise_stddev_ut: [f64; 3],
    /// Hard-iron offset per axis (uT).
    #[serde(default)]
    pub hard_iron_ut: [f64; 3],
}

impl Default for MagnetometerErrorModel {
    fn default() -> Self {
        Self {
            noise_stddev_ut: [0.0; 3],
            hard_iron_ut: [0.0; 3],
        }
    }
}

pub fn corrupt(
    rng: &mut impl Rng,
    reference: &SampleMatrix,
    model: &MagnetometerErrorModel,
) -> Result<SampleMatrix, SimError> {
    check_columns("magnetometer reference", reference, 3)?;
    let mut out = reference.clone();
    for axis in 0..3 {
        let dist = normal(model.noise_stddev_ut[axis])?;
        for row in 0..out.nrows() {
            out[(row, axis)] += model.hard_iron_ut[axis] + dist.sample(rng);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_hard_iron_offsets_every_sample() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let reference = SampleMatrix::from_element(20, 3, 30.0);
        let model = MagnetometerErrorModel {
            noise_stddev_ut: [0.0; 3],
            hard_iron_ut: [1.0, -2.0, 0.5],
        };
        let out = corrupt(&mut rng, &reference, &model).unwrap();
        for row in 0..20 {
            assert_abs_diff_eq!(out[(row, 0)], 31.0, epsilon = 1e-12);
            assert_abs_diff_eq!(out[(row, 1)], 28.0, epsilon = 1e-12);
            assert_abs_diff_eq!(out[(row, 2)], 30.5, epsilon = 1e-12);
        }
    }
}
