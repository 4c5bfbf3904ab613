// meridian_sim/src/sensors/gps.rs

//! GPS error model: white position noise specified in metres, converted to
//! angular noise through the local curvature radii, plus white velocity
//! noise.

use rand::Rng;
use rand_distr::Distribution;
use serde::Deserialize;

use meridian_core::error::SimError;
use meridian_core::types::SampleMatrix;

use crate::pathgen::earth;
use crate::sensors::imu::{check_columns, normal};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GpsErrorModel {
    /// Position noise standard deviation, metres, N/E/D.
    #[serde(default)]
    pub pos_stddev_m: [f64; 3],
    /// Velocity noise standard deviation, m/s, N/E/D.
    #[serde(default)]
    pub vel_stddev_mps: [f64; 3],
}

impl Default for GpsErrorModel {
    fn default() -> Self {
        Self {
            pos_stddev_m: [0.0; 3],
            vel_stddev_mps: [0.0; 3],
        }
    }
}

/// Corrupts a `lat, lon, alt, vN, vE, vD` reference series.
pub fn corrupt_gps(
    rng: &mut impl Rng,
    reference: &SampleMatrix,
    model: &GpsErrorModel,
) -> Result<SampleMatrix, SimError> {
    check_columns("gps reference", reference, 6)?;
    let north = normal(model.pos_stddev_m[0])?;
    let east = normal(model.pos_stddev_m[1])?;
    let down = normal(model.pos_stddev_m[2])?;
    let vel = [
        normal(model.vel_stddev_mps[0])?,
        normal(model.vel_stddev_mps[1])?,
        normal(model.vel_stddev_mps[2])?,
    ];

    let mut out = reference.clone();
    for row in 0..out.nrows() {
        let lat = reference[(row, 0)];
        let alt = reference[(row, 2)];
        // Metres of horizontal error become radians of lat/lon error.
        out[(row, 0)] += north.sample(rng) / (earth::meridian_radius(lat) + alt);
        out[(row, 1)] += east.sample(rng) / ((earth::transverse_radius(lat) + alt) * lat.cos());
        out[(row, 2)] -= down.sample(rng);
        for axis in 0..3 {
            out[(row, 3 + axis)] += vel[axis].sample(rng);
        }
    }
    Ok(out)
}
