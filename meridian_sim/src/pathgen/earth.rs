// meridian_sim/src/pathgen/earth.rs

//! WGS-84 earth model helpers used by position transport and GPS noise
//! conversion.

/// WGS-84 semi-major axis (m).
pub const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
/// WGS-84 first eccentricity squared.
pub const ECCENTRICITY_SQ: f64 = 6.694_379_990_141_32e-3;

/// Meridian (north-south) radius of curvature at `lat` (rad).
pub fn meridian_radius(lat: f64) -> f64 {
    let s = lat.sin();
    let denom = 1.0 - ECCENTRICITY_SQ * s * s;
    SEMI_MAJOR_AXIS * (1.0 - ECCENTRICITY_SQ) / denom.powf(1.5)
}

/// Transverse (east-west) radius of curvature at `lat` (rad).
pub fn transverse_radius(lat: f64) -> f64 {
    let s = lat.sin();
    SEMI_MAJOR_AXIS / (1.0 - ECCENTRICITY_SQ * s * s).sqrt()
}

/// Somigliana normal gravity at `lat` (rad), with a free-air correction for
/// altitude (m). Positive down.
pub fn gravity(lat: f64, alt: f64) -> f64 {
    let s2 = lat.sin().powi(2);
    let g0 = 9.780_325_335_9 * (1.0 + 1.931_852_652_41e-3 * s2)
        / (1.0 - ECCENTRICITY_SQ * s2).sqrt();
    g0 - 3.086e-6 * alt
}
