// meridian_core/src/types.rs

use nalgebra::DMatrix;

// --- Core Type Aliases ---

/// One result series: `n` samples by `dim` columns.
pub type SampleMatrix = DMatrix<f64>;

/// Index of one stochastic realization within a run.
pub type TrialIndex = usize;

/// Identifier of the NED (North-East-Down) local navigation frame, the only
/// reference frame the engine produces.
pub const NED_FRAME: f64 = 0.0;

/// A single payload value held by a data container.
///
/// Configuration quantities (the IMU sample rate, the reference-frame id) are
/// scalars; every other series is an `(n, dim)` matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    Scalar(f64),
    Matrix(SampleMatrix),
}

impl SampleData {
    /// Column count of the payload; scalars count as a single column.
    pub fn columns(&self) -> usize {
        match self {
            SampleData::Scalar(_) => 1,
            SampleData::Matrix(m) => m.ncols(),
        }
    }

    /// Sample (row) count of the payload; scalars count as a single row.
    pub fn rows(&self) -> usize {
        match self {
            SampleData::Scalar(_) => 1,
            SampleData::Matrix(m) => m.nrows(),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            SampleData::Scalar(v) => Some(*v),
            SampleData::Matrix(_) => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&SampleMatrix> {
        match self {
            SampleData::Scalar(_) => None,
            SampleData::Matrix(m) => Some(m),
        }
    }
}

impl From<f64> for SampleData {
    fn from(value: f64) -> Self {
        SampleData::Scalar(value)
    }
}

impl From<SampleMatrix> for SampleData {
    fn from(value: SampleMatrix) -> Self {
        SampleData::Matrix(value)
    }
}

/// Canonical container names, shared by the engine, the capability registry,
/// the plot dispatcher and algorithm plugins.
pub mod names {
    // Non-plottable configuration scalars.
    pub const FS: &str = "fs";
    pub const REF_FRAME: &str = "ref_frame";

    // Time bases.
    pub const TIME: &str = "time";
    pub const GPS_TIME: &str = "gps_time";

    // Reference (truth) series, constant across trials.
    pub const REF_POS: &str = "ref_pos";
    pub const REF_VEL: &str = "ref_vel";
    pub const REF_ATT: &str = "ref_att";
    pub const REF_GYRO: &str = "ref_gyro";
    pub const REF_ACCEL: &str = "ref_accel";
    pub const REF_GPS: &str = "ref_gps";
    pub const REF_MAG: &str = "ref_mag";

    // Synthesized sensor streams, one realization per trial.
    pub const ACCEL: &str = "accel";
    pub const GYRO: &str = "gyro";
    pub const GPS: &str = "gps";
    pub const MAG: &str = "mag";

    // Algorithm outputs the engine knows how to collect.
    pub const POS: &str = "pos";
    pub const VEL: &str = "vel";
    pub const ATT_QUAT: &str = "att_quat";
    pub const ATT_EULER: &str = "att_euler";
    pub const WB: &str = "wb";
    pub const AB: &str = "ab";
    pub const AV_T: &str = "av_t";
    pub const AV_GYRO: &str = "av_gyro";
    pub const AV_ACCEL: &str = "av_accel";
}
