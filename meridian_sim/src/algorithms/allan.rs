// meridian_sim/src/algorithms/allan.rs

//! Allan-variance analysis of the synthesized IMU streams.
//!
//! Computes the overlapping Allan variance of each gyro and accel axis over
//! octave-spaced cluster sizes. The variance containers render with a
//! square-root transform, so plots show Allan deviation.

use meridian_core::algorithm::NavAlgorithm;
use meridian_core::error::SimError;
use meridian_core::types::{names, SampleData, SampleMatrix};

pub struct AllanAnalysis {
    pending: Option<[SampleData; 3]>,
}

impl AllanAnalysis {
    pub fn new() -> Box<Self> {
        Box::new(Self { pending: None })
    }
}

impl NavAlgorithm for AllanAnalysis {
    fn input_names(&self) -> Vec<String> {
        vec![
            names::FS.to_string(),
            names::GYRO.to_string(),
            names::ACCEL.to_string(),
        ]
    }

    fn output_names(&self) -> Vec<String> {
        vec![
            names::AV_T.to_string(),
            names::AV_GYRO.to_string(),
            names::AV_ACCEL.to_string(),
        ]
    }

    fn run(&mut self, inputs: &[&SampleData]) -> Result<(), SimError> {
        let fs = inputs[0]
            .as_scalar()
            .ok_or(SimError::InvalidAlgorithm("fs input must be a scalar"))?;
        let gyro = inputs[1]
            .as_matrix()
            .ok_or(SimError::InvalidAlgorithm("gyro input must be a matrix"))?;
        let accel = inputs[2]
            .as_matrix()
            .ok_or(SimError::InvalidAlgorithm("accel input must be a matrix"))?;

        let clusters = cluster_sizes(gyro.nrows());
        if clusters.is_empty() {
            return Err(SimError::InvalidAlgorithm(
                "series too short for Allan analysis",
            ));
        }
        let tau0 = 1.0 / fs;
        let taus = SampleMatrix::from_fn(clusters.len(), 1, |row, _| clusters[row] as f64 * tau0);
        let av_gyro = allan_variance(gyro, &clusters, tau0);
        let av_accel = allan_variance(accel, &clusters, tau0);
        self.pending = Some([taus.into(), av_gyro.into(), av_accel.into()]);
        Ok(())
    }

    fn take_results(&mut self) -> Result<Vec<SampleData>, SimError> {
        let results = self.pending.take().ok_or(SimError::InvalidAlgorithm(
            "take_results called before run",
        ))?;
        Ok(results.into())
    }
}

/// Octave-spaced cluster sizes, capped so each size still spans enough
/// clusters for a meaningful average.
fn cluster_sizes(samples: usize) -> Vec<usize> {
    let mut sizes = Vec::new();
    let mut m = 1;
    while 2 * m < samples / 2 {
        sizes.push(m);
        m *= 2;
    }
    sizes
}

/// Overlapping Allan variance per column.
fn allan_variance(series: &SampleMatrix, clusters: &[usize], tau0: f64) -> SampleMatrix {
    let n = series.nrows();
    let cols = series.ncols();
    let mut out = SampleMatrix::zeros(clusters.len(), cols);
    for col in 0..cols {
        // Integrate the rate series into phase data.
        let mut theta = Vec::with_capacity(n + 1);
        theta.push(0.0);
        let mut acc = 0.0;
        for row in 0..n {
            acc += series[(row, col)] * tau0;
            theta.push(acc);
        }
        for (tau_idx, &m) in clusters.iter().enumerate() {
            let tau = m as f64 * tau0;
            let terms = theta.len() - 2 * m;
            let mut sum = 0.0;
            for k in 0..terms {
                let d = theta[k + 2 * m] - 2.0 * theta[k + m] + theta[k];
                sum += d * d;
            }
            out[(tau_idx, col)] = sum / (2.0 * tau * tau * terms as f64);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn run_on(gyro: SampleMatrix, accel: SampleMatrix, fs: f64) -> Vec<SampleData> {
        let mut algo = AllanAnalysis::new();
        let fs = SampleData::Scalar(fs);
        let gyro = SampleData::Matrix(gyro);
        let accel = SampleData::Matrix(accel);
        algo.run(&[&fs, &gyro, &accel]).unwrap();
        algo.take_results().unwrap()
    }

    #[test]
    fn test_constant_signal_has_zero_allan_variance() {
        let gyro = SampleMatrix::from_element(512, 3, 0.25);
        let accel = SampleMatrix::from_element(512, 3, -9.8);
        let results = run_on(gyro, accel, 100.0);

        let av_gyro = results[1].as_matrix().unwrap();
        for value in av_gyro.iter() {
            assert_abs_diff_eq!(*value, 0.0, epsilon = 1e-18);
        }
    }

    #[test]
    fn test_taus_are_octave_spaced() {
        let gyro = SampleMatrix::zeros(512, 3);
        let accel = SampleMatrix::zeros(512, 3);
        let results = run_on(gyro, accel, 100.0);

        let taus = results[0].as_matrix().unwrap();
        assert!(taus.nrows() > 3);
        assert_abs_diff_eq!(taus[(0, 0)], 0.01, epsilon = 1e-12);
        for row in 1..taus.nrows() {
            assert_abs_diff_eq!(taus[(row, 0)], 2.0 * taus[(row - 1, 0)], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_alternating_signal_has_positive_variance() {
        let gyro = SampleMatrix::from_fn(512, 3, |row, _| if row % 2 == 0 { 0.1 } else { -0.1 });
        let accel = SampleMatrix::zeros(512, 3);
        let results = run_on(gyro, accel, 100.0);
        let av_gyro = results[1].as_matrix().unwrap();
        assert!(av_gyro[(0, 0)] > 0.0);
    }
}
