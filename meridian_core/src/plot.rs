// meridian_core/src/plot.rs

//! Chart descriptions and the axis-selection policy.
//!
//! The core never draws anything itself. Containers render into neutral
//! [`ChartSpec`] values and the stateless [`PlotDispatcher`] picks the right
//! x-axis for a series before handing the specs to an external
//! [`ChartBackend`].

use tracing::warn;

use crate::container::ContainerStore;
use crate::error::SimError;
use crate::types::{names, TrialIndex};

/// One line of a chart: a label plus its y-values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<f64>,
}

/// A complete, renderer-agnostic description of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub x: Vec<f64>,
    pub series: Vec<ChartSeries>,
    pub log_x: bool,
    pub log_y: bool,
    pub grid: bool,
}

/// The external chart-drawing collaborator.
pub trait ChartBackend {
    fn draw(&mut self, spec: &ChartSpec) -> Result<(), SimError>;
}

/// Stateless axis-selection policy. Owns no data.
///
/// Series fall into three time bases: GPS-category series run against the GPS
/// sample times, Allan-variance series run against the Allan averaging times
/// (trial 0 of `av_t`), and everything else runs against the primary IMU
/// sample times.
pub struct PlotDispatcher;

impl PlotDispatcher {
    /// Resolves the x-axis for `name`, or `None` when the required time base
    /// holds no data yet.
    pub fn x_axis_for(store: &ContainerStore, name: &str) -> Option<Vec<f64>> {
        match name {
            names::GPS | names::REF_GPS | names::GPS_TIME => {
                Self::constant_column(store, names::GPS_TIME)
            }
            names::AV_T | names::AV_GYRO | names::AV_ACCEL => {
                // The Allan time base is itself a per-trial output; trial 0
                // serves as the common axis, as in the original tooling.
                let container = store.by_name(names::AV_T)?;
                let data = container.get_trial(0)?;
                let m = data.as_matrix()?;
                Some(m.column(0).iter().copied().collect())
            }
            _ => Self::constant_column(store, names::TIME),
        }
    }

    /// Renders every chart for `name` over the selected trials.
    pub fn dispatch(
        store: &ContainerStore,
        name: &str,
        trials: &[TrialIndex],
        backend: &mut dyn ChartBackend,
    ) -> Result<(), SimError> {
        let Some(container) = store.by_name(name) else {
            warn!(name, "unsupported plot: unknown series");
            return Ok(());
        };
        let Some(x_axis) = Self::x_axis_for(store, name) else {
            warn!(name, "skipping plot: its time base holds no data");
            return Ok(());
        };
        for spec in container.render(&x_axis, trials) {
            backend.draw(&spec)?;
        }
        Ok(())
    }

    fn constant_column(store: &ContainerStore, name: &str) -> Option<Vec<f64>> {
        let m = store.by_name(name)?.get_constant()?.as_matrix()?;
        Some(m.column(0).iter().copied().collect())
    }
}
