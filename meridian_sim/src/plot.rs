// meridian_sim/src/plot.rs

//! The plotters-backed chart renderer: one PNG per chart spec.
//!
//! Log-scaled specs are drawn on linear axes over log10-mapped values
//! (non-positive samples are dropped), which keeps a single drawing path for
//! every chart kind.

use std::fs;
use std::path::PathBuf;

use plotters::prelude::*;
use tracing::info;

use meridian_core::error::SimError;
use meridian_core::plot::{ChartBackend, ChartSpec};

const CHART_SIZE: (u32, u32) = (1024, 640);

pub struct PlottersBackend {
    output_dir: PathBuf,
}

impl PlottersBackend {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, SimError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)
            .map_err(|e| SimError::Chart(format!("cannot create {}: {e}", output_dir.display())))?;
        Ok(Self { output_dir })
    }
}

impl ChartBackend for PlottersBackend {
    fn draw(&mut self, spec: &ChartSpec) -> Result<(), SimError> {
        let path = self.output_dir.join(format!("{}.png", sanitize(&spec.title)));
        render(&path, spec).map_err(|e| SimError::Chart(e.to_string()))?;
        info!(chart = %path.display(), "rendered");
        Ok(())
    }
}

fn render(path: &std::path::Path, spec: &ChartSpec) -> Result<(), Box<dyn std::error::Error>> {
    let lines = prepare_lines(spec);
    let (x_range, y_range) = ranges(&lines);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    if spec.grid {
        chart.configure_mesh().draw()?;
    } else {
        chart.configure_mesh().disable_mesh().draw()?;
    }

    let mut labelled = false;
    for (idx, (label, points)) in lines.iter().enumerate() {
        let color = Palette99::pick(idx).mix(0.9);
        let series = chart.draw_series(LineSeries::new(points.iter().copied(), &color))?;
        if !label.is_empty() {
            labelled = true;
            series
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
    }
    if labelled {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    root.present()?;
    Ok(())
}

/// Zips each series against the x-axis, applying log10 mapping where the
/// spec asks for log scaling.
fn prepare_lines(spec: &ChartSpec) -> Vec<(String, Vec<(f64, f64)>)> {
    spec.series
        .iter()
        .map(|series| {
            let points = spec
                .x
                .iter()
                .zip(series.values.iter())
                .filter_map(|(&x, &y)| {
                    let x = map_axis(x, spec.log_x)?;
                    let y = map_axis(y, spec.log_y)?;
                    Some((x, y))
                })
                .collect();
            (series.label.clone(), points)
        })
        .collect()
}

fn map_axis(value: f64, log: bool) -> Option<f64> {
    if !log {
        return Some(value);
    }
    (value > 0.0).then(|| value.log10())
}

fn ranges(lines: &[(String, Vec<(f64, f64)>)]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (_, points) in lines {
        for &(x, y) in points {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }
    (pad(x_min, x_max), pad(y_min, y_max))
}

fn pad(min: f64, max: f64) -> std::ops::Range<f64> {
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = (max - min).abs();
    let margin = if span < f64::EPSILON { 0.5 } else { span * 0.05 };
    (min - margin)..(max + margin)
}

fn sanitize(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::plot::ChartSeries;

    #[test]
    fn test_sanitize_keeps_filenames_safe() {
        assert_eq!(sanitize("gyro_0"), "gyro_0");
        assert_eq!(sanitize("av gyro/0"), "av_gyro_0");
    }

    #[test]
    fn test_log_mapping_drops_nonpositive_samples() {
        let spec = ChartSpec {
            title: "av".to_string(),
            x: vec![0.0, 10.0, 100.0],
            series: vec![ChartSeries {
                label: "a".to_string(),
                values: vec![1.0, 100.0, 1000.0],
            }],
            log_x: true,
            log_y: true,
            grid: true,
        };
        let lines = prepare_lines(&spec);
        // x = 0 cannot be drawn in log scale and is dropped.
        assert_eq!(lines[0].1, vec![(1.0, 2.0), (2.0, 3.0)]);
    }

    #[test]
    fn test_degenerate_range_is_padded() {
        let range = pad(1.0, 1.0);
        assert!(range.start < 1.0 && range.end > 1.0);
    }
}
