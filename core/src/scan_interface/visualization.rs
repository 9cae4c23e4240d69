use crate::math::stats::{Histogram, StatsHelper};
use crate::scan_interface::dataset::ScanDataset;
use crate::scan_interface::detection::{grid_rows, DetectionResult};
use serde::Serialize;

pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

/// Everything a renderer needs to draw the diagnostic panels for one scan:
/// raw and smoothed heat maps, the threshold mask, center markers over the
/// raw map and the raw-count histogram with the threshold line.
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationModel {
    /// `[x_min, x_max, y_min, y_max]` in microns.
    pub extent: [f64; 4],
    pub raw: Vec<Vec<f64>>,
    pub smoothed: Vec<Vec<f64>>,
    /// `smoothed > threshold`, cell by cell.
    pub threshold_mask: Vec<Vec<bool>>,
    pub markers: Vec<[f64; 2]>,
    pub histogram: Histogram,
    pub threshold: f64,
    pub detection_count: usize,
}

impl VisualizationModel {
    pub fn build(dataset: &ScanDataset, result: &DetectionResult, histogram_bins: usize) -> Self {
        let threshold = result.threshold();
        let processed = result.processed_image();

        let threshold_mask = processed
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|&v| v > threshold).collect())
            .collect();

        let markers = result
            .x_positions()
            .iter()
            .zip(result.y_positions())
            .map(|(&x, &y)| [x, y])
            .collect();

        let (x_min, x_max) = axis_bounds(dataset.x_steps());
        let (y_min, y_max) = axis_bounds(dataset.y_steps());

        Self {
            extent: [x_min, x_max, y_min, y_max],
            raw: grid_rows(dataset.counts()),
            smoothed: grid_rows(processed),
            threshold_mask,
            markers,
            histogram: StatsHelper::histogram(dataset.counts().iter().copied(), histogram_bins),
            threshold,
            detection_count: result.len(),
        }
    }
}

fn axis_bounds(steps: &[f64]) -> (f64, f64) {
    if steps.is_empty() {
        return (0.0, 0.0);
    }
    steps
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
