use crate::math::stats::{StatsHelper, UndefinedStats};
use ndarray::Array2;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Grid position of a detected peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeakIndex {
    pub row: usize,
    pub col: usize,
}

impl PeakIndex {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for PeakIndex {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// One detected center, flattened for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedCenter {
    pub index: PeakIndex,
    pub x_um: f64,
    pub y_um: f64,
    /// Raw count rate at the peak cell.
    pub intensity: f64,
    /// Smoothed response that ranked the peak.
    pub response: f64,
}

/// Output of one detection run. The four per-peak sequences are parallel and
/// ordered by descending smoothed response.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    coordinates: Vec<PeakIndex>,
    x_positions: Vec<f64>,
    y_positions: Vec<f64>,
    intensities: Vec<f64>,
    processed_image: Array2<f64>,
    threshold: f64,
}

impl DetectionResult {
    pub(crate) fn new(
        coordinates: Vec<PeakIndex>,
        x_positions: Vec<f64>,
        y_positions: Vec<f64>,
        intensities: Vec<f64>,
        processed_image: Array2<f64>,
        threshold: f64,
    ) -> Self {
        debug_assert_eq!(coordinates.len(), x_positions.len());
        debug_assert_eq!(coordinates.len(), y_positions.len());
        debug_assert_eq!(coordinates.len(), intensities.len());
        Self {
            coordinates,
            x_positions,
            y_positions,
            intensities,
            processed_image,
            threshold,
        }
    }

    /// A result with no peaks.
    pub(crate) fn empty(processed_image: Array2<f64>, threshold: f64) -> Self {
        Self::new(
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            processed_image,
            threshold,
        )
    }

    pub fn coordinates(&self) -> &[PeakIndex] {
        &self.coordinates
    }

    pub fn x_positions(&self) -> &[f64] {
        &self.x_positions
    }

    pub fn y_positions(&self) -> &[f64] {
        &self.y_positions
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn processed_image(&self) -> &Array2<f64> {
        &self.processed_image
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn centers(&self) -> impl Iterator<Item = DetectedCenter> + '_ {
        self.coordinates
            .iter()
            .zip(&self.x_positions)
            .zip(&self.y_positions)
            .zip(&self.intensities)
            .map(|(((&index, &x_um), &y_um), &intensity)| DetectedCenter {
                index,
                x_um,
                y_um,
                intensity,
                response: self.processed_image[[index.row, index.col]],
            })
    }

    /// Mean raw intensity over the detected centers, ignoring missing cells.
    pub fn mean_intensity(&self) -> Option<f64> {
        let moments =
            StatsHelper::nan_moments(self.intensities.iter().copied(), UndefinedStats::Propagate);
        if moments.mean.is_nan() {
            None
        } else {
            Some(moments.mean)
        }
    }
}

/// Grid rows as nested vectors; `NaN` serializes as `null` in JSON.
pub(crate) fn grid_rows(grid: &Array2<f64>) -> Vec<Vec<f64>> {
    grid.rows().into_iter().map(|row| row.to_vec()).collect()
}

impl Serialize for DetectionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DetectionResult", 6)?;
        state.serialize_field("coordinates", &self.coordinates)?;
        state.serialize_field("x_positions", &self.x_positions)?;
        state.serialize_field("y_positions", &self.y_positions)?;
        state.serialize_field("intensities", &self.intensities)?;
        state.serialize_field("processed_image", &grid_rows(&self.processed_image))?;
        state.serialize_field("threshold", &self.threshold)?;
        state.end()
    }
}
