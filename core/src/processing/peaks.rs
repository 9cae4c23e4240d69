use crate::math::window::{chebyshev_distance, max_filter};
use crate::scan_interface::detection::PeakIndex;
use ndarray::ArrayView2;
use std::cmp::Ordering;

/// Local-maximum extraction with Chebyshev-distance suppression.
///
/// A cell is a candidate when its value is strictly above the threshold and
/// equals the maximum of the square window of radius `min_distance` around
/// it (clipped at the borders). Candidates are visited by descending value,
/// ties in row-major order, and a candidate is dropped when an accepted peak
/// lies within Chebyshev distance `min_distance`.
#[derive(Debug, Clone, Copy)]
pub struct PeakExtractor {
    min_distance: usize,
}

impl PeakExtractor {
    pub fn new(min_distance: usize) -> Self {
        Self { min_distance }
    }

    /// Accepted peaks ordered by descending value.
    pub fn extract(&self, image: ArrayView2<f64>, threshold: f64) -> Vec<PeakIndex> {
        if image.is_empty() {
            return Vec::new();
        }

        let neighborhood_max = max_filter(image, self.min_distance);
        let mut candidates: Vec<(PeakIndex, f64)> = image
            .indexed_iter()
            .filter(|&(cell, &value)| value > threshold && value >= neighborhood_max[cell])
            .map(|(cell, &value)| (PeakIndex::from(cell), value))
            .collect();

        candidates.sort_by(|(a_idx, a_val), (b_idx, b_val)| {
            b_val
                .partial_cmp(a_val)
                .unwrap_or(Ordering::Equal)
                .then(a_idx.row.cmp(&b_idx.row))
                .then(a_idx.col.cmp(&b_idx.col))
        });

        let mut accepted: Vec<PeakIndex> = Vec::new();
        for (candidate, _) in candidates {
            let isolated = accepted.iter().all(|peak| {
                chebyshev_distance((peak.row, peak.col), (candidate.row, candidate.col))
                    > self.min_distance
            });
            if isolated {
                accepted.push(candidate);
            }
        }
        accepted
    }
}
