use crate::math::stats::{Moments, StatsHelper, UndefinedStats};
use crate::prelude::{DetectionParams, ThresholdBasis};
use ndarray::ArrayView2;

/// Threshold actually applied, with the statistics it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdEstimate {
    pub value: f64,
    /// `None` when an explicit minimum peak height overrode the statistics.
    pub moments: Option<Moments>,
}

/// `mean + factor * std` over the non-missing cells, unless an explicit
/// minimum peak height is configured.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveThreshold {
    factor: f64,
    min_peak_height: Option<f64>,
    basis: ThresholdBasis,
}

impl AdaptiveThreshold {
    pub fn new(factor: f64, min_peak_height: Option<f64>, basis: ThresholdBasis) -> Self {
        Self {
            factor,
            min_peak_height,
            basis,
        }
    }

    pub fn from_params(params: &DetectionParams) -> Self {
        Self::new(
            params.threshold_factor,
            params.min_peak_height,
            params.threshold_basis,
        )
    }

    /// `raw` decides which cells are present; `smoothed` supplies the values
    /// for [`ThresholdBasis::Smoothed`]. Both grids share a shape.
    pub fn estimate(&self, raw: ArrayView2<f64>, smoothed: ArrayView2<f64>) -> ThresholdEstimate {
        if let Some(height) = self.min_peak_height {
            return ThresholdEstimate {
                value: height,
                moments: None,
            };
        }

        let moments = match self.basis {
            ThresholdBasis::Raw => {
                StatsHelper::nan_moments(raw.iter().copied(), UndefinedStats::ZeroFill)
            }
            ThresholdBasis::Smoothed => StatsHelper::nan_moments(
                raw.iter()
                    .zip(smoothed.iter())
                    .filter(|(r, _)| !r.is_nan())
                    .map(|(_, &s)| s),
                UndefinedStats::ZeroFill,
            ),
        };

        ThresholdEstimate {
            value: moments.mean + self.factor * moments.std_dev,
            moments: Some(moments),
        }
    }
}
