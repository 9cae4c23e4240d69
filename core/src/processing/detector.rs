use crate::prelude::{DetectionParams, DetectorResult};
use crate::processing::mapping::CoordinateMapper;
use crate::processing::peaks::PeakExtractor;
use crate::processing::smoothing::GaussianSmoother;
use crate::processing::threshold::AdaptiveThreshold;
use crate::scan_interface::dataset::ScanDataset;
use crate::scan_interface::detection::DetectionResult;
use crate::telemetry::log::LogManager;
use std::path::Path;

/// Center detector: Gaussian smoothing, adaptive threshold, local-maximum
/// extraction and coordinate mapping. Holds only validated configuration, so
/// one instance can serve any number of datasets, from any thread.
#[derive(Debug, Clone)]
pub struct CenterDetector {
    params: DetectionParams,
    smoother: GaussianSmoother,
    threshold: AdaptiveThreshold,
    extractor: PeakExtractor,
    logger: LogManager,
}

impl CenterDetector {
    pub fn new(params: DetectionParams) -> DetectorResult<Self> {
        params.validate()?;
        Ok(Self {
            smoother: GaussianSmoother::default(),
            threshold: AdaptiveThreshold::from_params(&params),
            extractor: PeakExtractor::new(params.min_distance),
            logger: LogManager::new("detector"),
            params,
        })
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Never fails on numeric content: empty, all-missing and flat grids all
    /// yield an empty result.
    pub fn detect(&self, dataset: &ScanDataset) -> DetectionResult {
        let counts = dataset.counts();
        if counts.is_empty() || counts.iter().all(|v| v.is_nan()) {
            self.logger
                .detail("empty or all-missing scan; skipping detection");
            return DetectionResult::empty(counts.clone(), 0.0);
        }

        let smoothed = self.smoother.smooth(counts.view());
        let estimate = self.threshold.estimate(counts.view(), smoothed.view());
        let threshold = estimate.value;
        if let Some(moments) = estimate.moments {
            self.logger.detail(&format!(
                "mean {:.3} std {:.3} -> threshold {:.3}",
                moments.mean, moments.std_dev, threshold
            ));
        }

        if threshold <= 0.0 || !smoothed.iter().any(|&v| v > threshold) {
            self.logger.detail(&format!(
                "no smoothed value above threshold {:.3}",
                threshold
            ));
            return DetectionResult::empty(smoothed, threshold);
        }

        let coordinates = self.extractor.extract(smoothed.view(), threshold);
        let mapper = CoordinateMapper::for_dataset(dataset);
        let (x_positions, y_positions): (Vec<f64>, Vec<f64>) =
            coordinates.iter().map(|&idx| mapper.position(idx)).unzip();
        let intensities = coordinates
            .iter()
            .map(|idx| counts[[idx.row, idx.col]])
            .collect();

        self.logger.record(&format!(
            "detected {} centers above {:.3}",
            coordinates.len(),
            threshold
        ));

        DetectionResult::new(
            coordinates,
            x_positions,
            y_positions,
            intensities,
            smoothed,
            threshold,
        )
    }
}

/// Runs one detection with the given parameters.
pub fn detect(dataset: &ScanDataset, params: &DetectionParams) -> DetectorResult<DetectionResult> {
    Ok(CenterDetector::new(params.clone())?.detect(dataset))
}

/// Loads a scan container and runs detection on it.
pub fn detect_file<P: AsRef<Path>>(
    path: P,
    params: &DetectionParams,
) -> DetectorResult<(ScanDataset, DetectionResult)> {
    let detector = CenterDetector::new(params.clone())?;
    let dataset = ScanDataset::load(path)?;
    let result = detector.detect(&dataset);
    Ok((dataset, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::window::chebyshev_distance;
    use crate::prelude::{DetectionError, ThresholdBasis};
    use crate::scan_interface::detection::PeakIndex;
    use ndarray::Array2;
    use serde_json::Map;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn index_steps(len: usize) -> Vec<f64> {
        (0..len).map(|i| i as f64).collect()
    }

    fn dataset(counts: Array2<f64>) -> ScanDataset {
        let (rows, cols) = counts.dim();
        ScanDataset::new(counts, index_steps(cols), index_steps(rows), Map::new()).unwrap()
    }

    fn assert_parallel(result: &DetectionResult) {
        assert_eq!(result.coordinates().len(), result.x_positions().len());
        assert_eq!(result.coordinates().len(), result.y_positions().len());
        assert_eq!(result.coordinates().len(), result.intensities().len());
    }

    #[test]
    fn single_spike_is_detected_at_its_cell() {
        let mut counts = Array2::zeros((5, 5));
        counts[[2, 2]] = 100.0;
        let result = detect(&dataset(counts), &DetectionParams::default()).unwrap();

        assert_parallel(&result);
        assert_eq!(result.coordinates(), &[PeakIndex::new(2, 2)]);
        assert_eq!(result.intensities(), &[100.0]);
        assert_eq!(result.x_positions(), &[2.0]);
        assert_eq!(result.y_positions(), &[2.0]);
        assert!(result.threshold() > 0.0);
    }

    #[test]
    fn all_missing_grid_yields_empty_result_with_zero_threshold() {
        let counts = Array2::from_elem((3, 3), f64::NAN);
        let result = detect(&dataset(counts), &DetectionParams::default()).unwrap();
        assert!(result.is_empty());
        assert_parallel(&result);
        assert_eq!(result.threshold(), 0.0);
        assert!(result.processed_image().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn empty_grid_yields_empty_result() {
        let data = ScanDataset::new(Array2::zeros((0, 3)), vec![], vec![], Map::new()).unwrap();
        let result = detect(&data, &DetectionParams::default()).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.threshold(), 0.0);
        assert_eq!(result.processed_image().dim(), (0, 3));
    }

    #[test]
    fn adjacent_equal_spikes_keep_only_the_first() {
        let mut counts = Array2::zeros((5, 5));
        counts[[1, 1]] = 100.0;
        counts[[1, 2]] = 100.0;
        let result = detect(&dataset(counts), &DetectionParams::default()).unwrap();
        assert_eq!(result.coordinates(), &[PeakIndex::new(1, 1)]);
        assert_eq!(result.intensities(), &[100.0]);
    }

    #[test]
    fn flat_grid_keeps_computed_threshold() {
        let counts = Array2::from_elem((6, 6), 40.0);
        let result = detect(&dataset(counts), &DetectionParams::default()).unwrap();
        assert!(result.is_empty());
        assert!((result.threshold() - 40.0).abs() < 1e-9);
        assert_eq!(result.processed_image().dim(), (6, 6));
    }

    #[test]
    fn zero_grid_short_circuits_on_non_positive_threshold() {
        let counts = Array2::zeros((4, 4));
        let result = detect(&dataset(counts), &DetectionParams::default()).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.threshold(), 0.0);
    }

    #[test]
    fn explicit_min_peak_height_overrides_statistics() {
        let mut counts = Array2::zeros((5, 5));
        counts[[2, 2]] = 100.0;
        let data = dataset(counts);

        let adaptive = detect(&data, &DetectionParams::default()).unwrap();
        let fixed = detect(
            &data,
            &DetectionParams {
                min_peak_height: Some(3.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(fixed.threshold(), 3.0);
        assert_ne!(fixed.threshold(), adaptive.threshold());

        let too_high = detect(
            &data,
            &DetectionParams {
                min_peak_height: Some(50.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(too_high.is_empty());
        assert_eq!(too_high.threshold(), 50.0);
    }

    #[test]
    fn threshold_equal_to_peak_response_is_exclusive() {
        let mut counts = Array2::zeros((5, 5));
        counts[[2, 2]] = 100.0;
        let data = dataset(counts);
        let response = detect(&data, &DetectionParams::default())
            .unwrap()
            .processed_image()[[2, 2]];

        let at_response = DetectionParams {
            min_peak_height: Some(response),
            ..Default::default()
        };
        assert!(detect(&data, &at_response).unwrap().is_empty());

        let just_below = DetectionParams {
            min_peak_height: Some(response - 1e-6),
            ..Default::default()
        };
        assert_eq!(detect(&data, &just_below).unwrap().len(), 1);
    }

    #[test]
    fn raw_basis_reproduces_unsmoothed_statistics() {
        let mut counts = Array2::zeros((5, 5));
        counts[[2, 2]] = 100.0;
        let params = DetectionParams {
            threshold_basis: ThresholdBasis::Raw,
            ..Default::default()
        };
        let result = detect(&dataset(counts), &params).unwrap();
        // mean 4, population std sqrt(384)
        assert!((result.threshold() - (4.0 + 2.0 * 384f64.sqrt())).abs() < 1e-9);
        assert!(result.is_empty());
    }

    #[test]
    fn intensities_come_from_raw_counts_and_peaks_are_spaced() {
        let mut counts = Array2::from_elem((30, 30), 1.0);
        let spikes = [(5, 5, 80.0), (5, 20, 120.0), (22, 12, 60.0), (24, 14, 200.0)];
        for &(row, col, height) in &spikes {
            counts[[row, col]] = height;
        }
        let params = DetectionParams {
            min_distance: 4,
            ..Default::default()
        };
        let result = detect(&dataset(counts.clone()), &params).unwrap();
        assert_parallel(&result);
        assert_eq!(
            result.coordinates(),
            &[
                PeakIndex::new(24, 14),
                PeakIndex::new(5, 20),
                PeakIndex::new(5, 5)
            ]
        );

        for (idx, &intensity) in result.coordinates().iter().zip(result.intensities()) {
            assert_eq!(intensity, counts[[idx.row, idx.col]]);
            assert_ne!(intensity, result.processed_image()[[idx.row, idx.col]]);
        }
        let peaks = result.coordinates();
        for (i, a) in peaks.iter().enumerate() {
            for b in &peaks[i + 1..] {
                assert!(chebyshev_distance((a.row, a.col), (b.row, b.col)) > params.min_distance);
            }
        }
    }

    #[test]
    fn missing_cells_do_not_block_detection() {
        let mut counts = Array2::from_elem((9, 9), 2.0);
        counts[[4, 4]] = 90.0;
        counts[[0, 0]] = f64::NAN;
        counts[[4, 5]] = f64::NAN;
        let result = detect(&dataset(counts), &DetectionParams::default()).unwrap();
        assert_eq!(result.coordinates(), &[PeakIndex::new(4, 4)]);
        assert!(result.processed_image().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn physical_axes_are_interpolated() {
        let mut counts = Array2::zeros((5, 5));
        counts[[1, 3]] = 100.0;
        let data = ScanDataset::new(
            counts,
            vec![-1.0, -0.5, 0.0, 0.5, 1.0],
            vec![10.0, 10.2, 10.4, 10.6, 10.8],
            Map::new(),
        )
        .unwrap();
        let result = detect(&data, &DetectionParams::default()).unwrap();
        assert_eq!(result.x_positions(), &[0.5]);
        assert_eq!(result.y_positions(), &[10.2]);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let data = dataset(Array2::zeros((2, 2)));
        let err = detect(
            &data,
            &DetectionParams {
                threshold_factor: f64::INFINITY,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, DetectionError::InvalidParameter(_)));
    }

    #[test]
    fn detect_file_surfaces_format_errors() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(br#"{"datasets": {"xSteps": [], "ySteps": []}}"#)
            .unwrap();
        let err = detect_file(temp.path(), &DetectionParams::default()).unwrap_err();
        assert!(matches!(err, DetectionError::Format(_)));
    }
}
