//! Center-detection core for confocal raster scans.
//!
//! A scan container is loaded into a [`ScanDataset`], then [`detect`] runs the
//! guarded pipeline: Gaussian smoothing, adaptive `mean + k * std`
//! thresholding, local-maximum extraction with Chebyshev spacing, and mapping
//! of peak indices onto the scan axes. [`VisualizationModel`] carries the
//! panels a renderer draws from a result.

pub mod math;
pub mod prelude;
pub mod processing;
pub mod scan_interface;
pub mod telemetry;

pub use prelude::{DetectionError, DetectionParams, FormatError, ThresholdBasis};
pub use processing::{detect, detect_file, CenterDetector};
pub use scan_interface::{
    DetectedCenter, DetectionResult, PeakIndex, ScanDataset, VisualizationModel,
};
