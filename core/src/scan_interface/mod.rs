pub mod dataset;
pub mod detection;
pub mod visualization;

pub use dataset::ScanDataset;
pub use detection::{DetectedCenter, DetectionResult, PeakIndex};
pub use visualization::VisualizationModel;
