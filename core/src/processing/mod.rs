pub mod detector;
pub mod mapping;
pub mod peaks;
pub mod smoothing;
pub mod threshold;

pub use detector::{detect, detect_file, CenterDetector};
pub use mapping::CoordinateMapper;
pub use peaks::PeakExtractor;
pub use smoothing::{GaussianSmoother, SMOOTHING_SIGMA};
pub use threshold::{AdaptiveThreshold, ThresholdEstimate};
