use anyhow::Context;
use nvcore::scan_interface::visualization::DEFAULT_HISTOGRAM_BINS;
use nvcore::{DetectionParams, ThresholdBasis};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    #[serde(flatten)]
    pub detection: DetectionParams,
    pub output_dir: Option<PathBuf>,
    pub histogram_bins: usize,
}

/// Command-line settings; `None` keeps the value from the workflow file or
/// the defaults.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub threshold_factor: Option<f64>,
    pub min_distance: Option<usize>,
    pub min_peak_height: Option<f64>,
    pub threshold_basis: Option<ThresholdBasis>,
    pub output_dir: Option<PathBuf>,
    pub histogram_bins: Option<usize>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            detection: DetectionParams::default(),
            output_dir: None,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Applies the settings given explicitly on the command line on top of
    /// this config.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(factor) = overrides.threshold_factor {
            self.detection.threshold_factor = factor;
        }
        if let Some(distance) = overrides.min_distance {
            self.detection.min_distance = distance;
        }
        if overrides.min_peak_height.is_some() {
            self.detection.min_peak_height = overrides.min_peak_height;
        }
        if let Some(basis) = overrides.threshold_basis {
            self.detection.threshold_basis = basis;
        }
        if overrides.output_dir.is_some() {
            self.output_dir = overrides.output_dir;
        }
        if let Some(bins) = overrides.histogram_bins {
            self.histogram_bins = bins;
        }
        self
    }

    pub fn detection_params(&self) -> &DetectionParams {
        &self.detection
    }
}
