use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which grid the adaptive threshold statistics are measured on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdBasis {
    /// Mean/std of the raw counts.
    Raw,
    /// Mean/std of the smoothed grid, sampled at the non-missing cells.
    #[default]
    Smoothed,
}

/// Tunables for a single detection run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionParams {
    pub threshold_factor: f64,
    pub min_distance: usize,
    pub min_peak_height: Option<f64>,
    pub threshold_basis: ThresholdBasis,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            threshold_factor: 2.0,
            min_distance: 5,
            min_peak_height: None,
            threshold_basis: ThresholdBasis::default(),
        }
    }
}

impl DetectionParams {
    pub fn validate(&self) -> DetectorResult<()> {
        if !self.threshold_factor.is_finite() {
            return Err(DetectionError::InvalidParameter(format!(
                "threshold factor must be finite, got {}",
                self.threshold_factor
            )));
        }
        if self.min_distance == 0 {
            return Err(DetectionError::InvalidParameter(
                "min distance must be at least 1".into(),
            ));
        }
        if let Some(height) = self.min_peak_height {
            if !height.is_finite() {
                return Err(DetectionError::InvalidParameter(format!(
                    "min peak height must be finite, got {}",
                    height
                )));
            }
        }
        Ok(())
    }
}

/// Structural problems with a scan container.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("{origin}: unable to read scan container: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin}: malformed scan container: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{origin}: missing required key `{key}`")]
    MissingKey { origin: String, key: &'static str },
    #[error("{origin}: ScanCounts row {row} has {found} columns, expected {expected}")]
    RaggedGrid {
        origin: String,
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("{origin}: {axis} has {found} entries, expected {expected}")]
    AxisLength {
        origin: String,
        axis: &'static str,
        found: usize,
        expected: usize,
    },
}

impl FormatError {
    pub fn origin(&self) -> &str {
        match self {
            FormatError::Io { origin, .. }
            | FormatError::Malformed { origin, .. }
            | FormatError::MissingKey { origin, .. }
            | FormatError::RaggedGrid { origin, .. }
            | FormatError::AxisLength { origin, .. } => origin,
        }
    }
}

/// Errors raised by the detector itself.
#[derive(thiserror::Error, Debug)]
pub enum DetectionError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Format(#[from] FormatError),
}

pub type DetectorResult<T> = Result<T, DetectionError>;

/// Label used for containers that did not come from a file.
pub fn inline_origin() -> String {
    "<inline>".to_string()
}

pub(crate) fn path_origin(path: &Path) -> String {
    path.display().to_string()
}
