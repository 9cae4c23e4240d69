use anyhow::Context;
use nvcore::{DetectedCenter, DetectionResult, ScanDataset, VisualizationModel};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE_NAME: &str = "batch_summary.json";

/// Everything produced for one scan: the detection result, a flattened list
/// of centers and the panels a renderer needs.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub source: String,
    pub params: Map<String, Value>,
    pub detection: DetectionResult,
    pub centers: Vec<DetectedCenter>,
    pub visualization: VisualizationModel,
}

impl ScanReport {
    pub fn new(
        source: impl Into<String>,
        dataset: &ScanDataset,
        detection: DetectionResult,
        histogram_bins: usize,
    ) -> Self {
        let visualization = VisualizationModel::build(dataset, &detection, histogram_bins);
        Self {
            source: source.into(),
            params: dataset.params().clone(),
            centers: detection.centers().collect(),
            detection,
            visualization,
        }
    }
}

/// Per-file line of the batch summary.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub source: String,
    pub detection_count: usize,
    pub threshold: Option<f64>,
    pub mean_intensity: Option<f64>,
    pub report: Option<PathBuf>,
    pub error: Option<String>,
}

impl FileSummary {
    pub fn succeeded(report: &ScanReport, written_to: Option<PathBuf>) -> Self {
        Self {
            source: report.source.clone(),
            detection_count: report.detection.len(),
            threshold: Some(report.detection.threshold()),
            mean_intensity: report.detection.mean_intensity(),
            report: written_to,
            error: None,
        }
    }

    pub fn failed(source: impl Into<String>, error: &anyhow::Error) -> Self {
        Self {
            source: source.into(),
            detection_count: 0,
            threshold: None,
            mean_intensity: None,
            report: None,
            error: Some(format!("{:#}", error)),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Cross-file comparison data for a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub files: Vec<FileSummary>,
    pub processed: usize,
    pub failed: usize,
    pub total_centers: usize,
}

/// `<stem>_results.json` inside `dir`.
pub fn report_path(dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scan".to_string());
    dir.join(format!("{}_results.json", stem))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let contents = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing {}", path.display()))?;
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
