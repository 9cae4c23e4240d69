use crate::workflow::config::WorkflowConfig;
use crate::workflow::report::{
    report_path, write_json, BatchSummary, FileSummary, ScanReport, SUMMARY_FILE_NAME,
};
use anyhow::Context;
use log::{error, info};
use nvcore::telemetry::MetricsRecorder;
use nvcore::{CenterDetector, ScanDataset};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    detector: CenterDetector,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        let detector = CenterDetector::new(config.detection_params().clone())
            .context("configuring center detector")?;
        let params = detector.params();
        info!(
            "Detector: threshold factor {}, min distance {}, min peak height {}, basis {:?}",
            params.threshold_factor,
            params.min_distance,
            params
                .min_peak_height
                .map_or_else(|| "auto".to_string(), |h| h.to_string()),
            params.threshold_basis
        );
        Ok(Self { config, detector })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Detects centers in an already loaded scan.
    pub fn execute(&self, source: &str, dataset: &ScanDataset) -> ScanReport {
        let detection = self.detector.detect(dataset);
        ScanReport::new(source, dataset, detection, self.config.histogram_bins)
    }

    /// Loads, detects and (with an output directory) writes one report.
    pub fn process_file(&self, path: &Path) -> anyhow::Result<(ScanReport, Option<PathBuf>)> {
        let dataset =
            ScanDataset::load(path).with_context(|| format!("loading scan {}", path.display()))?;

        info!("  Scan center: {}", describe(dataset.center_of_scan()));
        info!("  Sweep ranges: {} um", describe(dataset.sweep_ranges()));
        info!(
            "  Resolution: {} points",
            describe(dataset.scan_points_per_axis())
        );

        let report = self.execute(&path.display().to_string(), &dataset);
        info!(
            "  Detected {} potential centers (threshold {:.3})",
            report.detection.len(),
            report.detection.threshold()
        );

        let written = match &self.config.output_dir {
            Some(dir) => {
                let target = report_path(dir, path);
                write_json(&target, &report)?;
                Some(target)
            }
            None => None,
        };
        Ok((report, written))
    }

    /// Processes every file; a failure on one file is logged and recorded in
    /// the summary and the batch moves on.
    pub fn run_batch(&self, paths: &[PathBuf]) -> anyhow::Result<BatchSummary> {
        if let Some(dir) = &self.config.output_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }

        let metrics = MetricsRecorder::new();
        let mut files = Vec::with_capacity(paths.len());
        for (idx, path) in paths.iter().enumerate() {
            info!(
                "Processing file {}/{}: {}",
                idx + 1,
                paths.len(),
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            );

            match self.process_file(path) {
                Ok((report, written)) => {
                    metrics.record_processed(report.detection.len());
                    files.push(FileSummary::succeeded(&report, written));
                }
                Err(err) => {
                    error!("  Error processing file: {:#}", err);
                    metrics.record_error();
                    files.push(FileSummary::failed(path.display().to_string(), &err));
                }
            }
        }

        let totals = metrics.snapshot();
        let summary = BatchSummary {
            files,
            processed: totals.processed,
            failed: totals.errors,
            total_centers: totals.centers,
        };

        if let Some(dir) = &self.config.output_dir {
            write_json(&dir.join(SUMMARY_FILE_NAME), &summary)?;
        }
        Ok(summary)
    }
}

fn describe(value: Option<&Value>) -> String {
    value
        .map(Value::to_string)
        .unwrap_or_else(|| "N/A".to_string())
}
