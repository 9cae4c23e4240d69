use anyhow::Context;
use clap::{Parser, ValueEnum};
use generator::profile::{build_scan, GeneratorConfig};
use log::{info, warn};
use nvcore::ThresholdBasis;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use viewer_bridge::bridge::{bridge_bind_address, DetectionBridge};
use workflow::config::{ConfigOverrides, WorkflowConfig};
use workflow::report::{report_path, write_json};
use workflow::runner::Runner;

mod generator;
mod viewer_bridge;
mod workflow;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BasisArg {
    Raw,
    Smoothed,
}

impl From<BasisArg> for ThresholdBasis {
    fn from(arg: BasisArg) -> Self {
        match arg {
            BasisArg::Raw => ThresholdBasis::Raw,
            BasisArg::Smoothed => ThresholdBasis::Smoothed,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Detect emitter centers in confocal raster scans")]
struct Args {
    /// Scan containers (JSON) to process in order
    files: Vec<PathBuf>,
    /// Load settings from YAML; flags given below override it
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Threshold = mean + factor * std [default: 2.0]
    #[arg(long)]
    threshold_factor: Option<f64>,
    /// Minimum Chebyshev spacing between centers, in grid points [default: 5]
    #[arg(long)]
    min_distance: Option<usize>,
    /// Fixed threshold overriding the statistics
    #[arg(long)]
    min_peak_height: Option<f64>,
    /// Grid the threshold statistics are measured on [default: smoothed]
    #[arg(long, value_enum)]
    threshold_basis: Option<BasisArg>,
    /// Write per-scan reports and the batch summary here
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Histogram bins in the visualization data [default: 50]
    #[arg(long)]
    histogram_bins: Option<usize>,
    /// Run detection on a generated scan
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Keep serving results over HTTP until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value_t = 9000)]
    port: u16,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let base_config = match &args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    let workflow_config = base_config.with_overrides(ConfigOverrides {
        threshold_factor: args.threshold_factor,
        min_distance: args.min_distance,
        min_peak_height: args.min_peak_height,
        threshold_basis: args.threshold_basis.map(Into::into),
        output_dir: args.output_dir.clone(),
        histogram_bins: args.histogram_bins,
    });

    let runner = Runner::new(workflow_config)?;
    let bridge = DetectionBridge::new(Arc::new(runner.clone()));

    if args.synthetic {
        let scan = build_scan(&GeneratorConfig {
            seed: args.seed,
            ..Default::default()
        })?;
        let report = runner.execute("synthetic", &scan.dataset);
        println!(
            "Synthetic scan -> {} centers detected ({} spots generated), threshold {:.3}",
            report.detection.len(),
            scan.spots.len(),
            report.detection.threshold()
        );
        if let Some(dir) = &runner.config().output_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
            write_json(&report_path(dir, Path::new("synthetic")), &report)?;
        }
        bridge.publish_scan(&report);
    }

    if !args.files.is_empty() {
        let summary = runner.run_batch(&args.files)?;
        println!(
            "Batch -> {} processed, {} failed, {} centers",
            summary.processed, summary.failed, summary.total_centers
        );
        for file in &summary.files {
            if file.is_failure() {
                println!(
                    "  {}: error: {}",
                    file.source,
                    file.error.as_deref().unwrap_or_default()
                );
            } else {
                println!("  {}: {} centers", file.source, file.detection_count);
            }
        }
        bridge.publish_summary(&summary);
    } else if !args.synthetic && !args.serve {
        warn!("no input files given; pass scan paths, --synthetic or --serve");
    }

    if args.serve {
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for detection bridge")?;
        runtime.block_on(bridge.serve(bridge_bind_address(args.port), async {
            if signal::ctrl_c().await.is_err() {
                warn!("unable to listen for Ctrl+C; stopping bridge");
            }
        }))?;
        info!("detection bridge stopped");
    }

    Ok(())
}
