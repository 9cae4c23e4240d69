use crate::generator::template::gaussian_spot;
use anyhow::{bail, Context};
use ndarray::Array2;
use nvcore::ScanDataset;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Configuration for generating a synthetic raster scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub width: usize,
    pub height: usize,
    /// Spacing between scan points, microns.
    pub step_um: f64,
    /// Scan center `[x, y]`, microns.
    pub origin_um: [f64; 2],
    pub spot_count: usize,
    /// Peak count rate of each spot above background.
    pub amplitude: f64,
    /// Spot width in grid units.
    pub spot_sigma: f64,
    pub background: f64,
    /// Half-width of the uniform noise added to every point.
    pub noise: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            step_um: 0.1,
            origin_um: [0.0, 0.0],
            spot_count: 5,
            amplitude: 400.0,
            spot_sigma: 1.5,
            background: 50.0,
            noise: 5.0,
            seed: 0,
        }
    }
}

/// Upper bound on `width * height` for one generated scan.
pub const MAX_GENERATED_POINTS: usize = 2048 * 2048;
pub const MAX_GENERATED_SPOTS: usize = 256;

impl GeneratorConfig {
    /// Rejects settings that cannot produce a finite, reasonably sized grid.
    pub fn validate(&self) -> anyhow::Result<()> {
        let scalars = [
            ("step_um", self.step_um),
            ("origin_um[0]", self.origin_um[0]),
            ("origin_um[1]", self.origin_um[1]),
            ("amplitude", self.amplitude),
            ("background", self.background),
            ("noise", self.noise),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                bail!("generator {} must be finite, got {}", name, value);
            }
        }
        // Noise is drawn from `[-noise, noise)`, whose span must stay finite.
        if !(2.0 * self.noise).is_finite() {
            bail!("generator noise {} is too large", self.noise);
        }
        if !(self.spot_sigma.is_finite() && self.spot_sigma > 0.0) {
            bail!(
                "generator spot_sigma must be positive and finite, got {}",
                self.spot_sigma
            );
        }
        if self.spot_count > MAX_GENERATED_SPOTS {
            bail!(
                "generator spot_count {} exceeds {}",
                self.spot_count,
                MAX_GENERATED_SPOTS
            );
        }
        let points = self
            .normalized_width()
            .checked_mul(self.normalized_height())
            .context("overflow computing point count for generator")?;
        if points > MAX_GENERATED_POINTS {
            bail!(
                "generator grid {}x{} exceeds {} points",
                self.normalized_width(),
                self.normalized_height(),
                MAX_GENERATED_POINTS
            );
        }
        Ok(())
    }

    fn normalized_width(&self) -> usize {
        self.width.max(1)
    }

    fn normalized_height(&self) -> usize {
        self.height.max(1)
    }
}

/// A generated scan together with the true spot centers `(row, col)`.
#[derive(Debug)]
pub struct SyntheticScan {
    pub dataset: ScanDataset,
    pub spots: Vec<(f64, f64)>,
}

fn axis_steps(len: usize, step: f64, center: f64) -> Vec<f64> {
    let half = (len as f64 - 1.0) / 2.0;
    (0..len)
        .map(|i| center + (i as f64 - half) * step)
        .collect()
}

pub fn build_scan(config: &GeneratorConfig) -> anyhow::Result<SyntheticScan> {
    config.validate()?;
    let width = config.normalized_width();
    let height = config.normalized_height();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let spots: Vec<(f64, f64)> = (0..config.spot_count)
        .map(|_| {
            (
                rng.gen_range(0.0..height as f64),
                rng.gen_range(0.0..width as f64),
            )
        })
        .collect();

    let mut counts = Array2::zeros((height, width));
    for ((row, col), value) in counts.indexed_iter_mut() {
        let signal: f64 = spots
            .iter()
            .map(|&(spot_row, spot_col)| {
                config.amplitude
                    * gaussian_spot(row as f64 - spot_row, col as f64 - spot_col, config.spot_sigma)
            })
            .sum();
        let jitter = if config.noise > 0.0 {
            rng.gen_range(-config.noise..config.noise)
        } else {
            0.0
        };
        *value = (config.background + signal + jitter).max(0.0);
    }

    let x_steps = axis_steps(width, config.step_um, config.origin_um[0]);
    let y_steps = axis_steps(height, config.step_um, config.origin_um[1]);

    let mut params = Map::new();
    params.insert("CenterOfScan".into(), json!(config.origin_um));
    params.insert(
        "sweepRanges".into(),
        json!([
            (width - 1) as f64 * config.step_um,
            (height - 1) as f64 * config.step_um
        ]),
    );
    params.insert("scanPointsPerAxis".into(), json!([width, height]));
    params.insert("synthetic".into(), Value::Bool(true));

    let dataset = ScanDataset::new(counts, x_steps, y_steps, params)
        .context("assembling synthetic scan")?;
    Ok(SyntheticScan { dataset, spots })
}
