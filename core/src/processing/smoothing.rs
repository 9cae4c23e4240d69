use crate::math::window::reflect_index;
use ndarray::{Array2, ArrayView2, Axis, Zip};

/// Spatial scale of the noise-suppression blur, in grid units.
pub const SMOOTHING_SIGMA: f64 = 1.0;

/// Kernel half-width in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Separable isotropic Gaussian blur with mirror-reflect borders.
///
/// Missing (`NaN`) samples are excluded by normalized convolution: every
/// output cell is the kernel-weighted mean of the present samples under the
/// kernel. Cells whose kernel footprint holds no present sample become `0.0`,
/// so the output never contains `NaN`.
#[derive(Debug, Clone)]
pub struct GaussianSmoother {
    kernel: Vec<f64>,
    radius: usize,
}

impl Default for GaussianSmoother {
    fn default() -> Self {
        Self::new(SMOOTHING_SIGMA)
    }
}

impl GaussianSmoother {
    /// `sigma` must be positive.
    pub fn new(sigma: f64) -> Self {
        let radius = (TRUNCATE * sigma + 0.5) as usize;
        let raw: Vec<f64> = (0..=2 * radius)
            .map(|k| {
                let offset = k as f64 - radius as f64;
                (-0.5 * offset * offset / (sigma * sigma)).exp()
            })
            .collect();
        let total: f64 = raw.iter().sum();
        let kernel = raw.into_iter().map(|w| w / total).collect();
        Self { kernel, radius }
    }

    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn smooth(&self, grid: ArrayView2<f64>) -> Array2<f64> {
        if grid.is_empty() {
            return grid.to_owned();
        }

        if !grid.iter().any(|v| v.is_nan()) {
            return self.convolve(grid);
        }

        let present = grid.mapv(|v| if v.is_nan() { 0.0 } else { 1.0 });
        let filled = grid.mapv(|v| if v.is_nan() { 0.0 } else { v });
        let weighted = self.convolve(filled.view());
        let support = self.convolve(present.view());

        let mut output = Array2::zeros(grid.raw_dim());
        Zip::from(&mut output)
            .and(&weighted)
            .and(&support)
            .for_each(|out, &value, &weight| {
                *out = if weight > 0.0 { value / weight } else { 0.0 };
            });
        output
    }

    fn convolve(&self, grid: ArrayView2<f64>) -> Array2<f64> {
        let along_rows = self.convolve_along(grid, Axis(1));
        self.convolve_along(along_rows.view(), Axis(0))
    }

    fn convolve_along(&self, grid: ArrayView2<f64>, axis: Axis) -> Array2<f64> {
        let mut output = Array2::zeros(grid.raw_dim());
        let radius = self.radius as isize;
        for (lane_in, mut lane_out) in grid.lanes(axis).into_iter().zip(output.lanes_mut(axis)) {
            let len = lane_in.len();
            for idx in 0..len {
                lane_out[idx] = self
                    .kernel
                    .iter()
                    .enumerate()
                    .map(|(k, weight)| {
                        let source = idx as isize + k as isize - radius;
                        weight * lane_in[reflect_index(source, len)]
                    })
                    .sum();
            }
        }
        output
    }
}
