use crate::math::interp::interpolate_index;
use crate::scan_interface::dataset::ScanDataset;
use crate::scan_interface::detection::PeakIndex;

/// Maps grid indices onto the scan's physical axes (microns).
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper<'a> {
    x_steps: &'a [f64],
    y_steps: &'a [f64],
}

impl<'a> CoordinateMapper<'a> {
    pub fn new(x_steps: &'a [f64], y_steps: &'a [f64]) -> Self {
        Self { x_steps, y_steps }
    }

    pub fn for_dataset(dataset: &'a ScanDataset) -> Self {
        Self::new(dataset.x_steps(), dataset.y_steps())
    }

    /// `(x, y)` for a fractional `(row, col)` position, e.g. a sub-pixel fit.
    pub fn position_at(&self, row: f64, col: f64) -> (f64, f64) {
        (
            interpolate_index(col, self.x_steps),
            interpolate_index(row, self.y_steps),
        )
    }

    pub fn position(&self, index: PeakIndex) -> (f64, f64) {
        self.position_at(index.row as f64, index.col as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_axes_round_trip_indices() {
        let steps: Vec<f64> = (0..8).map(f64::from).collect();
        let mapper = CoordinateMapper::new(&steps, &steps);
        for col in 0..8 {
            let (x, y) = mapper.position(PeakIndex::new(7 - col, col));
            assert_eq!(x, col as f64);
            assert_eq!(y, (7 - col) as f64);
        }
    }

    #[test]
    fn columns_map_to_x_and_rows_to_y() {
        let x_steps = [-5.0, -4.0, -3.0];
        let y_steps = [20.0, 20.5];
        let mapper = CoordinateMapper::new(&x_steps, &y_steps);
        assert_eq!(mapper.position(PeakIndex::new(1, 2)), (-3.0, 20.5));
        assert_eq!(mapper.position_at(0.5, 1.5), (-3.5, 20.25));
    }
}
