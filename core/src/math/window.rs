use ndarray::{Array2, ArrayView2, Axis};

/// Maps an out-of-range index onto `0..len` by mirror reflection about the
/// outer sample edges (`d c b a | a b c d | d c b a`), repeating as needed.
pub fn reflect_index(index: isize, len: usize) -> usize {
    debug_assert!(len > 0);
    let period = 2 * len as isize;
    let wrapped = index.rem_euclid(period) as usize;
    if wrapped < len {
        wrapped
    } else {
        2 * len - 1 - wrapped
    }
}

/// Chebyshev (chessboard) distance between two grid cells.
pub fn chebyshev_distance(a: (usize, usize), b: (usize, usize)) -> usize {
    a.0.abs_diff(b.0).max(a.1.abs_diff(b.1))
}

/// Maximum over the square window of the given radius around each cell.
/// The window is clipped at the grid borders.
pub fn max_filter(grid: ArrayView2<f64>, radius: usize) -> Array2<f64> {
    let rows_done = max_along(grid, radius, Axis(1));
    max_along(rows_done.view(), radius, Axis(0))
}

fn max_along(grid: ArrayView2<f64>, radius: usize, axis: Axis) -> Array2<f64> {
    let mut output = Array2::from_elem(grid.raw_dim(), f64::NEG_INFINITY);
    for (lane_in, mut lane_out) in grid.lanes(axis).into_iter().zip(output.lanes_mut(axis)) {
        let len = lane_in.len();
        for idx in 0..len {
            let start = idx.saturating_sub(radius);
            let end = (idx + radius + 1).min(len);
            lane_out[idx] = (start..end)
                .map(|k| lane_in[k])
                .fold(f64::NEG_INFINITY, f64::max);
        }
    }
    output
}
