/// Unit-amplitude 2D Gaussian evaluated at a `(row, col)` offset from its center.
pub fn gaussian_spot(d_row: f64, d_col: f64, sigma: f64) -> f64 {
    let r2 = d_row * d_row + d_col * d_col;
    (-0.5 * r2 / (sigma * sigma)).exp()
}
