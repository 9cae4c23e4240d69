/// Piecewise-linear interpolation of a (possibly fractional) index into
/// `samples`, where sample `i` sits at index `i`. Positions outside
/// `[0, len - 1]` clamp to the end samples. Returns NaN for an empty
/// sample set or a NaN position.
pub fn interpolate_index(position: f64, samples: &[f64]) -> f64 {
    let Some(&last) = samples.last() else {
        return f64::NAN;
    };
    if position.is_nan() {
        return f64::NAN;
    }
    if position <= 0.0 {
        return samples[0];
    }
    let upper_index = samples.len() - 1;
    if position >= upper_index as f64 {
        return last;
    }

    let lower = position.floor() as usize;
    let fraction = position - lower as f64;
    if fraction == 0.0 {
        return samples[lower];
    }
    samples[lower] + (samples[lower + 1] - samples[lower]) * fraction
}
