use serde::{Deserialize, Serialize};

/// Mean and population standard deviation of a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub mean: f64,
    pub std_dev: f64,
}

impl Moments {
    pub const ZERO: Moments = Moments {
        mean: 0.0,
        std_dev: 0.0,
    };
}

/// What [`StatsHelper::nan_moments`] reports when the moments are undefined
/// (no non-missing samples, or a NaN result such as `inf - inf`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedStats {
    /// Return NaN moments.
    Propagate,
    /// Return `(0, 0)`.
    ZeroFill,
}

/// Equal-width histogram over a closed value range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `counts.len() + 1` bin edges, ascending.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

pub struct StatsHelper;

impl StatsHelper {
    /// Mean and population standard deviation over the non-NaN samples.
    pub fn nan_moments<I>(samples: I, undefined: UndefinedStats) -> Moments
    where
        I: IntoIterator<Item = f64>,
    {
        let present: Vec<f64> = samples.into_iter().filter(|v| !v.is_nan()).collect();
        let moments = if present.is_empty() {
            Moments {
                mean: f64::NAN,
                std_dev: f64::NAN,
            }
        } else {
            let n = present.len() as f64;
            let mean = present.iter().sum::<f64>() / n;
            let variance = present.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            Moments {
                mean,
                std_dev: variance.sqrt(),
            }
        };

        match undefined {
            UndefinedStats::ZeroFill if moments.mean.is_nan() || moments.std_dev.is_nan() => {
                Moments::ZERO
            }
            _ => moments,
        }
    }

    /// Histogram of the finite samples. A degenerate range `[v, v]` is widened
    /// to `[v - 0.5, v + 0.5]`; no finite samples yields `[0, 1]` with zero counts.
    pub fn histogram<I>(samples: I, bins: usize) -> Histogram
    where
        I: IntoIterator<Item = f64>,
    {
        let bins = bins.max(1);
        let finite: Vec<f64> = samples.into_iter().filter(|v| v.is_finite()).collect();

        let (mut low, mut high) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if finite.is_empty() {
            low = 0.0;
            high = 1.0;
        } else if low == high {
            low -= 0.5;
            high += 0.5;
        }

        // Halved bounds keep the span finite for ranges wider than f64::MAX.
        let half_low = low / 2.0;
        let half_span = high / 2.0 - half_low;
        let edges = (0..=bins)
            .map(|i| {
                let t = i as f64 / bins as f64;
                low * (1.0 - t) + high * t
            })
            .collect();
        let mut counts = vec![0usize; bins];
        for value in finite {
            let fraction = (value / 2.0 - half_low) / half_span;
            // The last bin is closed on the right.
            let bin = ((fraction * bins as f64) as usize).min(bins - 1);
            counts[bin] += 1;
        }

        Histogram { edges, counts }
    }
}
