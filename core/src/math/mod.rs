pub mod interp;
pub mod stats;
pub mod window;

pub use interp::interpolate_index;
pub use stats::{Histogram, Moments, StatsHelper, UndefinedStats};
pub use window::{chebyshev_distance, max_filter, reflect_index};
