use crate::prelude::{inline_origin, path_origin, FormatError};
use ndarray::Array2;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// On-disk layout of a scan container. Every required field is optional here
/// so absence can be reported as a missing key instead of a serde error.
#[derive(Debug, Deserialize)]
struct RawContainer {
    datasets: Option<RawDatasets>,
    params: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawDatasets {
    #[serde(rename = "ScanCounts")]
    scan_counts: Option<Vec<Vec<Option<f64>>>>,
    #[serde(rename = "xSteps")]
    x_steps: Option<Vec<f64>>,
    #[serde(rename = "ySteps")]
    y_steps: Option<Vec<f64>>,
}

/// A loaded raster scan: count-rate grid (rows follow Y, columns follow X),
/// the physical axis positions in microns and the pass-through scan metadata.
#[derive(Debug, Clone)]
pub struct ScanDataset {
    counts: Array2<f64>,
    x_steps: Vec<f64>,
    y_steps: Vec<f64>,
    params: Map<String, Value>,
}

impl ScanDataset {
    /// Builds a dataset, enforcing that a non-empty grid has one x step per
    /// column and one y step per row. Missing counts are `NaN`.
    pub fn new(
        counts: Array2<f64>,
        x_steps: Vec<f64>,
        y_steps: Vec<f64>,
        params: Map<String, Value>,
    ) -> Result<Self, FormatError> {
        Self::with_origin(counts, x_steps, y_steps, params, inline_origin())
    }

    fn with_origin(
        counts: Array2<f64>,
        x_steps: Vec<f64>,
        y_steps: Vec<f64>,
        params: Map<String, Value>,
        origin: String,
    ) -> Result<Self, FormatError> {
        let (height, width) = counts.dim();
        if !counts.is_empty() {
            if x_steps.len() != width {
                return Err(FormatError::AxisLength {
                    origin,
                    axis: "xSteps",
                    found: x_steps.len(),
                    expected: width,
                });
            }
            if y_steps.len() != height {
                return Err(FormatError::AxisLength {
                    origin,
                    axis: "ySteps",
                    found: y_steps.len(),
                    expected: height,
                });
            }
        }

        Ok(Self {
            counts,
            x_steps,
            y_steps,
            params,
        })
    }

    /// Reads and validates a JSON scan container from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        let path_ref = path.as_ref();
        let origin = path_origin(path_ref);
        let contents = fs::read_to_string(path_ref).map_err(|source| FormatError::Io {
            origin: origin.clone(),
            source,
        })?;
        Self::from_json_str(&contents, origin)
    }

    /// Parses a JSON scan container; `origin` labels errors.
    pub fn from_json_str(contents: &str, origin: impl Into<String>) -> Result<Self, FormatError> {
        let origin = origin.into();
        let raw: RawContainer =
            serde_json::from_str(contents).map_err(|source| FormatError::Malformed {
                origin: origin.clone(),
                source,
            })?;
        Self::from_raw(raw, origin)
    }

    /// Same as [`ScanDataset::from_json_str`] for an already parsed document.
    pub fn from_json_value(
        document: Value,
        origin: impl Into<String>,
    ) -> Result<Self, FormatError> {
        let origin = origin.into();
        let raw: RawContainer =
            serde_json::from_value(document).map_err(|source| FormatError::Malformed {
                origin: origin.clone(),
                source,
            })?;
        Self::from_raw(raw, origin)
    }

    fn from_raw(raw: RawContainer, origin: String) -> Result<Self, FormatError> {
        let missing = |key: &'static str| FormatError::MissingKey {
            origin: origin.clone(),
            key,
        };

        let datasets = raw.datasets.ok_or_else(|| missing("datasets"))?;
        let rows = datasets
            .scan_counts
            .ok_or_else(|| missing("datasets.ScanCounts"))?;
        let x_steps = datasets.x_steps.ok_or_else(|| missing("datasets.xSteps"))?;
        let y_steps = datasets.y_steps.ok_or_else(|| missing("datasets.ySteps"))?;

        let counts = grid_from_rows(rows, &origin)?;
        Self::with_origin(
            counts,
            x_steps,
            y_steps,
            raw.params.unwrap_or_default(),
            origin,
        )
    }

    pub fn counts(&self) -> &Array2<f64> {
        &self.counts
    }

    pub fn x_steps(&self) -> &[f64] {
        &self.x_steps
    }

    pub fn y_steps(&self) -> &[f64] {
        &self.y_steps
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// `(rows, columns)` of the count grid.
    pub fn dim(&self) -> (usize, usize) {
        self.counts.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn center_of_scan(&self) -> Option<&Value> {
        self.params.get("CenterOfScan")
    }

    pub fn sweep_ranges(&self) -> Option<&Value> {
        self.params.get("sweepRanges")
    }

    pub fn scan_points_per_axis(&self) -> Option<&Value> {
        self.params.get("scanPointsPerAxis")
    }
}

fn grid_from_rows(rows: Vec<Vec<Option<f64>>>, origin: &str) -> Result<Array2<f64>, FormatError> {
    let height = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);

    if let Some((row, found)) = rows
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|&(_, len)| len != width)
    {
        return Err(FormatError::RaggedGrid {
            origin: origin.to_string(),
            row,
            found,
            expected: width,
        });
    }

    Ok(Array2::from_shape_fn((height, width), |(row, col)| {
        rows[row][col].unwrap_or(f64::NAN)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "datasets": {
            "ScanCounts": [[1.0, 2.0, null], [4.0, 5.0, 6.0]],
            "xSteps": [-1.0, 0.0, 1.0],
            "ySteps": [10.0, 12.5]
        },
        "params": {"CenterOfScan": [0.0, 11.25], "scanPointsPerAxis": 3}
    }"#;

    #[test]
    fn parses_grid_axes_and_params() {
        let dataset = ScanDataset::from_json_str(SAMPLE, "sample").unwrap();
        assert_eq!(dataset.dim(), (2, 3));
        assert_eq!(dataset.counts()[[1, 2]], 6.0);
        assert!(dataset.counts()[[0, 2]].is_nan());
        assert_eq!(dataset.x_steps(), &[-1.0, 0.0, 1.0]);
        assert_eq!(dataset.y_steps(), &[10.0, 12.5]);
        assert_eq!(dataset.scan_points_per_axis(), Some(&Value::from(3)));
        assert!(dataset.sweep_ranges().is_none());
    }

    #[test]
    fn load_reads_from_disk_and_reports_path() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(SAMPLE.as_bytes()).unwrap();
        let dataset = ScanDataset::load(temp.path()).unwrap();
        assert_eq!(dataset.dim(), (2, 3));

        let missing = temp.path().with_extension("absent");
        let err = ScanDataset::load(&missing).unwrap_err();
        assert!(matches!(err, FormatError::Io { .. }));
        assert_eq!(err.origin(), missing.display().to_string());
    }

    #[test]
    fn missing_keys_are_named() {
        let err = ScanDataset::from_json_str(r#"{"params": {}}"#, "a.json").unwrap_err();
        assert!(matches!(err, FormatError::MissingKey { key: "datasets", .. }));

        let err = ScanDataset::from_json_str(
            r#"{"datasets": {"ScanCounts": [[1.0]], "ySteps": [0.0]}}"#,
            "b.json",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FormatError::MissingKey {
                key: "datasets.xSteps",
                ..
            }
        ));
        assert!(err.to_string().starts_with("b.json"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = ScanDataset::from_json_str(
            r#"{"datasets": {"ScanCounts": [[1.0, 2.0], [3.0]], "xSteps": [0.0, 1.0], "ySteps": [0.0, 1.0]}}"#,
            "ragged",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FormatError::RaggedGrid {
                row: 1,
                found: 1,
                expected: 2,
                ..
            }
        ));
    }

    #[test]
    fn axis_length_mismatch_is_rejected() {
        let err = ScanDataset::from_json_str(
            r#"{"datasets": {"ScanCounts": [[1.0, 2.0]], "xSteps": [0.0], "ySteps": [0.0]}}"#,
            "axes",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FormatError::AxisLength {
                axis: "xSteps",
                found: 1,
                expected: 2,
                ..
            }
        ));
    }

    #[test]
    fn wrong_value_types_are_malformed() {
        let err = ScanDataset::from_json_str(
            r#"{"datasets": {"ScanCounts": [["high"]], "xSteps": [0.0], "ySteps": [0.0]}}"#,
            "types",
        )
        .unwrap_err();
        assert!(matches!(err, FormatError::Malformed { .. }));
    }

    #[test]
    fn empty_grid_skips_axis_checks() {
        let dataset = ScanDataset::from_json_str(
            r#"{"datasets": {"ScanCounts": [], "xSteps": [0.0, 1.0], "ySteps": []}}"#,
            "empty",
        )
        .unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.params().is_empty());
    }
}
