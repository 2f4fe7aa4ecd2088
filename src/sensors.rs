//! Electrode montage: ordered channel names with their coordinates.
use std::collections::HashSet;

use ndarray::{Array2, ArrayView2};

use crate::distance::{compute_distance, DistanceMatrix};
use crate::error::{Error, Result};

/// Ordered set of `N` sensors, each with a 2-D or 3-D position.
///
/// Row `i` of [`positions`](Self::positions) belongs to `names()[i]`, and the
/// same index addresses channel `i` of every data matrix used with this
/// montage.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSet {
    names: Vec<String>,
    positions: Array2<f64>,
}

impl SensorSet {
    /// Build a montage from names and an `[N, D]` position array.
    ///
    /// Fails with [`Error::InvalidInput`] if fewer than two sensors are
    /// given, names are duplicated (after normalisation), `D ∉ {2, 3}`, or a
    /// coordinate is not finite.
    pub fn new(names: Vec<String>, positions: Array2<f64>) -> Result<Self> {
        let n = positions.nrows();
        if names.len() != n {
            return Err(Error::DimensionMismatch {
                what: "sensor names vs. position rows",
                expected: n,
                found: names.len(),
            });
        }
        validate_positions(positions.view())?;

        let mut seen = HashSet::with_capacity(n);
        for name in &names {
            if !seen.insert(normalize_name(name)) {
                return Err(Error::input(format!("duplicate sensor name {name:?}")));
            }
        }
        Ok(Self { names, positions })
    }

    /// Build a montage from per-sensor coordinate rows.
    ///
    /// Rows of different length are rejected with [`Error::InvalidInput`].
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let d = rows.first().map_or(0, Vec::len);
        if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != d) {
            return Err(Error::input(format!(
                "sensor {i} has {} coordinates, expected {d}",
                r.len()
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let positions = Array2::from_shape_vec((rows.len(), d), flat)
            .map_err(|e| Error::input(e.to_string()))?;
        Self::new(names, positions)
    }

    /// Number of sensors.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false`: a valid montage holds at least two sensors.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Coordinate dimensionality (2 or 3).
    pub fn dim(&self) -> usize {
        self.positions.ncols()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `[N, D]` positions.
    pub fn positions(&self) -> ArrayView2<'_, f64> {
        self.positions.view()
    }

    /// Index of `name`.
    ///
    /// Matching is case-insensitive and ignores spaces, so `"fp 1"` finds
    /// `"Fp1"`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let key = normalize_name(name);
        self.names.iter().position(|n| normalize_name(n) == key)
    }

    /// Resolve several names to indices, failing on the first unknown one.
    pub fn indices_of<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|s| {
                let s = s.as_ref();
                self.index_of(s)
                    .ok_or_else(|| Error::input(format!("unknown sensor {s:?}")))
            })
            .collect()
    }

    /// Pairwise Euclidean distances between all sensors.
    pub fn distance_matrix(&self) -> Result<DistanceMatrix> {
        compute_distance(self.positions.view())
    }
}

/// Shared checks for `[N, D]` coordinate arrays.
pub(crate) fn validate_positions(positions: ArrayView2<'_, f64>) -> Result<()> {
    let (n, d) = positions.dim();
    if n < 2 {
        return Err(Error::input(format!("need at least 2 sensors, got {n}")));
    }
    if d != 2 && d != 3 {
        return Err(Error::input(format!("sensor coordinates must be 2-D or 3-D, got {d}-D")));
    }
    if let Some(((i, j), v)) = positions.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(Error::input(format!("sensor {i} coordinate {j} is not finite ({v})")));
    }
    Ok(())
}

fn normalize_name(s: &str) -> String {
    s.replace(' ', "").to_lowercase()
}
