//! Pairwise Euclidean distances between sensors.
//!
//! `D[i, j] = ‖p_i − p_j‖₂`, computed once per unordered pair and mirrored so
//! the result is exactly symmetric with an exact zero diagonal.
use ndarray::{Array2, ArrayView2};

use crate::error::{Error, Result};
use crate::sensors::validate_positions;

/// `N × N` symmetric, non-negative distance matrix with zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix(Array2<f64>);

impl DistanceMatrix {
    /// Wrap a caller-supplied matrix after checking it is square, finite,
    /// non-negative, symmetric and zero on the diagonal.
    pub fn from_array(d: Array2<f64>) -> Result<Self> {
        check_square(&d, "distance matrix")?;
        let n = d.nrows();
        for i in 0..n {
            if d[[i, i]] != 0.0 {
                return Err(Error::input(format!("distance diagonal [{i}, {i}] is {}", d[[i, i]])));
            }
            for j in (i + 1)..n {
                let v = d[[i, j]];
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::input(format!("distance [{i}, {j}] = {v} is not a finite non-negative value")));
                }
                if v != d[[j, i]] {
                    return Err(Error::input(format!("distance matrix is not symmetric at [{i}, {j}]")));
                }
            }
        }
        Ok(Self(d))
    }

    /// Number of sensors.
    pub fn len(&self) -> usize {
        self.0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.0.view()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.0
    }

    /// Largest pairwise distance.
    pub fn max(&self) -> f64 {
        self.0.iter().copied().fold(0.0, f64::max)
    }

    /// Strict upper triangle, row-major: `D[0,1], D[0,2], …, D[N-2,N-1]`.
    pub fn upper_triangle(&self) -> Vec<f64> {
        let n = self.len();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                out.push(self.0[[i, j]]);
            }
        }
        out
    }

    /// Distances rescaled to `[0, 1]` by dividing by the maximum.
    ///
    /// The minimum is always the zero diagonal, so this equals min-max
    /// scaling.  A matrix of coincident sensors (all zeros) is returned as-is.
    pub fn normalized(&self) -> Self {
        let max = self.max();
        if max > 0.0 {
            Self(self.0.mapv(|v| v / max))
        } else {
            self.clone()
        }
    }
}

/// Pairwise Euclidean distances for an `[N, D]` coordinate array.
///
/// `D` must be 2 or 3 and `N ≥ 2`; every coordinate must be finite.
///
/// # Examples
///
/// ```
/// use eegrasp::distance::compute_distance;
/// use ndarray::array;
///
/// let d = compute_distance(array![[0.0, 0.0], [3.0, 4.0]].view()).unwrap();
/// assert_eq!(d.view()[[0, 1]], 5.0);
/// assert_eq!(d.view()[[1, 0]], 5.0);
/// ```
pub fn compute_distance(positions: ArrayView2<'_, f64>) -> Result<DistanceMatrix> {
    validate_positions(positions)?;
    Ok(DistanceMatrix(euclidean_pairwise(positions)))
}

/// Row-by-row Euclidean distances for any number of columns.
///
/// Used for sensor positions and for whole signals (each channel's time
/// series treated as a point), so no dimensionality check is made here.
pub(crate) fn euclidean_pairwise(points: ArrayView2<'_, f64>) -> Array2<f64> {
    let n = points.nrows();
    let mut d = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let pi = points.row(i);
        for j in (i + 1)..n {
            let pj = points.row(j);
            let sq: f64 = pi.iter().zip(pj.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
            let v = sq.sqrt();
            d[[i, j]] = v;
            d[[j, i]] = v;
        }
    }
    d
}

/// Wrap an already-symmetric result of [`euclidean_pairwise`].
pub(crate) fn from_pairwise(d: Array2<f64>) -> DistanceMatrix {
    DistanceMatrix(d)
}

pub(crate) fn check_square(m: &Array2<f64>, what: &'static str) -> Result<()> {
    let (r, c) = m.dim();
    if r != c {
        return Err(Error::DimensionMismatch { what, expected: r, found: c });
    }
    Ok(())
}
