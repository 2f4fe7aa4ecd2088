//! Thresholded Gaussian-kernel graphs over a sensor montage.
//!
//! ```text
//! W[i, j] = exp(−D[i, j]² / (2σ²))   if D[i, j] ≤ ε
//!         = 0                        otherwise
//! W[i, i] = 0
//! ```
//!
//! Reference: D. I. Shuman et al., "The emerging field of signal processing
//! on graphs", IEEE Signal Processing Magazine 30(3), 2013.
use ndarray::{Array1, Array2, ArrayView2, Axis};
use tracing::debug;

use crate::distance::{check_square, DistanceMatrix};
use crate::error::{Error, Result};
use crate::params::{resolve, GraphParams, ParameterStrategy};

/// `N × N` symmetric, non-negative weight matrix with zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyMatrix(Array2<f64>);

impl AdjacencyMatrix {
    /// Wrap a precomputed weight matrix.
    ///
    /// The matrix must be square, finite, non-negative and exactly
    /// symmetric.  Self-loops are dropped (diagonal set to zero).
    pub fn from_weights(mut w: Array2<f64>) -> Result<Self> {
        check_square(&w, "adjacency matrix")?;
        let n = w.nrows();
        for i in 0..n {
            for j in i..n {
                let v = w[[i, j]];
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::input(format!("weight [{i}, {j}] = {v} is not a finite non-negative value")));
                }
                if v != w[[j, i]] {
                    return Err(Error::input(format!("adjacency matrix is not symmetric at [{i}, {j}]")));
                }
            }
        }
        w.diag_mut().fill(0.0);
        Ok(Self(w))
    }

    /// Number of nodes.
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

    /// Weighted degree of every node (row sums).
    pub fn degrees(&self) -> Array1<f64> {
        self.0.sum_axis(Axis(1))
    }

    /// Edges with positive weight, upper triangle only: `(i, j, w)` with `i < j`.
    pub fn edges(&self) -> Vec<(usize, usize, f64)> {
        let n = self.len();
        let mut out = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let w = self.0[[i, j]];
                if w > 0.0 {
                    out.push((i, j, w));
                }
            }
        }
        out
    }

    /// Number of undirected edges with positive weight.
    pub fn n_edges(&self) -> usize {
        self.edges().len()
    }

    /// Nodes with zero degree.
    pub fn isolated_nodes(&self) -> Vec<usize> {
        self.degrees()
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0.0)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Gaussian weighting `exp(−x² / (2σ²))`.
#[inline]
pub fn gaussian_kernel(x: f64, sigma: f64) -> f64 {
    (-(x * x) / (2.0 * sigma * sigma)).exp()
}

/// Build the thresholded Gaussian graph from a distance matrix.
///
/// Fails with [`Error::InvalidParameter`] unless `epsilon > 0` and
/// `0 < sigma < ∞`.  Sensors farther than `epsilon` from every other sensor
/// become isolated nodes, which is legal.
///
/// # Examples
///
/// ```
/// use eegrasp::distance::compute_distance;
/// use eegrasp::graph::compute_graph;
/// use ndarray::array;
///
/// let d = compute_distance(array![[0.0, 0.0], [1.0, 0.0], [5.0, 0.0]].view()).unwrap();
/// let w = compute_graph(&d, 1.5, 1.0).unwrap();
/// assert!(w.view()[[0, 1]] > 0.0);
/// assert_eq!(w.view()[[0, 2]], 0.0);   // beyond epsilon
/// assert_eq!(w.isolated_nodes(), vec![2]);
/// ```
pub fn compute_graph(distance: &DistanceMatrix, epsilon: f64, sigma: f64) -> Result<AdjacencyMatrix> {
    GraphParams::new(epsilon, sigma)?;
    let d = distance.view();
    let n = d.nrows();
    let mut w = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let dij = d[[i, j]];
            if dij <= epsilon {
                let v = gaussian_kernel(dij, sigma);
                w[[i, j]] = v;
                w[[j, i]] = v;
            }
        }
    }
    let adj = AdjacencyMatrix(w);
    debug!(nodes = n, edges = adj.n_edges(), epsilon, sigma, "built gaussian graph");
    Ok(adj)
}

/// [`compute_graph`] with parameters chosen by `strategy`.
pub fn compute_graph_with(
    distance: &DistanceMatrix,
    strategy: &dyn ParameterStrategy,
) -> Result<(AdjacencyMatrix, GraphParams)> {
    let p = resolve(None, None, distance, strategy)?;
    Ok((compute_graph(distance, p.epsilon, p.sigma)?, p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::compute_distance;
    use ndarray::array;

    #[test]
    fn kernel_at_zero_is_one() {
        assert_eq!(gaussian_kernel(0.0, 0.3), 1.0);
        approx::assert_abs_diff_eq!(gaussian_kernel(1.0, 1.0), (-0.5f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn coincident_sensors_fully_connected() {
        let d = compute_distance(array![[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]].view()).unwrap();
        let w = compute_graph(&d, 0.1, 0.1).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 0.0 } else { 1.0 };
                assert_eq!(w.view()[[i, j]], expected);
            }
        }
    }

    #[test]
    fn bad_parameters_rejected() {
        let d = compute_distance(array![[0.0, 0.0], [1.0, 0.0]].view()).unwrap();
        assert!(matches!(compute_graph(&d, 0.0, 1.0), Err(Error::InvalidParameter(_))));
        assert!(matches!(compute_graph(&d, 1.0, 0.0), Err(Error::InvalidParameter(_))));
        assert!(matches!(compute_graph(&d, -1.0, 1.0), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn from_weights_drops_self_loops() {
        let w = AdjacencyMatrix::from_weights(array![[3.0, 0.5], [0.5, 1.0]]).unwrap();
        assert_eq!(w.view()[[0, 0]], 0.0);
        assert_eq!(w.view()[[1, 1]], 0.0);
        assert_eq!(w.edges(), vec![(0, 1, 0.5)]);
    }

    #[test]
    fn from_weights_rejects_negative_and_asymmetric() {
        assert!(AdjacencyMatrix::from_weights(array![[0.0, -0.5], [-0.5, 0.0]]).is_err());
        assert!(AdjacencyMatrix::from_weights(array![[0.0, 0.5], [0.4, 0.0]]).is_err());
        assert!(AdjacencyMatrix::from_weights(array![[0.0, f64::NAN], [f64::NAN, 0.0]]).is_err());
    }
}
