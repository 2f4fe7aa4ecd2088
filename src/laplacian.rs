//! Graph Laplacian and the linear-algebra backend used to solve on it.
//!
//! The interpolator only needs two operations: build `L = Deg − W`, and solve
//! the harmonic-extension system `L_MM x_M = −L_MO x_O`.  Both sit behind
//! [`LinalgBackend`] so the solver can be swapped without touching the graph
//! or interpolation code.  [`NalgebraBackend`] is the default.
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2, Axis};

use crate::graph::AdjacencyMatrix;

/// Combinatorial Laplacian `L = Deg − W`.
#[derive(Debug, Clone, PartialEq)]
pub struct Laplacian(Array2<f64>);

impl Laplacian {
    pub fn from_adjacency(adjacency: &AdjacencyMatrix) -> Self {
        let w = adjacency.view();
        let deg = w.sum_axis(Axis(1));
        let mut l = w.mapv(|v| -v);
        for (i, d) in deg.iter().enumerate() {
            l[[i, i]] = *d;
        }
        Self(l)
    }

    pub fn len(&self) -> usize {
        self.0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.0.view()
    }

    /// Dirichlet energy `Σ_t x_tᵀ L x_t` of a `[N, T]` signal.
    pub fn energy(&self, x: ArrayView2<'_, f64>) -> f64 {
        let lx = self.0.dot(&x);
        (&lx * &x).sum()
    }
}

/// Linear-algebra operations required by the interpolator.
pub trait LinalgBackend: Send + Sync {
    fn build_laplacian(&self, adjacency: &AdjacencyMatrix) -> Laplacian {
        Laplacian::from_adjacency(adjacency)
    }

    /// Solve `L_MM x_M = −L_MO x_O` for every column of `x_observed`.
    ///
    /// `x_observed` is `[|observed|, T]`, rows ordered like `observed`.
    /// Returns `[|missing|, T]` rows ordered like `missing`, or `None` when the
    /// system cannot be solved.
    fn solve_harmonic(
        &self,
        laplacian: &Laplacian,
        observed: &[usize],
        missing: &[usize],
        x_observed: ArrayView2<'_, f64>,
    ) -> Option<Array2<f64>>;
}

/// Dense solver on `nalgebra`: Cholesky, then LU.
///
/// `L_MM` is symmetric positive definite whenever every missing channel is
/// connected to an observed one, so Cholesky succeeds on well-posed input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NalgebraBackend;

impl LinalgBackend for NalgebraBackend {
    fn solve_harmonic(
        &self,
        laplacian: &Laplacian,
        observed: &[usize],
        missing: &[usize],
        x_observed: ArrayView2<'_, f64>,
    ) -> Option<Array2<f64>> {
        let l = laplacian.view();
        let (m, o, t) = (missing.len(), observed.len(), x_observed.ncols());
        if m == 0 {
            return Some(Array2::zeros((0, t)));
        }

        let l_mm = DMatrix::from_fn(m, m, |r, c| l[[missing[r], missing[c]]]);
        let l_mo = DMatrix::from_fn(m, o, |r, c| l[[missing[r], observed[c]]]);
        let x_o = DMatrix::from_fn(o, t, |r, c| x_observed[[r, c]]);
        let rhs = -(l_mo * x_o);

        let x_m = match l_mm.clone().cholesky() {
            Some(chol) => chol.solve(&rhs),
            None => l_mm.lu().solve(&rhs)?,
        };
        if x_m.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Array2::from_shape_fn((m, t), |(r, c)| x_m[(r, c)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn path3() -> AdjacencyMatrix {
        // 0 -(1.0)- 1 -(2.0)- 2
        AdjacencyMatrix::from_weights(array![[0.0, 1.0, 0.0], [1.0, 0.0, 2.0], [0.0, 2.0, 0.0]]).unwrap()
    }

    #[test]
    fn laplacian_rows_sum_to_zero() {
        let l = NalgebraBackend.build_laplacian(&path3());
        assert_eq!(l.view(), array![[1.0, -1.0, 0.0], [-1.0, 3.0, -2.0], [0.0, -2.0, 2.0]]);
        for row in l.view().rows() {
            approx::assert_abs_diff_eq!(row.sum(), 0.0);
        }
    }

    #[test]
    fn middle_node_is_weighted_mean() {
        let l = NalgebraBackend.build_laplacian(&path3());
        let x_o = array![[3.0, 0.0], [6.0, 3.0]];
        let x_m = NalgebraBackend.solve_harmonic(&l, &[0, 2], &[1], x_o.view()).unwrap();
        // (1·3 + 2·6) / 3 = 5 ; (1·0 + 2·3) / 3 = 2
        approx::assert_abs_diff_eq!(x_m[[0, 0]], 5.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(x_m[[0, 1]], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn ungrounded_block_is_unsolvable() {
        let w = AdjacencyMatrix::from_weights(array![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]]).unwrap();
        let l = NalgebraBackend.build_laplacian(&w);
        let x_o = array![[1.0], [2.0]];
        assert!(NalgebraBackend.solve_harmonic(&l, &[0, 1], &[2], x_o.view()).is_none());
    }

    #[test]
    fn constant_signal_has_zero_energy() {
        let l = NalgebraBackend.build_laplacian(&path3());
        let x = Array2::from_elem((3, 4), 2.5);
        approx::assert_abs_diff_eq!(l.energy(x.view()), 0.0, epsilon = 1e-12);
    }
}
