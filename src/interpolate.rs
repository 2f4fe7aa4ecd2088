//! Missing-channel reconstruction by harmonic extension over the graph.
//!
//! For observed channels `O` and missing channels `M`, the reconstruction
//! minimises the graph energy `xᵀ L x` with `x_O` held fixed:
//!
//! ```text
//! x_M = −(L_MM)⁻¹ L_MO x_O
//! ```
//!
//! which is Tikhonov regression with `τ = 0`: each reconstructed channel is
//! the weight-averaged value of its neighbours.  All time samples are solved
//! in one factorisation.
//!
//! A missing channel that has no weighted path to any observed channel has
//! no harmonic extension.  Such channels are filled with a constant and
//! reported as [`SingularSystemWarning`]s; the rest of the batch is still
//! reconstructed.
use std::collections::BTreeSet;
use std::fmt;

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::is_marker;
use crate::error::{Error, Result};
use crate::graph::AdjacencyMatrix;
use crate::laplacian::{LinalgBackend, NalgebraBackend};

/// Non-fatal report for a channel that could not be reconstructed.
#[derive(Debug, Clone, PartialEq)]
pub struct SingularSystemWarning {
    /// Row index of the affected channel.
    pub channel: usize,
    pub reason: SingularReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingularReason {
    /// No positive-weight path from this channel to an observed channel.
    Disconnected,
    /// The backend failed to factorise the reduced system.
    SolverFailed,
}

impl fmt::Display for SingularSystemWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            SingularReason::Disconnected => {
                write!(f, "channel {} is not connected to any observed channel", self.channel)
            }
            SingularReason::SolverFailed => {
                write!(f, "solver failed for the system containing channel {}", self.channel)
            }
        }
    }
}

/// Reconstructed `[C, T]` data plus any per-channel degradations.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationResult {
    pub data: Array2<f64>,
    /// Sorted, de-duplicated channels that were reconstructed (or filled).
    pub missing: Vec<usize>,
    pub warnings: Vec<SingularSystemWarning>,
}

impl InterpolationResult {
    /// `true` when every missing channel got a harmonic reconstruction.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Graph-regularised channel interpolator.
///
/// Stateless apart from its backend and fill value, so one instance can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct ChannelInterpolator<B = NalgebraBackend> {
    backend: B,
    fill_value: f64,
}

impl Default for ChannelInterpolator<NalgebraBackend> {
    fn default() -> Self {
        Self::new(NalgebraBackend)
    }
}

impl<B: LinalgBackend> ChannelInterpolator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, fill_value: 0.0 }
    }

    /// Value written to channels that cannot be reconstructed.
    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    /// Reconstruct the rows listed in `missing` from the remaining rows.
    ///
    /// # Errors
    ///
    /// * [`Error::DimensionMismatch`]: adjacency size ≠ `data.nrows()`.
    /// * [`Error::InvalidInput`]: `missing` empty, out of range, covering
    ///   every channel, or an observed row holding non-finite samples.
    pub fn interpolate(
        &self,
        data: &Array2<f64>,
        adjacency: &AdjacencyMatrix,
        missing: &[usize],
    ) -> Result<InterpolationResult> {
        let (observed, missing) = validate(data.view(), adjacency.len(), missing)?;
        Ok(self.solve(data, adjacency, &observed, &missing))
    }

    /// Detect missing rows by `marker` and reconstruct them.
    pub fn interpolate_missing(
        &self,
        data: &Array2<f64>,
        adjacency: &AdjacencyMatrix,
        marker: f64,
    ) -> Result<InterpolationResult> {
        let missing = missing_rows(data.view(), marker);
        self.interpolate(data, adjacency, &missing)
    }

    /// Reconstruct the same channels in many independent trials.
    ///
    /// Trials are processed in parallel; the output keeps input order.
    pub fn interpolate_epochs(
        &self,
        epochs: &[Array2<f64>],
        adjacency: &AdjacencyMatrix,
        missing: &[usize],
    ) -> Result<Vec<InterpolationResult>> {
        let (observed, missing) = split_indices(adjacency.len(), missing)?;
        for ep in epochs {
            validate(ep.view(), adjacency.len(), &missing)?;
        }
        Ok(epochs
            .par_iter()
            .map(|ep| self.solve(ep, adjacency, &observed, &missing))
            .collect())
    }

    fn solve(
        &self,
        data: &Array2<f64>,
        adjacency: &AdjacencyMatrix,
        observed: &[usize],
        missing: &[usize],
    ) -> InterpolationResult {
        let mut out = data.clone();
        let mut warnings = Vec::new();

        let (grounded, floating) = split_grounded(adjacency.view(), observed, missing);
        for &ch in &floating {
            warnings.push(SingularSystemWarning { channel: ch, reason: SingularReason::Disconnected });
        }

        let mut failed = Vec::new();
        if !grounded.is_empty() {
            let laplacian = self.backend.build_laplacian(adjacency);
            let x_o = data.select(Axis(0), observed);
            match self.backend.solve_harmonic(&laplacian, observed, &grounded, x_o.view()) {
                Some(x_m) => {
                    for (k, &ch) in grounded.iter().enumerate() {
                        out.row_mut(ch).assign(&x_m.row(k));
                    }
                }
                None => failed = grounded.clone(),
            }
        }
        for &ch in &failed {
            warnings.push(SingularSystemWarning { channel: ch, reason: SingularReason::SolverFailed });
        }

        for w in &warnings {
            out.row_mut(w.channel).fill(self.fill_value);
            warn!(channel = w.channel, fill = self.fill_value, "{w}");
        }
        warnings.sort_by_key(|w| w.channel);

        debug!(
            channels = data.nrows(),
            samples = data.ncols(),
            reconstructed = grounded.len() - failed.len(),
            filled = warnings.len(),
            "harmonic interpolation done"
        );
        InterpolationResult { data: out, missing: missing.to_vec(), warnings }
    }
}

/// [`ChannelInterpolator::interpolate`] with the default backend and zero fill.
///
/// # Examples
///
/// ```
/// use eegrasp::graph::AdjacencyMatrix;
/// use eegrasp::interpolate::interpolate;
/// use ndarray::array;
///
/// // Two sensors: the missing one copies its only neighbour.
/// let w = AdjacencyMatrix::from_weights(array![[0.0, 1.0], [1.0, 0.0]]).unwrap();
/// let data = array![[1.0, 2.0, 3.0], [f64::NAN, f64::NAN, f64::NAN]];
/// let res = interpolate(&data, &w, &[1]).unwrap();
/// assert_eq!(res.data.row(1).to_vec(), vec![1.0, 2.0, 3.0]);
/// ```
pub fn interpolate(
    data: &Array2<f64>,
    adjacency: &AdjacencyMatrix,
    missing: &[usize],
) -> Result<InterpolationResult> {
    ChannelInterpolator::default().interpolate(data, adjacency, missing)
}

/// Detect missing rows by `marker`, then [`interpolate`].
pub fn interpolate_missing(
    data: &Array2<f64>,
    adjacency: &AdjacencyMatrix,
    marker: f64,
) -> Result<InterpolationResult> {
    ChannelInterpolator::default().interpolate_missing(data, adjacency, marker)
}

/// Batch [`interpolate`] across independent trials.
pub fn interpolate_epochs(
    epochs: &[Array2<f64>],
    adjacency: &AdjacencyMatrix,
    missing: &[usize],
) -> Result<Vec<InterpolationResult>> {
    ChannelInterpolator::default().interpolate_epochs(epochs, adjacency, missing)
}

/// Rows whose every sample equals `marker` (NaN matches NaN).
///
/// Rows of a zero-length recording are never reported.
pub fn missing_rows(data: ArrayView2<'_, f64>, marker: f64) -> Vec<usize> {
    if data.ncols() == 0 {
        return Vec::new();
    }
    data.rows()
        .into_iter()
        .enumerate()
        .filter(|(_, row)| row.iter().all(|&v| is_marker(v, marker)))
        .map(|(i, _)| i)
        .collect()
}

/// Check shapes and indices; returns sorted `(observed, missing)`.
pub(crate) fn validate(
    data: ArrayView2<'_, f64>,
    n_nodes: usize,
    missing: &[usize],
) -> Result<(Vec<usize>, Vec<usize>)> {
    let c = data.nrows();
    if n_nodes != c {
        return Err(Error::DimensionMismatch {
            what: "graph size vs. data channels",
            expected: c,
            found: n_nodes,
        });
    }
    let (observed, missing) = split_indices(c, missing)?;
    for &i in &observed {
        if let Some(t) = data.row(i).iter().position(|v| !v.is_finite()) {
            return Err(Error::input(format!("observed channel {i} has a non-finite sample at {t}")));
        }
    }
    Ok((observed, missing))
}

/// Sorted `(observed, missing)` index sets for `c` channels.
fn split_indices(c: usize, missing: &[usize]) -> Result<(Vec<usize>, Vec<usize>)> {
    if missing.is_empty() {
        return Err(Error::input("no missing channels given"));
    }
    if let Some(&bad) = missing.iter().find(|&&i| i >= c) {
        return Err(Error::input(format!("missing channel {bad} out of range for {c} channels")));
    }
    let set: BTreeSet<usize> = missing.iter().copied().collect();
    if set.len() == c {
        return Err(Error::input("every channel is missing; nothing to interpolate from"));
    }
    let observed = (0..c).filter(|i| !set.contains(i)).collect();
    Ok((observed, set.into_iter().collect()))
}

/// Split `missing` into channels reachable from an observed channel through
/// positive-weight edges (`grounded`) and the rest (`floating`).
///
/// Each connected component of the missing-only subgraph either touches an
/// observed channel or it does not; only grounded components give a
/// non-singular `L_MM` block.
fn split_grounded(w: ArrayView2<'_, f64>, observed: &[usize], missing: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let n = w.nrows();
    let mut reached = vec![false; n];
    let mut is_missing = vec![false; n];
    for &m in missing {
        is_missing[m] = true;
    }

    // BFS from every observed node, walking only into missing nodes.
    let mut stack: Vec<usize> = Vec::new();
    for &o in observed {
        for &m in missing {
            if !reached[m] && w[[o, m]] > 0.0 {
                reached[m] = true;
                stack.push(m);
            }
        }
    }
    while let Some(u) = stack.pop() {
        for v in 0..n {
            if is_missing[v] && !reached[v] && w[[u, v]] > 0.0 {
                reached[v] = true;
                stack.push(v);
            }
        }
    }

    missing.iter().copied().partition(|&m| reached[m])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn chain4() -> AdjacencyMatrix {
        // 0 - 1 - 2    3 (isolated)
        AdjacencyMatrix::from_weights(array![
            [0.0, 1.0, 0.0, 0.0],
            [1.0, 0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn isolated_channel_filled_others_solved() {
        let nan = f64::NAN;
        let data = array![[2.0, 4.0], [nan, nan], [6.0, 0.0], [nan, nan]];
        let res = ChannelInterpolator::default()
            .with_fill_value(-1.0)
            .interpolate(&data, &chain4(), &[1, 3])
            .unwrap();
        approx::assert_abs_diff_eq!(res.data[[1, 0]], 4.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(res.data[[1, 1]], 2.0, epsilon = 1e-12);
        assert_eq!(res.data.row(3).to_vec(), vec![-1.0, -1.0]);
        assert_eq!(
            res.warnings,
            vec![SingularSystemWarning { channel: 3, reason: SingularReason::Disconnected }]
        );
        assert!(!res.is_complete());
    }

    #[test]
    fn missing_component_reached_through_missing_neighbour() {
        // 1 and 2 missing; 2 is only connected to 1, which touches 0.
        let data = array![[5.0], [f64::NAN], [f64::NAN], [1.0]];
        let res = interpolate(&data, &chain4(), &[2, 1]).unwrap();
        approx::assert_abs_diff_eq!(res.data[[1, 0]], 5.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(res.data[[2, 0]], 5.0, epsilon = 1e-12);
        assert_eq!(res.missing, vec![1, 2]);
        assert!(res.is_complete());
    }

    #[test]
    fn duplicates_collapse() {
        let data = array![[1.0], [f64::NAN], [3.0], [0.0]];
        let res = interpolate(&data, &chain4(), &[1, 1, 1]).unwrap();
        assert_eq!(res.missing, vec![1]);
        approx::assert_abs_diff_eq!(res.data[[1, 0]], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn validation_errors() {
        let data = Array2::<f64>::zeros((4, 3));
        let w = chain4();
        assert!(matches!(interpolate(&data, &w, &[]), Err(Error::InvalidInput(_))));
        assert!(matches!(interpolate(&data, &w, &[4]), Err(Error::InvalidInput(_))));
        assert!(matches!(interpolate(&data, &w, &[0, 1, 2, 3]), Err(Error::InvalidInput(_))));

        let small = Array2::<f64>::zeros((3, 3));
        assert!(matches!(
            interpolate(&small, &w, &[0]),
            Err(Error::DimensionMismatch { expected: 3, found: 4, .. })
        ));

        let mut holey = Array2::<f64>::zeros((4, 3));
        holey[[0, 1]] = f64::NAN;
        assert!(matches!(interpolate(&holey, &w, &[1]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn marker_detection() {
        let nan = f64::NAN;
        let data = array![[1.0, nan], [nan, nan], [0.0, 0.0]];
        assert_eq!(missing_rows(data.view(), nan), vec![1]);
        assert_eq!(missing_rows(data.view(), 0.0), vec![2]);
        assert!(missing_rows(Array2::<f64>::zeros((3, 0)).view(), nan).is_empty());
    }

    #[test]
    fn empty_epoch_batch() {
        let res = interpolate_epochs(&[], &chain4(), &[1]).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn empty_epoch_batch_still_checks_indices() {
        let w = chain4();
        assert!(matches!(interpolate_epochs(&[], &w, &[]), Err(Error::InvalidInput(_))));
        assert!(matches!(interpolate_epochs(&[], &w, &[9]), Err(Error::InvalidInput(_))));
        assert!(matches!(interpolate_epochs(&[], &w, &[0, 1, 2, 3]), Err(Error::InvalidInput(_))));
    }

    /// Backend whose solve never succeeds.
    struct FailingBackend;

    impl LinalgBackend for FailingBackend {
        fn solve_harmonic(
            &self,
            _laplacian: &crate::laplacian::Laplacian,
            _observed: &[usize],
            _missing: &[usize],
            _x_observed: ArrayView2<'_, f64>,
        ) -> Option<Array2<f64>> {
            None
        }
    }

    #[test]
    fn solver_failure_fills_grounded_channels() {
        let nan = f64::NAN;
        let data = array![[1.0, 2.0], [nan, nan], [3.0, 5.0], [nan, nan]];
        let res = ChannelInterpolator::new(FailingBackend)
            .with_fill_value(7.0)
            .interpolate(&data, &chain4(), &[3, 1])
            .unwrap();

        assert_eq!(res.data.row(1).to_vec(), vec![7.0, 7.0]);
        assert_eq!(res.data.row(3).to_vec(), vec![7.0, 7.0]);
        assert_eq!(res.data.row(0), data.row(0));
        assert_eq!(res.data.row(2), data.row(2));
        // Sorted by channel: 1 failed in the solve, 3 was never grounded.
        assert_eq!(
            res.warnings,
            vec![
                SingularSystemWarning { channel: 1, reason: SingularReason::SolverFailed },
                SingularSystemWarning { channel: 3, reason: SingularReason::Disconnected },
            ]
        );
    }
}
