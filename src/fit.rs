//! Kernel-parameter search by leave-channel-out reconstruction.
//!
//! The masked channels' true signal is hidden, reconstructed from a graph
//! built with each candidate value, and compared with the truth.  The
//! candidate with the smallest reconstruction error wins.
//!
//! * [`fit_epsilon`]: sweeps every distinct pairwise distance as threshold.
//! * [`fit_sigma`]: sweeps a regular grid of kernel widths.
//!
//! Candidates that leave a masked channel disconnected are dropped.
use ndarray::{Array2, Axis};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};
use crate::graph::{compute_graph, AdjacencyMatrix};
use crate::interpolate::{validate, ChannelInterpolator};
use crate::params::GraphParams;

/// Outcome of a parameter sweep.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Candidates that produced a complete reconstruction, in sweep order.
    pub values: Vec<f64>,
    /// Frobenius norm of `truth − reconstruction` over the masked rows.
    pub errors: Vec<f64>,
    pub best: f64,
    pub best_error: f64,
    /// Input data with the masked rows replaced by the best reconstruction.
    pub signal: Array2<f64>,
    /// Graph built with the best value.
    pub adjacency: AdjacencyMatrix,
}

/// Upper bound on the number of σ candidates in one sweep.
pub const MAX_GRID_POINTS: usize = 100_000;

/// Regular grid `min, min + step, …` strictly below `max` (NumPy `arange`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmaGrid {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for SigmaGrid {
    /// `0.1, 0.2, …, 0.9`.
    fn default() -> Self {
        Self { min: 0.1, max: 1.0, step: 0.1 }
    }
}

impl SigmaGrid {
    pub fn values(&self) -> Result<Vec<f64>> {
        if !(self.min > 0.0 && self.min.is_finite()) {
            return Err(Error::param(format!("sigma grid min must be > 0, got {}", self.min)));
        }
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(Error::param(format!("sigma grid step must be > 0, got {}", self.step)));
        }
        if !(self.max > self.min && self.max.is_finite()) {
            return Err(Error::param(format!(
                "sigma grid max ({}) must exceed min ({})",
                self.max, self.min
            )));
        }
        let n = ((self.max - self.min) / self.step).ceil();
        if !(n.is_finite() && n <= MAX_GRID_POINTS as f64) {
            return Err(Error::param(format!(
                "sigma grid from {} to {} with step {} exceeds {MAX_GRID_POINTS} values",
                self.min, self.max, self.step
            )));
        }
        let n = n as usize;
        Ok((0..n).map(|i| self.min + i as f64 * self.step).collect())
    }
}

/// Find the distance threshold that best reconstructs `missing`.
///
/// Every distinct positive pairwise distance is tried as `epsilon`, with a
/// fixed kernel width `sigma`.  `data` holds the *true* signal of every
/// channel, the masked rows included.
pub fn fit_epsilon(
    data: &Array2<f64>,
    distance: &DistanceMatrix,
    sigma: f64,
    missing: &[usize],
) -> Result<FitResult> {
    GraphParams::new(1.0, sigma)?;
    let mut candidates: Vec<f64> = distance.upper_triangle().into_iter().filter(|&v| v > 0.0).collect();
    candidates.sort_by(f64::total_cmp);
    candidates.dedup();
    sweep("epsilon", data, distance, missing, candidates, |eps| compute_graph(distance, eps, sigma))
}

/// Find the kernel width that best reconstructs `missing` at a fixed
/// `epsilon`.
pub fn fit_sigma(
    data: &Array2<f64>,
    distance: &DistanceMatrix,
    epsilon: f64,
    missing: &[usize],
    grid: SigmaGrid,
) -> Result<FitResult> {
    GraphParams::new(epsilon, 1.0)?;
    let candidates = grid.values()?;
    sweep("sigma", data, distance, missing, candidates, |sigma| compute_graph(distance, epsilon, sigma))
}

fn sweep<F>(
    name: &str,
    data: &Array2<f64>,
    distance: &DistanceMatrix,
    missing: &[usize],
    candidates: Vec<f64>,
    make_graph: F,
) -> Result<FitResult>
where
    F: Fn(f64) -> Result<AdjacencyMatrix> + Sync,
{
    let (_, missing) = validate(data.view(), distance.len(), missing)?;
    if data.iter().any(|v| !v.is_finite()) {
        return Err(Error::input("parameter search needs the true signal of every channel"));
    }

    let mut masked = data.clone();
    for &m in &missing {
        masked.row_mut(m).fill(f64::NAN);
    }
    let truth = data.select(Axis(0), &missing);
    let interp = ChannelInterpolator::default();

    let scored: Vec<Option<(f64, f64)>> = candidates
        .par_iter()
        .map(|&v| -> Result<Option<(f64, f64)>> {
            let adj = make_graph(v)?;
            let res = interp.interpolate(&masked, &adj, &missing)?;
            if !res.is_complete() {
                return Ok(None);
            }
            let rec = res.data.select(Axis(0), &missing);
            let err = (&truth - &rec).mapv(|e| e * e).sum().sqrt();
            Ok(Some((v, err)))
        })
        .collect::<Result<_>>()?;

    let (values, errors): (Vec<f64>, Vec<f64>) = scored.into_iter().flatten().unzip();
    debug!(param = name, tried = candidates.len(), kept = values.len(), "parameter sweep done");

    // First minimum wins, like `argmin`.
    let best_idx = errors
        .iter()
        .enumerate()
        .fold(None, |acc: Option<usize>, (i, &e)| match acc {
            Some(b) if errors[b] <= e => Some(b),
            _ => Some(i),
        })
        .ok_or_else(|| {
            Error::input(format!("no {name} candidate reconstructs the masked channels"))
        })?;
    let best = values[best_idx];
    let best_error = errors[best_idx];

    let adjacency = make_graph(best)?;
    let signal = interp.interpolate(&masked, &adjacency, &missing)?.data;
    info!(param = name, best, error = best_error, "selected graph parameter");

    Ok(FitResult { values, errors, best, best_error, signal, adjacency })
}
