//! # eegrasp: graph signal processing for EEG montages
//!
//! `eegrasp` builds weighted graphs over EEG electrodes and uses them to
//! reconstruct missing channels.  Everything is plain `ndarray` in, `ndarray`
//! out; the only numeric backend is [`nalgebra`](https://nalgebra.org) for
//! the dense solve, behind a swappable trait.
//!
//! ## Pipeline overview
//!
//! ```text
//! SensorSet (names + [N, D] positions)
//!   │
//!   ├─ distance::compute_distance()   pairwise Euclidean, exactly symmetric
//!   ├─ DistanceMatrix::normalized()   ÷ max distance (optional)
//!   ├─ params::ParameterStrategy      fills ε / σ left open (median heuristic)
//!   ├─ graph::compute_graph()         exp(−d²/2σ²), 0 where d > ε, 0 diagonal
//!   │
//!   └─ interpolate::interpolate()     x_M = −(L_MM)⁻¹ L_MO x_O
//!        │
//!        └─→ InterpolationResult      [C, T], observed rows untouched,
//!                                     + SingularSystemWarning per degraded channel
//! ```
//!
//! ## Quick start
//!
//! ```
//! use eegrasp::{reconstruct, GraphConfig, SensorSet};
//! use ndarray::{array, Array2};
//!
//! let sensors = SensorSet::new(
//!     vec!["Fz".into(), "Cz".into(), "Pz".into(), "C3".into()],
//!     array![[0.0, 1.0], [0.0, 0.0], [0.0, -1.0], [-1.0, 0.0]],
//! ).unwrap();
//!
//! // Cz dropped out: mark the whole row with NaN.
//! let mut data = Array2::from_shape_fn((4, 100), |(c, t)| (c as f64 + 1.0) * (t as f64 * 0.1).sin());
//! data.row_mut(1).fill(f64::NAN);
//!
//! let out = reconstruct(&data, &sensors, &GraphConfig::default()).unwrap();
//! assert!(out.result.data.row(1).iter().all(|v| v.is_finite()));
//! assert_eq!(out.result.missing, vec![1]);
//! ```
//!
//! ## Running individual steps
//!
//! ```
//! use eegrasp::distance::compute_distance;
//! use eegrasp::graph::compute_graph;
//! use eegrasp::interpolate::interpolate;
//! use ndarray::array;
//!
//! let pos = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
//! let d = compute_distance(pos.view()).unwrap();
//! let w = compute_graph(&d, 1.5, 0.5).unwrap();
//!
//! let nan = f64::NAN;
//! let data = array![[0.0, 1.0], [1.0, 2.0], [nan, nan], [2.0, 3.0]];
//! let res = interpolate(&data, &w, &[2]).unwrap();
//! assert!(res.is_complete());
//! ```
//!
//! ## Beyond interpolation
//!
//! * [`fit`]: choose ε or σ by leave-channel-out reconstruction error.
//! * [`learn`]: learn a graph from the signals themselves (log-degree model).
//! * [`io`]: safetensors reader/writer used by the `eegrasp-interpolate` binary.

pub mod builder;
pub mod config;
pub mod distance;
pub mod error;
pub mod fit;
pub mod graph;
pub mod interpolate;
pub mod io;
pub mod laplacian;
pub mod learn;
pub mod params;
pub mod sensors;

use ndarray::Array2;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `eegrasp::Foo` without having to know the internal module layout.

// builder + config
pub use builder::{BuiltGraph, DistanceGraphBuilder};
pub use config::GraphConfig;

// errors
pub use error::{Error, Result};

// montage, distances, graphs
pub use distance::{compute_distance, DistanceMatrix};
pub use graph::{compute_graph, compute_graph_with, gaussian_kernel, AdjacencyMatrix};
pub use params::{FixedParams, GraphParams, MedianHeuristic, ParameterStrategy};
pub use sensors::SensorSet;

// interpolation + backend
pub use interpolate::{
    interpolate, interpolate_epochs, interpolate_missing, missing_rows,
    ChannelInterpolator, InterpolationResult, SingularReason, SingularSystemWarning,
};
pub use laplacian::{Laplacian, LinalgBackend, NalgebraBackend};

// parameter search + graph learning
pub use fit::{fit_epsilon, fit_sigma, FitResult, SigmaGrid};
pub use learn::{learn_graph, learn_graph_from_distance, learn_graph_trials, LearnMode, LearnParams, LearnedGraph};

/// Output of [`reconstruct`]: the graph that was used and the interpolation.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub graph: BuiltGraph,
    pub result: InterpolationResult,
}

/// Reconstruct every marker-filled channel of `data` in one call.
///
/// # Pipeline steps
///
/// 1. Check that `data` has one row per sensor.
/// 2. Build the montage graph with [`DistanceGraphBuilder`] (normalisation and
///    parameter estimation per `cfg`).
/// 3. Find rows filled with [`GraphConfig::missing_marker`].
/// 4. Harmonic interpolation, filling unreachable channels with
///    [`GraphConfig::fill_value`].
///
/// # Errors
///
/// * [`Error::DimensionMismatch`] if `data.nrows() != sensors.len()`.
/// * [`Error::InvalidInput`] if no row is marked missing, every row is, or an
///   observed row contains non-finite samples.
/// * [`Error::InvalidParameter`] for a non-positive `epsilon` / `sigma`.
pub fn reconstruct(data: &Array2<f64>, sensors: &SensorSet, cfg: &GraphConfig) -> Result<Reconstruction> {
    if data.nrows() != sensors.len() {
        return Err(Error::DimensionMismatch {
            what: "data channels vs. sensors",
            expected: sensors.len(),
            found: data.nrows(),
        });
    }
    let graph = DistanceGraphBuilder::new(cfg.clone()).build(sensors)?;
    let result = ChannelInterpolator::default()
        .with_fill_value(cfg.fill_value)
        .interpolate_missing(data, &graph.adjacency, cfg.missing_marker)?;
    Ok(Reconstruction { graph, result })
}
