//! Graph and interpolation configuration.
//!
//! [`GraphConfig`] holds every tunable parameter of the distance → graph →
//! interpolation chain.  Defaults follow the EEGraSP workflow: distances are
//! normalised to `[0, 1]`, missing channels are NaN rows, and kernel
//! parameters left as `None` are estimated from the distance matrix.

/// Configuration for [`reconstruct`](crate::reconstruct) and
/// [`DistanceGraphBuilder`](crate::DistanceGraphBuilder).
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use eegrasp::GraphConfig;
///
/// let cfg = GraphConfig {
///     epsilon: Some(0.5),   // keep pairs closer than half the montage span
///     sigma:   Some(0.1),
///     ..GraphConfig::default()
/// };
/// assert!(cfg.normalize_distances);
/// ```
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Distance threshold: pairs farther apart than this get zero weight.
    ///
    /// `None` defers to the [`ParameterStrategy`](crate::params::ParameterStrategy)
    /// in use (the median heuristic unless overridden).
    ///
    /// Default: `None`.
    pub epsilon: Option<f64>,

    /// Width of the Gaussian kernel `exp(-d² / 2σ²)`.
    ///
    /// `None` defers to the parameter strategy, like `epsilon`.
    ///
    /// Default: `None`.
    pub sigma: Option<f64>,

    /// Divide distances by their maximum before building the graph.
    ///
    /// With normalisation on, `epsilon` and `sigma` are expressed as a
    /// fraction of the widest electrode pair, which makes the same values
    /// usable across montages recorded in metres, millimetres or unit-sphere
    /// coordinates.
    ///
    /// Default: `true`.
    pub normalize_distances: bool,

    /// Sentinel that marks a whole channel row as missing.
    ///
    /// NaN matches NaN.
    ///
    /// Default: `f64::NAN`.
    pub missing_marker: f64,

    /// Value written into a missing channel whose reconstruction is
    /// undefined (the channel has no path to any observed channel).
    ///
    /// Default: `0.0`.
    pub fill_value: f64,
}

impl Default for GraphConfig {
    /// Normalised distances · estimated ε/σ · NaN marker · zero fill.
    fn default() -> Self {
        Self {
            epsilon: None,
            sigma: None,
            normalize_distances: true,
            missing_marker: f64::NAN,
            fill_value: 0.0,
        }
    }
}

impl GraphConfig {
    /// `true` when `v` is the configured missing marker.
    ///
    /// # Examples
    ///
    /// ```
    /// use eegrasp::GraphConfig;
    /// let cfg = GraphConfig::default();
    /// assert!(cfg.is_missing(f64::NAN));
    /// assert!(!cfg.is_missing(0.0));
    /// ```
    pub fn is_missing(&self, v: f64) -> bool {
        is_marker(v, self.missing_marker)
    }
}

#[inline]
pub(crate) fn is_marker(v: f64, marker: f64) -> bool {
    if marker.is_nan() { v.is_nan() } else { v == marker }
}
