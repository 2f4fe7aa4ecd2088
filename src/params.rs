//! Kernel parameters and the strategies that choose them.
//!
//! `compute_graph` never guesses: when the caller leaves ε or σ open, a
//! [`ParameterStrategy`] turns the distance matrix into concrete values.
//! [`MedianHeuristic`] is the default; [`FixedParams`] reproduces the values
//! the EEGraSP notebooks use on normalised distances.
use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};

/// Threshold and kernel width for the thresholded Gaussian graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphParams {
    /// Pairs with `D > epsilon` get zero weight.  `+∞` keeps every pair.
    pub epsilon: f64,
    /// Gaussian kernel width.
    pub sigma: f64,
}

impl GraphParams {
    pub fn new(epsilon: f64, sigma: f64) -> Result<Self> {
        let p = Self { epsilon, sigma };
        p.validate()?;
        Ok(p)
    }

    /// `epsilon > 0` (NaN rejected) and `0 < sigma < ∞`.
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0) {
            return Err(Error::param(format!("epsilon must be > 0, got {}", self.epsilon)));
        }
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(Error::param(format!("sigma must be finite and > 0, got {}", self.sigma)));
        }
        Ok(())
    }
}

impl Default for GraphParams {
    /// `epsilon = 0.5`, `sigma = 0.1`: tuned for distances normalised to `[0, 1]`.
    fn default() -> Self {
        Self { epsilon: 0.5, sigma: 0.1 }
    }
}

/// Picks ε and σ from a distance matrix.
pub trait ParameterStrategy: Send + Sync {
    fn estimate(&self, distance: &DistanceMatrix) -> Result<GraphParams>;
}

/// `σ = median(positive pairwise distances)`, `ε = epsilon_factor · σ`.
///
/// Falls back to `ε = σ = 1` when every sensor sits at the same point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedianHeuristic {
    pub epsilon_factor: f64,
}

impl Default for MedianHeuristic {
    fn default() -> Self {
        Self { epsilon_factor: 2.0 }
    }
}

impl ParameterStrategy for MedianHeuristic {
    fn estimate(&self, distance: &DistanceMatrix) -> Result<GraphParams> {
        let mut pos: Vec<f64> = distance
            .upper_triangle()
            .into_iter()
            .filter(|&v| v > 0.0)
            .collect();
        if pos.is_empty() {
            return GraphParams::new(1.0, 1.0);
        }
        pos.sort_by(f64::total_cmp);
        let m = pos.len();
        let median = if m % 2 == 1 { pos[m / 2] } else { 0.5 * (pos[m / 2 - 1] + pos[m / 2]) };
        GraphParams::new(self.epsilon_factor * median, median)
    }
}

/// Always returns the wrapped parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedParams(pub GraphParams);

impl ParameterStrategy for FixedParams {
    fn estimate(&self, _distance: &DistanceMatrix) -> Result<GraphParams> {
        self.0.validate()?;
        Ok(self.0)
    }
}

/// Fill the `None` slots of `(epsilon, sigma)` from `strategy`.
///
/// The strategy is only consulted when at least one value is missing.
pub fn resolve(
    epsilon: Option<f64>,
    sigma: Option<f64>,
    distance: &DistanceMatrix,
    strategy: &dyn ParameterStrategy,
) -> Result<GraphParams> {
    let p = match (epsilon, sigma) {
        (Some(epsilon), Some(sigma)) => GraphParams { epsilon, sigma },
        _ => {
            let est = strategy.estimate(distance)?;
            GraphParams {
                epsilon: epsilon.unwrap_or(est.epsilon),
                sigma: sigma.unwrap_or(est.sigma),
            }
        }
    };
    p.validate()?;
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::compute_distance;
    use ndarray::array;

    fn unit_square() -> DistanceMatrix {
        compute_distance(array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]].view()).unwrap()
    }

    #[test]
    fn median_of_unit_square() {
        // Pairs: four sides of length 1, two diagonals of √2 → median 1.
        let p = MedianHeuristic::default().estimate(&unit_square()).unwrap();
        approx::assert_abs_diff_eq!(p.sigma, 1.0);
        approx::assert_abs_diff_eq!(p.epsilon, 2.0);
    }

    #[test]
    fn median_of_three_pairs() {
        let d = compute_distance(array![[0.0, 0.0], [1.0, 0.0], [3.0, 0.0]].view()).unwrap();
        // Upper triangle 1, 3, 2 → odd count, median 2.
        let p = MedianHeuristic { epsilon_factor: 1.0 }.estimate(&d).unwrap();
        approx::assert_abs_diff_eq!(p.sigma, 2.0);
    }

    #[test]
    fn coincident_sensors_fall_back_to_one() {
        let d = compute_distance(array![[0.5, 0.5], [0.5, 0.5], [0.5, 0.5]].view()).unwrap();
        let p = MedianHeuristic::default().estimate(&d).unwrap();
        assert_eq!(p, GraphParams { epsilon: 1.0, sigma: 1.0 });
    }

    #[test]
    fn resolve_keeps_explicit_values() {
        let p = resolve(Some(0.3), None, &unit_square(), &MedianHeuristic::default()).unwrap();
        approx::assert_abs_diff_eq!(p.epsilon, 0.3);
        approx::assert_abs_diff_eq!(p.sigma, 1.0);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(GraphParams::new(0.0, 1.0), Err(Error::InvalidParameter(_))));
        assert!(matches!(GraphParams::new(f64::NAN, 1.0), Err(Error::InvalidParameter(_))));
        assert!(matches!(GraphParams::new(1.0, -1.0), Err(Error::InvalidParameter(_))));
        assert!(GraphParams::new(f64::INFINITY, 1.0).is_ok());
    }
}
