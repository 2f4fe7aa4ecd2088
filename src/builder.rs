//! Montage → graph in one call.
use tracing::debug;

use crate::config::GraphConfig;
use crate::distance::DistanceMatrix;
use crate::error::Result;
use crate::graph::{compute_graph, AdjacencyMatrix};
use crate::params::{resolve, GraphParams, MedianHeuristic, ParameterStrategy};
use crate::sensors::SensorSet;

/// Everything produced while building a graph from a montage.
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    /// Distances actually fed to the kernel (normalised if configured).
    pub distance: DistanceMatrix,
    pub adjacency: AdjacencyMatrix,
    /// The ε and σ that were used, whether given or estimated.
    pub params: GraphParams,
}

/// Distance → (normalise) → parameter resolution → Gaussian graph.
///
/// ```
/// use eegrasp::{DistanceGraphBuilder, GraphConfig, SensorSet};
/// use ndarray::array;
///
/// let sensors = SensorSet::new(
///     vec!["A".into(), "B".into(), "C".into()],
///     array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
/// ).unwrap();
/// let g = DistanceGraphBuilder::new(GraphConfig::default()).build(&sensors).unwrap();
/// assert_eq!(g.adjacency.len(), 3);
/// ```
pub struct DistanceGraphBuilder {
    config: GraphConfig,
    strategy: Box<dyn ParameterStrategy>,
}

impl DistanceGraphBuilder {
    /// Builder using [`MedianHeuristic`] for parameters left open in `config`.
    pub fn new(config: GraphConfig) -> Self {
        Self { config, strategy: Box::new(MedianHeuristic::default()) }
    }

    /// Replace the strategy used for `None` epsilon / sigma.
    pub fn with_strategy(mut self, strategy: impl ParameterStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn build(&self, sensors: &SensorSet) -> Result<BuiltGraph> {
        let raw = sensors.distance_matrix()?;
        self.build_from_distance(&raw)
    }

    /// Same as [`build`](Self::build) for a precomputed distance matrix.
    pub fn build_from_distance(&self, distance: &DistanceMatrix) -> Result<BuiltGraph> {
        let distance = if self.config.normalize_distances {
            distance.normalized()
        } else {
            distance.clone()
        };
        let params = resolve(self.config.epsilon, self.config.sigma, &distance, self.strategy.as_ref())?;
        debug!(epsilon = params.epsilon, sigma = params.sigma, "graph parameters resolved");
        let adjacency = compute_graph(&distance, params.epsilon, params.sigma)?;
        Ok(BuiltGraph { distance, adjacency, params })
    }
}

impl std::fmt::Debug for DistanceGraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceGraphBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FixedParams;
    use ndarray::array;

    fn line() -> SensorSet {
        SensorSet::new(
            vec!["a".into(), "b".into(), "c".into()],
            array![[0.0, 0.0], [2.0, 0.0], [4.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn normalisation_rescales_before_threshold() {
        let cfg = GraphConfig { epsilon: Some(0.6), sigma: Some(1.0), ..GraphConfig::default() };
        let g = DistanceGraphBuilder::new(cfg).build(&line()).unwrap();
        // Normalised distances 0.5 (neighbours) and 1.0 (ends).
        assert!(g.adjacency.view()[[0, 1]] > 0.0);
        assert_eq!(g.adjacency.view()[[0, 2]], 0.0);
        approx::assert_abs_diff_eq!(g.distance.max(), 1.0);
    }

    #[test]
    fn strategy_fills_open_parameters() {
        let cfg = GraphConfig { normalize_distances: false, ..GraphConfig::default() };
        let g = DistanceGraphBuilder::new(cfg)
            .with_strategy(FixedParams(GraphParams { epsilon: 2.5, sigma: 1.0 }))
            .build(&line())
            .unwrap();
        assert_eq!(g.params, GraphParams { epsilon: 2.5, sigma: 1.0 });
        assert_eq!(g.adjacency.n_edges(), 2);
    }
}
