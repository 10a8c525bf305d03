//! Iterative edge removal until supply adequacy fails.
//!
//! A stress run analyzes the graph, then keeps cutting a fraction of the
//! remaining edges and re-analyzing while the average adequacy is still above
//! the threshold and edges remain. Every cut removes at least one edge, so a
//! run finishes in at most as many iterations as the graph has edges.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::{run_analytics, GraphAnalytics};
use crate::graph::Graph;

/// Parameter errors, reported before the graph is mutated
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StressError {
    #[error("Invalid {name} {value}: expected a value in {expected}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// Parameters of a stress run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StressConfig {
    /// Stop once average adequacy is at or below this, in `[0, 1]`
    pub power_threshold: f64,
    /// Fraction of remaining edges cut per iteration, in `(0, 1]`
    pub edge_cut_percent: f64,
    /// Optional cap on component discovery; `None` or `Some(0)` means no cap
    pub max_components: Option<usize>,
}

impl StressConfig {
    /// Build a validated configuration without a component cap
    pub fn new(power_threshold: f64, edge_cut_percent: f64) -> Result<Self, StressError> {
        let config = Self {
            power_threshold,
            edge_cut_percent,
            max_components: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_components(mut self, max_components: Option<usize>) -> Self {
        self.max_components = max_components;
        self
    }

    pub fn validate(&self) -> Result<(), StressError> {
        if !(0.0..=1.0).contains(&self.power_threshold) {
            return Err(StressError::InvalidParameter {
                name: "power threshold",
                value: self.power_threshold,
                expected: "[0, 1]",
            });
        }
        validate_cut_percent(self.edge_cut_percent)
    }
}

fn validate_cut_percent(percent: f64) -> Result<(), StressError> {
    if percent > 0.0 && percent <= 1.0 {
        Ok(())
    } else {
        Err(StressError::InvalidParameter {
            name: "edge cut percentage",
            value: percent,
            expected: "(0, 1]",
        })
    }
}

/// Remove `max(1, floor(edge_count * percent))` distinct edges chosen uniformly.
///
/// Returns the number of edges removed; an edgeless graph is left as is.
pub fn cut_edges<R: Rng + ?Sized>(
    graph: &mut Graph,
    percent: f64,
    rng: &mut R,
) -> Result<usize, StressError> {
    validate_cut_percent(percent)?;

    let edges = graph.edge_list();
    if edges.is_empty() {
        return Ok(0);
    }

    let cut_count = ((edges.len() as f64 * percent).floor() as usize).clamp(1, edges.len());
    for &(row, col) in edges.choose_multiple(rng, cut_count) {
        graph.set_pair(row, col, false);
    }

    Ok(cut_count)
}

/// Analytics snapshot taken after each cut (iteration 0 is the starting state)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StressStep {
    pub iteration: usize,
    pub edges_cut: usize,
    pub analytics: GraphAnalytics,
}

/// Outcome of [`run_stress_test`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressReport {
    pub initial: GraphAnalytics,
    #[serde(rename = "final")]
    pub final_state: GraphAnalytics,
    pub iterations: usize,
    pub history: Vec<StressStep>,
}

impl StressReport {
    pub fn edges_cut(&self) -> usize {
        self.initial.num_edges.saturating_sub(self.final_state.num_edges)
    }
}

/// Run the stress loop on `graph` in place
pub fn run_stress_test<R: Rng + ?Sized>(
    graph: &mut Graph,
    config: &StressConfig,
    rng: &mut R,
) -> Result<StressReport, StressError> {
    config.validate()?;

    let initial = run_analytics(graph, config.max_components);
    log::info!(
        "Stress test start: {} edges, {} components, {:.2}% average power supplied",
        initial.num_edges,
        initial.num_components,
        initial.power_percent()
    );

    let mut current = initial;
    let mut history = vec![StressStep {
        iteration: 0,
        edges_cut: 0,
        analytics: initial,
    }];

    while current.avg_power_percentage > config.power_threshold && current.num_edges > 0 {
        let edges_cut = cut_edges(graph, config.edge_cut_percent, rng)?;
        current = run_analytics(graph, config.max_components);

        let iteration = history.len();
        log::debug!(
            "Iteration {}: cut {} edges, {} remain, {} components, {:.2}% supplied",
            iteration,
            edges_cut,
            current.num_edges,
            current.num_components,
            current.power_percent()
        );
        history.push(StressStep {
            iteration,
            edges_cut,
            analytics: current,
        });
    }

    Ok(StressReport {
        initial,
        final_state: current,
        iterations: history.len() - 1,
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::components::count_components;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cycle4() -> Graph {
        Graph::parse("1,1,1\n1,1,2\n1,1,3\n1,1,0").unwrap()
    }

    #[test]
    fn test_cut_quarter_of_cycle() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut graph = cycle4();

        let removed = cut_edges(&mut graph, 0.25, &mut rng).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(count_components(&graph), 1);
    }

    #[test]
    fn test_cut_count_floor_and_ceiling() {
        let mut rng = StdRng::seed_from_u64(1);

        let mut graph = cycle4();
        assert_eq!(cut_edges(&mut graph, 0.01, &mut rng).unwrap(), 1);
        assert_eq!(graph.edge_count(), 3);

        let mut graph = cycle4();
        assert_eq!(cut_edges(&mut graph, 1.0, &mut rng).unwrap(), 4);
        assert_eq!(graph.edge_count(), 0);

        assert_eq!(cut_edges(&mut graph, 0.5, &mut rng).unwrap(), 0);
    }

    #[test]
    fn test_cut_rejects_bad_percent() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut graph = cycle4();

        assert!(cut_edges(&mut graph, 0.0, &mut rng).is_err());
        assert!(cut_edges(&mut graph, 1.5, &mut rng).is_err());
        assert!(cut_edges(&mut graph, f64::NAN, &mut rng).is_err());
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_config_validation() {
        assert!(StressConfig::new(0.0, 1.0).is_ok());
        assert!(StressConfig::new(1.0, 0.1).is_ok());
        assert!(matches!(
            StressConfig::new(1.1, 0.5),
            Err(StressError::InvalidParameter { name: "power threshold", .. })
        ));
        assert!(StressConfig::new(-0.1, 0.5).is_err());
        assert!(StressConfig::new(0.5, 0.0).is_err());
    }

    #[test]
    fn test_balanced_graph_stops_immediately() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut graph = Graph::parse("2,2,1\n3,3,2\n4,4").unwrap();
        let config = StressConfig::new(1.0, 0.5).unwrap();

        let report = run_stress_test(&mut graph, &config, &mut rng).unwrap();

        assert_eq!(report.iterations, 0);
        assert_eq!(report.edges_cut(), 0);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(report.history.len(), 1);
    }

    #[test]
    fn test_stress_run_until_threshold() {
        let mut rng = StdRng::seed_from_u64(4);
        // One producer feeding a chain of consumers
        let mut graph = Graph::parse("5,0,1\n0,1,2\n0,1,3\n0,1,4\n0,1").unwrap();
        let config = StressConfig::new(0.5, 0.25).unwrap();

        let report = run_stress_test(&mut graph, &config, &mut rng).unwrap();

        assert_eq!(report.initial.avg_power_percentage, 1.0);
        assert!(
            report.final_state.avg_power_percentage <= 0.5 || report.final_state.num_edges == 0
        );
        assert!(report.iterations <= report.initial.num_edges);
        assert_eq!(report.final_state.num_edges, graph.edge_count());

        for pair in report.history.windows(2) {
            assert!(pair[1].analytics.num_edges < pair[0].analytics.num_edges);
            assert_eq!(
                pair[0].analytics.num_edges - pair[1].analytics.num_edges,
                pair[1].edges_cut
            );
        }
    }

    #[test]
    fn test_zero_threshold_cuts_everything_when_fully_powered() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut graph = cycle4();
        let config = StressConfig::new(0.0, 0.5).unwrap();

        let report = run_stress_test(&mut graph, &config, &mut rng).unwrap();

        // Every node balances itself, so adequacy never drops
        assert_eq!(report.final_state.num_edges, 0);
        assert_eq!(report.edges_cut(), 4);
        assert_eq!(report.final_state.num_components, 4);
    }
}
