//! Supply-adequacy analytics and stress testing.
//!
//! A component is *powered* when its total production covers its total
//! consumption. Its adequacy ratio is `min(1, produced / consumed)`, and the
//! network-wide figure is the mean ratio over all components.

pub mod report;
pub mod stress;

use serde::Serialize;

use crate::graph::components::find_connected_components;
use crate::graph::Graph;

pub use report::{generate_json_report, stress_summary_lines, summary_csv_line, write_summary_csv, SUMMARY_CSV_HEADER};
pub use stress::{cut_edges, run_stress_test, StressConfig, StressError, StressReport, StressStep};

/// Aggregate figures for one graph state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GraphAnalytics {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub num_components: usize,
    pub num_components_powered: usize,
    /// Mean adequacy ratio across components, in `[0, 1]`; 0 for an empty graph
    pub avg_power_percentage: f64,
}

impl GraphAnalytics {
    /// Average adequacy as a percentage in `[0, 100]`
    pub fn power_percent(&self) -> f64 {
        self.avg_power_percentage * 100.0
    }
}

/// Summed production and consumption of one component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentSupply {
    pub produced: f64,
    pub consumed: f64,
}

impl ComponentSupply {
    pub fn from_component(graph: &Graph, component: &[usize]) -> Self {
        let nodes = graph.nodes();
        component.iter().filter_map(|&index| nodes.get(index)).fold(
            Self {
                produced: 0.0,
                consumed: 0.0,
            },
            |supply, node| Self {
                produced: supply.produced + node.produced(),
                consumed: supply.consumed + node.consumed(),
            },
        )
    }

    pub fn is_powered(&self) -> bool {
        self.produced >= self.consumed
    }

    pub fn adequacy_ratio(&self) -> f64 {
        if self.is_powered() {
            1.0
        } else {
            (self.produced / self.consumed).clamp(0.0, 1.0)
        }
    }
}

/// Compute components and their supply adequacy for the current graph state
pub fn run_analytics(graph: &Graph, max_components: Option<usize>) -> GraphAnalytics {
    let components = find_connected_components(graph, max_components);

    let mut num_components_powered = 0;
    let mut ratio_sum = 0.0;
    for component in &components {
        let supply = ComponentSupply::from_component(graph, component);
        if supply.is_powered() {
            num_components_powered += 1;
        }
        ratio_sum += supply.adequacy_ratio();
    }

    let avg_power_percentage = if components.is_empty() {
        0.0
    } else {
        ratio_sum / components.len() as f64
    };

    GraphAnalytics {
        num_nodes: graph.node_count(),
        num_edges: graph.edge_count(),
        num_components: components.len(),
        num_components_powered,
        avg_power_percentage,
    }
}
