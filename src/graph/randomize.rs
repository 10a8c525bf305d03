//! Edge rewiring and node resampling.
//!
//! Two edge strategies are available:
//!
//! - [`SwapStrategy::ColumnExchange`] collects every edge as a `(row, col)`
//!   pair, exchanges the `col` member of two uniformly chosen pairs per swap
//!   (the same pair may be picked twice), then re-inserts the pairs. Self-loops
//!   produced this way are dropped and duplicates collapse into one edge, so the
//!   edge count and node degrees are only approximately preserved.
//! - [`SwapStrategy::Strict`] is the textbook double-edge swap
//!   `(a,b),(c,d) -> (a,d),(c,b)`, rejecting any swap that would create a
//!   self-loop or a duplicate edge. Every node degree is preserved exactly.
//!
//! The edge matrix is rewritten in a single pass once all swaps have been
//! computed, so it is never observed half-swapped.

use std::collections::HashSet;

use rand::Rng;

use super::{normalize_pair, Graph, GraphError, Node};

/// How [`randomize_edges`] perturbs the edge set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapStrategy {
    #[default]
    ColumnExchange,
    Strict,
}

/// Bookkeeping for one [`randomize_edges`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapSummary {
    pub edges_before: usize,
    pub edges_after: usize,
    pub swaps_attempted: usize,
    /// Strict swaps skipped because they would break simplicity
    pub swaps_rejected: usize,
    /// Column-exchange pairs that ended up as `(x, x)`
    pub self_loops_dropped: usize,
    /// Column-exchange pairs that landed on an already inserted edge
    pub duplicates_merged: usize,
}

/// Randomize the edge set of `graph` with `num_swaps` swap iterations.
///
/// An edgeless graph is left untouched whatever `num_swaps` is.
pub fn randomize_edges<R: Rng + ?Sized>(
    graph: &mut Graph,
    num_swaps: usize,
    strategy: SwapStrategy,
    rng: &mut R,
) -> SwapSummary {
    let mut pairs = graph.edge_list();
    let mut summary = SwapSummary {
        edges_before: pairs.len(),
        ..SwapSummary::default()
    };

    if pairs.is_empty() {
        return summary;
    }

    summary.swaps_attempted = num_swaps;
    match strategy {
        SwapStrategy::ColumnExchange => exchange_columns(&mut pairs, num_swaps, rng),
        SwapStrategy::Strict => summary.swaps_rejected = strict_swaps(&mut pairs, num_swaps, rng),
    }

    graph.clear_edges();
    for (a, b) in pairs {
        if a == b {
            summary.self_loops_dropped += 1;
        } else if graph.has_pair(a, b) {
            summary.duplicates_merged += 1;
        } else {
            graph.set_pair(a, b, true);
        }
    }
    summary.edges_after = graph.edge_count();

    log::debug!(
        "Randomized edges ({:?}): {} -> {} edges, {} rejected, {} self-loops dropped, {} duplicates merged",
        strategy,
        summary.edges_before,
        summary.edges_after,
        summary.swaps_rejected,
        summary.self_loops_dropped,
        summary.duplicates_merged
    );
    summary
}

fn exchange_columns<R: Rng + ?Sized>(pairs: &mut [(usize, usize)], num_swaps: usize, rng: &mut R) {
    let len = pairs.len();
    for _ in 0..num_swaps {
        let first = rng.gen_range(0..len);
        let second = rng.gen_range(0..len);

        let column = pairs[first].1;
        pairs[first].1 = pairs[second].1;
        pairs[second].1 = column;
    }
}

/// Returns the number of rejected swaps
fn strict_swaps<R: Rng + ?Sized>(pairs: &mut [(usize, usize)], num_swaps: usize, rng: &mut R) -> usize {
    let len = pairs.len();
    let mut present: HashSet<(usize, usize)> = pairs.iter().copied().collect();
    let mut rejected = 0;

    for _ in 0..num_swaps {
        let first = rng.gen_range(0..len);
        let second = rng.gen_range(0..len);

        let (a, b) = pairs[first];
        // Pick the orientation of the second edge at random so both rewirings are reachable
        let (c, d) = if rng.gen_bool(0.5) {
            pairs[second]
        } else {
            (pairs[second].1, pairs[second].0)
        };

        let rewired_first = normalize_pair(a, d);
        let rewired_second = normalize_pair(c, b);

        if first == second
            || a == d
            || c == b
            || rewired_first == rewired_second
            || present.contains(&rewired_first)
            || present.contains(&rewired_second)
        {
            rejected += 1;
            continue;
        }

        present.remove(&pairs[first]);
        present.remove(&pairs[second]);
        present.insert(rewired_first);
        present.insert(rewired_second);
        pairs[first] = rewired_first;
        pairs[second] = rewired_second;
    }

    rejected
}

/// Sampling bounds for [`randomize_nodes`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRanges {
    pub min_produced: f64,
    pub max_produced: f64,
    pub min_consumed: f64,
    pub max_consumed: f64,
}

impl NodeRanges {
    /// Both ranges must be finite with `min <= max` and a finite width;
    /// production must be non-negative.
    pub fn validate(&self) -> Result<(), GraphError> {
        check_range("production", self.min_produced, self.max_produced)?;
        check_range("consumption", self.min_consumed, self.max_consumed)?;

        if self.min_produced < 0.0 {
            return Err(GraphError::InvalidRange {
                name: "production",
                min: self.min_produced,
                max: self.max_produced,
            });
        }
        Ok(())
    }
}

fn check_range(name: &'static str, min: f64, max: f64) -> Result<(), GraphError> {
    if min.is_finite() && max.is_finite() && min <= max && (max - min).is_finite() {
        Ok(())
    } else {
        Err(GraphError::InvalidRange { name, min, max })
    }
}

/// Resample every node's production and consumption uniformly within `ranges`.
///
/// The ranges are validated before any node is touched.
pub fn randomize_nodes<R: Rng + ?Sized>(
    graph: &mut Graph,
    ranges: &NodeRanges,
    rng: &mut R,
) -> Result<(), GraphError> {
    ranges.validate()?;

    for node in &mut graph.nodes {
        let produced = rng.gen_range(ranges.min_produced..=ranges.max_produced);
        let consumed = rng.gen_range(ranges.min_consumed..=ranges.max_consumed);
        *node = Node::new(produced, consumed);
    }

    Ok(())
}
