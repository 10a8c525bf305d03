//! Graph storage for production/consumption networks.
//!
//! Nodes are identified by a dense index matching their line in the graph
//! file. Edges are undirected and stored in a strictly lower-triangular
//! boolean matrix: the pair `{i, j}` lives in the single cell
//! `(max(i, j), min(i, j))`.
//!
//! ## File format
//!
//! One line per node, in index order:
//!
//! ```text
//! produced,consumed[,neighbor]*
//! ```
//!
//! Missing `produced`/`consumed` fields default to 0, empty neighbor fields
//! are ignored, and a non-positive consumption is clamped to
//! [`MIN_CONSUMPTION`].

pub mod components;
pub mod randomize;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use color_eyre::eyre::{Result, WrapErr};

/// Smallest consumption a node may carry, keeping adequacy ratios finite.
pub const MIN_CONSUMPTION: f64 = 1e-6;

/// Errors raised while building or mutating a [`Graph`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("Malformed graph line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("Invalid edge ({i}, {j}): a node cannot connect to itself")]
    InvalidEdge { i: usize, j: usize },

    #[error("Node index {index} out of range for a graph of {node_count} nodes")]
    NodeOutOfRange { index: usize, node_count: usize },

    #[error("Invalid {name} range [{min}, {max}]")]
    InvalidRange {
        name: &'static str,
        min: f64,
        max: f64,
    },
}

/// A single producer/consumer in the network
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    produced: f64,
    consumed: f64,
}

impl Node {
    /// Create a node, clamping production to be non-negative and
    /// consumption to be at least [`MIN_CONSUMPTION`].
    pub fn new(produced: f64, consumed: f64) -> Self {
        Self {
            produced: produced.max(0.0),
            consumed: if consumed > MIN_CONSUMPTION {
                consumed
            } else {
                MIN_CONSUMPTION
            },
        }
    }

    pub fn produced(&self) -> f64 {
        self.produced
    }

    pub fn consumed(&self) -> f64 {
        self.consumed
    }
}

/// Undirected, simple, unweighted graph over [`Node`]s
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    /// Row `r` holds the cells for columns `0..r`.
    edges: Vec<Vec<bool>>,
}

/// Order a pair as `(row, col)` with `row > col`.
pub(crate) fn normalize_pair(i: usize, j: usize) -> (usize, usize) {
    (i.max(j), i.min(j))
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an edgeless graph over the given nodes
    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        let edges = (0..nodes.len()).map(|row| vec![false; row]).collect();
        Self { nodes, edges }
    }

    /// Parse a graph from its line-oriented text form
    pub fn parse(text: &str) -> Result<Self, GraphError> {
        let lines: Vec<&str> = text.lines().collect();
        let node_count = lines.len();

        let mut nodes = Vec::with_capacity(node_count);
        let mut neighbor_lists = Vec::with_capacity(node_count);
        for (index, line) in lines.iter().enumerate() {
            let (node, neighbors) = parse_line(index, line, node_count)?;
            nodes.push(node);
            neighbor_lists.push(neighbors);
        }

        let mut graph = Self::with_nodes(nodes);
        for (index, neighbors) in neighbor_lists.into_iter().enumerate() {
            for neighbor in neighbors {
                graph.set_edge(index, neighbor, true)?;
            }
        }

        Ok(graph)
    }

    /// Read and parse a graph file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Unable to read graph file '{}'", path.display()))?;

        let graph = Self::parse(&content)
            .wrap_err_with(|| format!("Failed to parse graph file '{}'", path.display()))?;

        log::debug!(
            "Loaded graph '{}': {} nodes, {} edges",
            path.display(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Render the graph in its line-oriented text form.
    ///
    /// Neighbors are listed in ascending order and there is no trailing
    /// newline after the last node.
    pub fn serialize(&self) -> String {
        let adjacency = self.adjacency_list();
        let mut lines = Vec::with_capacity(self.nodes.len());

        for (node, neighbors) in self.nodes.iter().zip(&adjacency) {
            let mut line = format!("{},{}", node.produced, node.consumed);
            for neighbor in neighbors {
                // Writing into a String cannot fail
                let _ = write!(line, ",{}", neighbor);
            }
            lines.push(line);
        }

        lines.join("\n")
    }

    /// Serialize the graph to a file, replacing any existing content
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.serialize())
            .wrap_err_with(|| format!("Unable to write graph file '{}'", path.display()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Whether `i` and `j` share an edge
    pub fn edge(&self, i: usize, j: usize) -> Result<bool, GraphError> {
        let (row, col) = self.checked_cell(i, j)?;
        Ok(self.edges[row][col])
    }

    /// Add (`value = true`) or remove (`value = false`) the edge `{i, j}`
    pub fn set_edge(&mut self, i: usize, j: usize, value: bool) -> Result<(), GraphError> {
        let (row, col) = self.checked_cell(i, j)?;
        self.edges[row][col] = value;
        Ok(())
    }

    pub fn add_edge(&mut self, i: usize, j: usize) -> Result<(), GraphError> {
        self.set_edge(i, j, true)
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.edges
            .iter()
            .map(|row| row.iter().filter(|&&cell| cell).count())
            .sum()
    }

    /// Every edge as a normalized `(row, col)` pair, `row > col`, in row-major order
    pub fn edge_list(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (row, cells) in self.edges.iter().enumerate() {
            for (col, &cell) in cells.iter().enumerate() {
                if cell {
                    pairs.push((row, col));
                }
            }
        }
        pairs
    }

    /// Remove every edge, keeping the nodes
    pub fn clear_edges(&mut self) {
        for row in &mut self.edges {
            row.fill(false);
        }
    }

    /// Neighbors of `index` in ascending order
    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        let node_count = self.nodes.len();
        if index >= node_count {
            return Vec::new();
        }

        let below = (0..index).filter(|&col| self.edges[index][col]);
        let above = (index + 1..node_count).filter(|&row| self.edges[row][index]);
        below.chain(above).collect()
    }

    /// Per-node neighbor lists, each in ascending order
    pub fn adjacency_list(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        // Rows are visited in ascending order, so each list stays sorted
        for (row, cells) in self.edges.iter().enumerate() {
            for (col, &cell) in cells.iter().enumerate() {
                if cell {
                    adjacency[row].push(col);
                    adjacency[col].push(row);
                }
            }
        }
        adjacency
    }

    fn checked_cell(&self, i: usize, j: usize) -> Result<(usize, usize), GraphError> {
        let node_count = self.nodes.len();
        for index in [i, j] {
            if index >= node_count {
                return Err(GraphError::NodeOutOfRange { index, node_count });
            }
        }
        if i == j {
            return Err(GraphError::InvalidEdge { i, j });
        }
        Ok(normalize_pair(i, j))
    }

    /// Unchecked read of a pair already known to be valid
    pub(crate) fn has_pair(&self, i: usize, j: usize) -> bool {
        let (row, col) = normalize_pair(i, j);
        self.edges[row][col]
    }

    /// Unchecked write of a pair already known to be valid
    pub(crate) fn set_pair(&mut self, i: usize, j: usize, value: bool) {
        let (row, col) = normalize_pair(i, j);
        self.edges[row][col] = value;
    }
}

impl FromStr for Graph {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse one node line into the node and its declared neighbors
fn parse_line(
    index: usize,
    line: &str,
    node_count: usize,
) -> Result<(Node, Vec<usize>), GraphError> {
    let line_number = index + 1;
    let mut fields = line.split(',').map(str::trim);

    let produced = parse_quantity(fields.next(), "produced", line_number)?;
    let consumed = parse_quantity(fields.next(), "consumed", line_number)?;

    let mut neighbors = Vec::new();
    for field in fields.filter(|field| !field.is_empty()) {
        let neighbor: usize = field.parse().map_err(|_| GraphError::Format {
            line: line_number,
            message: format!("invalid neighbor index '{}'", field),
        })?;

        if neighbor >= node_count {
            return Err(GraphError::Format {
                line: line_number,
                message: format!(
                    "neighbor index {} out of range for a graph of {} nodes",
                    neighbor, node_count
                ),
            });
        }
        if neighbor == index {
            return Err(GraphError::Format {
                line: line_number,
                message: format!("node {} lists itself as a neighbor", index),
            });
        }

        neighbors.push(neighbor);
    }

    Ok((Node::new(produced, consumed), neighbors))
}

/// Absent or empty quantities default to 0; anything else must be a finite number
fn parse_quantity(field: Option<&str>, name: &str, line: usize) -> Result<f64, GraphError> {
    match field {
        None | Some("") => Ok(0.0),
        Some(value) => value
            .parse::<f64>()
            .ok()
            .filter(|parsed| parsed.is_finite())
            .ok_or_else(|| GraphError::Format {
                line,
                message: format!("invalid {} value '{}'", name, value),
            }),
    }
}
