//! # GridStress - randomization and stress testing of power-distribution graphs
//!
//! This library models an undirected graph whose nodes produce and consume
//! power, and runs two experiments on it: degree-approximate randomization of
//! the edge set, and iterative edge removal until supply adequacy fails across
//! connected components.
//!
//! ## Architecture
//!
//! - `graph`: node and edge storage, the text file format, connected
//!   components (`graph::components`) and edge/node randomization
//!   (`graph::randomize`)
//! - `analysis`: per-component supply adequacy, the stress loop
//!   (`analysis::stress`) and report generation (`analysis::report`)
//! - `config`: the `key=value` settings file and per-mode required keys
//! - `logging`: console plus `runtime.log` output
//! - `orchestrator`: the Randomize, Test, Stress and BatchStress workflows
//!
//! ## Example Usage
//!
//! ```rust
//! use gridstress::analysis::{run_analytics, run_stress_test, StressConfig};
//! use gridstress::graph::Graph;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! // A 4-node cycle where node 0 feeds three consumers
//! let mut graph = Graph::parse("3,0,1\n0,1,2\n0,1,3\n0,1,0")?;
//! assert_eq!(run_analytics(&graph, None).num_components, 1);
//!
//! let config = StressConfig::new(0.5, 0.25)?;
//! let mut rng = StdRng::seed_from_u64(42);
//! let report = run_stress_test(&mut graph, &config, &mut rng)?;
//! assert!(report.final_state.num_edges < report.initial.num_edges);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Graph File Format
//!
//! One line per node, `produced,consumed[,neighbor]*`, where each neighbor is
//! the index (line number, from 0) of a connected node:
//!
//! ```text
//! 5,5
//! 0,5,0
//! 0,5,1
//! ```
//!
//! ## Error Handling
//!
//! Library modules return typed errors built with `thiserror`; the workflows
//! and the binary use `color_eyre` for error reports with context.

pub mod analysis;
pub mod config;
pub mod graph;
pub mod logging;
pub mod orchestrator;
