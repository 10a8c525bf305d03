//! Workflow orchestration.
//!
//! Each [`ProgramMode`] maps to one workflow that reads its parameters from
//! [`Settings`], drives the graph engine and writes results next to its
//! inputs. Parameters are validated before any graph is loaded or mutated.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use log::{debug, error, info, warn};
use rand::Rng;

use crate::analysis::{self, run_analytics, run_stress_test, GraphAnalytics, StressConfig, StressReport};
use crate::config::{keys, ProgramMode, Settings};
use crate::graph::components::count_components;
use crate::graph::randomize::{randomize_edges, randomize_nodes, NodeRanges, SwapStrategy};
use crate::graph::Graph;
use crate::logging;

/// Attempts per generated graph before giving up on a connected variant
pub const DEFAULT_MAX_RANDOMIZE_ATTEMPTS: usize = 100;

/// File name of the batch summary, written inside the batch directory
pub const BATCH_SUMMARY_FILE: &str = "stress_summary.csv";

/// Extension of graph files picked up in batch mode
pub const GRAPH_EXTENSION: &str = "graph";

/// Options that come from the command line rather than the settings file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Also write `<graph>.report.json` for each stress run
    pub json_report: bool,
}

/// Run the workflow for `mode`
pub fn run<R: Rng + ?Sized>(
    mode: ProgramMode,
    settings: &Settings,
    options: &RunOptions,
    rng: &mut R,
) -> Result<()> {
    info!("{} function called", mode);
    settings
        .require(mode.required_keys())
        .wrap_err_with(|| format!("Cannot run {} mode", mode))?;

    match mode {
        ProgramMode::Randomize => randomize_graphs(settings, rng).map(|_| ()),
        ProgramMode::Test => test_graph(settings).map(|_| ()),
        ProgramMode::Stress => stress_graph(settings, options, rng).map(|_| ()),
        ProgramMode::BatchStress => batch_stress(settings, options, rng).map(|_| ()),
    }?;

    info!("{} function complete", mode);
    Ok(())
}

/// Parameters of the randomize workflow
#[derive(Debug, Clone, PartialEq)]
pub struct RandomizeParams {
    pub graph_file: PathBuf,
    pub output_dir: PathBuf,
    pub num_graphs: usize,
    /// Defaults to the baseline edge count when absent
    pub num_swaps: Option<usize>,
    pub strategy: SwapStrategy,
    pub node_ranges: Option<NodeRanges>,
    pub max_attempts: usize,
}

impl RandomizeParams {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.require(ProgramMode::Randomize.required_keys())?;

        let randomize_nodes = settings.get_flag(keys::RANDOMIZE_NODES)?.unwrap_or(false);
        let node_ranges = if randomize_nodes {
            settings.require(&[
                keys::MIN_NODE_PRODUCTION,
                keys::MAX_NODE_PRODUCTION,
                keys::MIN_NODE_CONSUMPTION,
                keys::MAX_NODE_CONSUMPTION,
            ])?;
            let ranges = NodeRanges {
                min_produced: settings.require_f64(keys::MIN_NODE_PRODUCTION)?,
                max_produced: settings.require_f64(keys::MAX_NODE_PRODUCTION)?,
                min_consumed: settings.require_f64(keys::MIN_NODE_CONSUMPTION)?,
                max_consumed: settings.require_f64(keys::MAX_NODE_CONSUMPTION)?,
            };
            ranges.validate()?;
            Some(ranges)
        } else {
            None
        };

        let strategy = if settings.get_flag(keys::STRICT_EDGE_SWAPS)?.unwrap_or(false) {
            SwapStrategy::Strict
        } else {
            SwapStrategy::ColumnExchange
        };

        Ok(Self {
            graph_file: PathBuf::from(settings.require_str(keys::GRAPH_FILENAME)?),
            output_dir: PathBuf::from(settings.require_str(keys::OUTPUT_DIRECTORY)?),
            num_graphs: settings.require_count(keys::NUMBER_GRAPHS_GENERATED)?,
            num_swaps: settings.get_count(keys::NUMBER_EDGE_SWAPS)?,
            strategy,
            node_ranges,
            max_attempts: settings
                .get_count(keys::MAX_RANDOMIZE_ATTEMPTS)?
                .unwrap_or(DEFAULT_MAX_RANDOMIZE_ATTEMPTS)
                .max(1),
        })
    }
}

/// Files written by [`randomize_graphs`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RandomizeOutcome {
    pub written: Vec<PathBuf>,
    /// Generations that never produced a single-component variant
    pub skipped: usize,
}

/// Generate randomized, still-connected variants of a baseline graph
pub fn randomize_graphs<R: Rng + ?Sized>(settings: &Settings, rng: &mut R) -> Result<RandomizeOutcome> {
    let params = RandomizeParams::from_settings(settings)?;

    let baseline = Graph::from_file(&params.graph_file)?;
    let num_swaps = params.num_swaps.unwrap_or_else(|| baseline.edge_count());
    info!(
        "Baseline '{}': {} nodes, {} edges, {} components",
        params.graph_file.display(),
        baseline.node_count(),
        baseline.edge_count(),
        count_components(&baseline)
    );
    info!(
        "Generating {} graphs with {} {:?} swaps each",
        params.num_graphs, num_swaps, params.strategy
    );

    fs::create_dir_all(&params.output_dir).wrap_err_with(|| {
        format!("Failed to create output directory '{}'", params.output_dir.display())
    })?;

    let mut outcome = RandomizeOutcome::default();
    for generation in 0..params.num_graphs {
        match connected_variant(&baseline, &params, num_swaps, rng)? {
            Some(variant) => {
                let path = params.output_dir.join(format!("random{}.{}", generation, GRAPH_EXTENSION));
                variant.write_to_file(&path)?;
                info!("Randomized graph written to: {}", path.display());
                outcome.written.push(path);
            }
            None => {
                warn!(
                    "Generation {} did not yield a single-component graph after {} attempts, skipping",
                    generation, params.max_attempts
                );
                outcome.skipped += 1;
            }
        }
    }

    Ok(outcome)
}

/// Branch the baseline until a randomized variant forms exactly one component
fn connected_variant<R: Rng + ?Sized>(
    baseline: &Graph,
    params: &RandomizeParams,
    num_swaps: usize,
    rng: &mut R,
) -> Result<Option<Graph>> {
    for attempt in 1..=params.max_attempts {
        let mut variant = baseline.clone();
        randomize_edges(&mut variant, num_swaps, params.strategy, rng);
        if let Some(ranges) = &params.node_ranges {
            randomize_nodes(&mut variant, ranges, rng)?;
        }

        let components = count_components(&variant);
        if components == 1 {
            debug!("Connected variant found on attempt {}", attempt);
            return Ok(Some(variant));
        }
        debug!("Attempt {} produced {} components, retrying", attempt, components);
    }

    Ok(None)
}

/// Load a graph, log its analytics and check that it round-trips through the file format
pub fn test_graph(settings: &Settings) -> Result<GraphAnalytics> {
    let graph_file = Path::new(settings.require_str(keys::GRAPH_FILENAME)?);
    let graph = Graph::from_file(graph_file)?;

    let analytics = run_analytics(&graph, None);
    info!("Nodes: {}", analytics.num_nodes);
    info!("Edges: {}", analytics.num_edges);
    info!(
        "Components: {} ({} powered)",
        analytics.num_components, analytics.num_components_powered
    );
    info!("Average percentage power supplied: {:.2}%", analytics.power_percent());

    let reparsed = Graph::parse(&graph.serialize())
        .wrap_err("Serialized graph could not be parsed back")?;
    if reparsed == graph {
        info!("Round-trip check passed");
    } else {
        warn!("Round-trip check failed: serialized graph differs from '{}'", graph_file.display());
    }

    Ok(analytics)
}

/// Read and validate the stress parameters
pub fn stress_config_from(settings: &Settings) -> Result<StressConfig> {
    let config = StressConfig::new(
        settings.require_f64(keys::POWER_SUPPLIED_THRESHOLD)?,
        settings.require_f64(keys::PERCENTAGE_OF_EDGES_TO_CUT)?,
    )?;
    Ok(config.with_max_components(component_cap(settings)?))
}

/// `MaxComponents` as a discovery cap; zero or negative means no cap
fn component_cap(settings: &Settings) -> Result<Option<usize>> {
    let cap = settings
        .get_f64(keys::MAX_COMPONENTS)?
        .filter(|&value| value >= 1.0)
        .map(|value| value.trunc() as usize);
    Ok(cap)
}

/// `<path>.output`
pub fn stress_output_path(graph_file: &Path) -> PathBuf {
    with_suffix(graph_file, ".output")
}

/// `<path>.report.json`
pub fn json_report_path(graph_file: &Path) -> PathBuf {
    with_suffix(graph_file, ".report.json")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Stress-test the single graph named by `GraphFilename`
pub fn stress_graph<R: Rng + ?Sized>(
    settings: &Settings,
    options: &RunOptions,
    rng: &mut R,
) -> Result<StressReport> {
    let config = stress_config_from(settings)?;
    let graph_file = Path::new(settings.require_str(keys::GRAPH_FILENAME)?);

    let report = stress_file(graph_file, &config, options, rng)?;
    info!("{}", analysis::summary_csv_line(&display_name(graph_file), &report));
    Ok(report)
}

/// Load, stress and persist one graph file
pub fn stress_file<R: Rng + ?Sized>(
    graph_file: &Path,
    config: &StressConfig,
    options: &RunOptions,
    rng: &mut R,
) -> Result<StressReport> {
    let mut graph = Graph::from_file(graph_file)?;
    let report = run_stress_test(&mut graph, config, rng)
        .wrap_err_with(|| format!("Stress test failed for '{}'", graph_file.display()))?;

    for line in analysis::stress_summary_lines(&report) {
        info!("{}", line);
    }

    let output = stress_output_path(graph_file);
    graph.write_to_file(&output)?;
    info!("Ending graph written to: {}", output.display());

    if options.json_report {
        analysis::generate_json_report(&report, config, graph_file, &json_report_path(graph_file))?;
    }

    Ok(report)
}

/// Result of [`batch_stress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub summary_path: PathBuf,
    /// Summary CSV rows, one per successfully processed graph
    pub rows: Vec<String>,
    pub failed: Vec<PathBuf>,
}

/// Graph files in `dir`, sorted by path
pub fn graph_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .wrap_err_with(|| format!("Unable to read directory '{}'", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .wrap_err_with(|| format!("Unable to list directory '{}'", dir.display()))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == GRAPH_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Stress-test every graph file in `Directory`, one after another.
///
/// A failing file is logged and skipped; the rest of the batch still runs.
pub fn batch_stress<R: Rng + ?Sized>(
    settings: &Settings,
    options: &RunOptions,
    rng: &mut R,
) -> Result<BatchOutcome> {
    let config = stress_config_from(settings)?;
    let dir = Path::new(settings.require_str(keys::DIRECTORY)?);

    let files = graph_files_in(dir)?;
    info!("Found {} graph files in '{}'", files.len(), dir.display());

    let mut rows = Vec::with_capacity(files.len());
    let mut failed = Vec::new();
    for file in files {
        info!("Processing {}", file.display());
        match stress_file(&file, &config, options, rng) {
            Ok(report) => {
                let row = analysis::summary_csv_line(&display_name(&file), &report);
                info!("{}", row);
                rows.push(row);
            }
            Err(e) => {
                error!("Skipping '{}': {}", file.display(), logging::error_chain(&e));
                failed.push(file);
            }
        }
    }

    let summary_path = dir.join(BATCH_SUMMARY_FILE);
    analysis::write_summary_csv(&summary_path, &rows)?;
    info!(
        "Batch complete: {} processed, {} failed",
        rows.len(),
        failed.len()
    );

    Ok(BatchOutcome {
        summary_path,
        rows,
        failed,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_output_paths() {
        let path = Path::new("/data/grid.graph");
        assert_eq!(stress_output_path(path), PathBuf::from("/data/grid.graph.output"));
        assert_eq!(json_report_path(path), PathBuf::from("/data/grid.graph.report.json"));
        assert_eq!(display_name(path), "grid.graph");
    }

    #[test]
    fn test_randomize_params_defaults() {
        let params = RandomizeParams::from_settings(&settings(&[
            ("NumberGraphsGenerated", "3"),
            ("GraphFilename", "base.graph"),
            ("OutputDirectory", "out"),
        ]))
        .unwrap();

        assert_eq!(params.num_graphs, 3);
        assert_eq!(params.num_swaps, None);
        assert_eq!(params.strategy, SwapStrategy::ColumnExchange);
        assert_eq!(params.node_ranges, None);
        assert_eq!(params.max_attempts, DEFAULT_MAX_RANDOMIZE_ATTEMPTS);
    }

    #[test]
    fn test_randomize_params_node_ranges_required() {
        let result = RandomizeParams::from_settings(&settings(&[
            ("NumberGraphsGenerated", "1"),
            ("GraphFilename", "base.graph"),
            ("OutputDirectory", "out"),
            ("RandomizeNodes", "1"),
            ("MinNodeProduction", "0"),
        ]));

        let message = format!("{}", result.unwrap_err());
        assert!(message.contains("MaxNodeProduction"));
        assert!(message.contains("MinNodeConsumption"));
        assert!(message.contains("MaxNodeConsumption"));
        assert!(!message.contains("MinNodeProduction"));
    }

    #[test]
    fn test_randomize_params_full() {
        let params = RandomizeParams::from_settings(&settings(&[
            ("NumberGraphsGenerated", "2"),
            ("GraphFilename", "base.graph"),
            ("OutputDirectory", "out"),
            ("NumberEdgeSwaps", "40"),
            ("StrictEdgeSwaps", "true"),
            ("MaxRandomizeAttempts", "0"),
            ("RandomizeNodes", "yes"),
            ("MinNodeProduction", "0"),
            ("MaxNodeProduction", "10"),
            ("MinNodeConsumption", "1"),
            ("MaxNodeConsumption", "5"),
        ]))
        .unwrap();

        assert_eq!(params.num_swaps, Some(40));
        assert_eq!(params.strategy, SwapStrategy::Strict);
        assert_eq!(params.max_attempts, 1);
        assert_eq!(
            params.node_ranges,
            Some(NodeRanges {
                min_produced: 0.0,
                max_produced: 10.0,
                min_consumed: 1.0,
                max_consumed: 5.0,
            })
        );
    }

    #[test]
    fn test_stress_config_from_settings() {
        let config = stress_config_from(&settings(&[
            ("PowerSuppliedThreshold", "0.8"),
            ("PercentageOfEdgesToCut", "0.1"),
            ("MaxComponents", "50"),
        ]))
        .unwrap();
        assert_eq!(config.power_threshold, 0.8);
        assert_eq!(config.max_components, Some(50));

        for uncapped in ["-1", "0", "0.5"] {
            let config = stress_config_from(&settings(&[
                ("PowerSuppliedThreshold", "0.8"),
                ("PercentageOfEdgesToCut", "0.1"),
                ("MaxComponents", uncapped),
            ]))
            .unwrap();
            assert_eq!(config.max_components, None);
        }

        let malformed = stress_config_from(&settings(&[
            ("PowerSuppliedThreshold", "0.8"),
            ("PercentageOfEdgesToCut", "0.1"),
            ("MaxComponents", "lots"),
        ]));
        assert!(malformed.is_err());

        let invalid = stress_config_from(&settings(&[
            ("PowerSuppliedThreshold", "0.8"),
            ("PercentageOfEdgesToCut", "0"),
        ]));
        assert!(invalid.is_err());
    }
}
