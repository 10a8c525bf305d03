//! Report generation for stress runs.
//!
//! Produces the human-readable summary lines written to the log, the
//! one-line CSV summary used for spreadsheet ingestion in batch mode, and an
//! optional JSON report.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use super::stress::{StressConfig, StressReport};

/// Column names matching [`summary_csv_line`]
pub const SUMMARY_CSV_HEADER: &str =
    "filename,nodes,starting_edges,ending_edges,components,powered_components,avg_power_percentage";

/// Human-readable before/after summary of a stress run
pub fn stress_summary_lines(report: &StressReport) -> Vec<String> {
    let initial = &report.initial;
    let last = &report.final_state;

    vec![
        format!(
            "Number of edges cut: {} (of {})",
            report.edges_cut(),
            initial.num_edges
        ),
        format!(
            "Ending component count: {} (of {})",
            last.num_components, initial.num_components
        ),
        format!(
            "Ending powered component count: {} (of {})",
            last.num_components_powered, initial.num_components_powered
        ),
        format!(
            "Ending average percentage power supplied: {:.2}% (from {:.2}%)",
            last.power_percent(),
            initial.power_percent()
        ),
        format!("Iterations: {}", report.iterations),
    ]
}

/// One CSV row: file, node count, starting/ending edges, components, powered components, adequacy
pub fn summary_csv_line(file_name: &str, report: &StressReport) -> String {
    let last = &report.final_state;
    format!(
        "{},{},{},{},{},{},{:.6}",
        csv_field(file_name),
        last.num_nodes,
        report.initial.num_edges,
        last.num_edges,
        last.num_components,
        last.num_components_powered,
        last.avg_power_percentage
    )
}

/// Quote a field if it would otherwise break the row
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write a header row followed by `rows`
pub fn write_summary_csv(output_path: &Path, rows: &[String]) -> Result<()> {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(SUMMARY_CSV_HEADER.to_string());
    lines.extend(rows.iter().cloned());

    fs::write(output_path, lines.join("\n") + "\n")
        .with_context(|| format!("Failed to write summary CSV to {}", output_path.display()))?;

    log::info!("Summary CSV written to {}", output_path.display());
    Ok(())
}

#[derive(Serialize)]
struct JsonStressReport<'a> {
    generated_at: String,
    graph_file: String,
    config: &'a StressConfig,
    edges_cut: usize,
    #[serde(flatten)]
    report: &'a StressReport,
}

/// Write the full stress report, including per-iteration history, as JSON
pub fn generate_json_report(
    report: &StressReport,
    config: &StressConfig,
    graph_file: &Path,
    output_path: &Path,
) -> Result<()> {
    let document = JsonStressReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        graph_file: graph_file.display().to_string(),
        config,
        edges_cut: report.edges_cut(),
        report,
    };

    let json = serde_json::to_string_pretty(&document)
        .context("Failed to serialize stress report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}
