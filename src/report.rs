//! Tabular and JSON output of measurement points.

use crate::orchestrator::Observation;
use anyhow::Context;
use std::path::Path;

const COLUMNS: [&str; 11] = [
    "Avg record size",
    "Target rate",
    "Test time",
    "Total changes",
    "Achieved rate",
    "Avg CM time",
    "Seen by CDC",
    "Processed by CDC",
    "Time in CDC",
    "CDC download",
    "CDC process",
];

fn row(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| format!("{cell:>15}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Header line printed before the first point.
pub fn header() -> String {
    row(&COLUMNS.map(String::from))
}

/// Format `value` with a K/M magnitude and a unit suffix.
pub fn readable(value: f64, suffix: &str) -> String {
    if value > 1_000_000.0 {
        format!("{:.2}M {suffix}", value / 1_000_000.0)
    } else if value > 1000.0 {
        format!("{:.2}K {suffix}", value / 1000.0)
    } else {
        format!("{value:.2} {suffix}")
    }
}

/// One report line for a measurement point.
pub fn format_row(observation: &Observation) -> String {
    let load = &observation.load;
    let capture = &observation.capture;
    row(&[
        readable(capture.average_record_size_bytes, "B"),
        readable(observation.target_rate as f64, "ch/s"),
        readable(observation.test_duration_ms as f64 / 1000.0, "s"),
        readable(load.total_changes as f64, "chgs"),
        readable(load.achieved_rate(), "ch/s"),
        readable(load.average_worker_runtime_ms / 1000.0, "s"),
        readable(capture.records_seen as f64, "chgs"),
        readable(capture.records_processed as f64, "chgs"),
        readable(capture.duration_ms as f64 / 1000.0, "s"),
        readable(capture.download_rate(), "ch/s"),
        readable(capture.process_rate(), "ch/s"),
    ])
}

/// Write all observations as pretty printed JSON.
pub fn write_json(path: &Path, observations: &[Observation]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(observations)
        .context("Failed to serialize observations")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write observations to {}", path.display()))
}
