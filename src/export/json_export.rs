//! JSON export of a full trajectory.
//!
//! Every sample carries its ActiveIndexSet, so consumers can map state
//! slots back to follicle ids across dimension changes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;

use crate::config::ParameterSet;
use crate::solver::{SimulationSummary, Trajectory};
use crate::state::HormoneSlot;

/// Export format version
pub const EXPORT_VERSION: &str = "1.0.0";

/// Top-level JSON document
#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryExport<'a> {
    /// Export timestamp (RFC 3339)
    pub exported_at: String,
    pub version: &'static str,
    /// Names of the fixed state slots, in order
    pub hormone_slots: Vec<&'static str>,
    pub parameters: &'a ParameterSet,
    pub summary: SimulationSummary,
    pub trajectory: &'a Trajectory,
}

impl<'a> TrajectoryExport<'a> {
    pub fn new(trajectory: &'a Trajectory, parameters: &'a ParameterSet) -> Self {
        Self {
            exported_at: Local::now().to_rfc3339(),
            version: EXPORT_VERSION,
            hormone_slots: HormoneSlot::ALL.iter().map(|s| s.name()).collect(),
            parameters,
            summary: trajectory.summary(),
            trajectory,
        }
    }
}

/// Export into `dir` as `trajectory_YYYYMMDD_HHMMSS.json`.
///
/// Creates the directory if it doesn't exist and returns the file path.
pub fn export_trajectory_json<P: AsRef<Path>>(
    trajectory: &Trajectory,
    parameters: &ParameterSet,
    dir: P,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating export directory {}", dir.display()))?;
    let filename = format!("trajectory_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);
    export_trajectory_json_to(trajectory, parameters, &path)?;
    Ok(path)
}

/// Export to a specific file
pub fn export_trajectory_json_to<P: AsRef<Path>>(
    trajectory: &Trajectory,
    parameters: &ParameterSet,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let export = TrajectoryExport::new(trajectory, parameters);
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &export)?;
    log::info!(
        "JSON trajectory exported: {} ({} samples)",
        path.display(),
        trajectory.len()
    );
    Ok(())
}
