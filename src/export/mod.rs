//! Export of simulation output.
//!
//! Provides CSV hormone time series and full JSON trajectories for
//! downstream analysis.

mod csv_export;
mod json_export;

pub use csv_export::{CsvExporter, HormoneRecord};
pub use json_export::{export_trajectory_json, export_trajectory_json_to, TrajectoryExport};
