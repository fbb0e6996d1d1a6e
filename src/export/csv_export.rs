//! CSV time-series export of hormone levels.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;

use crate::solver::{Trajectory, TrajectorySample};
use crate::state::HormoneSlot;

/// One CSV row
#[derive(Debug, Clone, Serialize)]
pub struct HormoneRecord {
    /// Simulation time (days)
    pub time_days: f64,
    /// Blood FSH (IU/L)
    pub fsh_IU_per_L: f64,
    /// Blood LH (IU/L)
    pub lh_IU_per_L: f64,
    /// Estradiol (pg/mL)
    pub e2_pg_per_mL: f64,
    /// Progesterone (ng/mL)
    pub p4_ng_per_mL: f64,
    /// FSH–receptor complex
    pub fsh_residual: f64,
    /// Follicles holding state slots
    pub active_follicles: usize,
    /// Largest active follicle (mm), 0 when none
    pub largest_follicle_mm: f64,
}

impl From<&TrajectorySample> for HormoneRecord {
    fn from(s: &TrajectorySample) -> Self {
        Self {
            time_days: s.time,
            fsh_IU_per_L: s.hormone(HormoneSlot::FshBlood),
            lh_IU_per_L: s.hormone(HormoneSlot::LhBlood),
            e2_pg_per_mL: s.e2_pg_per_mL,
            p4_ng_per_mL: s.p4_ng_per_mL,
            fsh_residual: s.fsh_residual(),
            active_follicles: s.active.len(),
            largest_follicle_mm: s.largest_follicle().unwrap_or(0.0),
        }
    }
}

/// CSV exporter for hormone time series
pub struct CsvExporter {
    writer: csv::Writer<File>,
    /// Minimum spacing of rows (days)
    sample_interval_days: f64,
    last_sample_time: f64,
    path: PathBuf,
}

impl CsvExporter {
    /// Create an exporter writing `hormones_<timestamp>.csv` into `dir`.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new<P: AsRef<Path>>(dir: P, sample_interval_days: f64) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating export directory {}", dir.display()))?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Self::to_path(dir.join(format!("hormones_{}.csv", timestamp)), sample_interval_days)
    }

    /// Create an exporter writing to an explicit file
    pub fn to_path<P: AsRef<Path>>(path: P, sample_interval_days: f64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        log::info!("CSV export started: {}", path.display());
        Ok(Self {
            writer: csv::Writer::from_writer(file),
            sample_interval_days,
            // First sample is always written
            last_sample_time: f64::NEG_INFINITY,
            path,
        })
    }

    /// Write a row if the interval has elapsed since the last one
    pub fn maybe_record(&mut self, sample: &TrajectorySample) -> Result<bool> {
        if sample.time - self.last_sample_time >= self.sample_interval_days {
            self.record(sample)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Write a row regardless of the interval
    pub fn record(&mut self, sample: &TrajectorySample) -> Result<()> {
        self.writer.serialize(HormoneRecord::from(sample))?;
        self.last_sample_time = sample.time;
        Ok(())
    }

    /// Write a whole trajectory, thinned to the sample interval
    pub fn record_all(&mut self, trajectory: &Trajectory) -> Result<usize> {
        let mut written = 0;
        for sample in &trajectory.samples {
            if self.maybe_record(sample)? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Finish writing and return the output path
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        log::info!("CSV export completed: {}", self.path.display());
        Ok(self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
