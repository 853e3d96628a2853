use crate::performance::metrics::{FailureRow, HistoryRow, StatsRow};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const FAILURE_HEADERS: [&str; 4] = ["Method", "Name", "Error", "Occurrences"];

/// File name prefix of one run, e.g. `graphql_1000_users`.
pub fn run_prefix(scenario: &str, users: u32) -> String {
    format!("{}_{}_users", scenario, users)
}

/// The three CSV files a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFiles {
    dir: PathBuf,
    prefix: String,
}

impl ResultFiles {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn stats(&self) -> PathBuf {
        self.dir.join(format!("{}_stats.csv", self.prefix))
    }

    pub fn failures(&self) -> PathBuf {
        self.dir.join(format!("{}_failures.csv", self.prefix))
    }

    pub fn history(&self) -> PathBuf {
        self.dir.join(format!("{}_stats_history.csv", self.prefix))
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create results directory: {}", self.dir.display()))
    }

    pub fn write_stats(&self, rows: &[StatsRow]) -> Result<()> {
        let path = self.stats();
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_failures(&self, rows: &[FailureRow]) -> Result<()> {
        let path = self.failures();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record(FAILURE_HEADERS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Appends aggregated rows to `<prefix>_stats_history.csv` as the run progresses.
pub struct HistoryWriter {
    writer: csv::Writer<File>,
}

impl HistoryWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self { writer })
    }

    pub fn append(&mut self, row: &HistoryRow) -> Result<()> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads a stats CSV back into rows.
pub fn read_stats(path: &Path) -> Result<Vec<StatsRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: StatsRow = row.with_context(|| format!("Malformed row in {}", path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}
