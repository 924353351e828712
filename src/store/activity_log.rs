use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::state_machine::ApplicationRecord;

const HEADER: [&str; 6] = ["timestamp", "job_title", "company", "city", "distance", "status"];

/// One CSV row as it appears on disk. Unknown distance is an empty cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub job_title: String,
    pub company: String,
    pub city: String,
    pub distance: Option<f64>,
    pub status: String,
}

impl From<&ApplicationRecord> for LogEntry {
    fn from(record: &ApplicationRecord) -> Self {
        Self {
            timestamp: record.timestamp.to_rfc3339(),
            job_title: record.title.clone(),
            company: record.company.clone(),
            city: record.city.clone(),
            distance: record.distance_miles,
            status: record.status.to_string(),
        }
    }
}

/// Append-only CSV of every processed candidate.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Appends one row, writing the header first if the file is new or empty.
    pub fn append(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(err) if err.kind() == ErrorKind::NotFound => true,
            Err(err) => return Err(StoreError::io(&self.path)(err)),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(StoreError::io(&self.path))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let csv_err = |source| StoreError::Csv {
            path: self.path.clone(),
            source,
        };
        if needs_header {
            writer.write_record(HEADER).map_err(csv_err)?;
        }
        writer.serialize(LogEntry::from(record)).map_err(csv_err)?;

        writer.flush().map_err(StoreError::io(&self.path))?;
        writer
            .get_ref()
            .sync_data()
            .map_err(StoreError::io(&self.path))
    }

    /// Every row written so far; empty when the log does not exist yet.
    #[cfg(test)]
    pub fn entries(&self) -> Result<Vec<LogEntry>, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&self.path)(err)),
        };
        csv::Reader::from_reader(file)
            .deserialize()
            .collect::<Result<Vec<LogEntry>, _>>()
            .map_err(|source| StoreError::Csv {
                path: self.path.clone(),
                source,
            })
    }
}
