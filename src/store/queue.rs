use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use super::StoreError;
use crate::state_machine::JobCandidate;

/// Pending candidates handed to a separate executor, stored as one JSON
/// array that is rewritten on every enqueue.
#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Current queue contents. A missing or unreadable document reads as empty.
    pub fn pending(&self) -> Result<Vec<JobCandidate>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&self.path)(err)),
        };
        match serde_json::from_str(&contents) {
            Ok(queue) => Ok(queue),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "queue document unreadable, starting fresh");
                Ok(Vec::new())
            }
        }
    }

    /// Adds `job` unless a job with the same id is already queued.
    /// Returns whether the queue changed.
    pub fn enqueue(&self, job: &JobCandidate) -> Result<bool, StoreError> {
        let mut queue = self.pending()?;
        if queue.iter().any(|queued| queued.id == job.id) {
            return Ok(false);
        }
        queue.push(job.clone());
        self.write(&queue)?;
        Ok(true)
    }

    // Write to a sibling file and rename so a crash never leaves half a document.
    fn write(&self, queue: &[JobCandidate]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(queue).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        let staging = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&staging).map_err(StoreError::io(&staging))?;
        file.write_all(json.as_bytes())
            .map_err(StoreError::io(&staging))?;
        file.sync_all().map_err(StoreError::io(&staging))?;
        fs::rename(&staging, &self.path).map_err(StoreError::io(&self.path))
    }
}
