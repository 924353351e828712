//! Durable state shared across runs: the applied registry, the pending
//! queue for queue-only runs, and the activity log.
//!
//! Every write is flushed and synced before the in-memory view changes, so an
//! interrupted run never forgets a job it already applied to.

mod activity_log;
mod queue;
mod registry;

use std::path::PathBuf;

use thiserror::Error;

pub use activity_log::ActivityLog;
pub use queue::QueueStore;
pub use registry::AppliedRegistry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}
