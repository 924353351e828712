use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use super::StoreError;

/// Ids of listings already applied to, backed by a newline-delimited file.
///
/// Ids are only ever added. `contains` never flips from true to false.
#[derive(Debug)]
pub struct AppliedRegistry {
    path: PathBuf,
    ids: HashSet<String>,
    /// The file has content whose last line was cut short of its `\n`.
    unterminated: bool,
}

impl AppliedRegistry {
    /// Reads every recorded id. A missing file is an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let (ids, unterminated) = match fs::read_to_string(&path) {
            Ok(contents) => (
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
                !contents.is_empty() && !contents.ends_with('\n'),
            ),
            Err(err) if err.kind() == ErrorKind::NotFound => (HashSet::new(), false),
            Err(err) => return Err(StoreError::io(&path)(err)),
        };
        tracing::debug!(path = %path.display(), count = ids.len(), "applied registry loaded");
        Ok(Self {
            path,
            ids,
            unterminated,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Appends `id` durably, then adds it to the in-memory set.
    ///
    /// Returns `false` (and writes nothing) when the id is already recorded.
    pub fn record(&mut self, id: &str) -> Result<bool, StoreError> {
        if self.ids.contains(id) {
            return Ok(false);
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(StoreError::io(&self.path))?;
        let line = if self.unterminated {
            format!("\n{id}\n")
        } else {
            format!("{id}\n")
        };
        file.write_all(line.as_bytes())
            .map_err(StoreError::io(&self.path))?;
        file.sync_data().map_err(StoreError::io(&self.path))?;

        self.unterminated = false;
        self.ids.insert(id.to_string());
        Ok(true)
    }
}
