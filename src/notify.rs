//! Success notifications. Delivery is best-effort: callers log a failed
//! notification and carry on.

use std::io;

use console::{Style, Term};
use thiserror::Error;

use crate::state_machine::ApplicationRecord;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("could not deliver notification: {0}")]
    Io(#[from] io::Error),
}

pub trait Notifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

pub const APPLIED_TITLE: &str = "Application sent";

/// `"<title> at <company> - <distance> mi away"`, without the distance part
/// when it is unknown.
pub fn applied_message(record: &ApplicationRecord) -> String {
    match record.distance_miles {
        Some(miles) => format!("{} at {} - {miles} mi away", record.title, record.company),
        None => format!("{} at {}", record.title, record.company),
    }
}

/// Rings the terminal bell and prints a highlighted line on stderr.
pub struct ConsoleNotifier {
    term: Term,
    style: Style,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            style: Style::new().magenta().bold(),
        }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ConsoleNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        self.term.write_str("\x07")?;
        self.term
            .write_line(&format!("  {} {message}", self.style.apply_to(format!("[{title}]"))))?;
        Ok(())
    }
}
