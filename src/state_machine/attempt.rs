use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::ApplicationState;

/// A quick-apply listing produced by discovery. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCandidate {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub link: String,
}

/// Terminal status of one attempt, as written to the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationOutcome {
    Queued,
    Applied,
    Skipped,
    Error,
}

impl fmt::Display for ApplicationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApplicationOutcome::Queued => "Queued",
            ApplicationOutcome::Applied => "Applied",
            ApplicationOutcome::Skipped => "Skipped",
            ApplicationOutcome::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Why evaluation short-circuited to `Skipped`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    JobTypeMissing,
    JobTypeRejected(String),
    SalaryMissing,
    SalaryBelowFloor { listed: String, minimum: f64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::JobTypeMissing => write!(f, "job type not listed"),
            SkipReason::JobTypeRejected(kind) => write!(f, "job type is {kind}"),
            SkipReason::SalaryMissing => write!(f, "salary not listed"),
            SkipReason::SalaryBelowFloor { listed, minimum } => {
                write!(f, "salary too low ({listed}, minimum {minimum})")
            }
        }
    }
}

/// The rationale kept for the terminal state of an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rationale {
    Skipped(SkipReason),
    Failed(String),
    Confirmed(String),
    Queued,
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rationale::Skipped(reason) => write!(f, "{reason}"),
            Rationale::Failed(message) => write!(f, "{message}"),
            Rationale::Confirmed(phrase) => write!(f, "confirmed by \"{phrase}\""),
            Rationale::Queued => write!(f, "queued for a separate executor"),
        }
    }
}

/// One candidate's trip through the state machine.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub candidate: JobCandidate,
    /// The searched location this candidate was found under.
    pub city: String,
    pub state: ApplicationState,
    pub state_history: Vec<ApplicationState>,
    pub distance_miles: Option<f64>,
    pub rationale: Option<Rationale>,
}

impl Attempt {
    pub fn new(candidate: JobCandidate, city: impl Into<String>) -> Self {
        Self {
            candidate,
            city: city.into(),
            state: ApplicationState::Discovered,
            state_history: Vec::new(),
            distance_miles: None,
            rationale: None,
        }
    }

    pub fn outcome(&self) -> Option<ApplicationOutcome> {
        self.state.outcome()
    }

    /// Every state visited, current one last.
    pub fn transitions(&self) -> Vec<ApplicationState> {
        let mut all = self.state_history.clone();
        all.push(self.state);
        all
    }
}

/// Write-once row of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub timestamp: DateTime<Utc>,
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub city: String,
    pub distance_miles: Option<f64>,
    pub status: ApplicationOutcome,
}

impl ApplicationRecord {
    /// Record for a finished attempt; `None` while it is still in flight.
    pub fn from_attempt(attempt: &Attempt) -> Option<Self> {
        Some(Self {
            timestamp: Utc::now(),
            job_id: attempt.candidate.id.clone(),
            title: attempt.candidate.title.clone(),
            company: attempt.candidate.company.clone(),
            city: attempt.city.clone(),
            distance_miles: attempt.distance_miles,
            status: attempt.outcome()?,
        })
    }
}

#[cfg(test)]
pub(crate) fn candidate(id: &str, location: &str) -> JobCandidate {
    JobCandidate {
        id: id.to_string(),
        title: format!("Role {id}"),
        company: "Acme".to_string(),
        location: location.to_string(),
        link: format!("https://jobs.test/viewjob?jk={id}"),
    }
}
