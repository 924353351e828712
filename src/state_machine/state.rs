use std::fmt;

use serde::{Deserialize, Serialize};

use super::attempt::{ApplicationOutcome, Attempt, Rationale, SkipReason};

/// States of one application attempt.
///
/// DISCOVERED → EVALUATING → {SKIPPED, QUEUED} | APPLYING → {APPLIED, ERROR}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationState {
    Discovered,
    Evaluating,
    Applying,
    Skipped,
    Queued,
    Applied,
    Error,
}

impl ApplicationState {
    pub fn outcome(self) -> Option<ApplicationOutcome> {
        match self {
            ApplicationState::Skipped => Some(ApplicationOutcome::Skipped),
            ApplicationState::Queued => Some(ApplicationOutcome::Queued),
            ApplicationState::Applied => Some(ApplicationOutcome::Applied),
            ApplicationState::Error => Some(ApplicationOutcome::Error),
            ApplicationState::Discovered
            | ApplicationState::Evaluating
            | ApplicationState::Applying => None,
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationState::Discovered => write!(f, "DISCOVERED"),
            ApplicationState::Evaluating => write!(f, "EVALUATING"),
            ApplicationState::Applying => write!(f, "APPLYING"),
            ApplicationState::Skipped => write!(f, "SKIPPED"),
            ApplicationState::Queued => write!(f, "QUEUED"),
            ApplicationState::Applied => write!(f, "APPLIED"),
            ApplicationState::Error => write!(f, "ERROR"),
        }
    }
}

/// What happened while the attempt was in its current state.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Start evaluating the listing.
    Evaluate,
    /// Hand the candidate to the pending queue instead of applying.
    Enqueue,
    /// A criteria check failed.
    Reject(SkipReason),
    /// All criteria passed.
    Qualify,
    /// A confirmation phrase appeared after submitting.
    Confirm(String),
    /// An operational failure while opening, filling or submitting.
    Fail(String),
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::Evaluate => "evaluate",
            Event::Enqueue => "enqueue",
            Event::Reject(_) => "reject",
            Event::Qualify => "qualify",
            Event::Confirm(_) => "confirm",
            Event::Fail(_) => "fail",
        }
    }
}

/// The result of feeding an event to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Advanced to a non-terminal state.
    Next(ApplicationState),
    /// Reached a terminal state.
    Complete(ApplicationOutcome),
    /// The event is not valid in the current state; nothing changed.
    Rejected {
        state: ApplicationState,
        event: &'static str,
    },
}

/// Drives an [`Attempt`] through the application states.
pub struct StateMachine;

impl StateMachine {
    /// Apply `event` to the attempt's current state.
    ///
    /// Terminal states accept no further events, and no state is ever
    /// re-entered: there is no retry edge.
    pub fn next(attempt: &mut Attempt, event: Event) -> Transition {
        use ApplicationState::*;

        let event_name = event.name();
        let (target, rationale) = match (attempt.state, event) {
            (Discovered, Event::Evaluate) => (Evaluating, None),
            (Discovered, Event::Enqueue) => (Queued, Some(Rationale::Queued)),
            (Evaluating, Event::Reject(reason)) => (Skipped, Some(Rationale::Skipped(reason))),
            (Evaluating, Event::Qualify) => (Applying, None),
            (Evaluating | Applying, Event::Fail(message)) => (Error, Some(Rationale::Failed(message))),
            (Applying, Event::Confirm(phrase)) => (Applied, Some(Rationale::Confirmed(phrase))),
            (state, _) => {
                return Transition::Rejected {
                    state,
                    event: event_name,
                };
            }
        };

        attempt.state_history.push(attempt.state);
        attempt.state = target;
        if rationale.is_some() {
            attempt.rationale = rationale;
        }

        match target.outcome() {
            Some(outcome) => Transition::Complete(outcome),
            None => Transition::Next(target),
        }
    }
}
