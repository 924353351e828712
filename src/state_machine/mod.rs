mod attempt;
mod state;

#[cfg(test)]
pub(crate) use attempt::candidate;
pub use attempt::{ApplicationOutcome, ApplicationRecord, Attempt, JobCandidate, SkipReason};
#[cfg(test)]
pub use attempt::Rationale;
#[cfg(test)]
pub use state::ApplicationState;
pub use state::{Event, StateMachine, Transition};
