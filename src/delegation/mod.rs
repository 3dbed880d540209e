//! Boss/intern delegation loop.
//!
//! The boss never reads the context. It asks the intern focused questions,
//! collects the answers in an [`EvidenceLog`], and stops when it emits the
//! completion sentinel or its iteration budget is spent.

mod boss;
mod error;
mod intern;
mod reply;
mod state;
mod types;

pub use boss::{Boss, BossSummary};
pub use error::{DelegationError, ResolutionFailure};
pub use intern::Intern;
pub use reply::BossReply;
pub use state::{ResolutionState, ResolutionStateMachine, ResolutionStats};
pub use types::{EvidenceLog, IterationRecord, Query, ResolutionOutcome, Termination};
