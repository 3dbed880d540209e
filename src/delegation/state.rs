//! Resolution state machine.

use serde::{Deserialize, Serialize};

/// Current state of one boss resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionState {
    #[default]
    Init,
    Iterate,
    Maxed,
    Done,
    Error,
}

impl ResolutionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// State machine for tracking resolution progress.
#[derive(Debug, Clone, Default)]
pub struct ResolutionStateMachine {
    state: ResolutionState,
    boss_calls: usize,
    intern_calls: usize,
}

impl ResolutionStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn transition(&mut self, new_state: ResolutionState) {
        debug_assert!(
            !self.state.is_terminal(),
            "transition out of terminal state {:?}",
            self.state
        );
        tracing::debug!(from = ?self.state, to = ?new_state, "State transition");
        self.state = new_state;
    }

    pub fn record_boss_call(&mut self) {
        self.boss_calls = self.boss_calls.saturating_add(1);
    }

    pub fn record_intern_call(&mut self) {
        self.intern_calls = self.intern_calls.saturating_add(1);
    }

    #[must_use]
    pub fn stats(&self) -> ResolutionStats {
        ResolutionStats {
            boss_calls: self.boss_calls,
            intern_calls: self.intern_calls,
        }
    }
}

/// Model calls made by one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionStats {
    pub boss_calls: usize,
    pub intern_calls: usize,
}
