//! Client-side view of one execution's lifecycle.

use crate::model::ExecutionState;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    Cancelled,
    TimedOut,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LifecycleState::Submitted | LifecycleState::Polling)
    }

    /// Fold one observed service state into the lifecycle.
    ///
    /// Terminal states absorb every further observation.
    pub fn observe(self, observed: ExecutionState) -> Self {
        if self.is_terminal() {
            return self;
        }
        match observed {
            ExecutionState::Queued | ExecutionState::Running => LifecycleState::Polling,
            ExecutionState::Succeeded => LifecycleState::Succeeded,
            ExecutionState::Failed => LifecycleState::Failed,
            ExecutionState::Cancelled => LifecycleState::Cancelled,
        }
    }

    /// Local poll budget ran out.
    pub fn time_out(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            LifecycleState::TimedOut
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Submitted => "submitted",
            LifecycleState::Polling => "polling",
            LifecycleState::Succeeded => "succeeded",
            LifecycleState::Failed => "failed",
            LifecycleState::Cancelled => "cancelled",
            LifecycleState::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OBSERVED: [ExecutionState; 5] = [
        ExecutionState::Queued,
        ExecutionState::Running,
        ExecutionState::Succeeded,
        ExecutionState::Failed,
        ExecutionState::Cancelled,
    ];

    #[test]
    fn first_observation_leaves_submitted() {
        assert_eq!(
            LifecycleState::Submitted.observe(ExecutionState::Queued),
            LifecycleState::Polling
        );
        assert_eq!(
            LifecycleState::Submitted.observe(ExecutionState::Succeeded),
            LifecycleState::Succeeded
        );
    }

    #[test]
    fn polling_follows_the_service() {
        let s = LifecycleState::Polling;
        assert_eq!(s.observe(ExecutionState::Running), LifecycleState::Polling);
        assert_eq!(s.observe(ExecutionState::Failed), LifecycleState::Failed);
        assert_eq!(
            s.observe(ExecutionState::Cancelled),
            LifecycleState::Cancelled
        );
        assert_eq!(s.time_out(), LifecycleState::TimedOut);
    }

    #[test]
    fn terminal_states_never_move() {
        for terminal in [
            LifecycleState::Succeeded,
            LifecycleState::Failed,
            LifecycleState::Cancelled,
            LifecycleState::TimedOut,
        ] {
            assert!(terminal.is_terminal());
            for observed in ALL_OBSERVED {
                assert_eq!(terminal.observe(observed), terminal);
            }
            assert_eq!(terminal.time_out(), terminal);
        }
        assert!(!LifecycleState::Submitted.is_terminal());
        assert!(!LifecycleState::Polling.is_terminal());
    }
}
