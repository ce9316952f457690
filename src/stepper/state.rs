use serde::Serialize;
use std::fmt;

/// Lifecycle of a single stepper run.
///
/// ```text
/// Idle -> Running -> Paused -> Running
///                 -> Committing -> Committed
///                 -> Failed        (also from Committing)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepperState {
    Idle,
    Running,
    Paused,
    Committing,
    Committed,
    Failed,
}

impl StepperState {
    pub fn can_transition_to(self, next: StepperState) -> bool {
        use StepperState::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Running, Paused)
                | (Running, Committing)
                | (Running, Failed)
                | (Paused, Running)
                | (Committing, Committed)
                | (Committing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StepperState::Committed | StepperState::Failed)
    }
}

impl fmt::Display for StepperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepperState::Idle => "idle",
            StepperState::Running => "running",
            StepperState::Paused => "paused",
            StepperState::Committing => "committing",
            StepperState::Committed => "committed",
            StepperState::Failed => "failed",
        };
        f.write_str(name)
    }
}
