//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while stepping through a build script.
///
/// `line` fields are 1-based script line numbers.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    Started {
        base_image: String,
        target: String,
        directives: usize,
    },

    /// Working environment created
    EnvironmentReady { id: String },

    /// Command about to run inside the environment
    CommandStarted { line: usize, argv: Vec<String> },

    /// Command finished, successfully or not
    CommandFinished {
        line: usize,
        exit_code: Option<i64>,
        output: String,
        duration: Duration,
    },

    /// Paused at a breakpoint; a session is about to open
    BreakpointReached { line: usize, environment: String },

    /// Operator closed the session; stepping resumes
    SessionEnded { line: usize },

    /// All directives done, commit starting
    Committing { target: String },

    /// Image committed
    Committed {
        reference: String,
        id: String,
        total_time: Duration,
    },

    /// Run failed and the environment was left in place on request
    EnvironmentKept { id: String },

    /// Run failed
    Failed { error: String },
}

/// Trait for handling progress events during a build
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
