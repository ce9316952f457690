//! Operator-facing progress output

use super::{ProgressEvent, ProgressHandler};
use std::io::{self, Write};
use std::sync::Mutex;

/// Prints command output and breakpoint banners as plain text.
///
/// Write errors are ignored; a closed stdout must not fail the build.
pub struct ConsoleHandler {
    out: Mutex<Box<dyn Write + Send>>,
    breakpoints_only: bool,
}

impl ConsoleHandler {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            breakpoints_only: false,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Prints only the breakpoint and resume banners, for quiet runs
    pub fn breakpoints_only(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            breakpoints_only: true,
        }
    }

    pub fn stderr_breakpoints_only() -> Self {
        Self::breakpoints_only(Box::new(io::stderr()))
    }

    fn shows(&self, event: &ProgressEvent) -> bool {
        !self.breakpoints_only
            || matches!(
                event,
                ProgressEvent::BreakpointReached { .. } | ProgressEvent::SessionEnded { .. }
            )
    }

    fn render(event: &ProgressEvent) -> Option<String> {
        match event {
            ProgressEvent::Started {
                base_image, target, ..
            } => Some(format!("Building {} from {}\n", target, base_image)),
            ProgressEvent::CommandStarted { line, argv } => {
                Some(format!("Step {}: RUN {}\n", line, argv.join(" ")))
            }
            ProgressEvent::CommandFinished {
                output, exit_code, ..
            } => {
                let mut text = output.clone();
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                if *exit_code != Some(0) {
                    match exit_code {
                        Some(code) => text.push_str(&format!("Command exited with code {}\n", code)),
                        None => text.push_str("Command terminated without an exit code\n"),
                    }
                }
                Some(text)
            }
            ProgressEvent::BreakpointReached { line, .. } => Some(format!(
                "Breakpoint at line {}\nEntering interactive shell. Type 'exit' to continue.\n",
                line
            )),
            ProgressEvent::SessionEnded { line } => {
                Some(format!("Resuming after breakpoint at line {}\n", line))
            }
            ProgressEvent::Committing { target } => Some(format!("Committing {}\n", target)),
            ProgressEvent::EnvironmentKept { id } => Some(format!(
                "Working environment {} kept for inspection\n",
                id
            )),
            ProgressEvent::EnvironmentReady { id } => {
                Some(format!("Working environment {}\n", id))
            }
            ProgressEvent::Committed { .. }
            | ProgressEvent::Failed { .. } => None,
        }
    }
}

impl ProgressHandler for ConsoleHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        if !self.shows(event) {
            return;
        }
        let Some(text) = Self::render(event) else {
            return;
        };
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }
}
