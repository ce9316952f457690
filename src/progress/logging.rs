//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                base_image,
                target,
                directives,
            } => {
                info!(base = %base_image, target = %target, directives, "Starting build");
            }
            ProgressEvent::EnvironmentReady { id } => {
                debug!(environment = %id, "Working environment ready");
            }
            ProgressEvent::CommandStarted { line, argv } => {
                info!(line, command = %argv.join(" "), "Running command");
            }
            ProgressEvent::CommandFinished {
                line,
                exit_code,
                output,
                duration,
            } => {
                if *exit_code == Some(0) {
                    debug!(
                        line,
                        duration_ms = duration.as_millis(),
                        output_bytes = output.len(),
                        "Command complete"
                    );
                } else {
                    warn!(
                        line,
                        exit_code = ?exit_code,
                        duration_ms = duration.as_millis(),
                        "Command failed"
                    );
                }
            }
            ProgressEvent::BreakpointReached { line, environment } => {
                info!(line, environment = %environment, "Paused at breakpoint");
            }
            ProgressEvent::SessionEnded { line } => {
                info!(line, "Resuming after breakpoint");
            }
            ProgressEvent::Committing { target } => {
                info!(target = %target, "Committing image");
            }
            ProgressEvent::Committed {
                reference,
                id,
                total_time,
            } => {
                info!(
                    reference = %reference,
                    image_id = %id,
                    total_time_ms = total_time.as_millis(),
                    "Build complete"
                );
            }
            ProgressEvent::EnvironmentKept { id } => {
                warn!(environment = %id, "Keeping working environment for inspection");
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Build failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::Started {
                base_image: "alpine".to_string(),
                target: "app:dbg".to_string(),
                directives: 2,
            },
            ProgressEvent::EnvironmentReady {
                id: "ctr".to_string(),
            },
            ProgressEvent::CommandStarted {
                line: 1,
                argv: vec!["echo".to_string(), "a".to_string()],
            },
            ProgressEvent::CommandFinished {
                line: 1,
                exit_code: Some(0),
                output: "a\n".to_string(),
                duration: Duration::from_millis(10),
            },
            ProgressEvent::CommandFinished {
                line: 1,
                exit_code: None,
                output: String::new(),
                duration: Duration::from_millis(10),
            },
            ProgressEvent::BreakpointReached {
                line: 2,
                environment: "ctr".to_string(),
            },
            ProgressEvent::SessionEnded { line: 2 },
            ProgressEvent::Committing {
                target: "app:dbg".to_string(),
            },
            ProgressEvent::Committed {
                reference: "app:dbg".to_string(),
                id: "sha256:abc".to_string(),
                total_time: Duration::from_secs(1),
            },
            ProgressEvent::EnvironmentKept {
                id: "ctr".to_string(),
            },
            ProgressEvent::Failed {
                error: "Test error".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
