use super::StepperState;
use crate::engine::EngineError;
use crate::session::SessionError;
use thiserror::Error;

/// Reasons a stepper run ends in [`StepperState::Failed`].
///
/// `index` fields are 1-based script line numbers.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Stepper already used (state: {0}); create a new one for each run")]
    NotIdle(StepperState),

    #[error("Failed to create working environment from {base_image}: {source}")]
    EngineInit {
        base_image: String,
        #[source]
        source: EngineError,
    },

    #[error("Command on line {index} failed with exit code {}", display_code(.exit_code))]
    CommandFailed {
        index: usize,
        exit_code: Option<i64>,
        output: String,
    },

    #[error("Engine could not run command on line {index}: {source}")]
    Execute {
        index: usize,
        #[source]
        source: EngineError,
    },

    #[error("Could not open session at breakpoint on line {index}: {source}")]
    SessionStart {
        index: usize,
        #[source]
        source: SessionError,
    },

    #[error("Failed to commit image {target}: {source}")]
    CommitFailed {
        target: String,
        #[source]
        source: EngineError,
    },
}

fn display_code(code: &Option<i64>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

impl StepError {
    /// Script line the failure is attributed to, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            StepError::CommandFailed { index, .. }
            | StepError::Execute { index, .. }
            | StepError::SessionStart { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn help_message(&self) -> String {
        match self {
            StepError::NotIdle(_) => format!(
                "Error: {}\n\n\
                Help: A stepper performs exactly one run. Construct a new\n\
                BuildStepper for every build.",
                self
            ),
            StepError::EngineInit { base_image, source } => format!(
                "Error: Could not start a working environment\nBase image: {}\n\n\
                Help: Check that:\n\
                - the base image reference is correct (BREAKSTEP_BASE_IMAGE or --base-image)\n\
                - the engine is installed and reachable (buildah on PATH, or a running Docker daemon)\n\
                - you can pull from the registry hosting the image\n\n\
                Details: {}",
                base_image, source
            ),
            StepError::CommandFailed {
                index,
                exit_code,
                output,
            } => {
                let mut message = format!(
                    "Error: RUN on line {} exited with code {}\n",
                    index,
                    display_code(exit_code)
                );
                if !output.trim().is_empty() {
                    message.push_str("\nOutput:\n");
                    message.push_str(output.trim_end());
                    message.push('\n');
                }
                message.push_str(&format!(
                    "\nHelp: Insert a breakpoint before the failing command to inspect\n\
                    the environment interactively:\n\
                    breakstep set-breakpoint <file> {}",
                    index
                ));
                message
            }
            StepError::Execute { index, source } => format!(
                "Error: The engine failed while running line {}\n\n\
                Help: The command never produced an exit status. Check the engine\n\
                logs and storage configuration (BREAKSTEP_STORAGE_DRIVER,\n\
                BREAKSTEP_GRAPH_ROOT).\n\n\
                Details: {}",
                index, source
            ),
            StepError::SessionStart { index, source } => format!(
                "Error: Breakpoint on line {} could not open a shell\n\n\
                Help: Check that the shell exists inside the image\n\
                (BREAKSTEP_SHELL or --shell, default /bin/sh) and that the engine\n\
                binary is on PATH.\n\n\
                Details: {}",
                index, source
            ),
            StepError::CommitFailed { target, source } => format!(
                "Error: Could not commit image {}\n\n\
                Help: Check the target reference (BREAKSTEP_TARGET_IMAGE or --tag)\n\
                and available disk space.\n\n\
                Details: {}",
                target, source
            ),
        }
    }
}
