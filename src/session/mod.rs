//! Interactive sessions at breakpoints
//!
//! A [`SessionRunner`] hands the working environment to the operator and does
//! not return until the operator is done. The stepper awaits it inline, so no
//! directive can run while a session is open.

mod terminal;

pub use terminal::TerminalSession;

use crate::engine::{CallLog, EngineCall, WorkingEnvironment};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while opening or waiting on a session
#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine produced no command to launch
    #[error("No session command available for environment {0}")]
    EmptyCommand(String),

    /// The session process could not be started
    #[error("Failed to start session with {program}: {source}")]
    Start {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the session process failed
    #[error("Lost track of session process: {0}")]
    Wait(#[source] std::io::Error),
}

#[async_trait]
pub trait SessionRunner: Send + Sync {
    /// Blocks until the operator ends the session
    async fn attach(&self, env: &WorkingEnvironment) -> Result<(), SessionError>;
}

/// Session runner that returns immediately and records each attachment
#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    log: CallLog,
    fail_with: Option<String>,
}

impl RecordingSession {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_with: None,
        }
    }

    /// Every attach fails as if the session program were missing
    pub fn failing(log: CallLog, program: impl Into<String>) -> Self {
        Self {
            log,
            fail_with: Some(program.into()),
        }
    }
}

#[async_trait]
impl SessionRunner for RecordingSession {
    async fn attach(&self, env: &WorkingEnvironment) -> Result<(), SessionError> {
        self.log.record(EngineCall::Attach(env.id().to_string()));
        match &self.fail_with {
            Some(program) => Err(SessionError::Start {
                program: program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
            None => Ok(()),
        }
    }
}
