//! Build engine abstraction
//!
//! The stepper never builds anything itself. It drives a [`BuildEngine`]
//! that owns image pulls, layer storage and commits. Two interchangeable
//! engines ship with the crate:
//!
//! - [`BuildahEngine`]: shells out to the `buildah` CLI
//! - [`DockerEngine`]: talks to the Docker Engine API through bollard
//!
//! [`MockEngine`] records calls for tests.
//!
//! # Example
//!
//! ```no_run
//! use breakstep::engine::{create_engine, BuildEngine};
//! use breakstep::BreakstepConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BreakstepConfig::default();
//! let engine = create_engine(&config)?;
//!
//! let mut env = engine.create_environment(&config.base_image).await?;
//! let out = engine
//!     .execute(&mut env, &["uname".to_string(), "-a".to_string()])
//!     .await?;
//! println!("{}", out.output);
//! engine.discard(env).await?;
//! # Ok(())
//! # }
//! ```

pub mod buildah;
pub mod docker;
pub mod mock;
mod process;

pub use buildah::BuildahEngine;
pub use docker::DockerEngine;
pub use mock::{CallLog, EngineCall, MockEngine};

use crate::config::{BreakstepConfig, EngineKind};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors reported by a build engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine tool could not be launched at all
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine tool ran but reported failure
    #[error("{program} {action} failed (exit code {code:?}): {stderr}")]
    ToolFailed {
        program: String,
        action: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Docker Engine API error
    #[error("Docker API error: {0}")]
    Docker(#[from] bollard::errors::Error),

    /// Image reference could not be interpreted
    #[error("Invalid image reference: {0}")]
    InvalidReference(String),

    #[error("{0}")]
    Other(String),
}

/// Handle to a mutable build context living inside an engine.
///
/// Created from a base image at the start of a run and consumed by either
/// [`BuildEngine::commit`] or [`BuildEngine::discard`]. Not `Clone`; exactly
/// one owner drives it at a time.
#[derive(Debug, PartialEq, Eq)]
pub struct WorkingEnvironment {
    id: String,
    base_image: String,
}

impl WorkingEnvironment {
    pub fn new(id: impl Into<String>, base_image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_image: base_image.into(),
        }
    }

    /// Engine-assigned identifier (container name or id)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn base_image(&self) -> &str {
        &self.base_image
    }
}

impl fmt::Display for WorkingEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (from {})", self.id, self.base_image)
    }
}

/// Result of running one command vector inside a working environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// stdout followed by stderr
    pub output: String,

    /// `None` when the process ended without an exit code (killed by a signal)
    pub exit_code: Option<i64>,
}

impl ExecOutput {
    pub fn new(output: impl Into<String>, exit_code: Option<i64>) -> Self {
        Self {
            output: output.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Image produced by a successful commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittedImage {
    /// Reference the image was tagged with
    pub reference: String,

    /// Engine image id (digest or short id, engine dependent)
    pub id: String,
}

/// Capability contract every engine implements.
///
/// Calls arrive strictly one at a time for a given environment.
#[async_trait]
pub trait BuildEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Pulls `base_image` if needed and starts a fresh working environment from it
    async fn create_environment(&self, base_image: &str)
        -> Result<WorkingEnvironment, EngineError>;

    /// Runs `argv` inside the environment, capturing combined output.
    ///
    /// A command exiting non-zero is NOT an error here; it is reported through
    /// [`ExecOutput::exit_code`]. Errors mean the engine could not run it.
    async fn execute(
        &self,
        env: &mut WorkingEnvironment,
        argv: &[String],
    ) -> Result<ExecOutput, EngineError>;

    /// Finalizes the environment into an image tagged `target`
    async fn commit(
        &self,
        env: WorkingEnvironment,
        target: &str,
    ) -> Result<CommittedImage, EngineError>;

    /// Removes the environment without producing an image
    async fn discard(&self, env: WorkingEnvironment) -> Result<(), EngineError>;

    /// Host command that opens an interactive `shell` inside the environment
    fn session_command(&self, env: &WorkingEnvironment, shell: &str) -> Vec<String>;
}

/// Builds the engine selected by `config.engine`
pub fn create_engine(config: &BreakstepConfig) -> Result<Arc<dyn BuildEngine>, EngineError> {
    let engine: Arc<dyn BuildEngine> = match config.engine {
        EngineKind::Buildah => Arc::new(BuildahEngine::new(config)),
        EngineKind::Docker => Arc::new(DockerEngine::connect(config)?),
    };
    info!(engine = engine.name(), "Build engine ready");
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_output_success() {
        assert!(ExecOutput::new("", Some(0)).success());
        assert!(!ExecOutput::new("boom", Some(1)).success());
        assert!(!ExecOutput::new("", None).success());
    }

    #[test]
    fn test_working_environment_display() {
        let env = WorkingEnvironment::new("alpine-working-container", "alpine:latest");
        assert_eq!(env.to_string(), "alpine-working-container (from alpine:latest)");
    }

    #[test]
    fn test_create_buildah_engine() {
        let config = BreakstepConfig {
            engine: EngineKind::Buildah,
            ..BreakstepConfig::default()
        };
        let engine = create_engine(&config).unwrap();
        assert_eq!(engine.name(), "buildah");
    }

    #[test]
    fn test_tool_failed_message() {
        let err = EngineError::ToolFailed {
            program: "buildah".into(),
            action: "commit".into(),
            code: Some(125),
            stderr: "no such container".into(),
        };
        assert_eq!(
            err.to_string(),
            "buildah commit failed (exit code Some(125)): no such container"
        );
    }
}
