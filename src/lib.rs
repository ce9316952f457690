//! breakstep - breakpoint debugger for container image build scripts
//!
//! Runs the `RUN` instructions of a build script one at a time against a
//! working container, pauses at `# BREAKPOINT` lines to open an interactive
//! shell inside it, and commits the result as an image.
//!
//! # Core Concepts
//!
//! - **Build script**: line-oriented text, classified line by line into
//!   [`Directive`]s (breakpoint, command, or raw text)
//! - **Build engine**: external collaborator that creates, mutates and commits
//!   the working environment (buildah or the Docker daemon)
//! - **Stepper**: state machine walking the script and pausing at breakpoints
//!
//! # Example Usage
//!
//! ```no_run
//! use breakstep::{create_engine, BreakstepConfig, BuildStepper, ScriptStore, TerminalSession};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ScriptStore::new("Containerfile");
//! let script = breakstep::script::set_breakpoint(&store.load().await?, 3)?;
//! store.save(&script).await?;
//!
//! let config = BreakstepConfig::default();
//! let engine = create_engine(&config)?;
//! let session = Arc::new(TerminalSession::new(engine.clone(), &config.shell));
//! let report = BuildStepper::new(engine, session)
//!     .run(&script, &config.base_image, &config.target_image)
//!     .await?;
//! println!("Committed {}", report.reference);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`script`]: classification, persistence and breakpoint editing
//! - [`engine`]: the [`BuildEngine`] trait and its implementations
//! - [`session`]: interactive shells at breakpoints
//! - [`stepper`]: the breakpoint-driven state machine
//! - [`progress`]: events emitted while stepping

pub mod cli;
pub mod config;
pub mod engine;
pub mod progress;
pub mod script;
pub mod session;
pub mod stepper;
pub mod util;

pub use config::{BreakstepConfig, ConfigError, EngineKind};
pub use engine::{create_engine, BuildEngine, EngineError, WorkingEnvironment};
pub use script::{BuildScript, Directive, ScriptError, ScriptStore};
pub use session::{SessionError, SessionRunner, TerminalSession};
pub use stepper::{BuildReport, BuildStepper, StepError, StepperState};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
