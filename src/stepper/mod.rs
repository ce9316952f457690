//! Breakpoint-driven build stepper
//!
//! [`BuildStepper`] walks a [`BuildScript`] top to bottom against one working
//! environment. `RUN` lines execute through the [`BuildEngine`], breakpoint
//! sentinels hand the environment to a [`SessionRunner`] until the operator
//! leaves, and once every directive is done the environment is committed.
//!
//! # Example
//!
//! ```no_run
//! use breakstep::engine::create_engine;
//! use breakstep::script::BuildScript;
//! use breakstep::session::TerminalSession;
//! use breakstep::stepper::BuildStepper;
//! use breakstep::BreakstepConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BreakstepConfig::default();
//! let engine = create_engine(&config)?;
//! let session = Arc::new(TerminalSession::new(engine.clone(), &config.shell));
//!
//! let script = BuildScript::parse("RUN apk add curl\n# BREAKPOINT\nRUN curl --version\n");
//! let mut stepper = BuildStepper::new(engine, session);
//! let report = stepper
//!     .run(&script, &config.base_image, &config.target_image)
//!     .await?;
//! println!("{} -> {}", report.reference, report.image_id);
//! # Ok(())
//! # }
//! ```

mod error;
mod report;
mod state;

pub use error::StepError;
pub use report::BuildReport;
pub use state::StepperState;

use crate::engine::{BuildEngine, WorkingEnvironment};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::script::{BuildScript, Directive};
use crate::session::SessionRunner;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct RunCounters {
    commands_executed: usize,
    breakpoints_hit: usize,
}

pub struct BuildStepper {
    engine: Arc<dyn BuildEngine>,
    session: Arc<dyn SessionRunner>,
    progress: Arc<dyn ProgressHandler>,
    keep_failed_environment: bool,
    state: StepperState,
}

impl BuildStepper {
    pub fn new(engine: Arc<dyn BuildEngine>, session: Arc<dyn SessionRunner>) -> Self {
        Self {
            engine,
            session,
            progress: Arc::new(NoOpHandler),
            keep_failed_environment: false,
            state: StepperState::Idle,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// Leave the working environment in place when a run fails after it was
    /// created, instead of discarding it.
    pub fn keep_failed_environment(mut self, keep: bool) -> Self {
        self.keep_failed_environment = keep;
        self
    }

    pub fn state(&self) -> StepperState {
        self.state
    }

    /// Executes `script` from a fresh environment based on `base_image` and
    /// commits the result as `target`.
    ///
    /// Stops at the first failing directive; nothing after it is evaluated
    /// and no image is committed.
    pub async fn run(
        &mut self,
        script: &BuildScript,
        base_image: &str,
        target: &str,
    ) -> Result<BuildReport, StepError> {
        if self.state != StepperState::Idle {
            return Err(StepError::NotIdle(self.state));
        }

        let started_at = Utc::now();
        let start = Instant::now();
        self.transition(StepperState::Running);
        info!(
            engine = self.engine.name(),
            base = %base_image,
            target = %target,
            directives = script.len(),
            "Starting stepped build"
        );
        self.progress.on_progress(&ProgressEvent::Started {
            base_image: base_image.to_string(),
            target: target.to_string(),
            directives: script.len(),
        });

        let mut env = match self.engine.create_environment(base_image).await {
            Ok(env) => env,
            Err(source) => {
                return Err(self.fail(StepError::EngineInit {
                    base_image: base_image.to_string(),
                    source,
                }))
            }
        };
        self.progress.on_progress(&ProgressEvent::EnvironmentReady {
            id: env.id().to_string(),
        });

        let mut counters = RunCounters::default();
        if let Err(err) = self.step_through(script, &mut env, &mut counters).await {
            self.abandon(env).await;
            return Err(self.fail(err));
        }

        self.transition(StepperState::Committing);
        self.progress.on_progress(&ProgressEvent::Committing {
            target: target.to_string(),
        });

        let image = match self.engine.commit(env, target).await {
            Ok(image) => image,
            Err(source) => {
                return Err(self.fail(StepError::CommitFailed {
                    target: target.to_string(),
                    source,
                }))
            }
        };
        self.transition(StepperState::Committed);

        let elapsed = start.elapsed();
        self.progress.on_progress(&ProgressEvent::Committed {
            reference: image.reference.clone(),
            id: image.id.clone(),
            total_time: elapsed,
        });

        Ok(BuildReport {
            target: target.to_string(),
            reference: image.reference,
            image_id: image.id,
            engine: self.engine.name().to_string(),
            base_image: base_image.to_string(),
            directives: script.len(),
            commands_executed: counters.commands_executed,
            breakpoints_hit: counters.breakpoints_hit,
            started_at,
            duration_ms: elapsed.as_millis() as u64,
        })
    }

    async fn step_through(
        &mut self,
        script: &BuildScript,
        env: &mut WorkingEnvironment,
        counters: &mut RunCounters,
    ) -> Result<(), StepError> {
        for (position, directive) in script.iter().enumerate() {
            let line = position + 1;
            match directive {
                Directive::Raw(_) => {}
                Directive::RunCommand(_) => {
                    let argv = directive.command_vector().unwrap_or_default();
                    if argv.is_empty() {
                        debug!(line, "Empty command, skipping");
                        continue;
                    }
                    self.execute(line, env, argv).await?;
                    counters.commands_executed += 1;
                }
                Directive::Breakpoint => {
                    self.pause(line, env).await?;
                    counters.breakpoints_hit += 1;
                }
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        line: usize,
        env: &mut WorkingEnvironment,
        argv: Vec<String>,
    ) -> Result<(), StepError> {
        self.progress.on_progress(&ProgressEvent::CommandStarted {
            line,
            argv: argv.clone(),
        });

        let command_start = Instant::now();
        let result = self
            .engine
            .execute(env, &argv)
            .await
            .map_err(|source| StepError::Execute {
                index: line,
                source,
            })?;

        self.progress.on_progress(&ProgressEvent::CommandFinished {
            line,
            exit_code: result.exit_code,
            output: result.output.clone(),
            duration: command_start.elapsed(),
        });

        if !result.success() {
            return Err(StepError::CommandFailed {
                index: line,
                exit_code: result.exit_code,
                output: result.output,
            });
        }
        Ok(())
    }

    /// Hands the environment to the session runner and waits for it.
    ///
    /// The stepper is back in `Running` whether or not the session started.
    async fn pause(&mut self, line: usize, env: &WorkingEnvironment) -> Result<(), StepError> {
        self.transition(StepperState::Paused);
        self.progress.on_progress(&ProgressEvent::BreakpointReached {
            line,
            environment: env.id().to_string(),
        });

        let session = Arc::clone(&self.session);
        let attached = session.attach(env).await;
        self.transition(StepperState::Running);

        attached.map_err(|source| StepError::SessionStart {
            index: line,
            source,
        })?;
        self.progress.on_progress(&ProgressEvent::SessionEnded { line });
        Ok(())
    }

    /// Disposes of the environment after a failed step
    async fn abandon(&self, env: WorkingEnvironment) {
        if self.keep_failed_environment {
            warn!(environment = %env, "Leaving working environment in place");
            self.progress.on_progress(&ProgressEvent::EnvironmentKept {
                id: env.id().to_string(),
            });
            return;
        }

        let id = env.id().to_string();
        if let Err(e) = self.engine.discard(env).await {
            warn!(environment = %id, error = %e, "Failed to discard working environment");
        } else {
            debug!(environment = %id, "Working environment discarded");
        }
    }

    fn fail(&mut self, err: StepError) -> StepError {
        self.transition(StepperState::Failed);
        self.progress.on_progress(&ProgressEvent::Failed {
            error: err.to_string(),
        });
        err
    }

    fn transition(&mut self, next: StepperState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal stepper transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "Stepper state change");
        self.state = next;
    }
}
