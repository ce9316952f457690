//! Subcommand handlers
//!
//! Each handler returns the process exit code: 0 on success, 1 on failure,
//! 2 for the unsupported `continue` command.

use super::commands::{BuildArgs, ScriptArgs, SetBreakpointArgs};
use super::output::{format_breakpoint_lines, OutputFormatter};
use crate::config::{BreakstepConfig, EngineKind, ENGINE_VAR, KEEP_FAILED_VAR};
use crate::engine::create_engine;
use crate::progress::{ConsoleHandler, LoggingHandler, ProgressEvent, ProgressHandler};
use crate::script::{breakpoint_lines, clear_breakpoints, set_breakpoint, BuildScript, ScriptStore};
use crate::session::TerminalSession;
use crate::stepper::{BuildReport, BuildStepper, StepError};
use anyhow::{Context, Result};
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_UNSUPPORTED: i32 = 2;

pub async fn handle_set_breakpoint(args: &SetBreakpointArgs) -> i32 {
    match insert_breakpoint(&args.file, args.line).await {
        Ok(()) => {
            println!(
                "Breakpoint set at line {} in {}",
                args.line,
                args.file.display()
            );
            EXIT_SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            EXIT_FAILURE
        }
    }
}

async fn insert_breakpoint(path: &Path, line: usize) -> Result<()> {
    let store = ScriptStore::new(path);
    let script = store.load().await?;
    let updated = set_breakpoint(&script, line)
        .with_context(|| format!("Cannot set breakpoint in {}", path.display()))?;
    store.save(&updated).await?;
    info!(path = %path.display(), line, "Breakpoint inserted");
    Ok(())
}

pub async fn handle_breakpoints(args: &ScriptArgs) -> i32 {
    match ScriptStore::new(&args.file).load().await {
        Ok(script) => {
            print!(
                "{}",
                format_breakpoint_lines(&args.file, &breakpoint_lines(&script))
            );
            EXIT_SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            EXIT_FAILURE
        }
    }
}

pub async fn handle_clear_breakpoints(args: &ScriptArgs) -> i32 {
    match remove_breakpoints(&args.file).await {
        Ok(removed) => {
            println!(
                "Removed {} breakpoint(s) from {}",
                removed,
                args.file.display()
            );
            EXIT_SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            EXIT_FAILURE
        }
    }
}

async fn remove_breakpoints(path: &Path) -> Result<usize> {
    let store = ScriptStore::new(path);
    let script = store.load().await?;
    let (cleared, removed) = clear_breakpoints(&script);
    if removed > 0 {
        store.save(&cleared).await?;
    } else {
        debug!(path = %path.display(), "No breakpoints to remove");
    }
    Ok(removed)
}

/// Resumption across process restarts does not exist; the command is kept
/// so scripts invoking it get a clear answer.
pub async fn handle_continue() -> i32 {
    warn!("continue requested but resuming a build is not supported");
    eprintln!(
        "Resuming an interrupted build is not supported.\n\
         Run `breakstep build <file>` again; it starts from a fresh working environment."
    );
    EXIT_UNSUPPORTED
}

pub async fn handle_build(args: &BuildArgs, quiet: bool) -> i32 {
    let config = build_config(args);
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your BREAKSTEP_* environment variables and command-line arguments.");
        return EXIT_FAILURE;
    }
    debug!("{}", config);

    let script = match ScriptStore::new(&args.file).load().await {
        Ok(script) => script,
        Err(e) => {
            error!("{}", e);
            return EXIT_FAILURE;
        }
    };

    let progress: Vec<Arc<dyn ProgressHandler>> = if quiet {
        vec![
            Arc::new(LoggingHandler),
            Arc::new(ConsoleHandler::stderr_breakpoints_only()),
        ]
    } else {
        vec![Arc::new(ConsoleHandler::stdout())]
    };

    match run_build(&config, &script, progress).await {
        Ok(BuildOutcome::Finished(report)) => {
            let formatter = OutputFormatter::new(args.format.into());
            match formatter.format_report(&report) {
                Ok(output) => {
                    println!("{}", output);
                    EXIT_SUCCESS
                }
                Err(e) => {
                    error!("{:#}", e);
                    EXIT_FAILURE
                }
            }
        }
        Ok(BuildOutcome::Interrupted { environment }) => {
            error!("Build interrupted");
            eprintln!("\n{}", interrupted_message(config.engine, environment.as_deref()));
            EXIT_FAILURE
        }
        Err(e) => {
            error!("Build failed: {:#}", e);
            if let Some(step_error) = e.downcast_ref::<StepError>() {
                eprintln!("\n{}", step_error.help_message());
            }
            EXIT_FAILURE
        }
    }
}

fn build_config(args: &BuildArgs) -> BreakstepConfig {
    let mut defaults = BreakstepConfig::default();
    // flags replace their variables
    let overridden = |name: &str| {
        (name == ENGINE_VAR && args.engine.is_some())
            || (name == KEEP_FAILED_VAR && args.keep_failed)
    };
    defaults.rejected_env.retain(|(name, _)| !overridden(name));
    let config = BreakstepConfig {
        engine: args.engine.map(Into::into).unwrap_or(defaults.engine),
        base_image: args.base_image.clone().unwrap_or(defaults.base_image),
        target_image: args.tag.clone().unwrap_or(defaults.target_image),
        shell: args.shell.clone().unwrap_or(defaults.shell),
        keep_failed_environment: args.keep_failed || defaults.keep_failed_environment,
        ..defaults
    };
    if args.engine.is_some() {
        debug!("Engine explicitly set to: {}", config.engine);
    }
    config
}

enum BuildOutcome {
    Finished(BuildReport),
    /// Ctrl-C outside a breakpoint shell. `environment` is the working
    /// environment left behind, if one had been created.
    Interrupted { environment: Option<String> },
}

/// Forwards events and remembers the working environment of the run
struct BuildProgress {
    handlers: Vec<Arc<dyn ProgressHandler>>,
    environment: Mutex<Option<String>>,
}

impl BuildProgress {
    fn new(handlers: Vec<Arc<dyn ProgressHandler>>) -> Self {
        Self {
            handlers,
            environment: Mutex::new(None),
        }
    }

    fn environment(&self) -> Option<String> {
        self.environment.lock().ok().and_then(|env| env.clone())
    }

    fn set_environment(&self, id: Option<String>) {
        if let Ok(mut env) = self.environment.lock() {
            *env = id;
        }
    }
}

impl ProgressHandler for BuildProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::EnvironmentReady { id } => self.set_environment(Some(id.clone())),
            ProgressEvent::Committed { .. } => self.set_environment(None),
            _ => {}
        }
        for handler in &self.handlers {
            handler.on_progress(event);
        }
    }
}

fn interrupted_message(engine: EngineKind, environment: Option<&str>) -> String {
    match environment {
        Some(id) => {
            let cleanup = match engine {
                EngineKind::Buildah => format!("buildah rm {}", id),
                EngineKind::Docker => format!("docker rm -f {}", id),
            };
            format!(
                "Build interrupted. The working environment {} was not removed;\n\
                 clean it up with `{}`.",
                id, cleanup
            )
        }
        None => "Build interrupted before a working environment was created.".to_string(),
    }
}

/// Runs the stepper until it finishes or the operator interrupts it.
///
/// Ctrl-C while a breakpoint shell is open belongs to the shell and is
/// ignored here.
async fn run_build(
    config: &BreakstepConfig,
    script: &BuildScript,
    handlers: Vec<Arc<dyn ProgressHandler>>,
) -> Result<BuildOutcome> {
    let engine = create_engine(config).context("Failed to initialize build engine")?;
    let session = Arc::new(TerminalSession::new(engine.clone(), &config.shell));
    let session_active = session.activity_flag();
    let progress = Arc::new(BuildProgress::new(handlers));

    let mut stepper = BuildStepper::new(engine, session)
        .with_progress(progress.clone())
        .keep_failed_environment(config.keep_failed_environment);

    let run = stepper.run(script, &config.base_image, &config.target_image);
    match until_interrupted(run, tokio::signal::ctrl_c, &session_active).await {
        Some(result) => Ok(BuildOutcome::Finished(result?)),
        None => Ok(BuildOutcome::Interrupted {
            environment: progress.environment(),
        }),
    }
}

/// Polls `run` to completion unless an interrupt arrives while no session
/// is open, in which case `run` is dropped and `None` returned.
async fn until_interrupted<T, F, I, S>(
    run: F,
    mut interrupts: I,
    session_active: &AtomicBool,
) -> Option<T>
where
    F: Future<Output = T>,
    I: FnMut() -> S,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(run);

    loop {
        tokio::select! {
            result = &mut run => return Some(result),
            signal = interrupts() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Cannot listen for interrupts");
                    return Some(run.await);
                }
                if session_active.load(Ordering::SeqCst) {
                    debug!("Interrupt received inside breakpoint session");
                    continue;
                }
                return None;
            }
        }
    }
}
