use super::{SessionError, SessionRunner};
use crate::engine::{BuildEngine, WorkingEnvironment};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Opens a shell inside the working environment on the operator's terminal.
///
/// The engine decides how to get a shell into its environment
/// (`buildah run -t`, `docker exec -it`); this runner only wires the process
/// to the inherited stdin/stdout/stderr and waits for it.
pub struct TerminalSession {
    engine: Arc<dyn BuildEngine>,
    shell: String,
    active: Arc<AtomicBool>,
}

/// Marks a session as open for as long as it lives
struct ActiveGuard<'a>(&'a AtomicBool);

impl<'a> ActiveGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TerminalSession {
    pub fn new(engine: Arc<dyn BuildEngine>, shell: impl Into<String>) -> Self {
        Self {
            engine,
            shell: shell.into(),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while an operator shell is running.
    ///
    /// Interrupt handlers consult this so Ctrl-C inside the shell does not
    /// abort the build.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Shareable view of [`Self::is_active`]
    pub fn activity_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.active)
    }
}

#[async_trait]
impl SessionRunner for TerminalSession {
    async fn attach(&self, env: &WorkingEnvironment) -> Result<(), SessionError> {
        let argv = self.engine.session_command(env, &self.shell);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SessionError::EmptyCommand(env.id().to_string()))?;

        if !atty::is(atty::Stream::Stdin) {
            warn!("stdin is not a terminal; the breakpoint shell may exit immediately");
        }

        let _guard = ActiveGuard::acquire(&self.active);
        debug!(program = %program, ?args, "Launching session");

        // kill_on_drop: if the build future is dropped mid-session the shell
        // must not outlive it.
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::Start {
                program: program.clone(),
                source,
            })?;

        let status = child.wait().await.map_err(SessionError::Wait)?;
        if status.success() {
            debug!("Session ended");
        } else {
            info!(code = ?status.code(), "Session shell exited with non-zero status");
        }

        Ok(())
    }
}
