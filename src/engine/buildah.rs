//! Process-backed engine driving the `buildah` CLI
//!
//! Every operation is a single buildah invocation against the configured
//! storage roots:
//!
//! | operation            | command                                   |
//! |----------------------|-------------------------------------------|
//! | create environment   | `buildah from [platform] <base>`          |
//! | execute              | `buildah run <ctr> -- <argv...>`          |
//! | commit               | `buildah commit --rm <ctr> <target>`      |
//! | discard              | `buildah rm <ctr>`                        |
//! | interactive session  | `buildah run -t <ctr> -- <shell>`         |

use super::process;
use super::{BuildEngine, CommittedImage, EngineError, ExecOutput, WorkingEnvironment};
use crate::config::{BreakstepConfig, Platform, StorageConfig};
use async_trait::async_trait;
use tracing::{debug, info};

const BUILDAH_PROGRAM: &str = "buildah";

/// Exit code `buildah run` reserves for its own errors, as opposed to the
/// exit code of the command it ran
const BUILDAH_RUN_ERROR: i32 = 125;

pub struct BuildahEngine {
    program: String,
    storage: StorageConfig,
    platform: Platform,
}

impl BuildahEngine {
    pub fn new(config: &BreakstepConfig) -> Self {
        Self {
            program: BUILDAH_PROGRAM.to_string(),
            storage: config.storage.clone(),
            platform: config.platform.clone(),
        }
    }

    /// Uses a different buildah binary (a wrapper script, an absolute path)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Storage flags shared by every invocation
    fn global_args(&self) -> Vec<String> {
        vec![
            "--root".to_string(),
            self.storage.graph_root.display().to_string(),
            "--runroot".to_string(),
            self.storage.run_root.display().to_string(),
            "--storage-driver".to_string(),
            self.storage.driver.clone(),
        ]
    }

    fn from_args(&self, base_image: &str) -> Vec<String> {
        let mut args = self.global_args();
        args.push("from".to_string());
        for (flag, value) in [
            ("--arch", &self.platform.arch),
            ("--os", &self.platform.os),
            ("--variant", &self.platform.variant),
        ] {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }
        args.push(base_image.to_string());
        args
    }

    fn run_args(&self, container: &str, argv: &[String]) -> Vec<String> {
        let mut args = self.global_args();
        args.extend(["run".to_string(), container.to_string(), "--".to_string()]);
        args.extend(argv.iter().cloned());
        args
    }

    fn commit_args(&self, container: &str, target: &str) -> Vec<String> {
        let mut args = self.global_args();
        args.extend([
            "commit".to_string(),
            "--rm".to_string(),
            container.to_string(),
            target.to_string(),
        ]);
        args
    }

    fn rm_args(&self, container: &str) -> Vec<String> {
        let mut args = self.global_args();
        args.extend(["rm".to_string(), container.to_string()]);
        args
    }
}

#[async_trait]
impl BuildEngine for BuildahEngine {
    fn name(&self) -> &str {
        "buildah"
    }

    async fn create_environment(
        &self,
        base_image: &str,
    ) -> Result<WorkingEnvironment, EngineError> {
        let output =
            process::run_checked(&self.program, "from", &self.from_args(base_image)).await?;
        let container = output.last_line();
        if container.is_empty() {
            return Err(EngineError::Other(format!(
                "buildah from {} printed no container name",
                base_image
            )));
        }

        info!(container = %container, base = %base_image, "Created working container");
        Ok(WorkingEnvironment::new(container, base_image))
    }

    async fn execute(
        &self,
        env: &mut WorkingEnvironment,
        argv: &[String],
    ) -> Result<ExecOutput, EngineError> {
        let output = process::run(&self.program, &self.run_args(env.id(), argv)).await?;
        debug!(container = env.id(), ?argv, code = ?output.code, "buildah run finished");

        if output.code == Some(BUILDAH_RUN_ERROR) {
            return Err(EngineError::ToolFailed {
                program: self.program.clone(),
                action: "run".to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(ExecOutput::new(output.combined(), output.code.map(i64::from)))
    }

    async fn commit(
        &self,
        env: WorkingEnvironment,
        target: &str,
    ) -> Result<CommittedImage, EngineError> {
        let output =
            process::run_checked(&self.program, "commit", &self.commit_args(env.id(), target))
                .await?;
        let id = output.last_line();

        info!(container = env.id(), target, image_id = %id, "Committed working container");
        Ok(CommittedImage {
            reference: target.to_string(),
            id,
        })
    }

    async fn discard(&self, env: WorkingEnvironment) -> Result<(), EngineError> {
        process::run_checked(&self.program, "rm", &self.rm_args(env.id())).await?;
        debug!(container = env.id(), "Removed working container");
        Ok(())
    }

    fn session_command(&self, env: &WorkingEnvironment, shell: &str) -> Vec<String> {
        let mut argv = vec![self.program.clone()];
        argv.extend(self.global_args());
        argv.extend([
            "run".to_string(),
            "-t".to_string(),
            env.id().to_string(),
            "--".to_string(),
            shell.to_string(),
        ]);
        argv
    }
}
