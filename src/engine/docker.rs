//! Docker Engine API backend
//!
//! The working environment is a long-lived container started from the base
//! image with an interactive shell as its command, the equivalent of
//! `docker run -dit <base> <shell>`. Commands run as execs inside it and the
//! final state is committed with the container paused.

use super::{BuildEngine, CommittedImage, EngineError, ExecOutput, WorkingEnvironment};
use crate::config::BreakstepConfig;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::{CommitContainerOptions, CreateImageOptions};
use bollard::models::ImageInspect;
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

const CONTAINER_PREFIX: &str = "breakstep";
const BASE_IMAGE_LABEL: &str = "io.breakstep.base-image";

pub struct DockerEngine {
    docker: Docker,
    platform: Option<String>,
    shell: String,
}

impl DockerEngine {
    /// Connects to the local daemon (`DOCKER_HOST` or the default socket)
    pub fn connect(config: &BreakstepConfig) -> Result<Self, EngineError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self::with_client(docker, config))
    }

    pub fn with_client(docker: Docker, config: &BreakstepConfig) -> Self {
        Self {
            docker,
            platform: config.platform.docker_platform(),
            shell: config.shell.clone(),
        }
    }

    async fn pull(&self, image: &str) -> Result<(), EngineError> {
        let options = CreateImageOptions {
            from_image: image.to_string(),
            platform: self.platform.clone().unwrap_or_default(),
            ..Default::default()
        };

        let mut progress = self.docker.create_image(Some(options), None, None);
        while let Some(item) = progress.next().await {
            let info = item?;
            if let Some(status) = info.status {
                debug!(image, status = %status, "Pull progress");
            }
        }
        Ok(())
    }

    async fn remove(&self, container: &str) -> Result<(), EngineError> {
        self.docker
            .remove_container(
                container,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }
}

/// Splits `repo[:tag]` into the pieces the commit endpoint wants.
///
/// A colon only counts as a tag separator after the last `/`, so registry
/// ports (`localhost:5000/app`) stay in the repository. Digests are rejected
/// because a commit cannot produce a chosen digest.
pub fn split_reference(reference: &str) -> Result<(String, String), EngineError> {
    if reference.is_empty() || reference.contains('@') {
        return Err(EngineError::InvalidReference(reference.to_string()));
    }

    let name_start = reference.rfind('/').map(|idx| idx + 1).unwrap_or(0);
    match reference[name_start..].rfind(':') {
        Some(colon) => {
            let split = name_start + colon;
            let (repo, tag) = (&reference[..split], &reference[split + 1..]);
            if repo.is_empty() || tag.is_empty() {
                return Err(EngineError::InvalidReference(reference.to_string()));
            }
            Ok((repo.to_string(), tag.to_string()))
        }
        None => Ok((reference.to_string(), "latest".to_string())),
    }
}

#[async_trait]
impl BuildEngine for DockerEngine {
    fn name(&self) -> &str {
        "docker"
    }

    async fn create_environment(
        &self,
        base_image: &str,
    ) -> Result<WorkingEnvironment, EngineError> {
        self.pull(base_image).await?;

        let name = format!("{}-{}", CONTAINER_PREFIX, Uuid::new_v4().simple());
        let config = Config {
            image: Some(base_image.to_string()),
            cmd: Some(vec![self.shell.clone()]),
            tty: Some(true),
            open_stdin: Some(true),
            labels: Some(HashMap::from([(
                BASE_IMAGE_LABEL.to_string(),
                base_image.to_string(),
            )])),
            ..Default::default()
        };

        self.docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    platform: self.platform.clone(),
                }),
                config,
            )
            .await?;

        if let Err(e) = self
            .docker
            .start_container(&name, None::<StartContainerOptions<String>>)
            .await
        {
            if let Err(cleanup) = self.remove(&name).await {
                warn!(container = %name, error = %cleanup, "Failed to remove unstarted container");
            }
            return Err(e.into());
        }

        info!(container = %name, base = %base_image, "Started working container");
        Ok(WorkingEnvironment::new(name, base_image))
    }

    async fn execute(
        &self,
        env: &mut WorkingEnvironment,
        argv: &[String],
    ) -> Result<ExecOutput, EngineError> {
        let exec = self
            .docker
            .create_exec(
                env.id(),
                CreateExecOptions {
                    cmd: Some(argv.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let mut output = String::new();
        if let StartExecResults::Attached { output: mut stream, .. } =
            self.docker.start_exec(&exec.id, None).await?
        {
            while let Some(chunk) = stream.next().await {
                output.push_str(&chunk?.to_string());
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        debug!(container = env.id(), ?argv, exit_code = ?inspect.exit_code, "Exec finished");

        Ok(ExecOutput::new(output, inspect.exit_code))
    }

    async fn commit(
        &self,
        env: WorkingEnvironment,
        target: &str,
    ) -> Result<CommittedImage, EngineError> {
        let (repo, tag) = split_reference(target)?;

        self.docker
            .commit_container(
                CommitContainerOptions {
                    container: env.id().to_string(),
                    repo,
                    tag,
                    pause: true,
                    ..Default::default()
                },
                Config::<String>::default(),
            )
            .await?;

        let id = committed_image_id(target, self.docker.inspect_image(target).await);
        info!(container = env.id(), target, image_id = %id, "Committed working container");

        if let Err(e) = self.remove(env.id()).await {
            warn!(container = env.id(), error = %e, "Committed but failed to remove working container");
        }

        Ok(CommittedImage {
            reference: target.to_string(),
            id,
        })
    }

    async fn discard(&self, env: WorkingEnvironment) -> Result<(), EngineError> {
        self.remove(env.id()).await?;
        debug!(container = env.id(), "Removed working container");
        Ok(())
    }

    fn session_command(&self, env: &WorkingEnvironment, shell: &str) -> Vec<String> {
        vec![
            "docker".to_string(),
            "exec".to_string(),
            "-it".to_string(),
            env.id().to_string(),
            shell.to_string(),
        ]
    }
}

/// Image id of a finished commit.
///
/// The image already exists once the commit call returns, so an inspect
/// failure only costs the id and never fails the run.
fn committed_image_id(
    target: &str,
    inspect: Result<ImageInspect, bollard::errors::Error>,
) -> String {
    match inspect {
        Ok(image) => image.id.unwrap_or_default(),
        Err(e) => {
            warn!(target, error = %e, "Committed but failed to inspect image");
            String::new()
        }
    }
}
