//! Configuration management for breakstep
//!
//! Settings are loaded from environment variables with defaults, and the CLI
//! overrides individual fields from flags. Nothing else in the crate reads the
//! environment or guesses paths; engines receive everything through
//! [`BreakstepConfig`].
//!
//! # Environment Variables
//!
//! - `BREAKSTEP_ENGINE`: build engine (buildah|docker) - default: "buildah"
//! - `BREAKSTEP_BASE_IMAGE`: image every run starts from - default: "docker.io/library/alpine:latest"
//! - `BREAKSTEP_TARGET_IMAGE`: reference the result is committed as - default: "localhost/breakstep-debug:latest"
//! - `BREAKSTEP_ARCH`, `BREAKSTEP_OS`, `BREAKSTEP_VARIANT`: platform of the base
//!   image and working environment - default: unset (engine picks the host platform)
//! - `BREAKSTEP_STORAGE_DRIVER`: buildah storage driver - default: "vfs"
//! - `BREAKSTEP_GRAPH_ROOT`: buildah image storage - default: "~/.local/share/containers/storage"
//! - `BREAKSTEP_RUN_ROOT`: buildah runtime state - default: "~/.local/share/containers/run"
//! - `BREAKSTEP_SHELL`: shell opened at breakpoints - default: "/bin/sh"
//! - `BREAKSTEP_KEEP_FAILED`: keep the working environment after a failure (true|false|1|0) - default: "false"
//! - `BREAKSTEP_LOG_LEVEL`: logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use breakstep::BreakstepConfig;
//!
//! let mut config = BreakstepConfig::default();
//! config.target_image = "localhost/myapp:debug".to_string();
//! config.validate().expect("Invalid configuration");
//! ```

use serde::Serialize;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_BASE_IMAGE: &str = "docker.io/library/alpine:latest";
const DEFAULT_TARGET_IMAGE: &str = "localhost/breakstep-debug:latest";
const DEFAULT_STORAGE_DRIVER: &str = "vfs";
const DEFAULT_SHELL: &str = "/bin/sh";
const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENGINE_VAR: &str = "BREAKSTEP_ENGINE";
pub const KEEP_FAILED_VAR: &str = "BREAKSTEP_KEEP_FAILED";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown engine name
    #[error("Invalid engine: {0}. Valid options: buildah, docker")]
    InvalidEngine(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Which build engine drives the working environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// `buildah` CLI, rootless-friendly, uses the configured storage roots
    #[default]
    Buildah,
    /// Docker daemon over its local socket
    Docker,
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buildah" => Ok(EngineKind::Buildah),
            "docker" => Ok(EngineKind::Docker),
            other => Err(ConfigError::InvalidEngine(other.to_string())),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Buildah => f.write_str("buildah"),
            EngineKind::Docker => f.write_str("docker"),
        }
    }
}

/// Target platform for the base image pull and the working environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub arch: Option<String>,
    pub os: Option<String>,
    pub variant: Option<String>,
}

impl Platform {
    pub fn is_host_default(&self) -> bool {
        self.arch.is_none() && self.os.is_none() && self.variant.is_none()
    }

    /// `os/arch[/variant]` as the Docker API expects it.
    ///
    /// The OS falls back to `linux` when only an architecture is set. Returns
    /// `None` when no architecture is configured.
    pub fn docker_platform(&self) -> Option<String> {
        let arch = self.arch.as_deref()?;
        let os = self.os.as_deref().unwrap_or("linux");
        Some(match self.variant.as_deref() {
            Some(variant) => format!("{}/{}/{}", os, arch, variant),
            None => format!("{}/{}", os, arch),
        })
    }
}

/// Container storage locations used by the buildah engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageConfig {
    pub driver: String,
    pub graph_root: PathBuf,
    pub run_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let share = dirs::home_dir()
            .unwrap_or_else(env::temp_dir)
            .join(".local/share/containers");

        Self {
            driver: env::var("BREAKSTEP_STORAGE_DRIVER")
                .unwrap_or_else(|_| DEFAULT_STORAGE_DRIVER.to_string()),
            graph_root: env::var("BREAKSTEP_GRAPH_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| share.join("storage")),
            run_root: env::var("BREAKSTEP_RUN_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| share.join("run")),
        }
    }
}

/// Main configuration structure for breakstep
#[derive(Debug, Clone, Serialize)]
pub struct BreakstepConfig {
    /// Engine that owns the working environment
    pub engine: EngineKind,

    /// Image each run starts from
    pub base_image: String,

    /// Reference the final image is committed as
    pub target_image: String,

    pub platform: Platform,

    /// Only read by the buildah engine
    pub storage: StorageConfig,

    /// Shell started inside the environment at each breakpoint
    pub shell: String,

    /// Leave the working environment in place when a run fails
    pub keep_failed_environment: bool,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// `BREAKSTEP_*` variables whose values could not be interpreted, as
    /// `(name, raw value)`. [`BreakstepConfig::validate`] rejects them.
    #[serde(skip)]
    pub rejected_env: Vec<(String, String)>,
}

impl Default for BreakstepConfig {
    /// Loads `BREAKSTEP_*` environment variables, falling back to defaults.
    /// Unparseable values leave the default in place and are recorded in
    /// `rejected_env`.
    fn default() -> Self {
        let mut rejected_env = Vec::new();

        let engine = match non_empty_var(ENGINE_VAR) {
            Some(raw) => raw.parse::<EngineKind>().unwrap_or_else(|_| {
                rejected_env.push((ENGINE_VAR.to_string(), raw));
                EngineKind::default()
            }),
            None => EngineKind::default(),
        };

        let base_image =
            env::var("BREAKSTEP_BASE_IMAGE").unwrap_or_else(|_| DEFAULT_BASE_IMAGE.to_string());
        let target_image =
            env::var("BREAKSTEP_TARGET_IMAGE").unwrap_or_else(|_| DEFAULT_TARGET_IMAGE.to_string());

        let platform = Platform {
            arch: non_empty_var("BREAKSTEP_ARCH"),
            os: non_empty_var("BREAKSTEP_OS"),
            variant: non_empty_var("BREAKSTEP_VARIANT"),
        };

        let shell = env::var("BREAKSTEP_SHELL").unwrap_or_else(|_| DEFAULT_SHELL.to_string());

        let keep_failed_environment = match non_empty_var(KEEP_FAILED_VAR) {
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    rejected_env.push((KEEP_FAILED_VAR.to_string(), raw));
                    false
                }
            },
            None => false,
        };

        let log_level = env::var("BREAKSTEP_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            engine,
            base_image,
            target_image,
            platform,
            storage: StorageConfig::default(),
            shell,
            keep_failed_environment,
            log_level,
            rejected_env,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl BreakstepConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEngine` when `BREAKSTEP_ENGINE` names an
    /// unknown engine. Returns `ConfigError::ValidationFailed` for any other
    /// unparseable variable, empty image references, a relative shell path,
    /// a variant without an architecture, or an unknown log level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((name, raw)) = self.rejected_env.first() {
            if name == ENGINE_VAR {
                return Err(ConfigError::InvalidEngine(raw.clone()));
            }
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid value for {}: {}",
                name, raw
            )));
        }
        if self.base_image.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Base image must not be empty".to_string(),
            ));
        }
        if self.target_image.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Target image must not be empty".to_string(),
            ));
        }
        if !self.shell.starts_with('/') {
            return Err(ConfigError::ValidationFailed(format!(
                "Shell must be an absolute path inside the image: {}",
                self.shell
            )));
        }
        if self.platform.variant.is_some() && self.platform.arch.is_none() {
            return Err(ConfigError::ValidationFailed(
                "Platform variant requires an architecture".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }
}

impl fmt::Display for BreakstepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Breakstep Configuration:")?;
        writeln!(f, "  Engine: {}", self.engine)?;
        writeln!(f, "  Base Image: {}", self.base_image)?;
        writeln!(f, "  Target Image: {}", self.target_image)?;
        match self.platform.docker_platform() {
            Some(platform) => writeln!(f, "  Platform: {}", platform)?,
            None => writeln!(f, "  Platform: host default")?,
        }
        if self.engine == EngineKind::Buildah {
            writeln!(f, "  Storage Driver: {}", self.storage.driver)?;
            writeln!(f, "  Graph Root: {}", self.storage.graph_root.display())?;
            writeln!(f, "  Run Root: {}", self.storage.run_root.display())?;
        }
        writeln!(f, "  Shell: {}", self.shell)?;
        writeln!(f, "  Keep Failed Environment: {}", self.keep_failed_environment)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
