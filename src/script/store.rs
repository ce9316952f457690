//! Script persistence

use super::{BuildScript, ScriptError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Line-oriented script file on disk
#[derive(Debug, Clone)]
pub struct ScriptStore {
    path: PathBuf,
}

impl ScriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<BuildScript, ScriptError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        let script = BuildScript::parse(&text);
        debug!(path = %self.path.display(), lines = script.len(), "Loaded script");
        Ok(script)
    }

    /// Overwrites the file with the rendered script
    pub async fn save(&self, script: &BuildScript) -> Result<(), ScriptError> {
        tokio::fs::write(&self.path, script.render())
            .await
            .map_err(|source| self.io_error(source))?;
        debug!(path = %self.path.display(), lines = script.len(), "Saved script");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> ScriptError {
        ScriptError::FileIo {
            path: self.path.clone(),
            source,
        }
    }
}
