use super::EngineError;
use std::process::Stdio;
use tokio::process::Command;
use tracing::trace;

/// Captured result of a finished engine tool invocation
#[derive(Debug, Clone)]
pub(crate) struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        combined.push_str(&self.stderr);
        combined
    }

    /// Last non-empty stdout line, which is where buildah prints ids
    pub fn last_line(&self) -> String {
        self.stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

/// Runs `program args...` to completion with stdin closed
pub(crate) async fn run(program: &str, args: &[String]) -> Result<ProcessOutput, EngineError> {
    trace!(program, ?args, "Spawning engine tool");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| EngineError::Spawn {
            program: program.to_string(),
            source,
        })?;

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code: output.status.code(),
    })
}

/// Like [`run`] but turns a non-zero exit into [`EngineError::ToolFailed`]
pub(crate) async fn run_checked(
    program: &str,
    action: &str,
    args: &[String],
) -> Result<ProcessOutput, EngineError> {
    let output = run(program, args).await?;
    if !output.success() {
        return Err(EngineError::ToolFailed {
            program: program.to_string(),
            action: action.to_string(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_streams() {
        let args = vec!["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()];
        let output = run("sh", &args).await.unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.code, Some(3));
        assert_eq!(output.combined(), "out\nerr\n");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_run_checked_reports_failure() {
        let args = vec!["-c".to_string(), "echo nope >&2; exit 1".to_string()];
        match run_checked("sh", "version", &args).await {
            Err(EngineError::ToolFailed {
                action, code, stderr, ..
            }) => {
                assert_eq!(action, "version");
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "nope");
            }
            other => panic!("Expected ToolFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let result = run("breakstep-definitely-not-installed", &[]).await;
        assert!(matches!(result, Err(EngineError::Spawn { .. })));
    }

    #[test]
    fn test_last_line() {
        let output = ProcessOutput {
            stdout: "Getting image source signatures\nabc123\n\n".to_string(),
            stderr: String::new(),
            code: Some(0),
        };
        assert_eq!(output.last_line(), "abc123");
    }
}
