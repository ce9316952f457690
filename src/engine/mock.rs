use super::{BuildEngine, CommittedImage, EngineError, ExecOutput, WorkingEnvironment};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One observed interaction with the engine or the session runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Create(String),
    Execute(Vec<String>),
    Attach(String),
    Commit(String),
    Discard(String),
}

/// Shared, ordered record of calls.
///
/// Hand the same log to [`MockEngine`] and to a recording session runner to
/// assert on the interleaving of executes and session attachments.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    pub fn executes(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Execute(argv) => Some(argv.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Scripted in-memory engine.
///
/// Every command succeeds with empty output unless a result was registered
/// for its joined argv with [`MockEngine::respond`].
pub struct MockEngine {
    log: CallLog,
    responses: Mutex<HashMap<String, ExecOutput>>,
    fail_create: Option<String>,
    fail_execute: Option<String>,
    fail_commit: Option<String>,
    fail_discard: Option<String>,
    session_command: Option<Vec<String>>,
}

impl MockEngine {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            responses: Mutex::new(HashMap::new()),
            fail_create: None,
            fail_execute: None,
            fail_commit: None,
            fail_discard: None,
            session_command: None,
        }
    }

    /// Result returned when `command` (argv joined by single spaces) runs
    pub fn respond(self, command: &str, output: ExecOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), output);
        self
    }

    pub fn fail_create(mut self, message: impl Into<String>) -> Self {
        self.fail_create = Some(message.into());
        self
    }

    /// Makes the engine itself error (not the command) when `command` runs
    pub fn fail_execute(mut self, command: impl Into<String>) -> Self {
        self.fail_execute = Some(command.into());
        self
    }

    pub fn fail_commit(mut self, message: impl Into<String>) -> Self {
        self.fail_commit = Some(message.into());
        self
    }

    pub fn fail_discard(mut self, message: impl Into<String>) -> Self {
        self.fail_discard = Some(message.into());
        self
    }

    /// Program a terminal session launches instead of `mock-attach`
    pub fn with_session_command<S: Into<String>>(
        mut self,
        argv: impl IntoIterator<Item = S>,
    ) -> Self {
        self.session_command = Some(argv.into_iter().map(Into::into).collect());
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

#[async_trait]
impl BuildEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_environment(
        &self,
        base_image: &str,
    ) -> Result<WorkingEnvironment, EngineError> {
        self.log.record(EngineCall::Create(base_image.to_string()));
        if let Some(message) = &self.fail_create {
            return Err(EngineError::Other(message.clone()));
        }
        Ok(WorkingEnvironment::new("mock-working-container", base_image))
    }

    async fn execute(
        &self,
        _env: &mut WorkingEnvironment,
        argv: &[String],
    ) -> Result<ExecOutput, EngineError> {
        self.log.record(EngineCall::Execute(argv.to_vec()));
        let command = argv.join(" ");
        if self.fail_execute.as_deref() == Some(command.as_str()) {
            return Err(EngineError::Other(format!("engine lost while running {}", command)));
        }

        let response = self.responses.lock().unwrap().get(&command).cloned();
        Ok(response.unwrap_or_else(|| ExecOutput::new("", Some(0))))
    }

    async fn commit(
        &self,
        _env: WorkingEnvironment,
        target: &str,
    ) -> Result<CommittedImage, EngineError> {
        self.log.record(EngineCall::Commit(target.to_string()));
        if let Some(message) = &self.fail_commit {
            return Err(EngineError::Other(message.clone()));
        }
        Ok(CommittedImage {
            reference: target.to_string(),
            id: "sha256:mock".to_string(),
        })
    }

    async fn discard(&self, env: WorkingEnvironment) -> Result<(), EngineError> {
        self.log.record(EngineCall::Discard(env.id().to_string()));
        if let Some(message) = &self.fail_discard {
            return Err(EngineError::Other(message.clone()));
        }
        Ok(())
    }

    fn session_command(&self, env: &WorkingEnvironment, shell: &str) -> Vec<String> {
        match &self.session_command {
            Some(argv) => argv.clone(),
            None => vec!["mock-attach".to_string(), env.id().to_string(), shell.to_string()],
        }
    }
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine")
            .field("calls", &self.log.calls().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(command: &str) -> Vec<String> {
        command.split_whitespace().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_mock_records_calls_in_order() {
        let log = CallLog::new();
        let engine = MockEngine::new(log.clone());

        let mut env = engine.create_environment("alpine").await.unwrap();
        engine.execute(&mut env, &argv("echo a")).await.unwrap();
        let image = engine.commit(env, "app:dbg").await.unwrap();

        assert_eq!(image.reference, "app:dbg");
        assert_eq!(
            log.calls(),
            vec![
                EngineCall::Create("alpine".into()),
                EngineCall::Execute(argv("echo a")),
                EngineCall::Commit("app:dbg".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_scripted_response() {
        let engine = MockEngine::new(CallLog::new())
            .respond("false", ExecOutput::new("nope", Some(1)));
        let mut env = engine.create_environment("alpine").await.unwrap();

        let out = engine.execute(&mut env, &argv("false")).await.unwrap();
        assert_eq!(out.exit_code, Some(1));
        assert_eq!(out.output, "nope");

        let out = engine.execute(&mut env, &argv("true")).await.unwrap();
        assert!(out.success());
    }

    #[tokio::test]
    async fn test_mock_failures() {
        let engine = MockEngine::new(CallLog::new())
            .fail_execute("reboot")
            .fail_commit("disk full");
        let mut env = engine.create_environment("alpine").await.unwrap();

        assert!(engine.execute(&mut env, &argv("reboot")).await.is_err());
        assert!(engine.commit(env, "app").await.is_err());

        let engine = MockEngine::new(CallLog::new()).fail_create("no such image");
        assert!(engine.create_environment("ghost").await.is_err());
    }
}
