// ABOUTME: Command execution collaborator shared by local and SSH transports.
// ABOUTME: Both return the same (stdout, exit status) shape so engines treat them alike.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Output from a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors that prevent a command from producing an exit status at all.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to spawn command: {0}")]
    Spawn(String),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Runs a shell command line somewhere and reports how it went.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` through a POSIX shell.
    async fn run(&self, command: &str) -> Result<CommandOutput, RunError>;

    /// Human-readable name of where commands run, for progress messages.
    fn location(&self) -> String;
}

/// Runs commands on this machine via `sh -c`.
#[derive(Debug, Clone)]
pub struct LocalShell {
    timeout: Duration,
}

impl LocalShell {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(300),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for LocalShell {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for LocalShell {
    async fn run(&self, command: &str) -> Result<CommandOutput, RunError> {
        tracing::debug!(command, "running local command");

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result.map_err(|e| RunError::Spawn(e.to_string()))?,
            Err(_) => return Err(RunError::Timeout(self.timeout)),
        };

        // A signal-terminated process has no exit code; report it as a failure.
        let exit_code = output
            .status
            .code()
            .map(|c| c as u32)
            .unwrap_or(u32::MAX);

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn location(&self) -> String {
        "localhost".to_string()
    }
}

/// Quote a single word for a POSIX shell.
pub fn quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '='))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}
