use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to spawn '{0}': {1}")]
    Spawn(String, String),
    #[error("'{0}' did not complete within {1:?}")]
    Timeout(String, Duration),
    #[error("failed waiting on child process: {0}")]
    Wait(String),
}

/// Result of a completed (or timed-out-and-killed) probe. Mirrors
/// `legacy_src/sandbox/types.rs::SandboxCommand`'s exit_code/stdout/
/// stderr shape, plus truncation flags since real probe output is
/// capped rather than unconditionally captured in full.
#[derive(Debug, Clone)]
pub struct SandboxOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stdout_truncated: bool,
    pub stderr: String,
    pub stderr_truncated: bool,
}

impl SandboxOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}
