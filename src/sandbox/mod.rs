//! Bounded subprocess execution: one of the three suspension points
//! the interpreter is allowed to block on (the others are file reads
//! and the resolver's own subprocess spawns, which reuse this module).
//! Every spawn is wrapped in a hard wall-clock timeout and each output
//! stream is capped at [`MAX_OUTPUT_BYTES`] — a probe that floods
//! stdout cannot exhaust memory or hang a configure run forever.
//!
//! Grounded directly on `legacy_src/sandbox/sandbox.rs` /
//! `legacy_src/sandbox/types.rs`: same timeout-wrapped-subprocess
//! shape, generalized from an in-process bash VM to a real OS
//! subprocess since compiler/resolver probes must exec real tools.

pub mod types;

pub use types::{SandboxError, SandboxOutput};

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// The third suspension-point kind alongside compiler/resolver
/// subprocess spawns: reading a DSL/toolchain-descriptor/
/// `configure_file` input file, bounded the same way a probe's output
/// is. A stuck network filesystem can't hang a configure run forever.
pub async fn read_file_bounded(path: &Path, limit: usize, timeout: Duration) -> Result<String, SandboxError> {
    let body = async {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| SandboxError::Spawn(path.display().to_string(), e.to_string()))?;
        let read = read_bounded(&mut file, limit).await;
        Ok::<_, SandboxError>(read.text)
    };
    match tokio::time::timeout(timeout, body).await {
        Ok(result) => result,
        Err(_) => Err(SandboxError::Timeout(path.display().to_string(), timeout)),
    }
}

pub const MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SandboxRequest<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    pub cwd: Option<&'a Path>,
    pub env: &'a [(String, String)],
    pub timeout: Duration,
}

impl<'a> SandboxRequest<'a> {
    pub fn new(program: &'a str, args: &'a [String]) -> Self {
        Self { program, args, cwd: None, env: &[], timeout: DEFAULT_TIMEOUT }
    }
}

/// Spawn `request.program`, wait for completion or timeout, returning
/// bounded stdout/stderr and the exit status. Never panics on a
/// non-zero exit — that is ordinary probe-failure information the
/// caller (compiler discovery, resolver strategy) interprets itself.
pub async fn run(request: SandboxRequest<'_>) -> Result<SandboxOutput, SandboxError> {
    let mut cmd = Command::new(request.program);
    cmd.args(request.args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    if let Some(cwd) = request.cwd {
        cmd.current_dir(cwd);
    }
    for (k, v) in request.env {
        cmd.env(k, v);
    }

    let mut child = cmd.spawn().map_err(|e| SandboxError::Spawn(request.program.to_string(), e.to_string()))?;
    let mut stdout_pipe = child.stdout.take().expect("stdout piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr piped");

    let body = async {
        let (stdout, stderr, status) = tokio::join!(
            read_bounded(&mut stdout_pipe, MAX_OUTPUT_BYTES),
            read_bounded(&mut stderr_pipe, MAX_OUTPUT_BYTES),
            child.wait(),
        );
        let status = status.map_err(|e| SandboxError::Wait(e.to_string()))?;
        Ok::<_, SandboxError>((stdout, stderr, status))
    };

    let (stdout, stderr, status) = match tokio::time::timeout(request.timeout, body).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(SandboxError::Timeout(request.program.to_string(), request.timeout));
        }
    };

    Ok(SandboxOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: stdout.text,
        stdout_truncated: stdout.truncated,
        stderr: stderr.text,
        stderr_truncated: stderr.truncated,
    })
}

struct BoundedRead {
    text: String,
    truncated: bool,
}

async fn read_bounded(pipe: &mut (impl AsyncReadExt + Unpin), limit: usize) -> BoundedRead {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];
    let mut truncated = false;
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let remaining = limit.saturating_sub(buf.len());
                if remaining == 0 {
                    truncated = true;
                    continue;
                }
                let take = n.min(remaining);
                buf.extend_from_slice(&chunk[..take]);
                if take < n {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }
    BoundedRead { text: String::from_utf8_lossy(&buf).into_owned(), truncated }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_true_and_false() {
        let out = run(SandboxRequest::new("true", &[])).await.unwrap();
        assert_eq!(out.exit_code, 0);

        let out = run(SandboxRequest::new("false", &[])).await.unwrap();
        assert_eq!(out.exit_code, 1);
    }

    #[tokio::test]
    async fn captures_stdout() {
        let args = vec!["hello".to_string()];
        let out = run(SandboxRequest::new("echo", &args)).await.unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert!(!out.stdout_truncated);
    }

    #[tokio::test]
    async fn unknown_program_is_spawn_error() {
        let err = run(SandboxRequest::new("definitely-not-a-real-binary-xyz", &[])).await.unwrap_err();
        assert!(matches!(err, SandboxError::Spawn(..)));
    }

    #[tokio::test]
    async fn timeout_kills_long_running_process() {
        let args = vec!["5".to_string()];
        let mut req = SandboxRequest::new("sleep", &args);
        req.timeout = Duration::from_millis(50);
        let err = run(req).await.unwrap_err();
        assert!(matches!(err, SandboxError::Timeout(..)));
    }

    #[tokio::test]
    async fn reads_file_contents_within_limit() {
        let dir = std::env::temp_dir().join(format!("mbuild-sandbox-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("input.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();
        let content = read_file_bounded(&path, MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT).await.unwrap();
        assert_eq!(content, "hello world");
    }

    #[tokio::test]
    async fn missing_file_is_spawn_error() {
        let path = std::path::Path::new("/nonexistent/definitely-missing-xyz.txt");
        let err = read_file_bounded(path, MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT).await.unwrap_err();
        assert!(matches!(err, SandboxError::Spawn(..)));
    }
}
