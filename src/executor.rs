use log::{debug, warn};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Outcome of a single external command.
///
/// `Success` with an empty string means the command exited cleanly without
/// printing anything, which callers treat as a plain "ok".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Success(String),
    Failure,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandResult::Success(_))
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            CommandResult::Success(out) => Some(out),
            CommandResult::Failure => None,
        }
    }

    pub fn into_output(self) -> Option<String> {
        match self {
            CommandResult::Success(out) => Some(out),
            CommandResult::Failure => None,
        }
    }
}

/// Runs shell commands with a bounded wait.
///
/// Holds no state besides the default timeout, so a single executor can be
/// shared by any number of lines and called concurrently.
#[derive(Debug, Clone, Copy)]
pub struct CommandExecutor {
    timeout: Duration,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run(&self, command: &str) -> CommandResult {
        self.run_with_timeout(command, self.timeout).await
    }

    /// Runs `command` through `sh -c`. On expiry of `limit` the child is
    /// killed and reaped before `Failure` is returned.
    pub async fn run_with_timeout(&self, command: &str, limit: Duration) -> CommandResult {
        let mut child = match Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("spawn `{command}`: {e}");
                return CommandResult::Failure;
            }
        };

        let waited = timeout(limit, collect(&mut child)).await;
        match waited {
            Ok((Ok(status), stdout, stderr)) => {
                if status.success() {
                    debug!("command `{command}` ok");
                    CommandResult::Success(normalize_output(stdout))
                } else {
                    warn!("command `{command}` failed with {status}: {}", stderr.trim());
                    CommandResult::Failure
                }
            }
            Ok((Err(e), _, _)) => {
                warn!("wait for `{command}`: {e}");
                CommandResult::Failure
            }
            Err(_) => {
                warn!("command `{command}` timed out after {limit:?}, killing it");
                if let Some(pid) = child.id() {
                    kill_group(pid);
                }
                if let Err(e) = child.kill().await {
                    warn!("kill `{command}`: {e}");
                }
                CommandResult::Failure
            }
        }
    }
}

/// SIGKILLs everything the command started. The child leads its own process
/// group (`process_group(0)` at spawn), so its pid is the group id.
fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal, no memory is shared with the callee.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        debug!("killpg {pgid}: {}", io::Error::last_os_error());
    }
}

async fn collect(child: &mut Child) -> (io::Result<ExitStatus>, String, String) {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr))
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe
        && let Err(e) = pipe.read_to_string(&mut buf).await
    {
        debug!("read child pipe: {e}");
    }
    buf
}

pub(crate) fn normalize_output(stdout: String) -> String {
    if stdout.trim().is_empty() {
        return String::new();
    }
    match stdout.strip_suffix('\n') {
        Some(stripped) => stripped.to_string(),
        None => stdout,
    }
}
