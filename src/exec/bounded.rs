// src/exec/bounded.rs

//! Deadline-bounded process execution.

use std::future::pending;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{ProvrunError, Result};

/// Exit code reported when the deadline expired and the child was killed.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Exit code reported when the caller cancelled the operation.
pub const CANCELLED_EXIT_CODE: i32 = -2;

/// How long to wait for the output readers once the process group is gone.
const READER_GRACE: Duration = Duration::from_millis(500);

/// One external command to run.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Written to the child's stdin, which is then closed. `None` gives the
    /// child a null stdin.
    pub stdin: Option<String>,
    pub timeout: Duration,
}

impl ExecRequest {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            stdin: None,
            timeout,
        }
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn display_program(&self) -> String {
        self.program.display().to_string()
    }
}

/// Captured outcome of one process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl OperationResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.exit_code == TIMEOUT_EXIT_CODE
    }

    pub fn cancelled(&self) -> bool {
        self.exit_code == CANCELLED_EXIT_CODE
    }
}

/// Deterministic stderr replacement for a timed-out operation.
pub fn timeout_message(timeout: Duration) -> String {
    format!(
        "Operation timed out! Took more than {} seconds.\n",
        timeout.as_secs_f64()
    )
}

/// Run `request` to completion or until its deadline.
pub async fn execute(request: &ExecRequest) -> Result<OperationResult> {
    execute_with_cancel(request, None).await
}

/// Like [`execute`], but also stops the child when `cancel` flips to `true`.
///
/// Exactly one child is spawned. Whatever way it ends, its process group is
/// killed and the child is reaped before returning, so nothing it started in
/// the background outlives the call.
pub async fn execute_with_cancel(
    request: &ExecRequest,
    cancel: Option<watch::Receiver<bool>>,
) -> Result<OperationResult> {
    let program = request.display_program();
    debug!(
        program = %program,
        args = ?request.args,
        timeout_secs = request.timeout.as_secs_f64(),
        "spawning operation"
    );

    let mut cmd = Command::new(&request.program);
    cmd.args(&request.args)
        .stdin(if request.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group, so a kill also reaches anything the child started.
    #[cfg(unix)]
    cmd.process_group(0);

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|source| ProvrunError::Spawn {
        program: program.clone(),
        source,
    })?;
    // `Child::id` is gone once the child is reaped; the group outlives it.
    let pid = child.id();

    if let (Some(input), Some(mut stdin)) = (request.stdin.clone(), child.stdin.take()) {
        tokio::spawn(async move {
            // The child may exit without reading; that is not our failure.
            let _ = stdin.write_all(input.as_bytes()).await;
        });
    }

    let mut stdout = Capture::spawn(child.stdout.take());
    let mut stderr = Capture::spawn(child.stderr.take());

    let cancelled = wait_for_cancel(cancel);

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res?;
            // A background grandchild may still hold the pipes open.
            kill_group(pid);
            drain(&mut stdout, &mut stderr).await;
            let exit_code = exit_code_of(status);
            let elapsed = start.elapsed();

            info!(
                program = %program,
                exit_code,
                elapsed_secs = elapsed.as_secs_f64(),
                "operation exited"
            );

            Ok(OperationResult {
                exit_code,
                stdout: stdout.take(),
                stderr: stderr.take(),
                elapsed,
            })
        }

        _ = tokio::time::sleep(request.timeout) => {
            warn!(
                program = %program,
                timeout_secs = request.timeout.as_secs_f64(),
                "operation exceeded its deadline; killing"
            );
            terminate(&mut child, pid).await;
            drain(&mut stdout, &mut stderr).await;

            Ok(OperationResult {
                exit_code: TIMEOUT_EXIT_CODE,
                stdout: stdout.take(),
                stderr: timeout_message(request.timeout),
                elapsed: request.timeout,
            })
        }

        _ = cancelled => {
            info!(program = %program, "cancellation requested; killing operation");
            terminate(&mut child, pid).await;
            drain(&mut stdout, &mut stderr).await;

            Ok(OperationResult {
                exit_code: CANCELLED_EXIT_CODE,
                stdout: stdout.take(),
                stderr: "Operation cancelled.\n".to_string(),
                elapsed: start.elapsed(),
            })
        }
    }
}

/// Resolves once the token reads `true`; never resolves without a token or
/// after the sender is gone.
async fn wait_for_cancel(cancel: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = cancel else {
        return pending().await;
    };
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        pending::<()>().await;
    }
}

/// Kill the child's process group, then the child itself, and reap it.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    kill_group(pid);

    if let Err(e) = child.kill().await {
        debug!(error = %e, "kill after group kill failed; child already gone");
        let _ = child.wait().await;
    }
}

/// SIGKILL every process left in the child's group.
fn kill_group(pid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pid) = pid {
            // SAFETY: killpg only sends a signal; the group id is our child's
            // pid because it was spawned with process_group(0).
            let ret = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
            if ret != 0 {
                // ESRCH: the group already emptied out.
                debug!(pid, error = %std::io::Error::last_os_error(), "killpg found nothing to kill");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}

/// Output of one child stream, read in chunks into a buffer we keep even if
/// the reader has to be abandoned.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn spawn<R>(handle: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let task = tokio::spawn(async move {
            let Some(mut h) = handle else { return };
            let mut chunk = [0u8; 8192];
            loop {
                match h.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .extend_from_slice(&chunk[..n]),
                }
            }
        });
        Self { buf, task }
    }

    fn take(&self) -> String {
        let bytes = std::mem::take(
            &mut *self.buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Wait for both readers to hit EOF, sharing a single grace deadline.
async fn drain(stdout: &mut Capture, stderr: &mut Capture) {
    let deadline = tokio::time::Instant::now() + READER_GRACE;
    let both = async {
        let _ = (&mut stdout.task).await;
        let _ = (&mut stderr.task).await;
    };
    if tokio::time::timeout_at(deadline, both).await.is_err() {
        debug!("output readers still open after grace period; keeping partial output");
        stdout.task.abort();
        stderr.task.abort();
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> ExecRequest {
        ExecRequest::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
    }

    #[tokio::test]
    async fn captures_streams_and_exit_code() {
        let result = execute(&sh("echo out; echo err >&2; exit 3", Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert!(!result.timed_out());
    }

    #[tokio::test]
    async fn feeds_stdin_when_given() {
        let request = sh("cat", Duration::from_secs(5)).with_stdin("hello");
        let result = execute(&request).await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout, "hello");
    }

    #[tokio::test]
    async fn signal_exit_is_not_the_timeout_sentinel() {
        let result = execute(&sh("kill -9 $$", Duration::from_secs(5))).await.unwrap();
        assert_eq!(result.exit_code, 128 + 9);
    }

    #[tokio::test]
    async fn cancel_token_stops_the_child() {
        let (tx, rx) = watch::channel(false);
        let request = sh("sleep 30", Duration::from_secs(30));

        let handle = tokio::spawn(async move { execute_with_cancel(&request, Some(rx)).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("cancel should end the wait")
            .unwrap()
            .unwrap();
        assert!(result.cancelled());
    }
}
