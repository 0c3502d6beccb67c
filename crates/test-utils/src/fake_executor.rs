use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use provrun::errors::{ProvrunError, Result};
use provrun::exec::{ExecRequest, OperationExecutor, OperationResult};
use provrun::fs::FileSystem;

use crate::fixtures;

/// One scripted reply: a result, or a failure to start the operation.
#[derive(Debug, Clone)]
pub enum Reply {
    Result(OperationResult),
    SpawnFailure,
}

/// A fake executor that:
/// - records every request it receives
/// - answers with scripted replies, in order
/// - falls back to an accepted, completed job once the script runs out
/// - optionally snapshots the payload file each request points at
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<ExecRequest>>>,
    payloads: Arc<Mutex<Vec<String>>>,
    payload_fs: Option<Arc<dyn FileSystem>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, result: OperationResult) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Result(result));
        self
    }

    pub fn then_spawn_failure(self) -> Self {
        self.replies.lock().unwrap().push_back(Reply::SpawnFailure);
        self
    }

    /// Read the `--file` argument of each request through `fs`.
    pub fn capturing_payloads(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.payload_fs = Some(fs);
        self
    }

    /// Handle for inspecting the requests after the executor was moved.
    pub fn requests(&self) -> Arc<Mutex<Vec<ExecRequest>>> {
        Arc::clone(&self.requests)
    }

    pub fn payloads(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.payloads)
    }

    fn capture_payload(&self, request: &ExecRequest) {
        let Some(fs) = &self.payload_fs else {
            return;
        };
        let file = request
            .args
            .iter()
            .position(|a| a == "--file")
            .and_then(|i| request.args.get(i + 1))
            .map(PathBuf::from);
        if let Some(path) = file {
            let text = fs.read_to_string(&path).unwrap_or_default();
            self.payloads.lock().unwrap().push(text);
        }
    }
}

impl OperationExecutor for ScriptedExecutor {
    fn execute(
        &mut self,
        request: ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OperationResult>> + Send + '_>> {
        self.capture_payload(&request);
        let program = request.display_program();
        self.requests.lock().unwrap().push(request);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Result(fixtures::ok(fixtures::accepted_stdout(&["Completed"]))));

        Box::pin(async move {
            match reply {
                Reply::Result(result) => Ok(result),
                Reply::SpawnFailure => Err(ProvrunError::Spawn {
                    program,
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted"),
                }),
            }
        })
    }
}
