#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use provrun::config::ConfigFile;
use provrun::engine::Sequencer;
use provrun::exec::{OperationCommand, OperationExecutor};
use provrun::fs::{FileSystem, RealFileSystem};

pub use provrun_test_utils::init_tracing;

/// Sequencer over the real filesystem, with payloads under the session's
/// scratch dir.
pub fn sequencer_in<E: OperationExecutor>(cfg: &ConfigFile, executor: E) -> Sequencer<E> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    Sequencer::new(
        cfg.template.clone(),
        cfg.session.trimmed_targets(),
        OperationCommand::with_program("provrun", &cfg.session),
        fs,
        cfg.session.scratch_dir.clone(),
        executor,
    )
}

/// Number of regular files directly inside `dir` (0 if it doesn't exist).
pub fn files_in(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .count(),
        Err(_) => 0,
    }
}
