// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running operations, using
//! `tokio::process::Command`, under a hard deadline.
//!
//! - [`bounded`] spawns, times and (if needed) kills one child process.
//! - [`command`] builds the argument vectors for provisioning and discovery
//!   operations.
//! - [`backend`] provides the `OperationExecutor` trait and the concrete
//!   `RealExecutor` that the sequencer uses in production, and which tests
//!   can replace with a fake implementation.

pub mod backend;
pub mod bounded;
pub mod command;

pub use backend::{OperationExecutor, RealExecutor};
pub use bounded::{
    CANCELLED_EXIT_CODE, ExecRequest, OperationResult, TIMEOUT_EXIT_CODE, execute,
    execute_with_cancel, timeout_message,
};
pub use command::OperationCommand;
