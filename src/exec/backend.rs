// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The sequencer talks to an `OperationExecutor` instead of spawning
//! processes itself. This makes it easy to swap in a fake executor in tests
//! while keeping the production implementation in [`bounded`].
//!
//! - `RealExecutor` is the default implementation used by `provrun run`. It
//!   runs each request through [`bounded::execute_with_cancel`].
//! - Tests can provide their own `OperationExecutor` that, for example,
//!   records each request and returns canned stdout.
//!
//! [`bounded`]: super::bounded
//! [`bounded::execute_with_cancel`]: super::bounded::execute_with_cancel

use std::future::Future;
use std::pin::Pin;

use tokio::sync::watch;

use crate::errors::Result;

use super::bounded::{ExecRequest, OperationResult, execute_with_cancel};

/// Trait abstracting how operations are executed.
///
/// Production code uses [`RealExecutor`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait OperationExecutor: Send {
    /// Run one operation and return its captured result.
    ///
    /// Implementations must return `Err` only when the operation could not be
    /// started; a non-zero exit is an `Ok` result.
    fn execute(
        &mut self,
        request: ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OperationResult>> + Send + '_>>;
}

/// Real executor backend used in production.
#[derive(Debug, Default)]
pub struct RealExecutor {
    cancel: Option<watch::Receiver<bool>>,
}

impl RealExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the running operation as soon as `cancel` reads `true`.
    pub fn with_cancel(cancel: watch::Receiver<bool>) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }
}

impl OperationExecutor for RealExecutor {
    fn execute(
        &mut self,
        request: ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OperationResult>> + Send + '_>> {
        // Clone the receiver so the future doesn't borrow `self` across `await`.
        let cancel = self.cancel.clone();

        Box::pin(async move { execute_with_cancel(&request, cancel).await })
    }
}
