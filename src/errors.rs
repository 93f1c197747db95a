//! Error handling module for PeriodicTimer.

use std::any::Any;

use thiserror::Error;

/// Custom error type for PeriodicTimer operations.
#[derive(Error, Debug)]
pub enum TimerError {
    /// The worker thread or its runtime could not be created.
    #[error("Failed to spawn timer worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// The callback panicked and took the worker down with it.
    #[error("Callback execution failed: {0}")]
    CallbackError(String),
}

impl TimerError {
    /// Builds a `CallbackError` from a panic payload caught at join time.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "worker panicked".to_string()
        };
        TimerError::CallbackError(message)
    }
}
