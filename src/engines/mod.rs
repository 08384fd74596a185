//! Execution engines
//!
//! `core` holds the scheduling primitives (futures, runners and the bounded
//! executor); `compute` holds the batch splitting built on top of them.

pub mod core;
pub mod compute;

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Engine operation result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Error types for engine operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Task failed: {0}")]
    Task(TaskFailure),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Task was dropped before producing a result")]
    Abandoned,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Concurrency substrate error: {0}")]
    Substrate(String),
}

impl EngineError {
    /// Wrap an error returned by a unit of work
    pub fn task<E>(err: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        EngineError::Task(TaskFailure(Arc::from(err.into())))
    }

    /// The error returned by the unit of work, if this is a task failure
    pub fn task_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            EngineError::Task(failure) => Some(failure.0.as_ref()),
            _ => None,
        }
    }
}

/// Shared handle to the error a unit of work returned
#[derive(Debug, Clone)]
pub struct TaskFailure(Arc<dyn Error + Send + Sync>);

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
