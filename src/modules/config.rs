//! Executor configuration
//!
//! [`ExecutorConfig`] is the construction surface: a diagnostic name, the
//! initial concurrency limit and which runner backs the executor. It
//! deserializes with serde, so it can be embedded in an application's own
//! configuration file.

use std::sync::Arc;
use serde::Deserialize;

use crate::engines::core::parallel::BoundedExecutor;
use crate::engines::core::runner::{default_num_threads, ConcurrentRunner, QueueRunner};
#[cfg(feature = "parallel")]
use crate::engines::core::runner::RayonRunner;
use crate::engines::{EngineError, EngineResult};

/// Default executor name
pub const DEFAULT_NAME: &str = "batch-executor";

/// Which concurrency substrate runs the units
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backend {
    /// Rayon pool; `None` shares the process-wide pool
    #[cfg(feature = "parallel")]
    Rayon {
        #[serde(default)]
        threads: Option<usize>,
    },
    /// Dedicated worker threads draining a FIFO queue
    WorkQueue {
        #[serde(default = "default_num_threads")]
        workers: usize,
    },
}

impl Default for Backend {
    #[cfg(feature = "parallel")]
    fn default() -> Self {
        Backend::Rayon { threads: None }
    }

    #[cfg(not(feature = "parallel"))]
    fn default() -> Self {
        Backend::WorkQueue {
            workers: default_num_threads(),
        }
    }
}

/// Construction parameters for a [`BoundedExecutor`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub name: String,
    pub max_op_count: usize,
    pub backend: Backend,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            max_op_count: default_num_threads(),
            backend: Backend::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn new(name: &str, max_op_count: usize) -> Self {
        Self {
            name: name.to_string(),
            max_op_count,
            ..Self::default()
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Reject settings that cannot produce a working runner
    pub fn validate(&self) -> EngineResult<()> {
        match self.backend {
            #[cfg(feature = "parallel")]
            Backend::Rayon { threads: Some(0) } => Err(EngineError::InvalidConfig(
                "rayon backend needs at least one thread".to_string(),
            )),
            Backend::WorkQueue { workers: 0 } => Err(EngineError::InvalidConfig(
                "work queue backend needs at least one worker".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Build the runner and the executor on top of it
    pub fn build(&self) -> EngineResult<BoundedExecutor> {
        self.validate()?;

        let runner: Arc<dyn ConcurrentRunner> = match self.backend {
            #[cfg(feature = "parallel")]
            Backend::Rayon { threads: None } => RayonRunner::global()?,
            #[cfg(feature = "parallel")]
            Backend::Rayon {
                threads: Some(threads),
            } => Arc::new(RayonRunner::new(&self.name, threads)?),
            Backend::WorkQueue { workers } => Arc::new(QueueRunner::new(&self.name, workers)?),
        };

        Ok(BoundedExecutor::new(&self.name, runner, self.max_op_count))
    }
}
