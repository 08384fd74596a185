//! Bounded parallel execution
//!
//! [`BoundedExecutor`] accepts units of work, hands at most `max_op_count`
//! of them to its runner at a time and surfaces each outcome as a
//! [`TaskFuture`]. Units beyond the limit wait in a FIFO queue owned by the
//! executor, so the runner itself never needs to be throttled.

use std::any::Any;
use std::collections::VecDeque;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use parking_lot::Mutex;

use crate::engines::core::future::{promise, TaskFuture};
use crate::engines::core::runner::{ConcurrentRunner, Job};
use crate::engines::{EngineError, EngineResult};

/// A queued unit: runs the body and returns the step that publishes its outcome
type Unit = Box<dyn FnOnce() -> Job + Send + 'static>;

/// Dispatch bookkeeping, guarded by a single lock
struct Gate {
    max_op_count: usize,
    op_count: usize,
    pending: VecDeque<Unit>,
}

struct ExecutorInner {
    name: String,
    runner: Arc<dyn ConcurrentRunner>,
    gate: Mutex<Gate>,
}

impl ExecutorInner {
    fn enqueue(self: &Arc<Self>, unit: Unit) {
        self.gate.lock().pending.push_back(unit);
        self.pump();
    }

    /// Move queued units to the runner while the limit allows
    fn pump(self: &Arc<Self>) {
        let ready: Vec<Unit> = {
            let mut gate = self.gate.lock();
            let mut ready = Vec::new();
            while gate.op_count < gate.max_op_count {
                match gate.pending.pop_front() {
                    Some(unit) => {
                        gate.op_count += 1;
                        ready.push(unit);
                    }
                    None => break,
                }
            }
            ready
        };

        // The runner is called without holding the gate
        for unit in ready {
            log::debug!("Executor '{}' dispatching unit on '{}'", self.name, self.runner.name());
            let inner = Arc::clone(self);
            self.runner.spawn(Box::new(move || {
                let publish = unit();

                // Observers run with the slot already released
                inner.finish_unit();

                if panic::catch_unwind(AssertUnwindSafe(publish)).is_err() {
                    log::error!("Completion observer panicked on executor '{}'", inner.name);
                }
            }));
        }
    }

    fn finish_unit(self: &Arc<Self>) {
        {
            let mut gate = self.gate.lock();
            gate.op_count = gate.op_count.saturating_sub(1);
        }
        self.pump();
    }
}

/// Executor that runs at most `max_op_count` units at once
///
/// Cloning is cheap; clones share the same limit and queue.
#[derive(Clone)]
pub struct BoundedExecutor {
    inner: Arc<ExecutorInner>,
}

impl BoundedExecutor {
    /// Create an executor on top of `runner`
    pub fn new(name: &str, runner: Arc<dyn ConcurrentRunner>, max_op_count: usize) -> Self {
        log::info!(
            "Created executor '{}' on runner '{}' with max_op_count {}",
            name,
            runner.name(),
            max_op_count
        );

        Self {
            inner: Arc::new(ExecutorInner {
                name: name.to_string(),
                runner,
                gate: Mutex::new(Gate {
                    max_op_count,
                    op_count: 0,
                    pending: VecDeque::new(),
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current concurrency limit
    pub fn max_op_count(&self) -> usize {
        self.inner.gate.lock().max_op_count
    }

    /// Change the concurrency limit
    ///
    /// Running units are never interrupted. Raising the limit dispatches
    /// queued units right away; zero holds every new unit in the queue.
    pub fn set_max_op_count(&self, max_op_count: usize) {
        let previous = {
            let mut gate = self.inner.gate.lock();
            std::mem::replace(&mut gate.max_op_count, max_op_count)
        };
        log::info!(
            "Executor '{}' max_op_count changed from {} to {}",
            self.inner.name,
            previous,
            max_op_count
        );
        self.inner.pump();
    }

    /// Number of units currently running
    pub fn op_count(&self) -> usize {
        self.inner.gate.lock().op_count
    }

    /// Number of units accepted but not dispatched yet
    pub fn queued_count(&self) -> usize {
        self.inner.gate.lock().pending.len()
    }

    /// Run `body` under the concurrency limit
    ///
    /// An error returned by `body` resolves the future with
    /// [`EngineError::Task`]; a panic resolves it with
    /// [`EngineError::Panicked`]. Neither reaches the caller or other units.
    pub fn execute<T, E, F>(&self, body: F) -> TaskFuture<T>
    where
        T: Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>>,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.submit(move || body().map_err(EngineError::task))
    }

    /// Run `body`, which itself produces a future, under the concurrency limit
    ///
    /// The unit holds a slot only while `body` runs; waiting on the inner
    /// future does not count against the limit.
    pub fn execute_future<T, F>(&self, body: F) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> TaskFuture<T> + Send + 'static,
    {
        self.submit(move || Ok(body())).flatten()
    }

    fn submit<T, F>(&self, unit: F) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> EngineResult<T> + Send + 'static,
    {
        let (promise, future) = promise();
        let name = self.inner.name.clone();

        self.inner.enqueue(Box::new(move || -> Job {
            let result = match panic::catch_unwind(AssertUnwindSafe(unit)) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::warn!("Unit on executor '{}' panicked: {}", name, message);
                    Err(EngineError::Panicked(message))
                }
            };
            Box::new(move || promise.fulfill(result))
        }));

        future
    }
}

impl std::fmt::Debug for BoundedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gate = self.inner.gate.lock();
        f.debug_struct("BoundedExecutor")
            .field("name", &self.inner.name)
            .field("runner", &self.inner.runner.name())
            .field("max_op_count", &gate.max_op_count)
            .field("op_count", &gate.op_count)
            .field("queued", &gate.pending.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
