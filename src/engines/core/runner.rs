//! Concurrency substrates
//!
//! The executor only needs a way to run a boxed closure on some thread.
//! [`ConcurrentRunner`] is that capability; [`RayonRunner`] backs it with a
//! managed rayon pool and [`QueueRunner`] with a fixed set of threads
//! draining a FIFO work queue.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
#[cfg(feature = "parallel")]
use std::sync::OnceLock;
use crossbeam_channel::{Receiver, Sender};

use crate::engines::{EngineError, EngineResult};

/// A unit of work handed to a runner
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run jobs on other threads
pub trait ConcurrentRunner: Send + Sync {
    /// Run `job` on a worker thread; jobs submitted earlier start first
    fn spawn(&self, job: Job);

    /// Name used in diagnostics
    fn name(&self) -> &str;
}

/// Get the default number of threads to use
pub fn default_num_threads() -> usize {
    num_cpus::get()
}

#[cfg(feature = "parallel")]
static GLOBAL_RUNNER: OnceLock<Arc<RayonRunner>> = OnceLock::new();

/// Runner backed by a rayon thread pool
#[cfg(feature = "parallel")]
pub struct RayonRunner {
    pool: rayon::ThreadPool,
    name: String,
}

#[cfg(feature = "parallel")]
impl RayonRunner {
    /// Build a pool with `num_threads` workers named `{name}-{idx}`
    pub fn new(name: &str, num_threads: usize) -> EngineResult<Self> {
        let prefix = name.to_string();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |idx| format!("{}-{}", prefix, idx))
            .build()
            .map_err(|e| EngineError::Substrate(e.to_string()))?;

        log::info!("Initialized rayon runner '{}' with {} threads", name, num_threads);

        Ok(Self {
            pool,
            name: name.to_string(),
        })
    }

    /// Process-wide pool sized to the number of CPUs
    pub fn global() -> EngineResult<Arc<RayonRunner>> {
        if let Some(runner) = GLOBAL_RUNNER.get() {
            return Ok(Arc::clone(runner));
        }

        let runner = Arc::new(Self::new("batch-worker", default_num_threads())?);
        // A concurrent caller may have won the race; keep whichever landed first
        Ok(Arc::clone(GLOBAL_RUNNER.get_or_init(|| runner)))
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(feature = "parallel")]
impl ConcurrentRunner for RayonRunner {
    fn spawn(&self, job: Job) {
        self.pool.spawn_fifo(job);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Runner backed by dedicated threads pulling from a FIFO queue
///
/// Dropping the runner closes the queue; workers finish what was already
/// queued and are then joined.
pub struct QueueRunner {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    name: String,
}

impl QueueRunner {
    /// Start `num_workers` threads named `{name}-{idx}`
    pub fn new(name: &str, num_workers: usize) -> EngineResult<Self> {
        if num_workers == 0 {
            return Err(EngineError::InvalidConfig(
                "work queue needs at least one worker".to_string(),
            ));
        }

        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(num_workers);

        for idx in 0..num_workers {
            let receiver: Receiver<Job> = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, idx))
                .spawn(move || {
                    for job in receiver.iter() {
                        job();
                    }
                })
                .map_err(|e| EngineError::Substrate(e.to_string()))?;
            workers.push(handle);
        }

        log::info!("Initialized work queue '{}' with {} workers", name, num_workers);

        Ok(Self {
            sender: Some(sender),
            workers,
            name: name.to_string(),
        })
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }
}

impl ConcurrentRunner for QueueRunner {
    fn spawn(&self, job: Job) {
        let sent = self
            .sender
            .as_ref()
            .map(|sender| sender.send(job).is_ok())
            .unwrap_or(false);

        if !sent {
            log::error!("Work queue '{}' is closed, job dropped", self.name);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for QueueRunner {
    fn drop(&mut self) {
        self.sender.take();

        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            // The last reference can be released from one of our own workers
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::warn!("Work queue '{}' worker exited with a panic", self.name);
            }
        }
    }
}
