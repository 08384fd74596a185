//! Bounded-concurrency executor with order-preserving batch splitting
//!
//! Units of work are submitted to a [`BoundedExecutor`], which runs at most
//! `max_op_count` of them at once on a [`ConcurrentRunner`] and returns a
//! [`TaskFuture`] for each. Array work goes through
//! [`BoundedExecutor::execute_batch`] or
//! [`BoundedExecutor::execute_batch_no_wait`], which cut the input into
//! slices and keep the outputs in input order.
//!
//! ```no_run
//! use batch_executor::ExecutorConfig;
//!
//! let executor = ExecutorConfig::new("squares", 4).build()?;
//! let squares = executor
//!     .execute_batch((0..1000u64).collect::<Vec<_>>(), 64, |chunk: &[u64]| {
//!         Ok::<_, String>(chunk.iter().map(|x| x * x).collect::<Vec<_>>())
//!     })
//!     .wait()?;
//! assert_eq!(squares[10], 100);
//! # Ok::<(), batch_executor::EngineError>(())
//! ```

pub mod engines;
pub mod modules;

pub use engines::compute::stride::{plan_slices, Slice};
pub use engines::compute::ParallelMap;
pub use engines::core::future::{join_all, promise, Promise, SharedFuture, TaskFuture};
pub use engines::core::parallel::BoundedExecutor;
#[cfg(feature = "parallel")]
pub use engines::core::runner::RayonRunner;
pub use engines::core::runner::{default_num_threads, ConcurrentRunner, Job, QueueRunner};
pub use engines::{EngineError, EngineResult, TaskFailure};
pub use modules::config::{Backend, ExecutorConfig};
