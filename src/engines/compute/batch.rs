//! Batch execution over slices of an input array
//!
//! Both entry points plan the slices once, submit one unit per slice through
//! [`BoundedExecutor::execute`] and keep each slice's outcome at its ordinal
//! position, so completion order never leaks into the result.

use std::error::Error;
use std::sync::Arc;

use crate::engines::compute::stride::plan_slices;
use crate::engines::core::future::{join_all, TaskFuture};
use crate::engines::core::parallel::BoundedExecutor;
use crate::engines::EngineResult;

impl BoundedExecutor {
    /// Apply `body` to slices of `args` and concatenate the outputs in order
    ///
    /// The returned future resolves only after every slice has finished. If
    /// any slice failed it resolves with the failure of the lowest-ordinal
    /// failed slice, whatever order the slices completed in.
    pub fn execute_batch<A, R, E, F>(
        &self,
        args: impl Into<Arc<[A]>>,
        min_stride: usize,
        body: F,
    ) -> TaskFuture<Vec<R>>
    where
        A: Send + Sync + 'static,
        R: Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>>,
        F: Fn(&[A]) -> Result<Vec<R>, E> + Send + Sync + 'static,
    {
        let slices = self.execute_batch_no_wait(args, min_stride, None, body);
        join_all(slices).and_then(concat_in_order)
    }

    /// Apply `body` to slices of `args` and return one future per slice
    ///
    /// The futures are in slice order and the call never blocks. An empty
    /// input returns an empty vector without dispatching anything.
    pub fn execute_batch_no_wait<A, R, E, F>(
        &self,
        args: impl Into<Arc<[A]>>,
        min_stride: usize,
        max_stride: Option<usize>,
        body: F,
    ) -> Vec<TaskFuture<Vec<R>>>
    where
        A: Send + Sync + 'static,
        R: Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>>,
        F: Fn(&[A]) -> Result<Vec<R>, E> + Send + Sync + 'static,
    {
        let args: Arc<[A]> = args.into();
        let slices = plan_slices(args.len(), min_stride, max_stride, self.max_op_count());
        if slices.is_empty() {
            return Vec::new();
        }

        log::debug!(
            "Executor '{}' splitting {} elements into {} slices",
            self.name(),
            args.len(),
            slices.len()
        );

        let body = Arc::new(body);
        slices
            .into_iter()
            .map(|slice| {
                let args = Arc::clone(&args);
                let body = Arc::clone(&body);
                self.execute(move || (*body)(&args[slice.range]))
            })
            .collect()
    }
}

fn concat_in_order<R>(results: Vec<EngineResult<Vec<R>>>) -> EngineResult<Vec<R>> {
    let mut output = Vec::new();
    for result in results {
        output.extend(result?);
    }
    Ok(output)
}
