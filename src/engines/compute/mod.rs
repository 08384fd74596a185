//! Batch computation on a bounded executor
//!
//! `stride` plans how an input is cut into slices and `batch` runs those
//! slices through a [`BoundedExecutor`]. [`ParallelMap`] is the element-wise
//! convenience layer on top.

pub mod batch;
pub mod stride;

use std::error::Error;

use crate::engines::core::future::TaskFuture;
use crate::engines::core::parallel::BoundedExecutor;

/// Element-wise operations that can be spread over an executor
pub trait ParallelMap<T, R, E> {
    /// Apply the operation to every element of `data`, keeping input order
    ///
    /// The first failing element of the lowest failing slice decides the error.
    fn map_parallel(&self, executor: &BoundedExecutor, data: Vec<T>, min_stride: usize) -> TaskFuture<Vec<R>>;
}

impl<T, R, E, F> ParallelMap<T, R, E> for F
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    E: Into<Box<dyn Error + Send + Sync>>,
    F: Fn(&T) -> Result<R, E> + Send + Sync + Clone + 'static,
{
    fn map_parallel(&self, executor: &BoundedExecutor, data: Vec<T>, min_stride: usize) -> TaskFuture<Vec<R>> {
        let f = self.clone();
        executor.execute_batch(data, min_stride, move |chunk: &[T]| {
            chunk
                .iter()
                .map(|item| f(item).map_err(Into::into))
                .collect::<Result<Vec<R>, Box<dyn Error + Send + Sync>>>()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::core::runner::QueueRunner;
    use std::sync::Arc;

    fn double(x: &i32) -> Result<i32, String> {
        Ok(x * 2)
    }

    fn executor() -> BoundedExecutor {
        BoundedExecutor::new("compute", Arc::new(QueueRunner::new("compute-test", 4).unwrap()), 4)
    }

    #[test]
    fn test_parallel_map() {
        let data: Vec<i32> = (1..1001).collect();

        let results = double.map_parallel(&executor(), data.clone(), 100).wait().unwrap();

        assert_eq!(results.len(), data.len());
        for (i, &result) in results.iter().enumerate() {
            assert_eq!(result, data[i] * 2);
        }
    }

    #[test]
    fn test_error_propagation() {
        let fail_on_negative = |x: &i32| -> Result<i32, String> {
            if *x < 0 {
                Err(format!("Negative input: {}", x))
            } else {
                Ok(x * 2)
            }
        };

        let data: Vec<i32> = vec![1, 2, 3, -4, 5, -6];
        let result = fail_on_negative.map_parallel(&executor(), data, 1).wait();

        match result {
            Err(err) => {
                let msg = err.to_string();
                assert_eq!(msg, "Task failed: Negative input: -4");
            }
            Ok(values) => panic!("Expected an error, got {:?}", values),
        }
    }
}
