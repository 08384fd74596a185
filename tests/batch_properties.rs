use std::sync::Arc;
use std::thread;
use std::time::Duration;

use batch_executor::{plan_slices, BoundedExecutor, QueueRunner};
use proptest::prelude::*;

fn executor(max_op_count: usize) -> BoundedExecutor {
    let runner = Arc::new(QueueRunner::new("properties", 4).unwrap());
    BoundedExecutor::new("properties", runner, max_op_count)
}

proptest! {
    #[test]
    fn slices_cover_input_exactly_once(
        len in 0usize..2000,
        min_stride in 0usize..64,
        max_stride in proptest::option::of(0usize..128),
        concurrency in 0usize..32,
    ) {
        let slices = plan_slices(len, min_stride, max_stride, concurrency);

        if len == 0 {
            prop_assert!(slices.is_empty());
            return Ok(());
        }
        prop_assert!(!slices.is_empty());

        let mut next = 0;
        for (idx, slice) in slices.iter().enumerate() {
            prop_assert_eq!(slice.ordinal, idx);
            prop_assert_eq!(slice.range.start, next);
            prop_assert!(!slice.is_empty());
            next = slice.range.end;
        }
        prop_assert_eq!(next, len);
    }

    #[test]
    fn slices_respect_stride_bounds(
        len in 1usize..2000,
        min_stride in 1usize..64,
        max_stride in proptest::option::of(1usize..128),
        concurrency in 1usize..32,
    ) {
        let slices = plan_slices(len, min_stride, max_stride, concurrency);
        let effective_min = max_stride.map_or(min_stride, |max| min_stride.min(max));

        for slice in &slices[..slices.len() - 1] {
            prop_assert!(slice.len() >= effective_min);
        }
        if let Some(max) = max_stride {
            prop_assert!(slices.iter().all(|s| s.len() <= max));
        } else {
            prop_assert!(slices.len() <= concurrency);
        }
    }

    #[test]
    fn huge_max_stride_plans_like_no_ceiling(
        len in 0usize..2000,
        min_stride in 0usize..64,
        max_stride in (usize::MAX - 16)..=usize::MAX,
        concurrency in 0usize..32,
    ) {
        let bounded = plan_slices(len, min_stride, Some(max_stride), concurrency);
        prop_assert_eq!(bounded, plan_slices(len, min_stride, None, concurrency));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn batch_output_keeps_input_order(
        input in proptest::collection::vec(any::<u32>(), 0..300),
        min_stride in 1usize..20,
        max_op_count in 1usize..6,
        delays in proptest::collection::vec(0u64..3, 16),
    ) {
        let executor = executor(max_op_count);
        let delays = Arc::new(delays);

        let output = executor
            .execute_batch(input.clone(), min_stride, move |chunk: &[u32]| {
                let delay = delays[chunk[0] as usize % delays.len()];
                thread::sleep(Duration::from_millis(delay));
                Ok::<_, String>(chunk.to_vec())
            })
            .wait()
            .unwrap();

        prop_assert_eq!(output, input);
    }

    #[test]
    fn no_wait_slices_match_the_plan(
        len in 0usize..300,
        min_stride in 1usize..20,
        max_stride in proptest::option::of(1usize..40),
        max_op_count in 1usize..6,
    ) {
        let executor = executor(max_op_count);
        let input: Vec<usize> = (0..len).collect();
        let plan = plan_slices(len, min_stride, max_stride, max_op_count);

        let futures = executor.execute_batch_no_wait(input, min_stride, max_stride, |chunk: &[usize]| {
            Ok::<_, String>(chunk.to_vec())
        });
        prop_assert_eq!(futures.len(), plan.len());

        for (future, slice) in futures.into_iter().zip(plan) {
            prop_assert_eq!(future.wait().unwrap(), slice.range.collect::<Vec<_>>());
        }
    }
}
