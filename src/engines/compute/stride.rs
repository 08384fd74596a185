//! Slice planning
//!
//! Splits `[0, len)` into contiguous slices that respect a minimum and an
//! optional maximum stride, using no more slices than the concurrency limit
//! unless the maximum stride requires it.

use std::ops::Range;

/// One contiguous piece of a batch input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    /// Position of the slice in the plan, starting at 0
    pub ordinal: usize,
    /// Half-open index range into the input
    pub range: Range<usize>,
}

impl Slice {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Plan the slices for an input of `len` elements
///
/// A `min_stride` of 0 is treated as 1 and a `max_stride` of `Some(0)` as
/// `Some(1)`. When `min_stride` exceeds `max_stride` the maximum wins.
/// `concurrency` caps the slice count (0 is treated as 1), except where
/// `max_stride` forces more slices.
///
/// Slices are normally balanced, with the first `len % count` slices one
/// element longer. If `max_stride` forces a count whose balanced size would
/// drop below `min_stride`, the plan uses `max_stride`-sized slices and a
/// shorter final slice instead.
pub fn plan_slices(
    len: usize,
    min_stride: usize,
    max_stride: Option<usize>,
    concurrency: usize,
) -> Vec<Slice> {
    if len == 0 {
        return Vec::new();
    }

    let max_stride = max_stride.map(|max| max.max(1));
    let min_stride = match max_stride {
        Some(max) => min_stride.clamp(1, max),
        None => min_stride.max(1),
    };

    // Floor division keeps every balanced slice at least `min_stride` long
    let by_min = (len / min_stride).max(1);
    let mut count = by_min.min(concurrency.max(1));

    if let Some(max) = max_stride {
        let by_max = len.div_ceil(max);
        if by_max > count {
            count = by_max;
            if len / count < min_stride {
                return fixed_slices(len, max);
            }
        }
    }

    balanced_slices(len, count)
}

fn balanced_slices(len: usize, count: usize) -> Vec<Slice> {
    let base = len / count;
    let remainder = len % count;

    let mut slices = Vec::with_capacity(count);
    let mut start = 0;
    for ordinal in 0..count {
        let size = base + usize::from(ordinal < remainder);
        slices.push(Slice {
            ordinal,
            range: start..start + size,
        });
        start += size;
    }
    slices
}

fn fixed_slices(len: usize, stride: usize) -> Vec<Slice> {
    (0..len)
        .step_by(stride)
        .enumerate()
        .map(|(ordinal, start)| Slice {
            ordinal,
            range: start..start.saturating_add(stride).min(len),
        })
        .collect()
}
