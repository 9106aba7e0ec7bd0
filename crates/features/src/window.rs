//! Sliding windows over an ordered sequence.
//!
//! Windows overlap and advance one item per step.

use std::collections::VecDeque;

/// Number of windows of length `size` over `len` items.
#[inline]
pub fn window_count(len: usize, size: usize) -> usize {
    if size == 0 {
        0
    } else {
        len.saturating_sub(size - 1)
    }
}

/// Lazy iterator of overlapping windows of a fixed length.
///
/// Cloning the iterator before use restarts the sequence.
#[derive(Debug, Clone)]
pub struct SlidingWindows<I: Iterator> {
    iter: I,
    size: usize,
    buffer: VecDeque<I::Item>,
}

impl<I> Iterator for SlidingWindows<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }
        if self.buffer.len() == self.size {
            self.buffer.pop_front();
        }
        while self.buffer.len() < self.size {
            self.buffer.push_back(self.iter.next()?);
        }
        Some(self.buffer.iter().cloned().collect())
    }
}

/// Windows of `size` consecutive items. Fewer than `size` items yield nothing.
pub fn sliding_windows<I>(items: I, size: usize) -> SlidingWindows<I::IntoIter>
where
    I: IntoIterator,
{
    SlidingWindows {
        iter: items.into_iter(),
        size,
        buffer: VecDeque::with_capacity(size),
    }
}
