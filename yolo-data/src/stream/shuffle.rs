use crate::common::*;

/// Approximately shuffles an iterator with a bounded buffer.
///
/// The buffer is topped up from the source before each draw, and the output
/// element is taken uniformly at random from the buffer. Once the source is
/// exhausted the remaining elements are drained in random order.
#[derive(Debug)]
pub struct ShuffleBuffer<I>
where
    I: Iterator,
{
    source: I,
    buffer: Vec<I::Item>,
    capacity: usize,
    rng: StdRng,
}

impl<I> ShuffleBuffer<I>
where
    I: Iterator,
{
    pub fn new(source: I, capacity: NonZeroUsize, rng: StdRng) -> Self {
        Self {
            source,
            buffer: Vec::with_capacity(capacity.get()),
            capacity: capacity.get(),
            rng,
        }
    }

    /// The number of buffered elements.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl<I> Iterator for ShuffleBuffer<I>
where
    I: Iterator,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.len() < self.capacity {
            match self.source.next() {
                Some(item) => self.buffer.push(item),
                None => break,
            }
        }

        if self.buffer.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.buffer.len());
        Some(self.buffer.swap_remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::iter;

    #[test]
    fn yields_every_element_once() {
        let buffer = ShuffleBuffer::new(
            0..1000,
            NonZeroUsize::new(100).unwrap(),
            StdRng::seed_from_u64(1),
        );
        let mut output: Vec<_> = buffer.collect();
        assert_ne!(output, (0..1000).collect::<Vec<_>>());
        output.sort_unstable();
        assert_eq!(output, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn output_stays_within_window() {
        // an element can only be drawn once it has entered the buffer
        let buffer = ShuffleBuffer::new(
            0..500,
            NonZeroUsize::new(10).unwrap(),
            StdRng::seed_from_u64(2),
        );
        buffer
            .enumerate()
            .for_each(|(position, value)| assert!(value < position + 10));
    }

    #[test]
    fn capacity_one_keeps_order() {
        let buffer = ShuffleBuffer::new(
            0..20,
            NonZeroUsize::new(1).unwrap(),
            StdRng::seed_from_u64(3),
        );
        assert_eq!(buffer.collect::<Vec<_>>(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn empty_source() {
        let mut buffer = ShuffleBuffer::new(
            iter::empty::<u32>(),
            NonZeroUsize::new(4).unwrap(),
            StdRng::seed_from_u64(4),
        );
        assert!(buffer.next().is_none());
        assert!(buffer.is_empty());
    }
}
