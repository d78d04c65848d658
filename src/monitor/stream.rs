use crate::monitor::BoundedHistory;

/// Rolling sample history addressed by absolute sample index.
///
/// `start_index() + len() == end_index()` always holds, and `end_index()` is the
/// number of samples ever pushed since creation or the last `clear`.
#[derive(Clone, Debug)]
pub struct SampleStream {
    samples: BoundedHistory<f64>,
    start_index: u64,
}

impl SampleStream {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: BoundedHistory::new(capacity),
            start_index: 0,
        }
    }

    /// Appends a sample and returns its absolute index.
    pub fn push(&mut self, value: f64) -> u64 {
        let index = self.end_index();
        if self.samples.push(value).is_some() {
            self.start_index += 1;
        }
        index
    }

    /// Absolute index of the oldest live sample.
    pub fn start_index(&self) -> u64 {
        self.start_index
    }

    /// Absolute index the next pushed sample will receive.
    pub fn end_index(&self) -> u64 {
        self.start_index + self.samples.len() as u64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    pub fn contains(&self, index: u64) -> bool {
        index >= self.start_index && index < self.end_index()
    }

    /// `None` when `index` was evicted or has not been generated yet.
    pub fn get(&self, index: u64) -> Option<f64> {
        if !self.contains(index) {
            return None;
        }
        self.samples
            .get((index - self.start_index) as usize)
            .copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.last().copied()
    }

    /// The most recent `count` samples, oldest first.
    pub fn tail(&self, count: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(count);
        self.samples.iter().skip(skip).copied().collect()
    }

    /// `(absolute_index, value)` pairs from `from` (clamped to the live range) to the newest.
    pub fn iter_from(&self, from: u64) -> impl Iterator<Item = (u64, f64)> + '_ {
        let first = from.max(self.start_index);
        let skip = (first - self.start_index) as usize;
        self.samples
            .iter()
            .skip(skip)
            .enumerate()
            .map(move |(offset, &value)| (first + offset as u64, value))
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.start_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn index_bookkeeping_holds_across_eviction() {
        let mut stream = SampleStream::with_capacity(5);
        for i in 0..12u64 {
            let index = stream.push(i as f64 * 0.5);
            assert_eq!(index, i);
            assert_eq!(stream.start_index() + stream.len() as u64, stream.end_index());
            assert_eq!(stream.end_index(), i + 1);
        }
        assert_eq!(stream.start_index(), 7);
        assert_eq!(stream.get(6), None);
        assert_eq!(stream.get(7), Some(3.5));
        assert_eq!(stream.get(11), Some(5.5));
        assert_eq!(stream.get(12), None);
        assert_eq!(stream.latest(), Some(5.5));
    }
    #[test]
    fn tail_and_iter_from_respect_live_range() {
        let mut stream = SampleStream::with_capacity(4);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            stream.push(v);
        }
        assert_eq!(stream.tail(2), vec![5.0, 6.0]);
        assert_eq!(stream.tail(10), vec![3.0, 4.0, 5.0, 6.0]);
        let from_start: Vec<(u64, f64)> = stream.iter_from(0).collect();
        assert_eq!(from_start.first(), Some(&(2, 3.0)));
        let recent: Vec<(u64, f64)> = stream.iter_from(4).collect();
        assert_eq!(recent, vec![(4, 5.0), (5, 6.0)]);
        assert_eq!(stream.iter_from(9).count(), 0);
    }
    #[test]
    fn clear_restarts_indexing() {
        let mut stream = SampleStream::with_capacity(3);
        for v in 0..5 {
            stream.push(v as f64);
        }
        stream.clear();
        assert!(stream.is_empty());
        assert_eq!(stream.start_index(), 0);
        assert_eq!(stream.end_index(), 0);
        assert_eq!(stream.push(9.0), 0);
        assert_eq!(stream.get(0), Some(9.0));
    }
}
