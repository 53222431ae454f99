//! Splitting id ranges into reprocessing batches.

use crate::error::WindowError;

/// Inclusive id range. `start` and `end` may be given in either order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub start: i64,
    pub end: i64,
}

impl IdRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// The same range with `start <= end`.
    pub fn normalized(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self {
                start: self.end,
                end: self.start,
            }
        }
    }
}

/// Expand `ranges` in input order and split the ids into consecutive
/// chunks of at most `batch_size`.
pub fn chunk_ranges(ranges: &[IdRange], batch_size: usize) -> Result<Vec<Vec<i64>>, WindowError> {
    if batch_size == 0 {
        return Err(WindowError::InvalidBatchSize);
    }

    let mut chunks = Vec::new();
    let mut current = Vec::with_capacity(batch_size);

    for range in ranges.iter().map(|r| r.normalized()) {
        for id in range.start..=range.end {
            current.push(id);
            if current.len() == batch_size {
                chunks.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_single_range() {
        let chunks = chunk_ranges(&[IdRange::new(1, 5)], 2).unwrap();
        assert_eq!(chunks, vec![vec![1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn reversed_range_is_normalized() {
        let chunks = chunk_ranges(&[IdRange::new(5, 3)], 10).unwrap();
        assert_eq!(chunks, vec![vec![3, 4, 5]]);
        let chunks = chunk_ranges(&[IdRange::new(5, 3)], 2).unwrap();
        assert_eq!(chunks, vec![vec![3, 4], vec![5]]);
    }

    #[test]
    fn chunks_span_ranges() {
        let ranges = [IdRange::new(1, 3), IdRange::new(10, 11)];
        let chunks = chunk_ranges(&ranges, 2).unwrap();
        assert_eq!(chunks, vec![vec![1, 2], vec![3, 10], vec![11]]);
    }

    #[test]
    fn single_point_range() {
        let chunks = chunk_ranges(&[IdRange::new(7, 7)], 3).unwrap();
        assert_eq!(chunks, vec![vec![7]]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_ranges(&[], 4).unwrap().is_empty());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert_eq!(
            chunk_ranges(&[IdRange::new(1, 2)], 0),
            Err(WindowError::InvalidBatchSize)
        );
    }
}
