//! Capacity trimming after a batch merge.
//!
//! The edge opposite to the batch is trimmed: older pages push out the
//! newest residents, newer pages push out the oldest. An initial load keeps
//! the most recent `capacity` ids.

use tgsearch_types::Direction;

use crate::index::SortedIds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// `min_id` side.
    Oldest,
    /// `max_id` side.
    Newest,
}

pub fn edge_for(direction: Direction) -> Edge {
    match direction {
        Direction::Older => Edge::Newest,
        Direction::Newer | Direction::Initial => Edge::Oldest,
    }
}

/// Pop ids from the evicting edge until `ids.len() <= capacity`.
/// Returns the evicted ids in eviction order.
pub fn trim(ids: &mut SortedIds, capacity: usize, direction: Direction) -> Vec<i64> {
    let excess = ids.len().saturating_sub(capacity);
    let mut evicted = Vec::with_capacity(excess);
    let edge = edge_for(direction);

    for _ in 0..excess {
        let popped = match edge {
            Edge::Oldest => ids.pop_first(),
            Edge::Newest => ids.pop_last(),
        };
        match popped {
            Some(id) => evicted.push(id),
            None => break,
        }
    }

    evicted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::RangeInclusive<i64>) -> SortedIds {
        let mut s = SortedIds::new();
        for id in range {
            s.insert(id);
        }
        s
    }

    #[test]
    fn older_trims_newest() {
        let mut s = ids(1..=6);
        let evicted = trim(&mut s, 4, Direction::Older);
        assert_eq!(evicted, vec![6, 5]);
        assert_eq!(s.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn newer_trims_oldest() {
        let mut s = ids(1..=6);
        let evicted = trim(&mut s, 4, Direction::Newer);
        assert_eq!(evicted, vec![1, 2]);
        assert_eq!(s.to_vec(), vec![3, 4, 5, 6]);
    }

    #[test]
    fn initial_keeps_most_recent() {
        let mut s = ids(1..=6);
        trim(&mut s, 2, Direction::Initial);
        assert_eq!(s.to_vec(), vec![5, 6]);
    }

    #[test]
    fn under_capacity_is_untouched() {
        let mut s = ids(1..=3);
        assert!(trim(&mut s, 3, Direction::Older).is_empty());
        assert_eq!(s.len(), 3);
    }
}
