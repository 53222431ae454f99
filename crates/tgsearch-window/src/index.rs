//! Ordered set of resident message ids.
//!
//! Backed by a `BTreeSet`, so both edges are reachable in O(log n) and
//! iteration is ascending.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct SortedIds {
    ids: BTreeSet<i64>,
}

impl SortedIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an id. Returns true if it was not already present.
    #[inline]
    pub fn insert(&mut self, id: i64) -> bool {
        self.ids.insert(id)
    }

    #[inline]
    pub fn remove(&mut self, id: i64) -> bool {
        self.ids.remove(&id)
    }

    #[inline]
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    #[inline]
    pub fn first(&self) -> Option<i64> {
        self.ids.first().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<i64> {
        self.ids.last().copied()
    }

    /// Remove and return the lowest id.
    pub fn pop_first(&mut self) -> Option<i64> {
        self.ids.pop_first()
    }

    /// Remove and return the highest id.
    pub fn pop_last(&mut self) -> Option<i64> {
        self.ids.pop_last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }

    /// Snapshot of all ids in ascending order.
    pub fn to_vec(&self) -> Vec<i64> {
        self.ids.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_ids_sorted_and_unique() {
        let mut ids = SortedIds::new();
        for id in [30, 10, 20, 10] {
            ids.insert(id);
        }
        assert_eq!(ids.to_vec(), vec![10, 20, 30]);
        assert_eq!(ids.len(), 3);
        assert_eq!(ids.first(), Some(10));
        assert_eq!(ids.last(), Some(30));
    }

    #[test]
    fn pops_from_both_edges() {
        let mut ids = SortedIds::new();
        for id in 1..=5 {
            ids.insert(id);
        }
        assert_eq!(ids.pop_first(), Some(1));
        assert_eq!(ids.pop_last(), Some(5));
        assert_eq!(ids.to_vec(), vec![2, 3, 4]);
    }

    #[test]
    fn empty_has_no_edges() {
        let mut ids = SortedIds::new();
        assert!(ids.is_empty());
        assert_eq!(ids.first(), None);
        assert_eq!(ids.pop_last(), None);
    }

    #[test]
    fn negative_ids_sort_numerically() {
        let mut ids = SortedIds::new();
        ids.insert(-5);
        ids.insert(3);
        ids.insert(-100);
        assert_eq!(ids.to_vec(), vec![-100, -5, 3]);
    }
}
