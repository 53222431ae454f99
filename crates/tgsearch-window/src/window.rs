use std::collections::HashMap;

use tgsearch_types::{Direction, Message};
use tracing::{debug, warn};

use crate::error::WindowError;
use crate::eviction;
use crate::index::SortedIds;

/// Outcome of a single `add_batch` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Ids that were not resident before this batch.
    pub inserted: Vec<i64>,
    /// Ids that were already resident and got their message replaced.
    pub updated: Vec<i64>,
    /// Raw platform ids that could not be parsed; those messages were skipped.
    pub rejected: Vec<String>,
    /// Ids removed by the capacity trim, in eviction order.
    pub evicted: Vec<i64>,
}

/// Bounded store of one chat's messages keyed by numeric id.
///
/// Invariants after every public call:
/// - `index` and `store` hold the same ids
/// - `min_id`/`max_id` are the true bounds, or `None` when empty
/// - `len() <= capacity()`
#[derive(Debug, Clone)]
pub struct MessageWindow {
    capacity: usize,
    index: SortedIds,
    store: HashMap<i64, Message>,
    min_id: Option<i64>,
    max_id: Option<i64>,
}

impl MessageWindow {
    /// Create an empty window. A zero capacity is a configuration error.
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        if capacity == 0 {
            return Err(WindowError::InvalidCapacity(capacity));
        }

        Ok(Self {
            capacity,
            index: SortedIds::new(),
            store: HashMap::with_capacity(capacity.min(1024)),
            min_id: None,
            max_id: None,
        })
    }

    /// Build a window with a different capacity carrying over the most
    /// recent residents of `self`.
    pub fn resized(&self, capacity: usize) -> Result<Self, WindowError> {
        let mut next = Self::new(capacity)?;
        for id in self.index.iter().rev().take(capacity) {
            if let Some(message) = self.store.get(&id) {
                next.index.insert(id);
                next.store.insert(id, message.clone());
            }
        }
        next.refresh_bounds();
        Ok(next)
    }

    /// Merge `messages` into the window and trim to capacity.
    ///
    /// Resident ids are replaced in place. The window is never cleared here;
    /// callers that want `Initial` to mean "replace" call `clear()` first.
    pub fn add_batch(&mut self, messages: &[Message], direction: Direction) -> BatchReport {
        let mut report = BatchReport::default();

        for message in messages {
            let Some(id) = message.numeric_id() else {
                warn!(
                    chat_id = %message.chat_id,
                    platform_message_id = %message.platform_message_id,
                    "Skipping message with non-numeric id"
                );
                report.rejected.push(message.platform_message_id.clone());
                continue;
            };

            if self.index.insert(id) {
                report.inserted.push(id);
            } else {
                report.updated.push(id);
            }
            self.store.insert(id, message.clone());
        }

        report.evicted = eviction::trim(&mut self.index, self.capacity, direction);
        for id in &report.evicted {
            self.store.remove(id);
        }

        self.refresh_bounds();

        debug!(
            %direction,
            inserted = report.inserted.len(),
            updated = report.updated.len(),
            rejected = report.rejected.len(),
            evicted = report.evicted.len(),
            resident = self.index.len(),
            "Merged message batch"
        );

        report
    }

    /// Drop every resident message. The instance stays usable.
    pub fn clear(&mut self) {
        self.index.clear();
        self.store.clear();
        self.min_id = None;
        self.max_id = None;
    }

    pub fn get(&self, id: i64) -> Option<&Message> {
        self.store.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.contains(id)
    }

    /// Snapshot of resident ids, ascending.
    pub fn sorted_ids(&self) -> Vec<i64> {
        self.index.to_vec()
    }

    /// Resident messages in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        self.index.iter().filter_map(|id| self.store.get(&id))
    }

    #[inline]
    pub fn min_id(&self) -> Option<i64> {
        self.min_id
    }

    #[inline]
    pub fn max_id(&self) -> Option<i64> {
        self.max_id
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn refresh_bounds(&mut self) {
        self.min_id = self.index.first();
        self.max_id = self.index.last();
    }
}
