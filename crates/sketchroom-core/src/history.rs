//! Bounded local history of raster snapshots.

use std::collections::VecDeque;

/// Maximum number of snapshots kept.
pub const MAX_HISTORY: usize = 50;

/// Ordered raster snapshots, oldest first.
///
/// Used to roll back shape previews and to resynchronize the local raster
/// after reconciliation. Overflow evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct HistoryCache<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> Default for HistoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HistoryCache<T> {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    /// Cache with a custom capacity (at least one entry).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a snapshot, evicting the oldest at capacity.
    pub fn push(&mut self, snapshot: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// Most recent snapshot, `None` meaning "empty surface".
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop everything and seed with exactly one snapshot.
    pub fn reset_to(&mut self, snapshot: T) {
        self.entries.clear();
        self.entries.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Snapshots eligible for redo.
///
/// The client never fills this: canonical undo/redo state lives with the room
/// authority. It only gets cleared when a new local edit is committed.
#[derive(Debug, Clone)]
pub struct RedoBuffer<T> {
    entries: Vec<T>,
}

impl<T> Default for RedoBuffer<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> RedoBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_empty() {
        let cache: HistoryCache<u32> = HistoryCache::new();
        assert!(cache.latest().is_none());
    }

    #[test]
    fn test_push_latest() {
        let mut cache = HistoryCache::new();
        cache.push(1);
        cache.push(2);
        assert_eq!(cache.latest(), Some(&2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut cache = HistoryCache::new();
        for i in 0..500 {
            cache.push(i);
            assert!(cache.len() <= MAX_HISTORY);
        }
        assert_eq!(cache.len(), MAX_HISTORY);
        assert_eq!(cache.latest(), Some(&499));
    }

    #[test]
    fn test_evicts_oldest() {
        let mut cache = HistoryCache::with_capacity(3);
        for i in 0..5 {
            cache.push(i);
        }
        assert_eq!(cache.entries.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_reset_to_single_entry() {
        let mut cache = HistoryCache::new();
        for i in 0..10 {
            cache.push(i);
        }
        cache.reset_to(42);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.latest(), Some(&42));
    }

    #[test]
    fn test_redo_buffer_starts_empty() {
        let mut redo: RedoBuffer<u8> = RedoBuffer::new();
        assert!(redo.is_empty());
        redo.clear();
        assert_eq!(redo.len(), 0);
    }
}
