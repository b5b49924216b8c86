use arrayvec::ArrayVec;
use thiserror::Error;

pub type TagId = i32;

/// Largest capacity a memory can be configured with.
pub const MAX_CAPACITY: usize = 64;
pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("memory capacity must be between 1 and {}, got {}", MAX_CAPACITY, .0)]
pub struct InvalidCapacity(pub usize);

/// Remembers the first `capacity` distinct tags reported since the last reset.
///
/// Slots fill from the left and are never evicted. Once every slot is taken, further
/// unseen tags are not recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionMemory {
    ids: ArrayVec<TagId, MAX_CAPACITY>,
    capacity: usize,
}

impl DetectionMemory {
    pub fn new(capacity: usize) -> Result<Self, InvalidCapacity> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(InvalidCapacity(capacity));
        }
        Ok(DetectionMemory {
            ids: ArrayVec::new(),
            capacity,
        })
    }

    pub fn seen(&self, id: TagId) -> bool {
        self.ids.contains(&id)
    }

    /// Records `id` and returns true if it was not seen before and a slot was free.
    pub fn record(&mut self, id: TagId) -> bool {
        if self.seen(id) || self.is_full() {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn reset(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.ids.len() >= self.capacity
    }

    /// Recorded ids in the order they were first seen.
    pub fn ids(&self) -> &[TagId] {
        &self.ids
    }

    /// Every slot, `None` for the ones still free.
    pub fn slots(&self) -> impl Iterator<Item = Option<TagId>> + '_ {
        (0..self.capacity).map(|i| self.ids.get(i).copied())
    }
}

impl Default for DetectionMemory {
    fn default() -> Self {
        DetectionMemory {
            ids: ArrayVec::new(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}
