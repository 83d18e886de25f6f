//! Per-thread staging area of encoded records.

use crate::record::{AccessRecord, RECORD_SIZE};

pub const DEFAULT_BATCH_RECORDS: usize = 1024;

/// Fixed number of encoded records, filled in order and flushed as one block.
#[derive(Debug)]
pub struct BatchBuffer {
    slots: Box<[[u8; RECORD_SIZE]]>,
    len: usize,
}

impl BatchBuffer {
    /// A zero capacity is raised to one record.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { slots: vec![[0u8; RECORD_SIZE]; capacity.max(1)].into_boxed_slice(), len: 0 }
    }

    /// Encode `record` into the next slot. Returns `true` when the buffer is now full.
    ///
    /// Pushing into a full buffer is a no-op that also returns `true`; callers flush first.
    pub fn push(&mut self, record: &AccessRecord) -> bool {
        if let Some(slot) = self.slots.get_mut(self.len) {
            record.encode_into(slot);
            self.len += 1;
        }
        self.is_full()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.slots[..self.len].as_flattened()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for BatchBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_RECORDS)
    }
}
