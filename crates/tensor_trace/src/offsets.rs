//! Name to disk-offset index filled by the model loader.

use rustc_hash::FxHashMap;

use crate::error::OffsetIndexError;

pub const DEFAULT_OFFSET_CAPACITY: usize = 4096;

/// Bounded map from tensor name to its absolute byte offset in the model file.
///
/// Re-registering a known name updates its offset in place and never counts against capacity.
#[derive(Debug)]
pub struct DiskOffsetIndex {
    offsets: FxHashMap<Box<str>, u64>,
    capacity: usize,
}

impl DiskOffsetIndex {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut offsets = FxHashMap::default();
        offsets.reserve(capacity.min(DEFAULT_OFFSET_CAPACITY));
        Self { offsets, capacity }
    }

    pub fn register(&mut self, name: &str, offset: u64) -> Result<(), OffsetIndexError> {
        if let Some(existing) = self.offsets.get_mut(name) {
            *existing = offset;
            return Ok(());
        }
        if self.offsets.len() >= self.capacity {
            let err = OffsetIndexError::Full { capacity: self.capacity, name: name.to_owned() };
            tracing::warn!(target: "tensor_trace", "{err}");
            return Err(err);
        }
        self.offsets.insert(name.into(), offset);
        Ok(())
    }

    /// `None` means the tensor is unknown; `Some(0)` is a real offset at the start of the file.
    #[inline]
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<u64> {
        self.offsets.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DiskOffsetIndex {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_OFFSET_CAPACITY)
    }
}
