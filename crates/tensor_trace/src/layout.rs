//! Load-time model layout: tensor registry plus disk-offset index.
//!
//! The loader fills a [`LayoutBuilder`] on a single thread; [`LayoutBuilder::build`]
//! freezes it into a [`ModelLayout`] that recording threads only ever read.

use crate::{
    config::TraceConfig,
    error::{OffsetIndexError, RegistryError},
    layer::layer_id_from_name,
    offsets::{DEFAULT_OFFSET_CAPACITY, DiskOffsetIndex},
    registry::{DEFAULT_REGISTRY_CAPACITY, TensorRegistry},
};

#[derive(Debug)]
pub struct LayoutBuilder {
    registry: TensorRegistry,
    offsets: DiskOffsetIndex,
    rejected_tensors: usize,
    rejected_offsets: usize,
}

impl LayoutBuilder {
    #[must_use]
    pub fn new(registry_capacity: usize, offset_capacity: usize) -> Self {
        Self {
            registry: TensorRegistry::with_capacity(registry_capacity),
            offsets: DiskOffsetIndex::with_capacity(offset_capacity),
            rejected_tensors: 0,
            rejected_offsets: 0,
        }
    }

    /// Builder sized by `registry_capacity` and `offset_capacity` of `config`.
    #[must_use]
    pub fn from_config(config: &TraceConfig) -> Self {
        Self::new(config.registry_capacity, config.offset_capacity)
    }

    /// Register a loaded tensor; the layer is derived from its name.
    pub fn register_tensor(&mut self, name: &str, address: usize, file_offset: u64, size_bytes: u64) -> Result<u32, RegistryError> {
        let result = self.registry.register(name, address, file_offset, size_bytes, layer_id_from_name(name));
        if result.is_err() {
            self.rejected_tensors += 1;
        }
        result
    }

    pub fn register_disk_offset(&mut self, name: &str, offset: u64) -> Result<(), OffsetIndexError> {
        let result = self.offsets.register(name, offset);
        if result.is_err() {
            self.rejected_offsets += 1;
        }
        result
    }

    #[must_use]
    pub fn registry(&self) -> &TensorRegistry {
        &self.registry
    }

    #[must_use]
    pub fn offsets(&self) -> &DiskOffsetIndex {
        &self.offsets
    }

    pub fn build(self) -> ModelLayout {
        if self.rejected_tensors > 0 || self.rejected_offsets > 0 {
            tracing::warn!(
                target: "tensor_trace",
                rejected_tensors = self.rejected_tensors,
                rejected_offsets = self.rejected_offsets,
                "model layout is incomplete; affected tensors will be recorded without registry index or disk offset"
            );
        }
        tracing::debug!(
            target: "tensor_trace",
            tensors = self.registry.len(),
            offsets = self.offsets.len(),
            "model layout built"
        );
        ModelLayout { registry: self.registry, offsets: self.offsets }
    }
}

impl Default for LayoutBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_CAPACITY, DEFAULT_OFFSET_CAPACITY)
    }
}

/// Immutable view shared by all recording threads.
#[derive(Debug)]
pub struct ModelLayout {
    registry: TensorRegistry,
    offsets: DiskOffsetIndex,
}

impl ModelLayout {
    #[inline]
    #[must_use]
    pub fn registry_index(&self, address: usize) -> Option<u32> {
        self.registry.lookup(address)
    }

    #[inline]
    #[must_use]
    pub fn disk_offset(&self, name: &str) -> Option<u64> {
        self.offsets.lookup(name)
    }

    #[must_use]
    pub fn registry(&self) -> &TensorRegistry {
        &self.registry
    }

    #[must_use]
    pub fn offsets(&self) -> &DiskOffsetIndex {
        &self.offsets
    }
}
