//! Bounded registry of model tensors known at load time.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use rustc_hash::FxHashMap;

use crate::{
    error::{RegistryError, TraceError},
    layer::{LAYER_NONE, known_layer},
};

pub const DEFAULT_REGISTRY_CAPACITY: usize = 1024;
pub const REGISTRY_NAME_LEN: usize = 64;

const CSV_HEADER: &str = "tensor_idx,tensor_name,data_ptr,file_offset,size_bytes,layer_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub index: u32,
    pub name: String,
    pub address: usize,
    pub file_offset: u64,
    pub size_bytes: u64,
    pub layer_id: u16,
}

/// Tensors in registration order, addressable by data pointer.
///
/// When two entries share an address the first one wins lookups.
#[derive(Debug)]
pub struct TensorRegistry {
    entries: Vec<RegistryEntry>,
    by_address: FxHashMap<usize, u32>,
    capacity: usize,
}

impl TensorRegistry {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), by_address: FxHashMap::default(), capacity }
    }

    /// Append a tensor. Names longer than [`REGISTRY_NAME_LEN`] bytes are truncated.
    pub fn register(
        &mut self,
        name: &str,
        address: usize,
        file_offset: u64,
        size_bytes: u64,
        layer_id: u16,
    ) -> Result<u32, RegistryError> {
        if self.entries.len() >= self.capacity {
            let err = RegistryError::Full { capacity: self.capacity, name: name.to_owned() };
            tracing::warn!(target: "tensor_trace", "{err}");
            return Err(err);
        }

        let index =
            u32::try_from(self.entries.len()).map_err(|_| RegistryError::Full { capacity: self.capacity, name: name.to_owned() })?;
        self.entries.push(RegistryEntry {
            index,
            name: truncate(name, REGISTRY_NAME_LEN).to_owned(),
            address,
            file_offset,
            size_bytes,
            layer_id,
        });
        self.by_address.entry(address).or_insert(index);
        Ok(index)
    }

    #[must_use]
    pub fn lookup(&self, address: usize) -> Option<u32> {
        self.by_address.get(&address).copied()
    }

    #[must_use]
    pub fn get(&self, index: u32) -> Option<&RegistryEntry> {
        self.entries.get(index as usize)
    }

    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Write every entry as CSV. Layers that do not apply are written as `-1`.
    pub fn dump(&self, path: &Path) -> Result<(), TraceError> {
        let file = File::create(path).map_err(|e| TraceError::io("create", path, e))?;
        let mut out = BufWriter::new(file);
        self.write_csv(&mut out).map_err(|e| TraceError::io("write", path, e))?;
        out.flush().map_err(|e| TraceError::io("flush", path, e))?;

        tracing::info!(target: "tensor_trace", entries = self.entries.len(), path = %path.display(), "dumped tensor registry");
        Ok(())
    }

    pub fn write_csv<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{CSV_HEADER}")?;
        for entry in &self.entries {
            let layer = known_layer(entry.layer_id).map_or(-1, i32::from);
            writeln!(
                out,
                "{},{},{:#x},{},{},{}",
                entry.index, entry.name, entry.address, entry.file_offset, entry.size_bytes, layer
            )?;
        }
        Ok(())
    }
}

impl Default for TensorRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_REGISTRY_CAPACITY)
    }
}

fn truncate(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
