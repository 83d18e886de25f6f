//! Fixed-width access record and its little-endian wire layout.
//!
//! Every record occupies exactly [`RECORD_SIZE`] bytes: a 64-byte header
//! followed by [`MAX_SOURCES`] 64-byte source slots. Fields are written one
//! by one at fixed offsets, so the layout does not depend on the compiler's
//! struct layout or the host's endianness.
//!
//! Header:
//!
//! | offset | size | field |
//! |-------:|-----:|-------|
//! | 0  | 8  | timestamp (ns since trace start) |
//! | 8  | 4  | token index |
//! | 12 | 2  | layer id (`0xFFFF` = not applicable) |
//! | 14 | 2  | thread id |
//! | 16 | 1  | operation code |
//! | 17 | 1  | phase (0 = prompt, 1 = generate) |
//! | 18 | 1  | source count (0..=4) |
//! | 19 | 1  | reserved, zero |
//! | 20 | 40 | destination name, NUL padded |
//! | 60 | 4  | reserved, zero |
//!
//! Source slot:
//!
//! | offset | size | field |
//! |-------:|-----:|-------|
//! | 0  | 32 | source name, NUL padded |
//! | 32 | 8  | data address |
//! | 40 | 8  | size in bytes |
//! | 48 | 8  | disk offset (disk-backed) or buffer id (runtime buffer) |
//! | 56 | 4  | registry index (`0xFFFFFFFF` = unregistered) |
//! | 60 | 2  | layer id |
//! | 62 | 1  | memory source (0 = disk, 1 = runtime buffer) |
//! | 63 | 1  | flags (bit 0: location known) |
//!
//! Unused slots are zero-filled.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::{error::RecordError, layer::LAYER_NONE};

/// Bumped whenever the byte layout below changes.
pub const RECORD_LAYOUT_VERSION: u32 = 1;

pub const MAX_SOURCES: usize = 4;
pub const DST_NAME_LEN: usize = 40;
pub const SRC_NAME_LEN: usize = 32;
pub const HEADER_SIZE: usize = 64;
pub const SLOT_SIZE: usize = 64;
pub const RECORD_SIZE: usize = HEADER_SIZE + MAX_SOURCES * SLOT_SIZE;

/// Registry index recorded for tensors that were never registered.
pub const REGISTRY_INDEX_NONE: u32 = u32::MAX;

/// Slot flag: the location field carries a resolved disk offset or buffer id.
pub const SLOT_FLAG_LOCATION_KNOWN: u8 = 0x01;

mod header {
    pub const TIMESTAMP: usize = 0;
    pub const TOKEN: usize = 8;
    pub const LAYER: usize = 12;
    pub const THREAD: usize = 14;
    pub const OP_CODE: usize = 16;
    pub const PHASE: usize = 17;
    pub const SOURCE_COUNT: usize = 18;
    pub const DST_NAME: usize = 20;
}

mod slot {
    pub const NAME: usize = 0;
    pub const ADDRESS: usize = 32;
    pub const SIZE: usize = 40;
    pub const LOCATION: usize = 48;
    pub const REGISTRY_INDEX: usize = 56;
    pub const LAYER: usize = 60;
    pub const MEMORY: usize = 62;
    pub const FLAGS: usize = 63;
}

const _: () = assert!(header::DST_NAME + DST_NAME_LEN <= HEADER_SIZE);
const _: () = assert!(slot::NAME + SRC_NAME_LEN <= slot::ADDRESS);
const _: () = assert!(slot::FLAGS < SLOT_SIZE);
const _: () = assert!(RECORD_SIZE == 320);

/// Coarse execution stage of the instrumented workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Phase {
    #[default]
    Prompt = 0,
    Generate = 1,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Prompt => "prompt",
            Phase::Generate => "generate",
        }
    }
}

impl TryFrom<u8> for Phase {
    type Error = RecordError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Phase::Prompt),
            1 => Ok(Phase::Generate),
            other => Err(RecordError::InvalidPhase(other)),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Memory tier a source tensor was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MemorySource {
    /// Backed by the mapped model file.
    Disk = 0,
    /// Allocated at inference time (KV cache, scratch, activations).
    #[default]
    Runtime = 1,
}

impl MemorySource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MemorySource::Disk => "disk",
            MemorySource::Runtime => "runtime",
        }
    }
}

impl TryFrom<u8> for MemorySource {
    type Error = RecordError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MemorySource::Disk),
            1 => Ok(MemorySource::Runtime),
            other => Err(RecordError::InvalidMemorySource(other)),
        }
    }
}

impl fmt::Display for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inline, NUL-padded name of at most `N` bytes.
///
/// Longer names are truncated on a UTF-8 character boundary; an interior NUL ends the name.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedName<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> FixedName<N> {
    pub const EMPTY: Self = Self { bytes: [0; N], len: 0 };

    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut end = name.find('\0').unwrap_or(name.len()).min(N);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; N];
        bytes[..end].copy_from_slice(&name.as_bytes()[..end]);
        Self { bytes, len: end }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn write(&self, out: &mut [u8]) {
        out[..N].copy_from_slice(&self.bytes);
    }

    fn read(raw: &[u8]) -> Result<Self, RecordError> {
        let raw = &raw[..N];
        let len = raw.iter().position(|&b| b == 0).unwrap_or(N);
        std::str::from_utf8(&raw[..len]).map_err(|_| RecordError::InvalidName)?;
        let mut bytes = [0u8; N];
        bytes[..len].copy_from_slice(&raw[..len]);
        Ok(Self { bytes, len })
    }
}

impl<const N: usize> Default for FixedName<N> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<const N: usize> fmt::Debug for FixedName<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> fmt::Display for FixedName<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source tensor of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSlot {
    pub name: FixedName<SRC_NAME_LEN>,
    pub address: u64,
    pub size_bytes: u64,
    pub layer_id: u16,
    pub memory: MemorySource,
    /// Disk offset for [`MemorySource::Disk`], opaque buffer id for [`MemorySource::Runtime`].
    pub location: u64,
    /// Whether `location` was resolved; offset 0 is a legitimate disk offset.
    pub location_known: bool,
    pub registry_index: u32,
}

impl SourceSlot {
    pub const EMPTY: Self = Self {
        name: FixedName::EMPTY,
        address: 0,
        size_bytes: 0,
        layer_id: LAYER_NONE,
        memory: MemorySource::Runtime,
        location: 0,
        location_known: false,
        registry_index: REGISTRY_INDEX_NONE,
    };

    #[must_use]
    pub fn disk_offset(&self) -> Option<u64> {
        (self.memory == MemorySource::Disk && self.location_known).then_some(self.location)
    }

    #[must_use]
    pub fn buffer_id(&self) -> Option<u64> {
        (self.memory == MemorySource::Runtime && self.location_known).then_some(self.location)
    }

    #[must_use]
    pub fn registry_index(&self) -> Option<u32> {
        (self.registry_index != REGISTRY_INDEX_NONE).then_some(self.registry_index)
    }

    fn write(&self, out: &mut [u8]) {
        self.name.write(&mut out[slot::NAME..]);
        LittleEndian::write_u64(&mut out[slot::ADDRESS..], self.address);
        LittleEndian::write_u64(&mut out[slot::SIZE..], self.size_bytes);
        LittleEndian::write_u64(&mut out[slot::LOCATION..], self.location);
        LittleEndian::write_u32(&mut out[slot::REGISTRY_INDEX..], self.registry_index);
        LittleEndian::write_u16(&mut out[slot::LAYER..], self.layer_id);
        out[slot::MEMORY] = self.memory as u8;
        out[slot::FLAGS] = if self.location_known { SLOT_FLAG_LOCATION_KNOWN } else { 0 };
    }

    fn read(raw: &[u8]) -> Result<Self, RecordError> {
        Ok(Self {
            name: FixedName::read(&raw[slot::NAME..])?,
            address: LittleEndian::read_u64(&raw[slot::ADDRESS..]),
            size_bytes: LittleEndian::read_u64(&raw[slot::SIZE..]),
            location: LittleEndian::read_u64(&raw[slot::LOCATION..]),
            registry_index: LittleEndian::read_u32(&raw[slot::REGISTRY_INDEX..]),
            layer_id: LittleEndian::read_u16(&raw[slot::LAYER..]),
            memory: MemorySource::try_from(raw[slot::MEMORY])?,
            location_known: raw[slot::FLAGS] & SLOT_FLAG_LOCATION_KNOWN != 0,
        })
    }
}

impl Default for SourceSlot {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// One compute operation: its destination and up to [`MAX_SOURCES`] sources.
///
/// Built on the stack per operation, encoded once into a batch buffer, never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    pub timestamp_ns: u64,
    pub token_id: u32,
    pub layer_id: u16,
    pub thread_id: u16,
    pub op_code: u8,
    pub phase: Phase,
    pub dst_name: FixedName<DST_NAME_LEN>,
    pub(crate) source_count: u8,
    pub(crate) sources: [SourceSlot; MAX_SOURCES],
}

impl AccessRecord {
    pub const EMPTY: Self = Self {
        timestamp_ns: 0,
        token_id: 0,
        layer_id: LAYER_NONE,
        thread_id: 0,
        op_code: 0,
        phase: Phase::Prompt,
        dst_name: FixedName::EMPTY,
        source_count: 0,
        sources: [SourceSlot::EMPTY; MAX_SOURCES],
    };

    #[must_use]
    pub fn sources(&self) -> &[SourceSlot] {
        &self.sources[..usize::from(self.source_count).min(MAX_SOURCES)]
    }

    /// Append a source; returns `false` once all slots are taken.
    pub fn push_source(&mut self, source: SourceSlot) -> bool {
        let index = usize::from(self.source_count);
        if index >= MAX_SOURCES {
            return false;
        }
        self.sources[index] = source;
        self.source_count += 1;
        true
    }

    /// Serialize into exactly one record-sized slot, overwriting every byte.
    pub fn encode_into(&self, out: &mut [u8; RECORD_SIZE]) {
        let (head, slots) = out.split_at_mut(HEADER_SIZE);
        head.fill(0);
        LittleEndian::write_u64(&mut head[header::TIMESTAMP..], self.timestamp_ns);
        LittleEndian::write_u32(&mut head[header::TOKEN..], self.token_id);
        LittleEndian::write_u16(&mut head[header::LAYER..], self.layer_id);
        LittleEndian::write_u16(&mut head[header::THREAD..], self.thread_id);
        head[header::OP_CODE] = self.op_code;
        head[header::PHASE] = self.phase as u8;
        head[header::SOURCE_COUNT] = self.source_count;
        self.dst_name.write(&mut head[header::DST_NAME..]);

        for (index, raw) in slots.chunks_exact_mut(SLOT_SIZE).enumerate() {
            match self.sources().get(index) {
                Some(source) => source.write(raw),
                None => raw.fill(0),
            }
        }
    }

    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        self.encode_into(&mut out);
        out
    }

    /// Decode the first [`RECORD_SIZE`] bytes of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() < RECORD_SIZE {
            return Err(RecordError::Truncated { expected: RECORD_SIZE, actual: bytes.len() });
        }
        let (head, slots) = bytes[..RECORD_SIZE].split_at(HEADER_SIZE);

        let source_count = head[header::SOURCE_COUNT];
        if usize::from(source_count) > MAX_SOURCES {
            return Err(RecordError::TooManySources(source_count));
        }

        let mut record = Self {
            timestamp_ns: LittleEndian::read_u64(&head[header::TIMESTAMP..]),
            token_id: LittleEndian::read_u32(&head[header::TOKEN..]),
            layer_id: LittleEndian::read_u16(&head[header::LAYER..]),
            thread_id: LittleEndian::read_u16(&head[header::THREAD..]),
            op_code: head[header::OP_CODE],
            phase: Phase::try_from(head[header::PHASE])?,
            dst_name: FixedName::read(&head[header::DST_NAME..])?,
            ..Self::EMPTY
        };
        for raw in slots.chunks_exact(SLOT_SIZE).take(usize::from(source_count)) {
            record.push_source(SourceSlot::read(raw)?);
        }
        Ok(record)
    }

    /// True for the all-zero bytes that fill the unused tail of a trace file.
    #[must_use]
    pub fn is_zeroed(bytes: &[u8]) -> bool {
        bytes.iter().all(|&b| b == 0)
    }
}

impl Default for AccessRecord {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[path = "record.test.rs"]
mod tests;
