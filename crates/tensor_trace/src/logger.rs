//! Assembly of one access record per compute operation.
//!
//! Every lookup degrades to a sentinel; assembly never fails and never allocates.

use crate::{
    journal::BufferUsage,
    layer::{LAYER_NONE, layer_id_from_name},
    layout::ModelLayout,
    record::{AccessRecord, FixedName, MAX_SOURCES, MemorySource, Phase, REGISTRY_INDEX_NONE, SourceSlot},
};

/// Backing buffer of a tensor as seen by the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub usage: BufferUsage,
    /// Opaque identifier recorded for runtime buffers, e.g. the buffer's base address.
    pub id: u64,
}

/// View of a host runtime tensor needed to describe it in a trace.
pub trait TracedTensor {
    fn name(&self) -> &str;

    fn op_code(&self) -> u8;

    /// Address of the tensor's data, `0` when it has no backing memory yet.
    fn data_address(&self) -> usize;

    fn size_bytes(&self) -> u64;

    fn buffer(&self) -> Option<BufferInfo>;

    /// Operand `slot`; the first `None` ends the operand list.
    fn source(&self, slot: usize) -> Option<&Self>;
}

/// Per-call stamp applied to every assembled record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordContext {
    pub timestamp_ns: u64,
    pub token_id: u32,
    pub phase: Phase,
    pub thread_id: u16,
}

/// Describe `dst` and up to four of its sources.
///
/// When the destination's name carries no layer, the first source with a known layer supplies it.
pub fn assemble_record<T: TracedTensor + ?Sized>(dst: &T, layout: Option<&ModelLayout>, ctx: &RecordContext) -> AccessRecord {
    let dst_name = dst.name();
    let mut record = AccessRecord {
        timestamp_ns: ctx.timestamp_ns,
        token_id: ctx.token_id,
        layer_id: layer_id_from_name(dst_name),
        thread_id: ctx.thread_id,
        op_code: dst.op_code(),
        phase: ctx.phase,
        dst_name: FixedName::new(dst_name),
        ..AccessRecord::EMPTY
    };

    for slot in 0..MAX_SOURCES {
        let Some(src) = dst.source(slot) else {
            break;
        };
        let source = describe_source(src, layout);
        if record.layer_id == LAYER_NONE && source.layer_id != LAYER_NONE {
            record.layer_id = source.layer_id;
        }
        record.push_source(source);
    }
    record
}

/// A source without backing memory keeps only its name and derived layer.
pub fn describe_source<T: TracedTensor + ?Sized>(src: &T, layout: Option<&ModelLayout>) -> SourceSlot {
    let name = src.name();
    let mut slot = SourceSlot { name: FixedName::new(name), layer_id: layer_id_from_name(name), ..SourceSlot::EMPTY };

    let address = src.data_address();
    if address == 0 {
        return slot;
    }
    slot.address = address as u64;
    slot.size_bytes = src.size_bytes();
    slot.registry_index = layout.and_then(|l| l.registry_index(address)).unwrap_or(REGISTRY_INDEX_NONE);

    match src.buffer() {
        Some(BufferInfo { usage: BufferUsage::Weights, .. }) => {
            slot.memory = MemorySource::Disk;
            let offset = if name.is_empty() { None } else { layout.and_then(|l| l.disk_offset(name)) };
            slot.location = offset.unwrap_or(0);
            slot.location_known = offset.is_some();
        }
        Some(BufferInfo { id, .. }) => {
            slot.memory = MemorySource::Runtime;
            slot.location = id;
            slot.location_known = true;
        }
        None => slot.memory = MemorySource::Runtime,
    }
    slot
}
