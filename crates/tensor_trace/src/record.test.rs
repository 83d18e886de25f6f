#![cfg(test)]

use super::*;

fn disk_source(name: &str, offset: u64) -> SourceSlot {
    SourceSlot {
        name: FixedName::new(name),
        address: 0x7f00_0000_1000,
        size_bytes: 4096,
        layer_id: 2,
        memory: MemorySource::Disk,
        location: offset,
        location_known: true,
        registry_index: 7,
    }
}

#[test]
fn record_is_320_bytes() {
    assert_eq!(RECORD_SIZE, 320);
    assert_eq!(AccessRecord::EMPTY.encode().len(), RECORD_SIZE);
}

#[test]
fn header_fields_land_at_fixed_offsets() {
    let mut record = AccessRecord {
        timestamp_ns: 0x0102_0304_0506_0708,
        token_id: 42,
        layer_id: 3,
        thread_id: 9,
        op_code: 17,
        phase: Phase::Generate,
        dst_name: FixedName::new("blk.3.attn_out"),
        ..AccessRecord::EMPTY
    };
    assert!(record.push_source(disk_source("blk.3.attn_q.weight", 0)));
    let bytes = record.encode();

    assert_eq!(&bytes[0..8], &0x0102_0304_0506_0708u64.to_le_bytes());
    assert_eq!(&bytes[8..12], &42u32.to_le_bytes());
    assert_eq!(&bytes[12..14], &3u16.to_le_bytes());
    assert_eq!(&bytes[14..16], &9u16.to_le_bytes());
    assert_eq!(bytes[16], 17);
    assert_eq!(bytes[17], 1);
    assert_eq!(bytes[18], 1);
    assert_eq!(&bytes[20..34], b"blk.3.attn_out");
    assert_eq!(bytes[34], 0);

    let slot = &bytes[HEADER_SIZE..HEADER_SIZE + SLOT_SIZE];
    assert_eq!(&slot[..19], b"blk.3.attn_q.weight");
    assert_eq!(slot[62], MemorySource::Disk as u8);
    assert_eq!(slot[63], SLOT_FLAG_LOCATION_KNOWN);
    assert!(AccessRecord::is_zeroed(&bytes[HEADER_SIZE + SLOT_SIZE..]));
}

#[test]
fn decode_restores_sources_and_sentinels() {
    let mut record = AccessRecord { token_id: 5, dst_name: FixedName::new("result"), ..AccessRecord::EMPTY };
    record.push_source(disk_source("weights", 0));
    record.push_source(SourceSlot { name: FixedName::new("scratch"), ..SourceSlot::EMPTY });

    let decoded = AccessRecord::decode(&record.encode()).expect("record should decode");
    assert_eq!(decoded, record);
    assert_eq!(decoded.sources()[0].disk_offset(), Some(0));
    assert_eq!(decoded.sources()[0].registry_index(), Some(7));
    assert_eq!(decoded.sources()[1].disk_offset(), None);
    assert_eq!(decoded.sources()[1].buffer_id(), None);
    assert_eq!(decoded.sources()[1].registry_index(), None);
    assert_eq!(decoded.sources()[1].layer_id, LAYER_NONE);
}

#[test]
fn push_source_stops_at_four() {
    let mut record = AccessRecord::EMPTY;
    for _ in 0..MAX_SOURCES {
        assert!(record.push_source(SourceSlot::EMPTY));
    }
    assert!(!record.push_source(SourceSlot::EMPTY));
    assert_eq!(record.sources().len(), MAX_SOURCES);
}

#[test]
fn long_names_truncate_on_char_boundary() {
    let long = "blk.12.ffn_gate_exps.weight.with.a.very.long.suffix";
    let name = FixedName::<DST_NAME_LEN>::new(long);
    assert_eq!(name.as_str(), &long[..DST_NAME_LEN]);

    // 'é' is two bytes and straddles the 32-byte limit.
    let accented = format!("{}é", "a".repeat(SRC_NAME_LEN - 1));
    let name = FixedName::<SRC_NAME_LEN>::new(&accented);
    assert_eq!(name.as_str().len(), SRC_NAME_LEN - 1);

    assert_eq!(FixedName::<8>::new("ab\0cd").as_str(), "ab");
}

#[test]
fn decode_rejects_bad_input() {
    assert_eq!(AccessRecord::decode(&[0u8; 10]), Err(RecordError::Truncated { expected: RECORD_SIZE, actual: 10 }));

    let mut bytes = AccessRecord::EMPTY.encode();
    bytes[17] = 9;
    assert_eq!(AccessRecord::decode(&bytes), Err(RecordError::InvalidPhase(9)));

    let mut bytes = AccessRecord::EMPTY.encode();
    bytes[18] = 5;
    assert_eq!(AccessRecord::decode(&bytes), Err(RecordError::TooManySources(5)));

    let mut bytes = AccessRecord::EMPTY.encode();
    bytes[18] = 1;
    bytes[HEADER_SIZE + 62] = 4;
    assert_eq!(AccessRecord::decode(&bytes), Err(RecordError::InvalidMemorySource(4)));
}

#[test]
fn encode_into_overwrites_stale_bytes() {
    let mut out = [0xAAu8; RECORD_SIZE];
    AccessRecord::EMPTY.encode_into(&mut out);
    assert_eq!(AccessRecord::decode(&out), Ok(AccessRecord::EMPTY));
    assert!(AccessRecord::is_zeroed(&out[HEADER_SIZE..]));
}
