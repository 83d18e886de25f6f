use super::{remove_trace, temp_path};
use crate::prelude::*;

const MB: u64 = 1024 * 1024;

fn synthetic(token: u32) -> AccessRecord {
    let mut record = AccessRecord {
        timestamp_ns: u64::from(token) * 10,
        token_id: token,
        layer_id: (token % 4) as u16,
        thread_id: 0,
        op_code: 1,
        dst_name: FixedName::new("synthetic"),
        ..AccessRecord::EMPTY
    };
    record.push_source(SourceSlot {
        name: FixedName::new("weights"),
        address: 0x1000,
        size_bytes: 1024,
        layer_id: (token % 4) as u16,
        memory: MemorySource::Disk,
        location: u64::from(token) * 1024,
        location_known: true,
        registry_index: REGISTRY_INDEX_NONE,
    });
    record
}

fn quiet_config() -> TraceConfig {
    TraceConfig::default().with_write_summary(false)
}

#[test]
fn init_sizes_file_to_capacity() {
    let path = temp_path("init_size", "bin");
    let mut session = TraceSession::new(quiet_config());
    session.init(&path, MB).expect("init should succeed");

    assert!(session.is_recording());
    assert_eq!(std::fs::metadata(&path).expect("trace file exists").len(), MB);
    assert_eq!(session.write_offset(), Some(0));

    session.shutdown();
    remove_trace(&path);
}

#[test]
fn ten_records_round_trip_through_the_file() {
    let path = temp_path("ten_records", "bin");
    let mut session = TraceSession::new(TraceConfig::default());
    session.init(&path, MB).expect("init should succeed");
    {
        let mut recorder = session.recorder();
        for token in 0..10 {
            recorder.append(&synthetic(token));
        }
        assert_eq!(recorder.pending(), 10);
    }
    let summary = session.shutdown().expect("session was open");
    assert_eq!(summary.records_written, 10);
    assert_eq!(summary.bytes_written, 10 * RECORD_SIZE as u64);
    assert_eq!(summary.dropped_records, 0);

    let bytes = std::fs::read(&path).expect("trace readable");
    assert!(bytes.len() >= 10 * RECORD_SIZE);
    let first = AccessRecord::decode(&bytes).expect("first record decodes");
    assert_eq!(first.token_id, 0);
    assert_eq!(first.layer_id, 0);
    assert_eq!(first.sources()[0].disk_offset(), Some(0));

    let reader = TraceReader::open(&path).expect("reader opens");
    assert_eq!(reader.record_count(), 10);
    for (token, record) in reader.iter().enumerate() {
        assert_eq!(record.expect("record decodes"), synthetic(token as u32));
    }

    remove_trace(&path);
}

#[test]
fn overflowing_batch_is_dropped_whole() {
    let path = temp_path("overflow", "bin");
    let mut session = TraceSession::new(quiet_config().with_batch_records(2));
    session.init(&path, 3 * RECORD_SIZE as u64).expect("init should succeed");
    {
        let mut recorder = session.recorder();
        recorder.append(&synthetic(0));
        recorder.append(&synthetic(1));
        assert_eq!(session.write_offset(), Some(2 * RECORD_SIZE));

        recorder.append(&synthetic(2));
        recorder.append(&synthetic(3));
        assert_eq!(session.write_offset(), Some(2 * RECORD_SIZE));
        assert_eq!(recorder.pending(), 0);
    }
    let summary = session.shutdown().expect("session was open");
    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.dropped_records, 2);
    assert_eq!(summary.dropped_batches, 1);

    let bytes = std::fs::read(&path).expect("trace readable");
    assert_eq!(bytes.len(), 3 * RECORD_SIZE);
    assert!(AccessRecord::is_zeroed(&bytes[2 * RECORD_SIZE..]));

    remove_trace(&path);
}

#[test]
fn second_init_is_rejected_without_side_effects() {
    let first = temp_path("double_init_a", "bin");
    let second = temp_path("double_init_b", "bin");
    let mut session = TraceSession::new(quiet_config());
    session.init(&first, MB).expect("first init succeeds");

    match session.init(&second, MB) {
        Err(TraceError::AlreadyInitialised) => {}
        other => panic!("expected already initialised error, got {other:?}"),
    }
    assert!(!second.exists());
    assert!(session.is_recording());

    session.shutdown();
    remove_trace(&first);
}

#[test]
fn failed_init_leaves_every_call_a_no_op() {
    let path = temp_path("missing_dir", "d").join("trace.bin");
    let mut session = TraceSession::new(quiet_config());

    assert!(matches!(session.init(&path, MB), Err(TraceError::Io { .. })));
    assert!(!session.is_recording());

    let mut recorder = session.recorder();
    recorder.append(&synthetic(0));
    assert_eq!(recorder.pending(), 0);
    drop(recorder);

    assert_eq!(session.shutdown(), None);
}

#[test]
fn zero_capacity_is_rejected() {
    let path = temp_path("zero_capacity", "bin");
    let mut session = TraceSession::new(quiet_config());
    assert!(matches!(session.init(&path, 0), Err(TraceError::ZeroCapacity)));
    assert!(!session.is_recording());
    remove_trace(&path);
}

#[test]
fn disabled_session_creates_nothing() {
    let path = temp_path("disabled", "bin");
    let mut session = TraceSession::new(TraceConfig::disabled());
    session.init(&path, MB).expect("disabled init is accepted");

    assert!(!session.is_recording());
    assert!(!path.exists());
}

#[test]
fn shutdown_is_idempotent_and_allows_reinit() {
    let first = temp_path("reinit_a", "bin");
    let second = temp_path("reinit_b", "bin");
    let mut session = TraceSession::new(quiet_config());

    session.init(&first, MB).expect("init succeeds");
    session.recorder().append(&synthetic(0));
    assert!(session.shutdown().is_some());
    assert!(session.shutdown().is_none());

    session.init(&second, MB).expect("reinit succeeds");
    assert_eq!(session.write_offset(), Some(0));
    session.shutdown();

    remove_trace(&first);
    remove_trace(&second);
}

#[derive(Default)]
struct Tensor {
    name: &'static str,
    address: usize,
    buffer: Option<BufferInfo>,
    sources: Vec<Tensor>,
}

impl TracedTensor for Tensor {
    fn name(&self) -> &str {
        self.name
    }
    fn op_code(&self) -> u8 {
        26
    }
    fn data_address(&self) -> usize {
        self.address
    }
    fn size_bytes(&self) -> u64 {
        256
    }
    fn buffer(&self) -> Option<BufferInfo> {
        self.buffer
    }
    fn source(&self, slot: usize) -> Option<&Self> {
        self.sources.get(slot)
    }
}

#[test]
fn log_operation_records_once_per_operation_with_context() {
    let path = temp_path("log_operation", "bin");
    let mut session = TraceSession::new(TraceConfig::default());
    session.init(&path, MB).expect("init succeeds");

    let mut builder = LayoutBuilder::new(4, 4);
    builder.register_tensor("blk.1.ffn_up.weight", 0x8000, 128, 256).expect("fits");
    builder.register_disk_offset("blk.1.ffn_up.weight", 4096).expect("fits");
    session.install_layout(builder.build()).expect("first install");
    assert!(matches!(session.install_layout(LayoutBuilder::default().build()), Err(TraceError::LayoutAlreadyInstalled)));

    let weight = Tensor {
        name: "blk.1.ffn_up.weight",
        address: 0x8000,
        buffer: Some(BufferInfo { usage: BufferUsage::Weights, id: 0 }),
        ..Tensor::default()
    };
    let dst = Tensor { name: "ffn_up-1", address: 0x9000, sources: vec![weight], ..Tensor::default() };

    session.begin_token(12, Phase::Generate);
    {
        let mut recorder = session.recorder();
        for worker in 0..4 {
            recorder.log_operation(&dst, worker);
        }
        recorder.finish();
    }
    session.shutdown();

    let reader = TraceReader::open(&path).expect("reader opens");
    assert_eq!(reader.record_count(), 1);
    let record = reader.record(0).expect("one record").expect("decodes");
    assert_eq!(record.token_id, 12);
    assert_eq!(record.phase, Phase::Generate);
    assert_eq!(record.op_code, 26);
    assert_eq!(record.layer_id, 1);
    assert_eq!(record.thread_id, thread_id());
    assert_eq!(record.dst_name.as_str(), "ffn_up-1");
    let src = record.sources()[0];
    assert_eq!(src.registry_index(), Some(0));
    assert_eq!(src.disk_offset(), Some(4096));

    remove_trace(&path);
}

#[test]
fn registry_dump_writes_csv() {
    let path = temp_path("registry_dump", "csv");
    let mut builder = LayoutBuilder::new(2, 2);
    builder.register_tensor("token_embd.weight", 0x10, 0, 32).expect("fits");
    builder.register_tensor("blk.0.attn_norm.weight", 0x20, 32, 16).expect("fits");
    builder.build().registry().dump(&path).expect("dump succeeds");

    let text = std::fs::read_to_string(&path).expect("csv readable");
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "tensor_idx,tensor_name,data_ptr,file_offset,size_bytes,layer_id");
    assert_eq!(lines[2], "1,blk.0.attn_norm.weight,0x20,32,16,0");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn reinit_at_the_same_path_discards_the_previous_summary() {
    let path = temp_path("reused_path", "bin");

    let mut first = TraceSession::new(TraceConfig::default());
    first.init(&path, MB).expect("first init succeeds");
    {
        let mut recorder = first.recorder();
        for token in 0..100 {
            recorder.append(&synthetic(token));
        }
    }
    first.shutdown().expect("first run was open");
    assert!(TraceSummary::sidecar_path(&path).exists());

    let mut second = TraceSession::new(quiet_config());
    second.init(&path, MB).expect("second init succeeds");
    assert!(!TraceSummary::sidecar_path(&path).exists());
    {
        let mut recorder = second.recorder();
        for token in 0..3 {
            recorder.append(&synthetic(token));
        }
    }
    second.shutdown().expect("second run was open");

    let reader = TraceReader::open(&path).expect("reader opens");
    assert!(reader.summary().is_none());
    let written: Vec<_> = reader.iter_written().map(|record| record.expect("record decodes")).collect();
    assert_eq!(written, (0..3).map(synthetic).collect::<Vec<_>>());

    remove_trace(&path);
}

#[test]
fn reader_ignores_a_summary_for_another_file_size() {
    let path = temp_path("foreign_summary", "bin");
    let mut session = TraceSession::new(quiet_config());
    session.init(&path, MB).expect("init succeeds");
    {
        let mut recorder = session.recorder();
        for token in 0..5 {
            recorder.append(&synthetic(token));
        }
    }
    let mut summary = session.shutdown().expect("session was open");
    summary.capacity_bytes = 4 * MB;
    summary.bytes_written = 50 * RECORD_SIZE as u64;
    summary.write_sidecar().expect("sidecar writable");

    let reader = TraceReader::open(&path).expect("reader opens");
    assert!(reader.summary().is_none());
    assert_eq!(reader.record_count(), MB as usize / RECORD_SIZE);
    assert_eq!(reader.iter_written().count(), 5);

    let mut matching = summary.clone();
    matching.capacity_bytes = MB;
    matching.bytes_written = 5 * RECORD_SIZE as u64;
    matching.write_sidecar().expect("sidecar writable");
    assert_eq!(TraceReader::open(&path).expect("reader opens").record_count(), 5);

    remove_trace(&path);
}
