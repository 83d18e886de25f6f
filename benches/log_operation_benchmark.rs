use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tensor_trace::prelude::*;

struct BenchTensor {
    name: &'static str,
    address: usize,
    usage: BufferUsage,
    sources: Vec<BenchTensor>,
}

impl TracedTensor for BenchTensor {
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
        4096
    }
    fn buffer(&self) -> Option<BufferInfo> {
        Some(BufferInfo { usage: self.usage, id: self.address as u64 })
    }
    fn source(&self, slot: usize) -> Option<&Self> {
        self.sources.get(slot)
    }
}

fn leaf(name: &'static str, address: usize, usage: BufferUsage) -> BenchTensor {
    BenchTensor { name, address, usage, sources: Vec::new() }
}

fn matmul_node() -> BenchTensor {
    BenchTensor {
        name: "blk.7.attn_q",
        address: 0x9000,
        usage: BufferUsage::Compute,
        sources: vec![leaf("blk.7.attn_q.weight", 0x1000, BufferUsage::Weights), leaf("blk.7.attn_norm", 0x8000, BufferUsage::Compute)],
    }
}

fn layout(session: &TraceSession) -> ModelLayout {
    let mut builder = session.layout_builder();
    builder.register_tensor("blk.7.attn_q.weight", 0x1000, 4096, 4096).expect("registry has room");
    builder.register_disk_offset("blk.7.attn_q.weight", 4096).expect("offset index has room");
    builder.build()
}

fn trace_path(stem: &str) -> std::path::PathBuf {
    let unique = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).expect("time went backwards").as_nanos();
    std::env::temp_dir().join(format!("tensor_trace_bench_{stem}_{unique}.bin"))
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    for &batch in &[1usize, 64, 1024] {
        let path = trace_path("append");
        let mut session = TraceSession::new(TraceConfig::default().with_batch_records(batch).with_write_summary(false));
        session.init(&path, 256 * 1024 * 1024).expect("trace init");

        let mut record = AccessRecord::EMPTY;
        record.token_id = 1;
        record.dst_name = FixedName::new("blk.0.ffn_out");
        record.push_source(SourceSlot { name: FixedName::new("blk.0.ffn_up.weight"), ..SourceSlot::EMPTY });

        group.bench_with_input(BenchmarkId::new("batch", batch), &batch, |b, _| {
            let mut recorder = session.recorder();
            b.iter(|| recorder.append(black_box(&record)));
        });

        session.shutdown();
        let _ = std::fs::remove_file(&path);
    }
    group.finish();
}

fn bench_log_operation(c: &mut Criterion) {
    let path = trace_path("log_operation");
    let mut session = TraceSession::new(TraceConfig::default().with_write_summary(false));
    session.init(&path, 256 * 1024 * 1024).expect("trace init");
    session.install_layout(layout(&session)).expect("first layout install");
    session.begin_token(3, Phase::Generate);

    let node = matmul_node();
    c.bench_function("log_operation", |b| {
        let mut recorder = session.recorder();
        b.iter(|| recorder.log_operation(black_box(&node), 0));
    });

    session.shutdown();
    let _ = std::fs::remove_file(&path);
}

criterion_group!(benches, bench_append, bench_log_operation);
criterion_main!(benches);
