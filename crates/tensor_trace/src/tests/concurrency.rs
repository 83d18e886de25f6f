use super::{remove_trace, temp_path};
use crate::prelude::*;

const PER_THREAD: u32 = 2000;

#[test]
fn concurrent_recorders_produce_every_record_once() {
    let path = temp_path("concurrent", "bin");
    let mut session = TraceSession::new(TraceConfig::default().with_batch_records(512));
    session.init(&path, 2 * 1024 * 1024).expect("init succeeds");

    std::thread::scope(|scope| {
        for worker in 0..2u16 {
            let session = &session;
            scope.spawn(move || {
                let mut recorder = session.recorder();
                for sequence in 0..PER_THREAD {
                    let mut record = AccessRecord::EMPTY;
                    record.thread_id = worker;
                    record.token_id = sequence;
                    record.dst_name = FixedName::new("worker");
                    recorder.append(&record);
                }
            });
        }
    });

    let summary = session.shutdown().expect("session was open");
    assert_eq!(summary.records_written, u64::from(2 * PER_THREAD));
    assert_eq!(summary.dropped_records, 0);

    let reader = TraceReader::open(&path).expect("reader opens");
    assert_eq!(reader.record_count(), (2 * PER_THREAD) as usize);

    let mut next = [0u32; 2];
    for record in reader.iter() {
        let record = record.expect("no torn records");
        assert_eq!(record.dst_name.as_str(), "worker");
        let expected = &mut next[usize::from(record.thread_id)];
        assert_eq!(record.token_id, *expected, "per-thread order must be preserved");
        *expected += 1;
    }
    assert_eq!(next, [PER_THREAD, PER_THREAD]);

    remove_trace(&path);
}

#[test]
fn concurrent_overflow_never_writes_partial_batches() {
    let path = temp_path("concurrent_overflow", "bin");
    let mut session = TraceSession::new(TraceConfig::default().with_batch_records(8).with_write_summary(false));
    // Room for 5 batches of 8 and a half.
    let capacity = (8 * 5 + 4) * RECORD_SIZE;
    session.init(&path, capacity as u64).expect("init succeeds");

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let session = &session;
            scope.spawn(move || {
                let mut recorder = session.recorder();
                for _ in 0..64 {
                    recorder.append(&AccessRecord { dst_name: FixedName::new("filler"), ..AccessRecord::EMPTY });
                }
            });
        }
    });

    let summary = session.shutdown().expect("session was open");
    assert_eq!(summary.records_written, 40);
    assert_eq!(summary.bytes_written, 40 * RECORD_SIZE as u64);
    assert_eq!(summary.dropped_records, 4 * 64 - 40);

    let bytes = std::fs::read(&path).expect("trace readable");
    assert!(AccessRecord::is_zeroed(&bytes[40 * RECORD_SIZE..]));

    remove_trace(&path);
}
