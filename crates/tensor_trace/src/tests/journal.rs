use super::temp_path;
use crate::prelude::*;

#[test]
fn journal_writes_one_event_per_line() {
    let trace = temp_path("journal_trace", "bin");
    let journal = temp_path("journal", "jsonl");
    let mut session = TraceSession::new(TraceConfig::default().with_write_summary(false).with_journal_path(&journal));
    session.init(&trace, 64 * 1024).expect("init succeeds");

    session.log_buffer_alloc(7, 0xdead_0000, 4096, "CPU KV buffer", "CPU", BufferUsage::KvCache, 3);
    session.log_buffer_alloc(8, 0xbeef_0000, 1024, "model weights", "CPU_Mapped", BufferUsage::Weights, LAYER_NONE);
    session.log_buffer_dealloc(7);

    // Each event is flushed as it is written.
    let contents = std::fs::read_to_string(&journal).expect("journal readable");
    let events: Vec<JournalEvent> =
        contents.lines().map(|line| serde_json::from_str(line).expect("each line is one event")).collect();
    assert_eq!(events.len(), 3);

    match &events[0] {
        JournalEvent::Alloc { buffer, .. } => {
            assert_eq!(buffer.id, 7);
            assert_eq!(buffer.usage, BufferUsage::KvCache);
            assert_eq!(buffer.layer_id, Some(3));
            assert_eq!(buffer.backend, "CPU");
        }
        other => panic!("expected alloc, got {other:?}"),
    }
    assert!(matches!(&events[1], JournalEvent::Alloc { buffer, .. } if buffer.layer_id.is_none()));
    assert!(matches!(events[2], JournalEvent::Dealloc { id: 7, .. }));
    assert!(contents.lines().next().is_some_and(|line| line.contains(r#""event":"alloc""#)));

    session.shutdown();
    let _ = std::fs::remove_file(&trace);
    let _ = std::fs::remove_file(&journal);
}

#[test]
fn journal_calls_without_an_open_journal_are_no_ops() {
    let session = TraceSession::new(TraceConfig::disabled());
    session.log_buffer_alloc(1, 0x10, 16, "scratch", "CPU", BufferUsage::Compute, LAYER_NONE);
    session.log_buffer_dealloc(1);
}

#[test]
fn disabled_session_never_opens_a_journal() {
    let journal = temp_path("journal_disabled", "jsonl");
    let mut session = TraceSession::new(TraceConfig::disabled());
    session.open_journal(&journal).expect("disabled open is accepted");
    session.log_buffer_dealloc(1);
    assert!(!journal.exists());
}
