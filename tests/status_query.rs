mod common;

use std::time::{Duration, Instant};

use common::{sample_replies, script_of, zero_replies, ScriptedTransport, Step};
use tracer_monitor::devices::{QueryState, StatusQuery};
use tracer_monitor::modbus::{ModbusClient, SerialSettings, STATUS_FRAMES};
use tracer_monitor::{query_status, TracerError};

const FAST: Duration = Duration::from_millis(100);

#[tokio::test]
async fn decodes_snapshot_from_canned_replies() {
    let (transport, wire) = ScriptedTransport::new(script_of(sample_replies()));

    let status = query_status(transport, FAST).await.unwrap();

    assert!(status.load);
    assert_eq!(status.array_voltage, 12.34);
    assert_eq!(status.battery_soc, 80);
    assert_eq!(status.battery_current, -2.5);
    assert_eq!(status.energy_generated_total, 5000.0);
    assert_eq!(status.load_power, 0.0);

    let wire = wire.lock().unwrap();
    let expected: Vec<Vec<u8>> = STATUS_FRAMES.iter().map(|f| f.request.to_vec()).collect();
    assert_eq!(wire.writes, expected);
    assert!(wire.closed, "transport must be released after the query");
}

#[tokio::test]
async fn joins_fragmented_replies() {
    let (transport, _wire) = ScriptedTransport::new(script_of(sample_replies()));
    let status = query_status(transport.fragmented(3), FAST).await.unwrap();

    assert!(status.load);
    assert_eq!(status.array_voltage, 12.34);
    assert_eq!(status.battery_soc, 80);
}

#[tokio::test]
async fn tolerates_replies_longer_than_declared() {
    let mut replies = sample_replies();
    replies[0].extend_from_slice(&[0xEE; 4]);
    let (transport, _wire) = ScriptedTransport::new(script_of(replies));

    let status = query_status(transport, FAST).await.unwrap();
    assert!(status.load);
    assert_eq!(status.array_voltage, 12.34);
}

#[tokio::test]
async fn places_each_reply_at_its_offset() {
    let replies: Vec<Vec<u8>> = STATUS_FRAMES
        .iter()
        .enumerate()
        .map(|(i, f)| (0..f.reply_len).map(|k| (i * 50 + k) as u8).collect())
        .collect();
    let (transport, _wire) = ScriptedTransport::new(script_of(replies.clone()));
    let client = ModbusClient::new(transport.fragmented(7), FAST);

    let mut query = StatusQuery::new();
    query.run(&client).await.unwrap();

    assert_eq!(query.state(), QueryState::Complete);
    for (frame, reply) in STATUS_FRAMES.iter().zip(&replies) {
        for (k, byte) in reply.iter().enumerate() {
            assert_eq!(query.buffer().byte(frame.offset + k), *byte);
        }
    }
}

#[tokio::test]
async fn timeout_aborts_remaining_exchanges() {
    let mut script = script_of(zero_replies());
    script[2] = Step::Stall(Duration::from_millis(400));
    let (transport, wire) = ScriptedTransport::new(script);

    let err = query_status(transport, FAST).await.unwrap_err();

    match err {
        TracerError::Timeout { step, timeout_ms } => {
            assert_eq!(step, 3);
            assert_eq!(timeout_ms, 100);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    let wire = wire.lock().unwrap();
    assert_eq!(wire.writes.len(), 3);
    assert!(wire.closed, "transport must be closed when the query returns");
}

#[tokio::test]
async fn transport_is_closed_on_return_after_long_stall() {
    let mut script = script_of(zero_replies());
    script[0] = Step::Stall(Duration::from_millis(1500));
    let (transport, wire) = ScriptedTransport::new(script);

    let started = Instant::now();
    let err = query_status(transport, FAST).await.unwrap_err();

    assert!(matches!(err, TracerError::Timeout { step: 1, .. }), "got {:?}", err);
    assert!(wire.lock().unwrap().closed, "transport still open after the query returned");
    assert!(started.elapsed() < Duration::from_millis(1000), "waited out the stall: {:?}", started.elapsed());
}

#[tokio::test]
async fn default_timeout_is_two_seconds() {
    let mut script = script_of(zero_replies());
    script[0] = Step::Stall(Duration::from_millis(2300));
    let (transport, _wire) = ScriptedTransport::new(script);

    let started = Instant::now();
    let err = query_status(transport, SerialSettings::DEFAULT_TIMEOUT).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_secs(2), "gave up after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(2300), "waited for the read: {:?}", elapsed);
}

#[tokio::test]
async fn write_failure_sends_nothing_else() {
    let mut script = script_of(zero_replies());
    script[0] = Step::RejectWrite;
    let (transport, wire) = ScriptedTransport::new(script);

    let err = query_status(transport, FAST).await.unwrap_err();

    assert!(matches!(err, TracerError::WriteFailed { step: 1, .. }), "got {:?}", err);
    let wire = wire.lock().unwrap();
    assert_eq!(wire.writes.len(), 1);
    assert!(wire.closed);
}

#[tokio::test]
async fn closed_link_is_read_failure() {
    let mut script = script_of(zero_replies());
    script[1] = Step::Eof;
    let (transport, wire) = ScriptedTransport::new(script);

    let err = query_status(transport, FAST).await.unwrap_err();

    assert!(matches!(err, TracerError::ReadFailed { step: 2, .. }), "got {:?}", err);
    assert_eq!(wire.lock().unwrap().writes.len(), 2);
}

#[tokio::test]
async fn short_reply_is_not_accepted() {
    let mut replies = zero_replies();
    replies[4].truncate(30);
    let (transport, _wire) = ScriptedTransport::new(script_of(replies));

    let err = query_status(transport, FAST).await.unwrap_err();
    assert_eq!(err.step(), Some(5));
}

#[tokio::test]
async fn missing_port_fails_to_open() {
    let err = tracer_monitor::status("/dev/tracer-monitor-no-such-port").await.unwrap_err();
    assert!(matches!(err, TracerError::OpenFailed { .. }), "got {:?}", err);
}
