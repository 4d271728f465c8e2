//! Integration tests for the shared-channel contract, against real shared
//! memory. Every test uses its own namespace so parallel test runs never
//! collide, and destroys its regions on the way out.

use std::sync::atomic::{AtomicU32, Ordering};

use skymon_ipc::{open_channel, Channel, ChannelError, ChannelKind};

fn test_name(tag: &str) -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    format!(
        "skt-{}-{}-{}",
        std::process::id(),
        tag,
        COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}

#[test]
fn test_write_then_read_round_trip() {
    let channel = Channel::open(&test_name("rw"), 256).expect("open");

    let version = channel.write_frame(b"1 100.00 200.00 300.00 0\n").expect("write");
    assert_eq!(version, 1);

    let frame = channel.read_frame().expect("read");
    assert_eq!(frame.version, 1);
    assert_eq!(frame.payload, b"1 100.00 200.00 300.00 0\n");

    channel.destroy();
}

#[test]
fn test_double_read_is_idempotent() {
    let channel = Channel::open(&test_name("idem"), 256).expect("open");
    channel.write_frame(b"stable contents").expect("write");

    let first = channel.read_frame().expect("first read");
    let second = channel.read_frame().expect("second read");
    assert_eq!(first, second);
    assert_eq!(channel.version().expect("version"), first.version);

    channel.destroy();
}

#[test]
fn test_empty_channel_reads_stale() {
    let channel = Channel::open(&test_name("empty"), 128).expect("open");

    assert!(matches!(
        channel.read_frame(),
        Err(ChannelError::StaleOrEmptyFrame)
    ));
    assert_eq!(channel.version().expect("version"), 0);

    channel.destroy();
}

#[test]
fn test_capacity_boundary() {
    let capacity = 64;
    let channel = Channel::open(&test_name("cap"), capacity).expect("open");

    // capacity - 1 bytes fit.
    let fitting = vec![b'x'; capacity - 1];
    channel.write_frame(&fitting).expect("fitting write");

    // capacity bytes are rejected and the prior frame stays readable.
    let too_large = vec![b'y'; capacity];
    match channel.write_frame(&too_large) {
        Err(ChannelError::FrameTooLarge { len, capacity: cap }) => {
            assert_eq!(len, capacity);
            assert_eq!(cap, capacity);
        }
        other => panic!("expected FrameTooLarge, got {other:?}"),
    }

    let frame = channel.read_frame().expect("prior frame readable");
    assert_eq!(frame.payload, fitting);
    assert_eq!(frame.version, 1);

    channel.destroy();
}

#[test]
fn test_overwrite_leaves_no_residue() {
    let channel = Channel::open(&test_name("resi"), 128).expect("open");

    channel
        .write_frame(b"a very long first frame with many bytes")
        .expect("long write");
    channel.write_frame(b"short").expect("short write");

    let frame = channel.read_frame().expect("read");
    assert_eq!(frame.payload, b"short");
    assert_eq!(frame.version, 2);

    channel.destroy();
}

#[test]
fn test_take_frame_consumes_the_slot() {
    let channel = Channel::open(&test_name("take"), 128).expect("open");
    channel.write_frame(b"4 120.00 -30.00 0.00\n").expect("write");

    let taken = channel.take_frame().expect("take");
    assert_eq!(taken.payload, b"4 120.00 -30.00 0.00\n");

    // The slot is now empty; the version still counts the one publish.
    assert!(matches!(
        channel.take_frame(),
        Err(ChannelError::StaleOrEmptyFrame)
    ));
    assert_eq!(channel.version().expect("version"), 1);

    channel.destroy();
}

#[test]
fn test_last_write_wins_on_command_slot() {
    let channel = Channel::open(&test_name("lww"), 128).expect("open");

    channel.write_frame(b"first command").expect("write");
    channel.write_frame(b"second command").expect("overwrite");

    let taken = channel.take_frame().expect("take");
    assert_eq!(taken.payload, b"second command");

    channel.destroy();
}

#[test]
fn test_update_frame_preserves_existing_lines() {
    let channel = Channel::open(&test_name("upd"), 256).expect("open");

    channel.write_frame(b"Terminate\n").expect("write");
    channel
        .update_frame(|current| {
            let mut text = String::from_utf8(current.to_vec())
                .map_err(|_| ChannelError::StaleOrEmptyFrame)?;
            text.push_str("Ack sensor\n");
            Ok(text.into_bytes())
        })
        .expect("update");

    let frame = channel.read_frame().expect("read");
    assert_eq!(frame.payload, b"Terminate\nAck sensor\n");
    assert_eq!(frame.version, 2);

    channel.destroy();
}

#[test]
fn test_update_frame_on_empty_channel_starts_fresh() {
    let channel = Channel::open(&test_name("updempty"), 128).expect("open");

    channel
        .update_frame(|current| {
            assert!(current.is_empty());
            Ok(b"Ack display\n".to_vec())
        })
        .expect("update");

    let frame = channel.read_frame().expect("read");
    assert_eq!(frame.payload, b"Ack display\n");

    channel.destroy();
}

#[test]
fn test_update_frame_rejects_oversized_result() {
    let channel = Channel::open(&test_name("updcap"), 32).expect("open");
    channel.write_frame(b"seed").expect("write");

    let result = channel.update_frame(|_| Ok(vec![b'z'; 32]));
    assert!(matches!(result, Err(ChannelError::FrameTooLarge { .. })));

    // The prior frame survives a rejected update.
    assert_eq!(channel.read_frame().expect("read").payload, b"seed");

    channel.destroy();
}

#[test]
fn test_second_open_attaches_to_same_region() {
    let name = test_name("attach");
    let writer = Channel::open(&name, 256).expect("create");
    let reader = Channel::open(&name, 256).expect("attach");

    writer.write_frame(b"shared bytes").expect("write");

    let frame = reader.read_frame().expect("read");
    assert_eq!(frame.payload, b"shared bytes");
    assert_eq!(frame.version, 1);

    reader.close();
    writer.destroy();
}

#[test]
fn test_destroy_removes_the_name() {
    let name = test_name("destroy");
    let channel = Channel::open(&name, 128).expect("create");
    channel.write_frame(b"doomed").expect("write");
    channel.destroy();

    // A fresh open creates a brand-new, empty region.
    let fresh = Channel::open(&name, 128).expect("recreate");
    assert!(matches!(
        fresh.read_frame(),
        Err(ChannelError::StaleOrEmptyFrame)
    ));
    assert_eq!(fresh.version().expect("version"), 0);

    fresh.destroy();
}

#[test]
fn test_channels_are_independent() {
    let namespace = test_name("reg");
    let alerts = open_channel(&namespace, ChannelKind::Alerts, 20).expect("alerts");
    let state = open_channel(&namespace, ChannelKind::AircraftState, 20).expect("state");

    alerts
        .write_frame(b"ALERT: Time: 0.00, Message: test\n")
        .expect("write alerts");

    // Writing one channel never disturbs another.
    assert!(matches!(
        state.read_frame(),
        Err(ChannelError::StaleOrEmptyFrame)
    ));
    assert_eq!(state.version().expect("version"), 0);

    alerts.destroy();
    state.destroy();
}

#[test]
fn test_concurrent_writers_serialize() {
    let name = test_name("conc");
    let channel = std::sync::Arc::new(Channel::open(&name, 4096).expect("open"));

    let mut handles = Vec::new();
    for worker in 0..4 {
        let channel = std::sync::Arc::clone(&channel);
        handles.push(std::thread::spawn(move || {
            for i in 0..50 {
                channel
                    .update_frame(|current| {
                        let mut bytes = current.to_vec();
                        bytes.extend_from_slice(format!("w{worker}i{i}\n").as_bytes());
                        // Keep the frame bounded; the point is serialization,
                        // not growth.
                        if bytes.len() > 2048 {
                            bytes.truncate(0);
                        }
                        Ok(bytes)
                    })
                    .expect("update");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("writer thread");
    }

    // 4 writers x 50 updates: every publish bumped the version exactly once.
    assert_eq!(channel.version().expect("version"), 200);

    match std::sync::Arc::try_unwrap(channel) {
        Ok(channel) => channel.destroy(),
        Err(_) => panic!("channel still shared"),
    }
}
