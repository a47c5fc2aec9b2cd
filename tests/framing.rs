use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use wirecall::protocol::framing::{
    MessageFramer, DEFAULT_MAX_FRAME_LEN, DEFAULT_READ_TIMEOUT,
};
use wirecall::FramingError;

#[tokio::test]
async fn round_trips_byte_payloads() {
    let (a, b) = tokio::io::duplex(64 * 1024);
    let mut tx = MessageFramer::new(a);
    let mut rx = MessageFramer::new(b);

    for len in [0_usize, 1, 5, 1024] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
        tx.send_bytes(&payload).await.expect("send payload");
        let received = rx.recv_bytes().await.expect("receive payload");
        assert_eq!(received, payload, "payload of {len} bytes");
    }
}

#[tokio::test]
async fn round_trips_payload_larger_than_stream_chunks() {
    // A tiny duplex buffer forces both sides through many partial reads
    // and writes.
    let (a, b) = tokio::io::duplex(16);
    let mut tx = MessageFramer::new(a);
    let mut rx = MessageFramer::new(b);

    let payload: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();
    let (sent, received) = tokio::join!(tx.send_bytes(&payload), rx.recv_bytes());
    sent.expect("send large payload");
    assert_eq!(received.expect("receive large payload"), payload);
}

#[tokio::test]
async fn rejects_oversized_length_before_reading_payload() {
    let (mut raw, b) = tokio::io::duplex(64);
    let mut rx = MessageFramer::new(b);
    rx.set_read_timeout(Duration::from_secs(1));

    // A header declaring more than the limit, with no payload behind it.
    // The declaration alone must fail the receive.
    let declared = (DEFAULT_MAX_FRAME_LEN + 1) as u32;
    raw.write_all(&declared.to_le_bytes()).await.expect("write header");

    let err = rx.recv_bytes().await.expect_err("expected oversize error");
    match err {
        FramingError::Oversize { length, max } => {
            assert_eq!(length, DEFAULT_MAX_FRAME_LEN + 1);
            assert_eq!(max, DEFAULT_MAX_FRAME_LEN);
        }
        other => panic!("expected Oversize, got {other:?}"),
    }
}

#[tokio::test]
async fn refuses_to_send_beyond_frame_limit() {
    let (a, _b) = tokio::io::duplex(64);
    let mut tx = MessageFramer::new(a);
    let previous = tx.set_max_frame_len(8);
    assert_eq!(previous, DEFAULT_MAX_FRAME_LEN);
    assert_eq!(tx.max_frame_len(), 8);

    let err = tx.send_bytes(&[0_u8; 16]).await.expect_err("expected oversize error");
    match err {
        FramingError::Oversize { length, max } => {
            assert_eq!(length, 16);
            assert_eq!(max, 8);
        }
        other => panic!("expected Oversize, got {other:?}"),
    }
}

#[tokio::test]
async fn reports_clean_close_between_frames() {
    let (a, b) = tokio::io::duplex(64);
    let mut rx = MessageFramer::new(b);
    drop(a);

    let err = rx.recv_bytes().await.expect_err("expected closed stream");
    assert!(matches!(err, FramingError::Closed), "unexpected error: {err:?}");
}

#[tokio::test]
async fn reports_truncation_mid_payload() {
    let (mut raw, b) = tokio::io::duplex(64);
    let mut rx = MessageFramer::new(b);

    raw.write_all(&10_u32.to_le_bytes()).await.expect("write header");
    raw.write_all(&[1, 2, 3]).await.expect("write partial payload");
    drop(raw);

    let err = rx.recv_bytes().await.expect_err("expected truncation");
    match err {
        FramingError::Truncated { got, expected } => {
            assert_eq!(got, 3);
            assert_eq!(expected, 10);
        }
        other => panic!("expected Truncated, got {other:?}"),
    }
}

#[tokio::test]
async fn reports_truncation_mid_header() {
    let (mut raw, b) = tokio::io::duplex(64);
    let mut rx = MessageFramer::new(b);

    raw.write_all(&[7, 0]).await.expect("write partial header");
    drop(raw);

    let err = rx.recv_bytes().await.expect_err("expected truncation");
    match err {
        FramingError::Truncated { got, expected } => {
            assert_eq!(got, 2);
            assert_eq!(expected, 4);
        }
        other => panic!("expected Truncated, got {other:?}"),
    }
}

#[tokio::test]
async fn times_out_when_no_frame_arrives() {
    let (keep_alive, b) = tokio::io::duplex(64);
    let mut rx = MessageFramer::new(b);
    let previous = rx.set_read_timeout(Duration::from_millis(50));
    assert_eq!(previous, DEFAULT_READ_TIMEOUT);
    assert_eq!(rx.read_timeout(), Duration::from_millis(50));

    let err = rx.recv_bytes().await.expect_err("expected timeout");
    assert!(matches!(err, FramingError::TimedOut(_)), "unexpected error: {err:?}");
    drop(keep_alive);
}

#[tokio::test]
async fn header_and_integers_are_little_endian_on_the_wire() {
    let (a, mut raw) = tokio::io::duplex(64);
    let mut tx = MessageFramer::new(a);

    tx.send_bytes(b"abcdef").await.expect("send bytes");
    let mut frame = [0_u8; 10];
    raw.read_exact(&mut frame).await.expect("read raw frame");
    assert_eq!(&frame[..4], &6_u32.to_le_bytes());
    assert_eq!(&frame[4..], b"abcdef");

    tx.send_u32(0x0A0B_0C0D).await.expect("send u32");
    let mut frame = [0_u8; 8];
    raw.read_exact(&mut frame).await.expect("read raw u32 frame");
    assert_eq!(&frame[..4], &4_u32.to_le_bytes());
    assert_eq!(&frame[4..], &[0x0D, 0x0C, 0x0B, 0x0A]);
}

#[tokio::test]
async fn round_trips_typed_payloads() {
    let (a, b) = tokio::io::duplex(64 * 1024);
    let mut tx = MessageFramer::new(a);
    let mut rx = MessageFramer::new(b);

    tx.send_str("grüße, wirecall").await.expect("send str");
    assert_eq!(rx.recv_str().await.expect("receive str"), "grüße, wirecall");

    tx.send_u32(u32::MAX).await.expect("send u32");
    assert_eq!(rx.recv_u32().await.expect("receive u32"), u32::MAX);

    let value = json!({ "nested": { "list": [1, 2, 3] } });
    tx.send_json(&value).await.expect("send json");
    let received: serde_json::Value = rx.recv_json().await.expect("receive json");
    assert_eq!(received, value);
}

#[tokio::test]
async fn rejects_undecodable_typed_payloads() {
    let (a, b) = tokio::io::duplex(64);
    let mut tx = MessageFramer::new(a);
    let mut rx = MessageFramer::new(b);

    tx.send_bytes(&[0xFF, 0xFE]).await.expect("send raw bytes");
    let err = rx.recv_str().await.expect_err("expected decode error");
    assert!(matches!(err, FramingError::Decode(_)), "unexpected error: {err:?}");

    tx.send_bytes(&[1, 2, 3]).await.expect("send raw bytes");
    let err = rx.recv_u32().await.expect_err("expected decode error");
    assert!(matches!(err, FramingError::Decode(_)), "unexpected error: {err:?}");

    tx.send_bytes(b"not json at all").await.expect("send raw bytes");
    let err = rx.recv_json::<serde_json::Value>().await.expect_err("expected decode error");
    assert!(matches!(err, FramingError::Decode(_)), "unexpected error: {err:?}");
}
