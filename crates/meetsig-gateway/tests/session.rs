//! Read loop behavior: frame handling, liveness, and cleanup.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{inbound, peer, text, Sent};
use meetsig_core::error::SignalError;
use meetsig_gateway::realtime::Hub;
use meetsig_gateway::transport::codec::Frame;
use meetsig_gateway::transport::session::{self, LoopExit, SessionConfig};

fn quick() -> SessionConfig {
    SessionConfig {
        ping_every: Duration::from_secs(30),
        liveness_timeout: Duration::from_secs(60),
        max_payload_bytes: 64 * 1024,
    }
}

async fn finish(handle: tokio::task::JoinHandle<LoopExit>) -> LoopExit {
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("session did not end")
        .unwrap()
}

#[tokio::test]
async fn oversized_frame_is_dropped_and_connection_survives() {
    let hub = Arc::new(Hub::default());
    let (alice, _pa) = peer("R1", "alice");
    let (bob, mut pb) = peer("R1", "bob");
    hub.admit(&alice).await.unwrap();
    hub.admit(&bob).await.unwrap();
    pb.drain();

    let (tx, rx) = inbound();
    let task = tokio::spawn(session::run(Arc::clone(&hub), Arc::clone(&alice), rx, quick()));

    let big = "x".repeat(64 * 1024 + 1);
    tx.send(text(json!({ "key": "offer", "value": big }))).unwrap();
    tx.send(text(json!({ "key": "offer", "value": "small" }))).unwrap();

    // the first thing bob sees is the small frame
    let got = pb.next_envelope().await;
    assert_eq!(got["value"], "small");
    assert_eq!(got["sender_identity"], "alice");
    assert_eq!(hub.metrics().frames_dropped.get(&[("reason", "oversized")]), 1);
    assert_eq!(hub.peers_in("R1").await.len(), 2);

    drop(tx);
    assert_eq!(finish(task).await, LoopExit::Closed);
}

#[tokio::test]
async fn null_target_is_broadcast_to_the_rest_of_the_room() {
    let hub = Arc::new(Hub::default());
    let (alice, mut pa) = peer("R1", "alice");
    let (bob, mut pb) = peer("R1", "bob");
    let (carol, mut pc) = peer("R1", "carol");
    for c in [&alice, &bob, &carol] {
        hub.join(c).await.unwrap();
    }

    let (tx, rx) = inbound();
    let task = tokio::spawn(session::run(Arc::clone(&hub), Arc::clone(&alice), rx, quick()));

    tx.send(Ok(Frame::Text(
        r#"{"key":"candidate","value":{"sdpMid":"0"},"target_identity":null,"timestamp":null,"system":null}"#.into(),
    )))
    .unwrap();

    for probe in [&mut pb, &mut pc] {
        let got = probe.next_envelope().await;
        assert_eq!(got["key"], "candidate");
        assert_eq!(got["sender_identity"], "alice");
        assert_eq!(got["value"]["sdpMid"], "0");
        assert!(got.get("target_identity").is_none());
    }
    assert_eq!(hub.metrics().frames_dropped.get(&[("reason", "malformed")]), 0);

    tx.send(Ok(Frame::Close)).unwrap();
    assert_eq!(finish(task).await, LoopExit::Closed);
    assert!(pa.envelopes().is_empty());
}

#[tokio::test]
async fn malformed_empty_and_keyless_frames_are_skipped() {
    let hub = Arc::new(Hub::default());
    let (alice, _pa) = peer("R1", "alice");
    let (bob, mut pb) = peer("R1", "bob");
    hub.join(&alice).await.unwrap();
    hub.join(&bob).await.unwrap();

    let (tx, rx) = inbound();
    let task = tokio::spawn(session::run(Arc::clone(&hub), Arc::clone(&alice), rx, quick()));

    tx.send(Ok(Frame::Text(String::new()))).unwrap();
    tx.send(Ok(Frame::Text("{not json".into()))).unwrap();
    tx.send(text(json!({ "key": "   ", "value": 1 }))).unwrap();
    tx.send(Ok(Frame::Pong)).unwrap();
    tx.send(Ok(Frame::Binary(br#"{"key":"answer"}"#.to_vec()))).unwrap();

    let got = pb.next_envelope().await;
    assert_eq!(got["key"], "answer");

    let m = hub.metrics();
    assert_eq!(m.frames_dropped.get(&[("reason", "empty")]), 1);
    assert_eq!(m.frames_dropped.get(&[("reason", "malformed")]), 1);
    assert_eq!(m.frames_dropped.get(&[("reason", "no_key")]), 1);

    tx.send(Ok(Frame::Close)).unwrap();
    assert_eq!(finish(task).await, LoopExit::Closed);
}

#[tokio::test]
async fn read_error_triggers_cleanup_and_frees_the_slot() {
    let hub = Arc::new(Hub::default());
    let (alice, mut pa) = peer("R1", "alice");
    let (bob, mut pb) = peer("R1", "bob");
    let (carol, mut pc) = peer("R1", "carol");
    for c in [&alice, &bob, &carol] {
        hub.admit(c).await.unwrap();
    }
    pa.drain();
    pc.drain();

    let (tx, rx) = inbound();
    let task = tokio::spawn(session::run(Arc::clone(&hub), Arc::clone(&bob), rx, quick()));
    tx.send(Err(SignalError::Transport("connection reset".into()))).unwrap();
    assert_eq!(finish(task).await, LoopExit::ReadFailed);

    pb.wait_closed().await;
    for p in [&mut pa, &mut pc] {
        let left: Vec<_> = p.envelopes().into_iter().filter(|v| v["key"] == "peer_left").collect();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["sender_identity"], "bob");
    }

    let (bob_again, _p) = peer("R1", "bob");
    hub.join(&bob_again).await.unwrap();
    assert_eq!(hub.peers_in("R1").await, vec!["alice", "bob", "carol"]);
}

#[tokio::test]
async fn silent_peer_times_out() {
    let hub = Arc::new(Hub::default());
    let (alice, mut pa) = peer("R1", "alice");
    let (bob, _pb) = peer("R1", "bob");
    hub.join(&alice).await.unwrap();
    hub.join(&bob).await.unwrap();

    let cfg = SessionConfig {
        ping_every: Duration::from_millis(20),
        liveness_timeout: Duration::from_millis(150),
        max_payload_bytes: 1024,
    };
    let (_tx, rx) = inbound();
    let task = tokio::spawn(session::run(Arc::clone(&hub), Arc::clone(&bob), rx, cfg));

    assert_eq!(finish(task).await, LoopExit::TimedOut);
    let got = pa.next_envelope().await;
    assert_eq!(got["key"], "peer_left");
    assert!(!hub.peers_in("R1").await.contains(&"bob".to_string()));
}

#[tokio::test]
async fn pongs_keep_the_session_alive_and_pings_are_sent() {
    let hub = Arc::new(Hub::default());
    let (alice, mut pa) = peer("R1", "alice");
    hub.join(&alice).await.unwrap();

    let cfg = SessionConfig {
        ping_every: Duration::from_millis(30),
        liveness_timeout: Duration::from_millis(200),
        max_payload_bytes: 1024,
    };
    let (tx, rx) = inbound();
    let task = tokio::spawn(session::run(Arc::clone(&hub), Arc::clone(&alice), rx, cfg));

    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(Ok(Frame::Pong)).unwrap();
    }
    // 600ms elapsed, well past one liveness window
    assert!(!task.is_finished());
    assert!(hub.contains_room("R1").await);
    assert!(pa.drain().contains(&Sent::Ping));

    drop(tx);
    assert_eq!(finish(task).await, LoopExit::Closed);
    assert!(!hub.contains_room("R1").await);
}

#[tokio::test]
async fn failing_ping_ends_the_session() {
    let hub = Arc::new(Hub::default());
    let (alice, pa) = peer("R1", "alice");
    hub.join(&alice).await.unwrap();
    pa.break_pipe();

    let cfg = SessionConfig {
        ping_every: Duration::from_millis(20),
        liveness_timeout: Duration::from_secs(5),
        max_payload_bytes: 1024,
    };
    let (_tx, rx) = inbound();
    let task = tokio::spawn(session::run(Arc::clone(&hub), Arc::clone(&alice), rx, cfg));
    assert_eq!(finish(task).await, LoopExit::PingFailed);
    assert_eq!(hub.room_count().await, 0);
}

#[tokio::test]
async fn aborted_session_still_departs() {
    let hub = Arc::new(Hub::default());
    let (alice, mut pa) = peer("R1", "alice");
    let (bob, _pb) = peer("R1", "bob");
    hub.join(&alice).await.unwrap();
    hub.join(&bob).await.unwrap();

    let (_tx, rx) = inbound();
    let task = tokio::spawn(session::run(Arc::clone(&hub), Arc::clone(&bob), rx, quick()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    task.abort();

    let got = pa.next_envelope().await;
    assert_eq!(got["key"], "peer_left");
    assert_eq!(got["sender_identity"], "bob");
}
