//! Integration tests for the evaluate round-trip over an in-memory stream.
//!
//! A duplex pipe plays the remote host. Covers the single-slot discipline
//! under sequential use, inline-output routing, stream-closure semantics,
//! and the fatal malformed-payload path.

use tokio::io::{split, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::Duration;

use repl_uplink::models::eval::{EvalStatus, TRANSPORT_CLOSED_MESSAGE};
use repl_uplink::session::Connection;
use repl_uplink::AppError;

use super::test_helpers::{read_script, success};

// ── Sequential ordering ──────────────────────────────────────────────────────

/// N sequential scripts yield exactly N responses, in submission order.
#[tokio::test]
async fn sequential_evaluations_respond_in_submission_order() {
    let (client, server) = tokio::io::duplex(4096);
    let (inline_tx, _inline_rx) = mpsc::channel(8);
    let mut conn = Connection::from_stream(client, inline_tx);

    let host = tokio::spawn(async move {
        let (mut read, mut write) = split(server);
        let mut round = 0;
        while let Some(script) = read_script(&mut read).await {
            assert_eq!(script, format!("script {round}"));
            write
                .write_all(&success(&format!("result {round}")))
                .await
                .expect("host write");
            round += 1;
        }
        round
    });

    for round in 0..3 {
        let response = conn
            .evaluate(&format!("script {round}"))
            .await
            .expect("evaluate must succeed");
        assert!(response.is_success());
        assert_eq!(response.value, format!("result {round}"));
    }

    conn.close().await.expect("close");
    assert_eq!(host.await.expect("host task"), 3);
}

// ── Inline output ────────────────────────────────────────────────────────────

/// Inline output emitted between request and response reaches the output
/// sink and is absent from the response value.
#[tokio::test]
async fn inline_output_reaches_the_sink_not_the_response() {
    let (client, server) = tokio::io::duplex(4096);
    let (inline_tx, mut inline_rx) = mpsc::channel(8);
    let mut conn = Connection::from_stream(client, inline_tx);

    let host = tokio::spawn(async move {
        let (mut read, mut write) = split(server);
        read_script(&mut read).await.expect("script must arrive");
        write
            .write_all(b"printed output\n\x01")
            .await
            .expect("host inline write");
        write.write_all(&success("nil")).await.expect("host write");
        // Hold the stream open until the client closes.
        read_script(&mut read).await;
    });

    let response = conn.evaluate("print something").await.expect("evaluate");
    assert!(response.is_success());
    assert_eq!(response.value, "nil", "inline text must not leak into the value");

    let inline = inline_rx.recv().await.expect("inline text must be delivered");
    assert_eq!(inline, "printed output\n");

    conn.close().await.expect("close");
    host.await.expect("host task");
}

// ── Stream closure ───────────────────────────────────────────────────────────

/// Closing the transport with a call outstanding yields exactly one
/// transport-error response, and the reader task terminates.
#[tokio::test]
async fn remote_close_with_outstanding_call_yields_one_transport_error() {
    let (client, server) = tokio::io::duplex(4096);
    let (inline_tx, _inline_rx) = mpsc::channel(8);
    let mut conn = Connection::from_stream(client, inline_tx);

    let host = tokio::spawn(async move {
        let (mut read, write) = split(server);
        read_script(&mut read).await.expect("script must arrive");
        // Drop both halves without replying — the client observes EOF.
        drop(read);
        drop(write);
    });

    let response = conn
        .evaluate("while(true){}")
        .await
        .expect("closure must synthesize a response, not an Err");
    assert_eq!(response.status, EvalStatus::Error);
    assert_eq!(response.value, TRANSPORT_CLOSED_MESSAGE);

    host.await.expect("host task");
    // close() joins the reader task; returning proves it terminated.
    conn.close().await.expect("reader must have terminated");
}

/// A late response arriving with no pending call is dropped, never held
/// for the next evaluation.
#[tokio::test]
async fn unsolicited_response_is_dropped() {
    let (client, server) = tokio::io::duplex(4096);
    let (inline_tx, _inline_rx) = mpsc::channel(8);
    let mut conn = Connection::from_stream(client, inline_tx);

    let host = tokio::spawn(async move {
        let (mut read, mut write) = split(server);
        // Nothing was asked — this response has no pending call.
        write
            .write_all(&success("stale"))
            .await
            .expect("host write");
        read_script(&mut read).await.expect("script must arrive");
        write.write_all(&success("fresh")).await.expect("host write");
        read_script(&mut read).await;
    });

    // Give the reader time to drain the unsolicited response first.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = conn.evaluate("1").await.expect("evaluate");
    assert_eq!(
        response.value, "fresh",
        "the stale response must not satisfy a later call"
    );

    conn.close().await.expect("close");
    host.await.expect("host task");
}

/// Once the stream has closed, every later call reports the same
/// transport-error response immediately — the protocol never retries.
#[tokio::test]
async fn calls_after_closure_keep_reporting_transport_error() {
    let (client, server) = tokio::io::duplex(4096);
    let (inline_tx, _inline_rx) = mpsc::channel(8);
    let mut conn = Connection::from_stream(client, inline_tx);

    let host = tokio::spawn(async move {
        let (mut read, write) = split(server);
        read_script(&mut read).await.expect("script must arrive");
        drop(read);
        drop(write);
    });

    let first = conn.evaluate("1").await.expect("first call");
    assert_eq!(first.status, EvalStatus::Error);
    host.await.expect("host task");

    let second = conn.evaluate("2").await.expect("second call");
    assert_eq!(second.status, EvalStatus::Error);
    assert_eq!(second.value, TRANSPORT_CLOSED_MESSAGE);

    conn.close().await.expect("close");
}

// ── Failure paths ────────────────────────────────────────────────────────────

/// A response payload that is not the structured record fails the call
/// hard — no synthesized response, no retry.
#[tokio::test]
async fn malformed_payload_fails_the_call() {
    let (client, server) = tokio::io::duplex(4096);
    let (inline_tx, _inline_rx) = mpsc::channel(8);
    let mut conn = Connection::from_stream(client, inline_tx);

    let host = tokio::spawn(async move {
        let (mut read, mut write) = split(server);
        read_script(&mut read).await.expect("script must arrive");
        write
            .write_all(b"this is not a record\x00")
            .await
            .expect("host write");
        read_script(&mut read).await;
    });

    let result = conn.evaluate("1").await;
    assert!(
        matches!(result, Err(AppError::Protocol(_))),
        "malformed payload must be fatal to the call, got: {result:?}"
    );

    conn.close().await.expect("close");
    host.await.expect("host task");
}

/// A script containing a reserved control byte is rejected before anything
/// is written, and the connection stays usable.
#[tokio::test]
async fn control_byte_in_script_is_rejected_and_session_survives() {
    let (client, server) = tokio::io::duplex(4096);
    let (inline_tx, _inline_rx) = mpsc::channel(8);
    let mut conn = Connection::from_stream(client, inline_tx);

    let host = tokio::spawn(async move {
        let (mut read, mut write) = split(server);
        // Only the valid follow-up script ever reaches the host.
        let script = read_script(&mut read).await.expect("script must arrive");
        assert_eq!(script, "2");
        write.write_all(&success("2")).await.expect("host write");
        read_script(&mut read).await;
    });

    let result = conn.evaluate("bad\u{0}script").await;
    assert!(matches!(result, Err(AppError::Protocol(_))));

    let response = conn.evaluate("2").await.expect("follow-up evaluate");
    assert!(response.is_success());

    conn.close().await.expect("close");
    host.await.expect("host task");
}
