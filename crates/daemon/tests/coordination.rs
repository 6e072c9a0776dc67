// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

//! End-to-end tests against an in-process daemon on a temporary socket.

use latch_core::{EntryId, ErrorKind, RequestOutcome, Resolution, WaitOutcome};
use latch_daemon::lifecycle::{self, LifecycleError};
use latch_daemon::protocol::{self, Request, Response};
use latch_daemon::{server, DaemonConfig, LockClient};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

struct TestDaemon {
    _dir: TempDir,
    socket: PathBuf,
    handle: JoinHandle<Result<(), LifecycleError>>,
}

impl TestDaemon {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(configure: impl FnOnce(&mut DaemonConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DaemonConfig::in_dir(dir.path());
        configure(&mut config);
        let daemon = lifecycle::startup(&config).await.unwrap();
        let handle = tokio::spawn(server::serve(daemon, std::future::pending()));
        Self {
            socket: config.socket_path,
            _dir: dir,
            handle,
        }
    }

    async fn client(&self) -> LockClient {
        LockClient::connect(&self.socket).await.unwrap()
    }

    async fn raw(&self) -> UnixStream {
        UnixStream::connect(&self.socket).await.unwrap()
    }
}

async fn send_raw(stream: &mut UnixStream, request: &Request) {
    let data = protocol::encode(request).unwrap();
    protocol::write_message(stream, &data).await.unwrap();
}

async fn recv_raw(stream: &mut UnixStream) -> Response {
    let bytes = protocol::read_message(stream).await.unwrap();
    protocol::decode(&bytes).unwrap()
}

/// Poll the daemon until it reports `expected` live entries
async fn wait_for_entries(client: &mut LockClient, expected: usize) {
    for _ in 0..100 {
        if client.status().await.unwrap().len() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("daemon never reached {expected} entries");
}

fn spawn_await(
    mut client: LockClient,
    entry: EntryId,
) -> JoinHandle<(LockClient, WaitOutcome)> {
    tokio::spawn(async move {
        let outcome = client.await_grant(entry).await.unwrap();
        (client, outcome)
    })
}

// =============================================================================
// Handshake
// =============================================================================

#[tokio::test]
async fn hello_assigns_distinct_processes() {
    let daemon = TestDaemon::start().await;

    let mut a = daemon.client().await;
    let b = daemon.client().await;

    assert_eq!(a.daemon_version(), latch_daemon::PROTOCOL_VERSION);
    assert!(!a.process().as_str().is_empty());
    assert_ne!(a.process(), b.process());
    a.ping().await.unwrap();
}

// =============================================================================
// Granting
// =============================================================================

#[tokio::test]
async fn mutex_hands_over_in_fifo_order() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;
    let mut b = daemon.client().await;

    let held = a.acquire("db", 1).await.unwrap().unwrap();
    let RequestOutcome::Queued(waiting) = b.request("db", 1, false).await.unwrap() else {
        panic!("second mutex request should queue");
    };
    let waiter = spawn_await(b, waiting);

    a.release(held).await.unwrap();

    let (_b, outcome) = waiter.await.unwrap();
    assert_eq!(outcome, WaitOutcome::Resolved(Resolution::Granted));
}

#[tokio::test]
async fn semaphore_admits_up_to_capacity() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;
    let mut b = daemon.client().await;
    let mut c = daemon.client().await;

    assert!(a.request("pool", 2, false).await.unwrap().is_granted());
    assert!(b.request("pool", 2, false).await.unwrap().is_granted());
    assert!(matches!(
        c.request("pool", 2, false).await.unwrap(),
        RequestOutcome::Queued(_)
    ));

    let status = a.status().await.unwrap();
    assert_eq!(status.len(), 3);
    assert_eq!(
        status.iter().map(|s| s.waiting).collect::<Vec<_>>(),
        vec![false, false, true]
    );
    assert_eq!(
        status.iter().map(|s| s.lock_position).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn fail_fast_reports_would_block_and_leaves_no_entry() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;
    let mut b = daemon.client().await;

    a.acquire("db", 1).await.unwrap().unwrap();

    assert_eq!(
        b.request("db", 1, true).await.unwrap(),
        RequestOutcome::WouldBlock
    );
    assert_eq!(a.status().await.unwrap().len(), 1);
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn cross_connection_deadlock_is_rejected() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;
    let mut b = daemon.client().await;

    a.acquire("x", 1).await.unwrap().unwrap();
    b.acquire("y", 1).await.unwrap().unwrap();
    assert!(matches!(
        a.request("y", 1, false).await.unwrap(),
        RequestOutcome::Queued(_)
    ));

    let err = b.request("x", 1, false).await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Deadlock));
    // The rejected request was rolled back
    assert_eq!(a.status().await.unwrap().len(), 3);
}

#[tokio::test]
async fn zero_capacity_is_rejected() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;

    let err = a.request("db", 0, false).await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::InvalidCapacity));
}

#[tokio::test]
async fn second_wait_from_one_process_is_rejected() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;
    let mut b = daemon.client().await;

    a.acquire("x", 1).await.unwrap().unwrap();
    a.acquire("y", 1).await.unwrap().unwrap();
    b.request("x", 1, false).await.unwrap();

    let err = b.request("y", 1, false).await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::AlreadyWaiting));
}

#[tokio::test]
async fn entries_of_other_connections_are_invisible() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;
    let mut b = daemon.client().await;

    let held = a.acquire("db", 1).await.unwrap().unwrap();

    assert_eq!(
        b.release(held).await.unwrap_err().kind(),
        Some(ErrorKind::NoSuchEntry)
    );
    assert_eq!(
        b.await_grant(held).await.unwrap_err().kind(),
        Some(ErrorKind::NoSuchEntry)
    );
    a.release(held).await.unwrap();
}

// =============================================================================
// Awaiting
// =============================================================================

#[tokio::test]
async fn requests_during_await_get_await_in_flight() {
    let daemon = TestDaemon::start().await;
    let mut holder = daemon.client().await;
    let held = holder.acquire("db", 1).await.unwrap().unwrap();

    let mut raw = daemon.raw().await;
    send_raw(
        &mut raw,
        &Request::Acquire {
            lock: "db".to_string(),
            capacity: 1,
            fail_fast: false,
        },
    )
    .await;
    let Response::Requested {
        entry,
        granted: false,
    } = recv_raw(&mut raw).await
    else {
        panic!("expected a queued entry");
    };

    send_raw(&mut raw, &Request::Await { entry }).await;
    send_raw(&mut raw, &Request::Ping).await;
    match recv_raw(&mut raw).await {
        Response::Error { kind, .. } => assert_eq!(kind, ErrorKind::AwaitInFlight),
        other => panic!("expected AwaitInFlight, got {other:?}"),
    }

    holder.release(held).await.unwrap();

    assert_eq!(
        recv_raw(&mut raw).await,
        Response::Resolved {
            entry,
            granted: true,
            timed_out: false,
        }
    );
}

#[tokio::test]
async fn grant_timeout_releases_the_waiting_entry() {
    let daemon =
        TestDaemon::start_with(|c| c.grant_timeout = Some(Duration::from_millis(50))).await;
    let mut a = daemon.client().await;
    let mut b = daemon.client().await;

    a.acquire("db", 1).await.unwrap().unwrap();
    let entry = b.request("db", 1, false).await.unwrap().entry().unwrap();

    assert_eq!(b.await_grant(entry).await.unwrap(), WaitOutcome::TimedOut);
    assert_eq!(a.status().await.unwrap().len(), 1);
}

#[tokio::test]
async fn awaiting_a_granted_entry_returns_at_once() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;

    let entry = a.acquire("db", 1).await.unwrap().unwrap();

    assert_eq!(
        a.await_grant(entry).await.unwrap(),
        WaitOutcome::Resolved(Resolution::Granted)
    );
}

// =============================================================================
// Disconnects
// =============================================================================

#[tokio::test]
async fn dropping_a_holder_hands_the_lock_on() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;
    let mut b = daemon.client().await;

    a.acquire("db", 1).await.unwrap().unwrap();
    let entry = b.request("db", 1, false).await.unwrap().entry().unwrap();
    let waiter = spawn_await(b, entry);

    drop(a);

    let (_b, outcome) = waiter.await.unwrap();
    assert_eq!(outcome, WaitOutcome::Resolved(Resolution::Granted));
}

#[tokio::test]
async fn dropping_a_waiter_withdraws_its_entry() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;
    let mut b = daemon.client().await;

    a.acquire("db", 1).await.unwrap().unwrap();
    b.request("db", 1, false).await.unwrap();
    wait_for_entries(&mut a, 2).await;

    drop(b);

    wait_for_entries(&mut a, 1).await;
}

// =============================================================================
// Protocol errors and shutdown
// =============================================================================

#[tokio::test]
async fn malformed_request_keeps_connection_usable() {
    let daemon = TestDaemon::start().await;
    let mut raw = daemon.raw().await;

    protocol::write_message(&mut raw, b"{\"type\":\"Nope\"}")
        .await
        .unwrap();
    match recv_raw(&mut raw).await {
        Response::Error { kind, .. } => assert_eq!(kind, ErrorKind::Protocol),
        other => panic!("expected protocol error, got {other:?}"),
    }

    send_raw(&mut raw, &Request::Ping).await;
    assert_eq!(recv_raw(&mut raw).await, Response::Pong);
}

#[tokio::test]
async fn oversized_frame_closes_connection() {
    let daemon = TestDaemon::start().await;
    let mut raw = daemon.raw().await;

    raw.write_all(&u32::MAX.to_be_bytes()).await.unwrap();

    match recv_raw(&mut raw).await {
        Response::Error { kind, .. } => assert_eq!(kind, ErrorKind::Protocol),
        other => panic!("expected protocol error, got {other:?}"),
    }
    let closed = protocol::read_message(&mut raw).await;
    assert!(matches!(
        closed,
        Err(protocol::ProtocolError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn shutdown_request_stops_the_server() {
    let daemon = TestDaemon::start().await;
    let mut a = daemon.client().await;

    a.shutdown().await.unwrap();

    daemon.handle.await.unwrap().unwrap();
    assert!(!daemon.socket.exists());
}
