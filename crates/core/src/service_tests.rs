// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::config::CoordinatorConfig;
use crate::observer::RecordingObserver;
use std::sync::atomic::{AtomicUsize, Ordering};

type TestService = LockService<FakeClock, RecordingObserver>;

fn service() -> TestService {
    LockService::new(LockManager::with_parts(
        CoordinatorConfig::default(),
        FakeClock::new(),
        RecordingObserver::new(),
    ))
}

fn pid(id: &str) -> ProcessId {
    ProcessId::new(id)
}

#[tokio::test]
async fn concurrent_acquirers_take_turns() {
    let service = service();
    let holders = Arc::new(AtomicUsize::new(0));
    let mut tasks = Vec::new();

    for i in 0..4 {
        let service = service.clone();
        let holders = Arc::clone(&holders);
        tasks.push(tokio::spawn(async move {
            let process = pid(&format!("worker-{i}"));
            let entry = service.acquire(&process, "db", 1).await.unwrap().unwrap();

            assert_eq!(holders.fetch_add(1, Ordering::SeqCst), 0);
            tokio::task::yield_now().await;
            holders.fetch_sub(1, Ordering::SeqCst);

            service.release(entry).unwrap();
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }
    assert!(service.status().is_empty());
}

#[tokio::test]
async fn await_grant_wakes_on_release() {
    let service = service();
    let holder = service.request(&pid("a"), "db", 1, false).unwrap();
    let waiter = service.request(&pid("b"), "db", 1, false).unwrap();
    let entry = waiter.entry().unwrap();

    let pending = {
        let service = service.clone();
        tokio::spawn(async move { service.await_grant(entry).await })
    };
    tokio::task::yield_now().await;
    service.release(holder.entry().unwrap()).unwrap();

    assert_eq!(pending.await.unwrap(), Ok(Resolution::Granted));
}

#[tokio::test(start_paused = true)]
async fn timeout_releases_on_callers_behalf() {
    let service = service();
    service.request(&pid("a"), "db", 1, false).unwrap();
    let entry = service
        .request(&pid("b"), "db", 1, false)
        .unwrap()
        .entry()
        .unwrap();

    let outcome = service
        .await_grant_timeout(entry, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert_eq!(service.inspect(|m| m.queue_len("db")), 1);
    assert_eq!(service.inspect(|m| m.blocked_on(&pid("b")).map(str::to_owned)), None);
}

#[tokio::test(start_paused = true)]
async fn timeout_reports_grant_that_arrived_in_time() {
    let service = service();
    let holder = service
        .request(&pid("a"), "db", 1, false)
        .unwrap()
        .entry()
        .unwrap();
    let entry = service
        .request(&pid("b"), "db", 1, false)
        .unwrap()
        .entry()
        .unwrap();

    let releaser = {
        let service = service.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            service.release(holder).unwrap();
        })
    };

    let outcome = service
        .await_grant_timeout(entry, Duration::from_secs(5))
        .await
        .unwrap();
    releaser.await.unwrap();

    assert_eq!(outcome, WaitOutcome::Resolved(Resolution::Granted));
}

#[tokio::test]
async fn disconnect_withdraws_pending_acquire() {
    let service = service();
    service.request(&pid("a"), "db", 1, false).unwrap();

    let pending = {
        let service = service.clone();
        tokio::spawn(async move { service.acquire(&pid("b"), "db", 1).await })
    };
    while service.inspect(|m| m.queue_len("db")) < 2 {
        tokio::task::yield_now().await;
    }

    assert_eq!(service.disconnect(&pid("b")), 1);
    assert_eq!(pending.await.unwrap(), Ok(None));
}

#[tokio::test]
async fn await_unknown_entry_fails() {
    let service = service();
    assert_eq!(
        service.await_grant(EntryId(99)).await,
        Err(LockError::NoSuchEntry(EntryId(99)))
    );
}
