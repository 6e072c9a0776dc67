// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn process() -> ProcessId {
    ProcessId::new("p1")
}

#[parameterized(
    queued = { LockEvent::Queued { lock: "db".into(), process: process(), entry: EntryId(1), capacity: 1, position: 2 }, "lock:queued" },
    acquired = { LockEvent::Acquired { lock: "db".into(), process: process(), entry: EntryId(1), capacity: 1, waited: Duration::ZERO }, "lock:acquired" },
    denied = { LockEvent::Denied { lock: "db".into(), process: process(), capacity: 1 }, "lock:denied" },
    withdrawn = { LockEvent::Withdrawn { lock: "db".into(), process: process(), entry: EntryId(1) }, "lock:withdrawn" },
    deadlock = { LockEvent::DeadlockDetected { lock: "db".into(), process: process(), strategy: DetectionStrategy::Chain }, "deadlock:detected" },
    disconnected = { LockEvent::ProcessDisconnected { process: process(), released: 3 }, "process:disconnected" },
)]
fn event_names(event: LockEvent, expected: &str) {
    assert_eq!(event.name(), expected);
}

#[test]
fn lock_accessor_skips_process_events() {
    let event = LockEvent::ProcessDisconnected {
        process: process(),
        released: 0,
    };
    assert_eq!(event.lock(), None);

    let event = LockEvent::Denied {
        lock: "cache".into(),
        process: process(),
        capacity: 2,
    };
    assert_eq!(event.lock(), Some("cache"));
}

#[test]
fn strategy_display() {
    assert_eq!(DetectionStrategy::Chain.to_string(), "chain");
    assert_eq!(DetectionStrategy::Reduction.to_string(), "reduction");
}
