// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

#[parameterized(
    empty = { &[], 0 },
    single_mutex = { &[1], 1 },
    mutex_queue = { &[1, 1, 1], 1 },
    semaphore_fills = { &[3, 3, 3], 3 },
    semaphore_overflow = { &[3, 3, 3, 3], 3 },
    stricter_later_request = { &[5, 5, 5, 5, 5, 2], 5 },
    stricter_request_early = { &[5, 2, 5], 2 },
    looser_request_behind_mutex = { &[1, 5], 1 },
    mixed = { &[4, 3, 2, 2], 2 },
)]
fn grant_prefix_length(capacities: &[u32], expected: usize) {
    assert_eq!(prefix_len(capacities.iter().copied()), expected);
}

#[test]
fn window_counts_rejected_entry() {
    let mut window = CapacityWindow::new();
    assert!(window.admits(2));
    assert!(window.admits(2));
    assert!(!window.admits(2));
    assert_eq!(window.seen(), 3);
}

proptest! {
    #[test]
    fn prefix_matches_running_minimum_definition(
        capacities in proptest::collection::vec(1u32..6, 0..12)
    ) {
        let len = prefix_len(capacities.iter().copied());

        // Every admitted position i satisfies i <= min(capacities[..i])
        for i in 1..=len {
            let min = capacities[..i].iter().copied().min().unwrap_or(u32::MAX);
            prop_assert!(i as u32 <= min);
        }

        // The first position past the prefix violates it
        if len < capacities.len() {
            let i = len + 1;
            let min = capacities[..i].iter().copied().min().unwrap_or(u32::MAX);
            prop_assert!(i as u32 > min);
        }
    }

    #[test]
    fn prefix_never_exceeds_head_capacity(
        capacities in proptest::collection::vec(1u32..6, 1..12)
    ) {
        let len = prefix_len(capacities.iter().copied());
        prop_assert!(len >= 1);
        prop_assert!(len <= capacities[0] as usize);
    }
}
