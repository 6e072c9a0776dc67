// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running-minimum capacity window
//!
//! Walking a queue front to back, the entry at position `i` may hold the lock
//! only if `i` does not exceed the smallest capacity requested at or before it.
//! The running minimum never increases, so the admitted entries always form a
//! contiguous prefix and the walk can stop at the first rejection.

/// One left-to-right pass over a queue's requested capacities
#[derive(Debug, Clone, Copy)]
pub struct CapacityWindow {
    seen: usize,
    running_cap: u32,
}

impl CapacityWindow {
    pub fn new() -> Self {
        Self {
            seen: 0,
            running_cap: u32::MAX,
        }
    }

    /// Count the next entry; returns whether it falls inside the window
    pub fn admits(&mut self, capacity: u32) -> bool {
        self.seen += 1;
        self.running_cap = self.running_cap.min(capacity);
        self.seen <= self.running_cap as usize
    }

    /// Entries counted so far
    pub fn seen(&self) -> usize {
        self.seen
    }
}

impl Default for CapacityWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Length of the grant prefix for a queue of requested capacities
pub fn prefix_len(capacities: impl IntoIterator<Item = u32>) -> usize {
    let mut window = CapacityWindow::new();
    let mut len = 0;
    for capacity in capacities {
        if !window.admits(capacity) {
            break;
        }
        len += 1;
    }
    len
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
