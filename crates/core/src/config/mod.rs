// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration

use serde::{Deserialize, Serialize};

/// Tunables for a [`LockManager`](crate::LockManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Run deadlock detection whenever a request has to wait.
    ///
    /// When disabled, blocking requests are queued unconditionally.
    pub detect_deadlocks: bool,
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self {
            detect_deadlocks: true,
        }
    }

    pub fn with_deadlock_detection(mut self, enabled: bool) -> Self {
        self.detect_deadlocks = enabled;
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new()
    }
}
