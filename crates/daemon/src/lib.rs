// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! latch-daemon: the lock coordinator served over a Unix socket
//!
//! One connection is one coordinated process. Closing the connection releases
//! everything the process held and withdraws anything it was waiting for.

pub mod client;
pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use client::{ClientError, LockClient};
pub use config::{ConfigError, DaemonConfig};
pub use lifecycle::{DaemonState, LifecycleError};
pub use protocol::{EntrySummary, ProtocolError, Request, Response, PROTOCOL_VERSION};
pub use server::{ServerContext, ServerError};
