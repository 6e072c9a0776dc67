// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between latchd and its clients.
//!
//! Every message is a 4-byte big-endian length prefix followed by a JSON body.
//! One connection is one coordinated process: the daemon assigns the process id
//! on `Hello` and tears the process down when the connection closes.

use latch_core::{EntryId, ErrorKind, LockError, ProcessId, StatusRecord};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Bumped whenever a request or response changes shape
pub const PROTOCOL_VERSION: &str = "1";

/// Upper bound on a single frame body
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Default deadline for request/response I/O
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client → daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Hello {
        version: String,
    },
    Ping,
    Acquire {
        lock: String,
        capacity: u32,
        #[serde(default)]
        fail_fast: bool,
    },
    /// Block until the entry resolves; no other request may be sent meanwhile
    Await {
        entry: EntryId,
    },
    Release {
        entry: EntryId,
    },
    Status,
    Shutdown,
}

/// Daemon → client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Hello {
        version: String,
        process: ProcessId,
    },
    Pong,
    Requested {
        entry: EntryId,
        granted: bool,
    },
    WouldBlock,
    Resolved {
        entry: EntryId,
        granted: bool,
        #[serde(default)]
        timed_out: bool,
    },
    Ok,
    Status {
        uptime_secs: u64,
        entries: Vec<EntrySummary>,
    },
    ShuttingDown,
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Response {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error {
            kind,
            message: message.into(),
        }
    }
}

impl From<LockError> for Response {
    fn from(err: LockError) -> Self {
        Response::error(err.kind(), err.to_string())
    }
}

/// Serializable view of a [`StatusRecord`]; instants become ages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub lock: String,
    pub entry: EntryId,
    pub process: ProcessId,
    pub capacity: u32,
    pub lock_position: usize,
    pub process_position: usize,
    pub waiting: bool,
    /// Time since the entry was queued
    pub age_ms: u64,
    /// Time since the entry was granted, if it has been
    pub held_ms: Option<u64>,
}

impl EntrySummary {
    pub fn from_record(record: StatusRecord, now: Instant) -> Self {
        let millis = |since: Instant| now.saturating_duration_since(since).as_millis() as u64;
        Self {
            age_ms: millis(record.waiting_since),
            held_ms: record.granted_at.map(millis),
            lock: record.lock,
            entry: record.entry,
            process: record.process,
            capacity: record.capacity,
            lock_position: record.lock_position,
            process_position: record.process_position,
            waiting: record.waiting,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,
}

/// Serialize to a JSON body (no length prefix)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read one length-prefixed frame
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write one length-prefixed frame
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and decode a request. No deadline: connections idle while holding locks.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request, ProtocolError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
