// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for talking to latchd
//!
//! A [`LockClient`] owns one connection and therefore one coordinated process.
//! Dropping it releases everything the process held.

use std::path::{Path, PathBuf};
use std::time::Duration;

use latch_core::{EntryId, ErrorKind, ProcessId, RequestOutcome, Resolution, WaitOutcome};
use thiserror::Error;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

use crate::protocol::{
    self, EntrySummary, ProtocolError, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Could not connect to daemon at {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected ({kind:?}): {message}")]
    Rejected { kind: ErrorKind, message: String },

    #[error("Unexpected response: {0:?}")]
    UnexpectedResponse(Box<Response>),
}

impl ClientError {
    /// Error kind reported by the daemon, if this was a rejection
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

fn unexpected(response: Response) -> ClientError {
    ClientError::UnexpectedResponse(Box::new(response))
}

pub struct LockClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    process: ProcessId,
    daemon_version: String,
    timeout: Duration,
}

impl LockClient {
    /// Connect and perform the `Hello` handshake
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|source| ClientError::Connect {
                path: socket_path.to_path_buf(),
                source,
            })?;
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            reader,
            writer,
            process: ProcessId::new(""),
            daemon_version: String::new(),
            timeout: DEFAULT_TIMEOUT,
        };

        match client
            .send(Request::Hello {
                version: PROTOCOL_VERSION.to_string(),
            })
            .await?
        {
            Response::Hello { version, process } => {
                client.process = process;
                client.daemon_version = version;
                Ok(client)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Deadline for each request/response exchange (except awaiting a grant)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Process id the daemon assigned to this connection
    pub fn process(&self) -> &ProcessId {
        &self.process
    }

    pub fn daemon_version(&self) -> &str {
        &self.daemon_version
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        match self.send(Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Queue a request; see [`LockManager::request_lock`](latch_core::LockManager::request_lock)
    pub async fn request(
        &mut self,
        lock: &str,
        capacity: u32,
        fail_fast: bool,
    ) -> Result<RequestOutcome, ClientError> {
        let request = Request::Acquire {
            lock: lock.to_string(),
            capacity,
            fail_fast,
        };
        match self.send(request).await? {
            Response::Requested {
                entry,
                granted: true,
            } => Ok(RequestOutcome::Granted(entry)),
            Response::Requested {
                entry,
                granted: false,
            } => Ok(RequestOutcome::Queued(entry)),
            Response::WouldBlock => Ok(RequestOutcome::WouldBlock),
            other => Err(unexpected(other)),
        }
    }

    /// Block until the entry is granted, withdrawn or timed out by the daemon
    pub async fn await_grant(&mut self, entry: EntryId) -> Result<WaitOutcome, ClientError> {
        match self.exchange(Request::Await { entry }, None).await? {
            Response::Resolved {
                timed_out: true, ..
            } => Ok(WaitOutcome::TimedOut),
            Response::Resolved { granted: true, .. } => {
                Ok(WaitOutcome::Resolved(Resolution::Granted))
            }
            Response::Resolved { granted: false, .. } => {
                Ok(WaitOutcome::Resolved(Resolution::Withdrawn))
            }
            other => Err(unexpected(other)),
        }
    }

    /// Request and wait in one call. `None` if the entry was never granted.
    pub async fn acquire(
        &mut self,
        lock: &str,
        capacity: u32,
    ) -> Result<Option<EntryId>, ClientError> {
        match self.request(lock, capacity, false).await? {
            RequestOutcome::Granted(entry) => Ok(Some(entry)),
            RequestOutcome::Queued(entry) => match self.await_grant(entry).await? {
                WaitOutcome::Resolved(Resolution::Granted) => Ok(Some(entry)),
                _ => Ok(None),
            },
            RequestOutcome::WouldBlock => Ok(None),
        }
    }

    pub async fn release(&mut self, entry: EntryId) -> Result<(), ClientError> {
        match self.send(Request::Release { entry }).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn status(&mut self) -> Result<Vec<EntrySummary>, ClientError> {
        match self.send(Request::Status).await? {
            Response::Status { entries, .. } => Ok(entries),
            other => Err(unexpected(other)),
        }
    }

    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn send(&mut self, request: Request) -> Result<Response, ClientError> {
        let timeout = self.timeout;
        self.exchange(request, Some(timeout)).await
    }

    /// Write a request and read its response. `read_timeout: None` waits forever.
    async fn exchange(
        &mut self,
        request: Request,
        read_timeout: Option<Duration>,
    ) -> Result<Response, ClientError> {
        let data = protocol::encode(&request)?;
        tokio::time::timeout(self.timeout, protocol::write_message(&mut self.writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let read = protocol::read_message(&mut self.reader);
        let bytes = match read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, read)
                .await
                .map_err(|_| ProtocolError::Timeout)??,
            None => read.await?,
        };

        match protocol::decode(&bytes)? {
            Response::Error { kind, message } => Err(ClientError::Rejected { kind, message }),
            response => Ok(response),
        }
    }
}
