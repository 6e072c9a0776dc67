// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.
//!
//! Each accepted connection becomes one coordinated process. Requests are read
//! on a separate task so that a connection suspended in `Await` still notices
//! when its peer goes away, and is torn down (all its entries released or
//! withdrawn) when it does.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use latch_core::{
    Clock, EntryId, ErrorKind, LockError, LockService, ProcessId, RequestOutcome, WaitOutcome,
};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn, Instrument};

use crate::lifecycle::{DaemonState, LifecycleError};
use crate::protocol::{
    self, EntrySummary, ProtocolError, Request, Response, PROTOCOL_VERSION,
};

/// Requests buffered per connection ahead of the handler
const REQUEST_BACKLOG: usize = 8;

/// What every connection handler shares
#[derive(Clone)]
pub struct ServerContext {
    pub service: LockService,
    pub shutdown: Arc<Notify>,
    pub start_time: Instant,
    pub io_timeout: Duration,
    pub grant_timeout: Option<Duration>,
}

impl ServerContext {
    pub fn new(daemon: &DaemonState) -> Self {
        Self {
            service: daemon.service.clone(),
            shutdown: Arc::clone(&daemon.shutdown),
            start_time: daemon.start_time,
            io_timeout: daemon.config.io_timeout,
            grant_timeout: daemon.config.grant_timeout,
        }
    }
}

/// Accept connections until `stop` resolves or a client requests shutdown
pub async fn serve(
    mut daemon: DaemonState,
    stop: impl Future<Output = ()>,
) -> Result<(), LifecycleError> {
    let ctx = ServerContext::new(&daemon);
    let shutdown = Arc::clone(&daemon.shutdown);
    let mut stop = std::pin::pin!(stop);

    loop {
        tokio::select! {
            result = daemon.listener.accept() => match result {
                Ok((stream, _)) => {
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(ctx, stream).await {
                            warn!("Error handling connection: {}", e);
                        }
                    });
                }
                Err(e) => error!("Error accepting connection: {}", e),
            },

            _ = shutdown.notified() => {
                info!("Shutdown requested via IPC, shutting down...");
                break;
            }

            _ = &mut stop => break,
        }
    }

    daemon.shutdown()
}

/// Serve one client until it disconnects, then tear its process down
pub async fn handle_connection(ctx: ServerContext, stream: UnixStream) -> Result<(), ServerError> {
    let process = ProcessId::generate();
    let span = tracing::info_span!("connection", %process);
    let (reader, writer) = stream.into_split();
    let (tx, requests) = mpsc::channel(REQUEST_BACKLOG);
    let reader_task = tokio::spawn(read_requests(reader, tx));

    let mut connection = Connection {
        ctx,
        process,
        writer,
        requests,
    };
    let result = connection.run().instrument(span.clone()).await;
    reader_task.abort();

    let released = connection.ctx.service.disconnect(&connection.process);
    span.in_scope(|| debug!(released, "connection closed"));
    result
}

/// Forward decoded requests until the peer closes or the stream breaks
async fn read_requests(
    mut reader: OwnedReadHalf,
    tx: mpsc::Sender<Result<Request, ProtocolError>>,
) {
    loop {
        let message = protocol::read_request(&mut reader).await;
        let fatal = match &message {
            Ok(_) | Err(ProtocolError::Json(_)) => false,
            Err(ProtocolError::ConnectionClosed) => break,
            Err(_) => true,
        };
        if tx.send(message).await.is_err() || fatal {
            break;
        }
    }
}

struct Connection {
    ctx: ServerContext,
    process: ProcessId,
    writer: OwnedWriteHalf,
    requests: mpsc::Receiver<Result<Request, ProtocolError>>,
}

impl Connection {
    async fn run(&mut self) -> Result<(), ServerError> {
        while let Some(message) = self.requests.recv().await {
            let request = match message {
                Ok(request) => request,
                Err(e) => {
                    self.reject(e).await?;
                    continue;
                }
            };

            debug!("Received request: {:?}", request);
            let Some(response) = self.dispatch(request).await? else {
                // Peer left while awaiting
                return Ok(());
            };
            debug!("Sending response: {:?}", response);
            self.respond(&response).await?;
        }
        Ok(())
    }

    /// `None` means the connection closed before a response was due
    async fn dispatch(&mut self, request: Request) -> Result<Option<Response>, ServerError> {
        let response = match request {
            Request::Hello { version } => {
                if version != PROTOCOL_VERSION {
                    warn!(client = %version, daemon = PROTOCOL_VERSION, "protocol version mismatch");
                }
                Response::Hello {
                    version: PROTOCOL_VERSION.to_string(),
                    process: self.process.clone(),
                }
            }

            Request::Ping => Response::Pong,

            Request::Acquire {
                lock,
                capacity,
                fail_fast,
            } => match self
                .ctx
                .service
                .request(&self.process, &lock, capacity, fail_fast)
            {
                Ok(RequestOutcome::Granted(entry)) => Response::Requested {
                    entry,
                    granted: true,
                },
                Ok(RequestOutcome::Queued(entry)) => Response::Requested {
                    entry,
                    granted: false,
                },
                Ok(RequestOutcome::WouldBlock) => Response::WouldBlock,
                Err(e) => e.into(),
            },

            Request::Await { entry } => return self.await_entry(entry).await,

            Request::Release { entry } => {
                if !self.owns(entry) {
                    return Ok(Some(LockError::NoSuchEntry(entry).into()));
                }
                match self.ctx.service.release(entry) {
                    Ok(()) => Response::Ok,
                    Err(e) => e.into(),
                }
            }

            Request::Status => {
                let (records, now) = self
                    .ctx
                    .service
                    .inspect(|manager| (manager.status(), manager.clock().now()));
                Response::Status {
                    uptime_secs: self.ctx.start_time.elapsed().as_secs(),
                    entries: records
                        .into_iter()
                        .map(|record| EntrySummary::from_record(record, now))
                        .collect(),
                }
            }

            Request::Shutdown => {
                self.ctx.shutdown.notify_one();
                Response::ShuttingDown
            }
        };
        Ok(Some(response))
    }

    /// Suspend until `entry` resolves, answering any other request with
    /// `AwaitInFlight`. Returns `None` if the peer disconnects first.
    async fn await_entry(&mut self, entry: EntryId) -> Result<Option<Response>, ServerError> {
        if !self.owns(entry) {
            return Ok(Some(LockError::NoSuchEntry(entry).into()));
        }

        let service = self.ctx.service.clone();
        let grant_timeout = self.ctx.grant_timeout;
        let mut wait = std::pin::pin!(async move {
            match grant_timeout {
                Some(timeout) => service.await_grant_timeout(entry, timeout).await,
                None => service.await_grant(entry).await.map(WaitOutcome::Resolved),
            }
        });

        loop {
            tokio::select! {
                outcome = &mut wait => {
                    let response = match outcome {
                        Ok(WaitOutcome::Resolved(resolution)) => Response::Resolved {
                            entry,
                            granted: resolution.is_granted(),
                            timed_out: false,
                        },
                        Ok(WaitOutcome::TimedOut) => Response::Resolved {
                            entry,
                            granted: false,
                            timed_out: true,
                        },
                        Err(e) => e.into(),
                    };
                    return Ok(Some(response));
                }

                message = self.requests.recv() => match message {
                    None => return Ok(None),
                    Some(Ok(request)) => {
                        debug!(%entry, "request while awaiting: {:?}", request);
                        let busy = Response::error(
                            ErrorKind::AwaitInFlight,
                            format!("still awaiting {entry}"),
                        );
                        self.respond(&busy).await?;
                    }
                    Some(Err(e)) => self.reject(e).await?,
                },
            }
        }
    }

    fn owns(&self, entry: EntryId) -> bool {
        self.ctx
            .service
            .inspect(|manager| manager.entries_of(&self.process).contains(&entry))
    }

    /// Report an undecodable frame. Framing errors end the connection.
    async fn reject(&mut self, err: ProtocolError) -> Result<(), ServerError> {
        warn!("Failed to read request: {}", err);
        let response = Response::error(ErrorKind::Protocol, err.to_string());
        let sent = self.respond(&response).await;
        if !matches!(err, ProtocolError::Json(_)) {
            return Err(err.into());
        }
        sent
    }

    async fn respond(&mut self, response: &Response) -> Result<(), ServerError> {
        protocol::write_response(&mut self.writer, response, self.ctx.io_timeout)
            .await
            .map_err(ServerError::Protocol)
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}
