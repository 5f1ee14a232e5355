// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task: accepts connections and dispatches requests (§4.2 "RPC
//! dispatcher", §5).
//!
//! Unlike a request-per-connection transport, a session here spans the
//! whole lifetime of its connection (§3 "Session"): the connection task
//! loops, reading one request and writing one reply at a time, while
//! also racing the notification-bus channel so an asynchronously posted
//! event can be interleaved onto the wire between request/reply pairs
//! (§4.5, §6 "Notification events").

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ncfd_core::{DatastoreName, Operation, PeerIdentity, SessionId};
use ncfd_engine::{ConfirmedCommitRequest, Engine, EngineError};
use ncfd_wire::{self as wire, ProtocolError, Request, Response};

use crate::env::{ipc_timeout, PROTOCOL_VERSION};
use crate::notify::NotificationBus;
use crate::session::{SessionRegistry, Transport};

/// Shared context every connection's dispatch loop reads and writes
/// through (§5 "the single lock the dispatcher serializes every request
/// through").
pub struct ListenCtx {
    pub engine: Arc<tokio::sync::Mutex<Engine>>,
    pub sessions: Arc<Mutex<SessionRegistry>>,
    pub notify_bus: Arc<NotificationBus>,
    pub auth_token: Option<String>,
    pub start_time: Instant,
}

pub struct Listener {
    unix: UnixListener,
    tcp: Option<TcpListener>,
    ctx: Arc<ListenCtx>,
}

#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, tcp: None, ctx }
    }

    pub fn with_tcp(unix: UnixListener, tcp: TcpListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, tcp: Some(tcp), ctx }
    }

    pub async fn run(mut self) {
        match self.tcp.take() {
            Some(tcp) => self.run_dual(tcp).await,
            None => self.run_unix_only().await,
        }
    }

    async fn run_unix_only(self) {
        loop {
            match self.unix.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    let (reader, writer) = stream.into_split();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(reader, writer, Transport::Unix, ctx).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!(error = %e, "unix accept error"),
            }
        }
    }

    async fn run_dual(self, tcp: TcpListener) {
        loop {
            tokio::select! {
                result = self.unix.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let ctx = Arc::clone(&self.ctx);
                            let (reader, writer) = stream.into_split();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(reader, writer, Transport::Unix, ctx).await {
                                    log_connection_error(e);
                                }
                            });
                        }
                        Err(e) => error!(error = %e, "unix accept error"),
                    }
                }
                result = tcp.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!(%addr, "tcp connection accepted");
                            let ctx = Arc::clone(&self.ctx);
                            let (reader, writer) = stream.into_split();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(reader, writer, Transport::Tcp, ctx).await {
                                    log_connection_error(e);
                                }
                            });
                        }
                        Err(e) => error!(error = %e, "tcp accept error"),
                    }
                }
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => debug!("client disconnected"),
        ConnectionError::Protocol(ProtocolError::Timeout) => warn!("connection timed out"),
        ConnectionError::Protocol(e) => error!(error = %e, "connection error"),
    }
}

/// Drive one connection end to end: authenticate (TCP only), create the
/// session, then loop dispatching requests until the peer disconnects or
/// a fatal protocol error occurs, at which point the session is torn down
/// (§3 "Session" lifecycle, §5 "Resource release").
async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    transport: Transport,
    ctx: Arc<ListenCtx>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + AsyncReadExt + Unpin + Send + 'static,
    W: AsyncWrite + AsyncWriteExt + Unpin + Send + 'static,
{
    let peer: Option<PeerIdentity> = None;

    if transport == Transport::Tcp {
        let bytes = wire::read_message(&mut reader).await?;
        let request: Request = wire::decode(&bytes)?;
        match request {
            Request::Hello { auth_token } => {
                if let Some(expected) = &ctx.auth_token {
                    if auth_token.as_deref() != Some(expected.as_str()) {
                        let response = Response::Error(ncfd_core::RpcError::new(
                            ncfd_core::ErrorOrigin::Rpc,
                            ncfd_core::ErrorKind::Transport,
                            "access-denied",
                            "unauthorized",
                        ));
                        let _ = wire::write_response(&mut writer, &response, ipc_timeout()).await;
                        return Ok(());
                    }
                }
                let response = Response::Hello { version: PROTOCOL_VERSION.to_string() };
                wire::write_response(&mut writer, &response, ipc_timeout()).await?;
            }
            _ => {
                let response = Response::Error(ncfd_core::RpcError::new(
                    ncfd_core::ErrorOrigin::Rpc,
                    ncfd_core::ErrorKind::Protocol,
                    "malformed-message",
                    "TCP connections must start with Hello",
                ));
                let _ = wire::write_response(&mut writer, &response, ipc_timeout()).await;
                return Ok(());
            }
        }
    }

    let (notify_tx, mut notify_rx) = unbounded_channel();
    let session = {
        let mut sessions = ctx.sessions.lock();
        sessions.create(transport, peer, notify_tx)
    };
    info!(%session, ?transport, "session created");

    let cancel = CancellationToken::new();
    let result = dispatch_loop(&mut reader, &mut writer, &ctx, session, &mut notify_rx, &cancel).await;

    {
        let mut engine = ctx.engine.lock().await;
        engine.on_session_destroyed(session).await;
    }
    ctx.sessions.lock().destroy(session);
    info!(%session, "session destroyed");

    result
}

async fn dispatch_loop<R, W>(
    reader: &mut R,
    writer: &mut W,
    ctx: &Arc<ListenCtx>,
    session: SessionId,
    notify_rx: &mut UnboundedReceiver<Response>,
    cancel: &CancellationToken,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + AsyncReadExt + Unpin,
    W: AsyncWrite + AsyncWriteExt + Unpin,
{
    loop {
        tokio::select! {
            read = wire::read_message(reader) => {
                let bytes = match read {
                    Ok(bytes) => bytes,
                    Err(ProtocolError::ConnectionClosed) => return Ok(()),
                    Err(e) => return Err(e.into()),
                };
                let request: Request = wire::decode(&bytes)?;

                if matches!(request, Request::Get { .. } | Request::GetConfig { .. }) {
                    debug!(%session, request = ?request, "received request");
                } else {
                    info!(%session, request = ?request, "received request");
                }

                let response = tokio::select! {
                    response = handle_request(request, ctx, session) => response,
                    _ = cancel.cancelled() => return Ok(()),
                };
                wire::write_response(writer, &response, ipc_timeout()).await?;
            }
            Some(notification) = notify_rx.recv() => {
                wire::write_response(writer, &notification, ipc_timeout()).await?;
            }
        }
    }
}

/// The dispatch table: one operation name to one `Engine`/session/
/// notify-bus call, per §4.2.
async fn handle_request(request: Request, ctx: &Arc<ListenCtx>, session: SessionId) -> Response {
    match request {
        Request::Hello { .. } => Response::Hello { version: PROTOCOL_VERSION.to_string() },
        Request::Ping => Response::Pong,

        Request::GetConfig { source, filter } => {
            let engine = ctx.engine.lock().await;
            let path = filter.as_deref().unwrap_or("/");
            match engine.get_config(&source, path) {
                Ok(v) => Response::Data(v),
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::Get { filter } => {
            let engine = ctx.engine.lock().await;
            let path = filter.as_deref().unwrap_or("/");
            match engine.get(path).await {
                Ok(v) => Response::Data(v),
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::EditConfig { target, default_operation, config } => {
            let op = default_operation.unwrap_or_else(Operation::default_for_edit_config);
            let mut engine = ctx.engine.lock().await;
            match engine.edit_config(&target, session, op, config) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::CopyConfig { source, target } => {
            let mut engine = ctx.engine.lock().await;
            match engine.copy_config(&source, &target, session) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::DeleteConfig { target } => {
            let mut engine = ctx.engine.lock().await;
            match engine.delete_config(&target, session) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::Lock { target } => {
            let mut engine = ctx.engine.lock().await;
            match engine.lock(&target, session) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::Unlock { target } => {
            let mut engine = ctx.engine.lock().await;
            match engine.unlock(&target, session) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::IsLocked { target } => {
            let engine = ctx.engine.lock().await;
            Response::LockStatus(engine.islocked(&target).map(SessionId::get))
        }

        Request::CloseSession => {
            let mut engine = ctx.engine.lock().await;
            engine.close_session(session);
            Response::Ok
        }

        Request::KillSession { session_id } => {
            let target = SessionId::from_raw(session_id);
            {
                let mut engine = ctx.engine.lock().await;
                engine.on_session_destroyed(target).await;
            }
            ctx.sessions.lock().destroy(target);
            Response::Ok
        }

        Request::Validate { source } => {
            let engine = ctx.engine.lock().await;
            match engine.validate(&source) {
                Ok(report) => Response::ValidateReport { ok: report.ok, violations: report.violations },
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::Commit { confirmed, confirm_timeout_secs, persist, persist_id } => {
            let req = ConfirmedCommitRequest {
                session,
                confirmed,
                confirm_timeout: confirm_timeout_secs.map(std::time::Duration::from_secs),
                persist,
                persist_id,
            };
            let mut engine = ctx.engine.lock().await;
            match engine.commit(DatastoreName::CANDIDATE, req).await {
                Ok(outcome) => {
                    let sessions = ctx.sessions.lock();
                    ctx.notify_bus.publish(
                        &sessions,
                        &ncfd_core::SystemClock,
                        ncfd_core::Subscription::DEFAULT_STREAM,
                        None,
                        serde_json::json!({"event": "netconf-config-change"}),
                    );
                    if !outcome.confirming && outcome.rollback.is_none() {
                        Response::Ok
                    } else {
                        Response::CommitOutcome(ncfd_wire::ConfirmedCommitOutcome {
                            confirming: outcome.confirming,
                            rollback: outcome.rollback.map(|r| ncfd_wire::RollbackReport(r.0)),
                        })
                    }
                }
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::DiscardChanges => {
            let mut engine = ctx.engine.lock().await;
            match engine.discard_changes() {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::CancelCommit { persist_id } => {
            let mut engine = ctx.engine.lock().await;
            match engine.cancel_commit(persist_id.as_deref()).await {
                Ok(report) => Response::CommitOutcome(ncfd_wire::ConfirmedCommitOutcome {
                    confirming: false,
                    rollback: Some(ncfd_wire::RollbackReport(report.0)),
                }),
                Err(e) => Response::Error(e.to_rpc_error()),
            }
        }

        Request::CreateSubscription { stream, filter } => {
            let subscription = ncfd_core::Subscription::new(session, stream, filter);
            ctx.sessions.lock().add_subscription(session, subscription);
            Response::Ok
        }

        Request::Debug { level } => {
            crate::logging::set_runtime_level(level);
            Response::Ok
        }

        Request::CustomRpc { operation, payload } => {
            let engine = ctx.engine.lock().await;
            match engine.plugins().rpc(&operation, &payload).await {
                Some(Ok(v)) => Response::Data(v),
                Some(Err(e)) => Response::Error(ncfd_core::RpcError::new(
                    ncfd_core::ErrorOrigin::Plugin,
                    ncfd_core::ErrorKind::Application,
                    "operation-failed",
                    e.to_string(),
                )),
                None => Response::Error(ncfd_core::RpcError::operation_not_supported(&operation)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncfd_engine::Engine;
    use ncfd_plugin::PluginRegistry;
    use ncfd_schema::SchemaRegistry;
    use serde_json::json;

    fn ctx() -> Arc<ListenCtx> {
        let scheduler = Arc::new(ncfd_engine::test_support::FakeScheduler::new());
        let engine = Engine::bootstrap(SchemaRegistry::empty(), PluginRegistry::new(), scheduler);
        Arc::new(ListenCtx {
            engine: Arc::new(tokio::sync::Mutex::new(engine)),
            sessions: Arc::new(Mutex::new(SessionRegistry::new())),
            notify_bus: Arc::new(NotificationBus::new()),
            auth_token: None,
            start_time: Instant::now(),
        })
    }

    #[tokio::test]
    async fn edit_config_then_commit_then_get_config_round_trips() {
        let ctx = ctx();
        let session = SessionId::from_raw(1);

        let edit = Request::EditConfig {
            target: "candidate".to_string(),
            default_operation: None,
            config: json!({"x": 1}),
        };
        assert!(matches!(handle_request(edit, &ctx, session).await, Response::Ok));

        let commit = Request::Commit {
            confirmed: false,
            confirm_timeout_secs: None,
            persist: None,
            persist_id: None,
        };
        assert!(matches!(handle_request(commit, &ctx, session).await, Response::Ok));

        let get = Request::GetConfig { source: "running".to_string(), filter: None };
        match handle_request(get, &ctx, session).await {
            Response::Data(v) => assert_eq!(v, json!({"x": 1})),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn lock_denied_carries_the_holders_session_id() {
        let ctx = ctx();
        let s1 = SessionId::from_raw(1);
        let s2 = SessionId::from_raw(2);

        let lock1 = Request::Lock { target: "running".to_string() };
        assert!(matches!(handle_request(lock1, &ctx, s1).await, Response::Ok));

        let lock2 = Request::Lock { target: "running".to_string() };
        match handle_request(lock2, &ctx, s2).await {
            Response::Error(e) => {
                assert_eq!(e.tag, "lock-denied");
                assert_eq!(e.context.as_deref(), Some("session-id=1"));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_custom_rpc_is_operation_not_supported() {
        let ctx = ctx();
        let req = Request::CustomRpc { operation: "frobnicate".to_string(), payload: json!(null) };
        match handle_request(req, &ctx, SessionId::from_raw(1)).await {
            Response::Error(e) => assert_eq!(e.tag, "operation-not-supported"),
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
