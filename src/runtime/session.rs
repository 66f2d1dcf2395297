//! Live runner session: TCP control channel, update frames, and the
//! background status listener.
//!
//! A session either attaches to an already-running runner
//! ([`RunnerSession::connect`]) or owns a locally spawned one
//! ([`RunnerSession::spawn_local`], "slave" mode). Control commands are
//! unframed UTF-8 tokens; graph payloads are length-prefixed frames.
//!
//! Update frames are fire-and-forget: the runner never acknowledges an
//! update. [`RunnerSession::dispatch`] sleeps a configurable settle delay
//! before unpausing instead of awaiting a reply.

use std::sync::Arc;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use super::command::RunnerCommand;
use super::config::SessionConfig;
use super::history::{SessionShared, StatusUpdate};
use super::listener::{self, StatusListenerHandle};
use super::wire::encode_frame;
use crate::types::NodeId;

/// Connect attempts made against a freshly spawned local runner before
/// giving up. The process needs a moment to bind its listen socket.
const SPAWN_CONNECT_ATTEMPTS: u32 = 3;
const SPAWN_CONNECT_BACKOFF: Duration = Duration::from_millis(300);

/// Errors raised by session setup and dispatch.
///
/// Session-level failures abort only the current dispatch; the graph stays
/// consistent and free to retry or reconnect.
#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("timed out connecting to runner at {addr} after {timeout:?}")]
    #[diagnostic(
        code(patchbay::session::connect_timeout),
        help("Is the runner process listening? Check host/port and firewall rules.")
    )]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("no runner session is connected")]
    #[diagnostic(
        code(patchbay::session::not_connected),
        help("Call Graph::attach_runner or Graph::spawn_runner first.")
    )]
    NotConnected,

    #[error("failed to spawn local runner: {reason}")]
    #[diagnostic(
        code(patchbay::session::spawn_failed),
        help("Set PATCHBAY_RUNNER_CMD or SessionConfig::runner_command to a runnable command.")
    )]
    SpawnFailed { reason: String },

    #[error(transparent)]
    #[diagnostic(code(patchbay::session::io))]
    Io(#[from] std::io::Error),
}

/// A live connection to a graph runner.
pub struct RunnerSession {
    writer: OwnedWriteHalf,
    listener: StatusListenerHandle,
    shared: Arc<SessionShared>,
    updates_rx: flume::Receiver<StatusUpdate>,
    config: SessionConfig,
    /// True when this session owns the runner process it spawned.
    slave: bool,
    child: Option<Child>,
    connected: bool,
}

impl RunnerSession {
    /// Connect to an already-running runner at the configured endpoint.
    ///
    /// The TCP connect is bounded by the configured timeout; on expiry the
    /// whole session setup fails and nothing is left connected. On success
    /// the status listener starts on the read half of the socket.
    pub async fn connect(
        config: SessionConfig,
        shared: Arc<SessionShared>,
    ) -> Result<Self, SessionError> {
        let addr = config.addr();
        let stream = match timeout(config.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(SessionError::Io(e)),
            Err(_) => {
                return Err(SessionError::ConnectTimeout {
                    addr,
                    timeout: config.connect_timeout,
                });
            }
        };
        tracing::info!(%addr, "connected to runner");
        Ok(Self::from_stream(stream, config, shared, false, None))
    }

    /// Spawn a local runner process and connect to it ("slave" mode).
    ///
    /// The session owns the child: [`kill_runner`](Self::kill_runner) will
    /// terminate it, and it is killed on drop as a backstop.
    pub async fn spawn_local(
        config: SessionConfig,
        shared: Arc<SessionShared>,
    ) -> Result<Self, SessionError> {
        let command_line =
            config
                .runner_command
                .clone()
                .ok_or_else(|| SessionError::SpawnFailed {
                    reason: "no runner command configured".to_string(),
                })?;
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or_else(|| SessionError::SpawnFailed {
            reason: "runner command is empty".to_string(),
        })?;
        let child = Command::new(program)
            .args(parts)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SessionError::SpawnFailed {
                reason: e.to_string(),
            })?;
        tracing::info!(command = %command_line, "spawned local runner");

        // The child needs a moment to bind its listen socket.
        let addr = config.addr();
        let mut last_err: Option<SessionError> = None;
        for attempt in 1..=SPAWN_CONNECT_ATTEMPTS {
            match timeout(config.connect_timeout, TcpStream::connect(&addr)).await {
                Ok(Ok(stream)) => {
                    tracing::info!(%addr, attempt, "connected to spawned runner");
                    return Ok(Self::from_stream(stream, config, shared, true, Some(child)));
                }
                Ok(Err(e)) => last_err = Some(SessionError::Io(e)),
                Err(_) => {
                    last_err = Some(SessionError::ConnectTimeout {
                        addr: addr.clone(),
                        timeout: config.connect_timeout,
                    })
                }
            }
            tokio::time::sleep(SPAWN_CONNECT_BACKOFF).await;
        }
        Err(last_err.unwrap_or(SessionError::NotConnected))
    }

    fn from_stream(
        stream: TcpStream,
        config: SessionConfig,
        shared: Arc<SessionShared>,
        slave: bool,
        child: Option<Child>,
    ) -> Self {
        let (reader, writer) = stream.into_split();
        shared.set_history_capacity(config.history_capacity);
        shared.mark_alive();
        let (updates_tx, updates_rx) = flume::bounded(config.history_capacity);
        let listener = listener::spawn(reader, shared.clone(), updates_tx);
        Self {
            writer,
            listener,
            shared,
            updates_rx,
            config,
            slave,
            child,
            connected: true,
        }
    }

    /// Whether the control channel is open and the listener alive.
    pub fn is_connected(&self) -> bool {
        self.connected && self.shared.is_alive()
    }

    /// Whether this session owns the runner it spawned.
    pub fn is_slave(&self) -> bool {
        self.slave
    }

    /// Receiver of parsed status updates for streaming consumers.
    ///
    /// Batches are dropped when the channel is full; the execution history
    /// remains the authoritative record.
    pub fn updates(&self) -> flume::Receiver<StatusUpdate> {
        self.updates_rx.clone()
    }

    /// Send one unframed control command token.
    pub async fn send_command(&mut self, command: RunnerCommand) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }
        tracing::debug!(%command, "sending runner command");
        self.writer.write_all(command.encode().as_bytes()).await?;
        Ok(())
    }

    /// Transmit a serialized graph as one length-prefixed frame.
    ///
    /// Fire-and-forget: no acknowledgment is awaited.
    pub async fn send_update(&mut self, payload: &str) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }
        let frame = encode_frame(payload);
        tracing::debug!(bytes = frame.len(), "sending graph update frame");
        self.writer.write_all(&frame).await?;
        Ok(())
    }

    /// Push a new graph state: clear the history, then
    /// PAUSE → frame → UPDATE.
    pub async fn push_update(&mut self, payload: &str) -> Result<(), SessionError> {
        self.shared.clear_history();
        self.send_command(RunnerCommand::Pause).await?;
        self.send_update(payload).await?;
        self.send_command(RunnerCommand::Update).await?;
        Ok(())
    }

    /// Interactive test run: push the graph, give the runner a moment to
    /// load it, then unpause.
    pub async fn dispatch(&mut self, payload: &str) -> Result<(), SessionError> {
        self.push_update(payload).await?;
        tokio::time::sleep(self.config.unpause_delay).await;
        self.send_command(RunnerCommand::Unpause).await?;
        Ok(())
    }

    pub async fn pause(&mut self) -> Result<(), SessionError> {
        self.send_command(RunnerCommand::Pause).await
    }

    pub async fn unpause(&mut self) -> Result<(), SessionError> {
        self.send_command(RunnerCommand::Unpause).await
    }

    pub async fn step(&mut self) -> Result<(), SessionError> {
        self.send_command(RunnerCommand::Step).await
    }

    pub async fn goto(&mut self, next: NodeId) -> Result<(), SessionError> {
        self.send_command(RunnerCommand::Goto(next)).await
    }

    /// Terminate a runner this session spawned.
    ///
    /// No-op unless in slave mode. Sends KILL, closes the socket, stops the
    /// listener, and releases the child so a later execute can respawn.
    pub async fn kill_runner(&mut self) -> Result<(), SessionError> {
        if !self.slave {
            return Ok(());
        }
        self.send_command(RunnerCommand::Kill).await?;
        self.writer.shutdown().await?;
        self.listener.shutdown().await;
        self.shared.mark_dead();
        self.connected = false;
        self.child = None;
        tracing::info!("local runner killed");
        Ok(())
    }

    /// Close the control channel and stop the listener without touching the
    /// runner process.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        if self.connected {
            self.writer.shutdown().await?;
            self.listener.shutdown().await;
            self.shared.mark_dead();
            self.connected = false;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RunnerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerSession")
            .field("addr", &self.config.addr())
            .field("slave", &self.slave)
            .field("connected", &self.connected)
            .finish()
    }
}
