//! Tokio transport shell around the session state machine
//!
//! One listener task accepts control connections; each connection gets a
//! read task that feeds the session and applies the actions it returns.
//! The keep-alive timer runs as a separate task per connection, holding
//! only a weak reference to the session so a closed connection tears the
//! timer down with it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::SourceConfig;
use super::events::{ErrorCode, ProsumerNotify, SourceEvent};
use super::session::{Action, WfdSourceSession};
use crate::error::WfdError;

/// Operations the session-management layer can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOperation {
    /// Start listening for a sink
    Start,
    /// Stop the source and tear down any session
    Stop,
    /// Pause the media pipeline
    Pause,
    /// Resume the media pipeline
    Resume,
    /// Destroy the source
    Destroy,
}

/// Shared per-connection handles kept in the registry
struct PeerHandle {
    session: Arc<Mutex<WfdSourceSession>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

type ConnectionRegistry = Arc<Mutex<HashMap<SocketAddr, PeerHandle>>>;

/// The Wi-Fi Display source
///
/// Owns the RTSP control listener and fans session events out on a
/// broadcast channel; see [`WfdSource::subscribe`].
pub struct WfdSource {
    config: SourceConfig,
    event_tx: broadcast::Sender<SourceEvent>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    connections: ConnectionRegistry,
    local_port: Option<u16>,
}

impl WfdSource {
    /// Create a source with the given configuration
    #[must_use]
    pub fn new(config: SourceConfig) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            config,
            event_tx,
            shutdown_tx: None,
            connections: Arc::new(Mutex::new(HashMap::new())),
            local_port: None,
        }
    }

    /// Subscribe to source events
    ///
    /// Each subscriber gets its own receiver; events published before the
    /// subscription are not replayed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SourceEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the listener is currently running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Port the listener is bound to, once started
    ///
    /// Differs from the configured port when the configuration asked for
    /// port 0 (auto-assign).
    #[must_use]
    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    /// Bind the control port and start accepting sink connections
    ///
    /// Returns the actual bound port. A bind failure is reported both as an
    /// error return and as an [`SourceEvent::Error`] on the event channel.
    ///
    /// # Errors
    ///
    /// [`WfdError::AlreadyRunning`] if the source is already started,
    /// [`WfdError::ListenFailed`] if the control port cannot be bound.
    pub async fn start(&mut self) -> Result<u16, WfdError> {
        if self.shutdown_tx.is_some() {
            return Err(WfdError::AlreadyRunning);
        }

        let bind_addr = SocketAddr::new(self.config.bind_addr, self.config.control_port);
        let listener = match TcpListener::bind(bind_addr).await {
            Ok(listener) => listener,
            Err(source) => {
                let _ = self.event_tx.send(SourceEvent::Error {
                    code: ErrorCode::ConnectionFailure,
                    message: format!("cannot listen on {bind_addr}: {source}"),
                });
                return Err(WfdError::ListenFailed {
                    port: self.config.control_port,
                    source,
                });
            }
        };
        let port = listener.local_addr()?.port();
        self.local_port = Some(port);

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        info!(port, "wfd source listening");
        let _ = self.event_tx.send(SourceEvent::Started { port });

        tokio::spawn(accept_loop(
            listener,
            shutdown_rx,
            self.config.clone(),
            self.event_tx.clone(),
            Arc::clone(&self.connections),
        ));

        Ok(port)
    }

    /// Stop the source
    ///
    /// Live sessions get an orderly M8 TEARDOWN before their connections
    /// close. Idempotent: stopping a stopped source is a no-op.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for teardown steps
    /// that can fail.
    pub async fn stop(&mut self) -> Result<(), WfdError> {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            return Ok(());
        };

        let peers: Vec<(SocketAddr, PeerHandle)> =
            self.connections.lock().await.drain().collect();
        for (peer, handle) in peers {
            debug!(%peer, "tearing down session");
            let actions = { handle.session.lock().await.begin_teardown() };
            for action in actions {
                if let Action::Send(bytes) = action {
                    let _ = handle.writer.lock().await.write_all(&bytes).await;
                }
            }
            let _ = handle.writer.lock().await.shutdown().await;
        }

        let _ = shutdown_tx.send(()).await;
        self.local_port = None;
        let _ = self.event_tx.send(SourceEvent::Stopped);
        Ok(())
    }

    /// Apply a session-management operation
    ///
    /// `Start` and `Stop`/`Destroy` map onto [`WfdSource::start`] and
    /// [`WfdSource::stop`]; `Pause` and `Resume` are forwarded to the media
    /// pipeline as producer notifications.
    ///
    /// # Errors
    ///
    /// Propagates [`WfdSource::start`] and [`WfdSource::stop`] failures.
    pub async fn update_operation(&mut self, operation: SessionOperation) -> Result<(), WfdError> {
        match operation {
            SessionOperation::Start => {
                self.start().await?;
                Ok(())
            }
            SessionOperation::Stop | SessionOperation::Destroy => self.stop().await,
            SessionOperation::Pause => {
                let _ = self
                    .event_tx
                    .send(SourceEvent::Prosumer(ProsumerNotify::Pause));
                Ok(())
            }
            SessionOperation::Resume => {
                let _ = self
                    .event_tx
                    .send(SourceEvent::Prosumer(ProsumerNotify::Resume));
                Ok(())
            }
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    mut shutdown_rx: mpsc::Receiver<()>,
    config: SourceConfig,
    events: broadcast::Sender<SourceEvent>,
    connections: ConnectionRegistry,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "sink connected");
                    tokio::spawn(handle_connection(
                        stream,
                        peer,
                        config.clone(),
                        events.clone(),
                        Arc::clone(&connections),
                    ));
                }
                Err(error) => {
                    warn!(%error, "accept failed");
                }
            },
        }
    }
    debug!("listener stopped");
}

/// Per-connection context shared between the read task and keep-alive task
struct ConnectionCtx {
    session: Arc<Mutex<WfdSourceSession>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    events: broadcast::Sender<SourceEvent>,
    keepalive: Arc<Mutex<Option<JoinHandle<()>>>>,
    keepalive_interval: Duration,
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    config: SourceConfig,
    events: broadcast::Sender<SourceEvent>,
    connections: ConnectionRegistry,
) {
    let local_addr = match stream.local_addr() {
        Ok(addr) => addr,
        Err(error) => {
            warn!(%peer, %error, "cannot resolve local address, dropping connection");
            return;
        }
    };

    let keepalive_interval = config.keepalive_interval;
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(Mutex::new(writer));
    let session = Arc::new(Mutex::new(WfdSourceSession::new(config, local_addr, peer)));

    connections.lock().await.insert(
        peer,
        PeerHandle {
            session: Arc::clone(&session),
            writer: Arc::clone(&writer),
        },
    );
    let _ = events.send(SourceEvent::PeerConnected { address: peer });

    let ctx = ConnectionCtx {
        session: Arc::clone(&session),
        writer: Arc::clone(&writer),
        events: events.clone(),
        keepalive: Arc::new(Mutex::new(None)),
        keepalive_interval,
    };

    let opening = { session.lock().await.on_connected() };
    let mut reason = String::from("session closed");

    if apply_actions(&ctx, opening).await {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    reason = "peer closed connection".to_string();
                    break;
                }
                Ok(n) => {
                    // Actions are computed under the lock, applied outside it
                    let actions = { session.lock().await.on_data(&buf[..n]) };
                    if !apply_actions(&ctx, actions).await {
                        break;
                    }
                }
                Err(error) => {
                    reason = format!("read error: {error}");
                    break;
                }
            }
        }
    }

    if let Some(handle) = ctx.keepalive.lock().await.take() {
        handle.abort();
    }
    let _ = writer.lock().await.shutdown().await;
    connections.lock().await.remove(&peer);
    debug!(%peer, reason, "sink disconnected");
    let _ = events.send(SourceEvent::PeerDisconnected {
        address: peer,
        reason,
    });
}

/// Apply session actions in order; returns false when the connection must close
async fn apply_actions(ctx: &ConnectionCtx, actions: Vec<Action>) -> bool {
    for action in actions {
        match action {
            Action::Send(bytes) => {
                if let Err(error) = ctx.writer.lock().await.write_all(&bytes).await {
                    warn!(%error, "write failed");
                    return false;
                }
            }
            Action::Notify(event) => {
                let _ = ctx.events.send(event);
            }
            Action::ArmKeepAlive => arm_keepalive(ctx).await,
            Action::DisarmKeepAlive => {
                if let Some(handle) = ctx.keepalive.lock().await.take() {
                    handle.abort();
                }
            }
            Action::Close => return false,
        }
    }
    true
}

/// Spawn the per-connection M16 timer
///
/// The task holds only a weak session reference; once the read task drops
/// the connection the next tick fails to upgrade and the timer exits.
async fn arm_keepalive(ctx: &ConnectionCtx) {
    let mut slot = ctx.keepalive.lock().await;
    if slot.is_some() {
        return;
    }

    let session: Weak<Mutex<WfdSourceSession>> = Arc::downgrade(&ctx.session);
    let writer = Arc::clone(&ctx.writer);
    let events = ctx.events.clone();
    let interval = ctx.keepalive_interval;

    *slot = Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // the first tick fires immediately, skip it
        loop {
            ticker.tick().await;
            let Some(session) = session.upgrade() else {
                break;
            };
            let actions = { session.lock().await.on_keepalive_tick() };
            let mut close = false;
            for action in actions {
                match action {
                    Action::Send(bytes) => {
                        if writer.lock().await.write_all(&bytes).await.is_err() {
                            close = true;
                        }
                    }
                    Action::Notify(event) => {
                        let _ = events.send(event);
                    }
                    Action::DisarmKeepAlive | Action::Close => close = true,
                    Action::ArmKeepAlive => {}
                }
            }
            if close {
                // Shutting the socket wakes the read task, which owns cleanup
                let _ = writer.lock().await.shutdown().await;
                break;
            }
        }
    }));
}
