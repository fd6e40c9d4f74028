//! # WebSocket Transport
//!
//! Broker uplink with automatic reconnection and backoff.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Transport Lifecycle Events                           │
//! │                                                                         │
//! │  ┌────────────┐    connect ok   ┌────────────┐                         │
//! │  │  connect   │ ──────────────► │ Connected  │ ── link loop ──┐        │
//! │  │  attempt   │                 └────────────┘                │        │
//! │  └─────┬──────┘                                               │        │
//! │        │ connect failed                     error / close     │        │
//! │        ▼                                          ▼           │        │
//! │  emit Offline                        emit Error, Disconnected │        │
//! │        │                                          │           │        │
//! │        └────────────► backoff wait ◄──────────────┘           │        │
//! │                     (emit Reconnecting)                       │        │
//! │                            │                                  │        │
//! │                            └───────── next attempt ◄──────────┘        │
//! │                                                                         │
//! │  BACKOFF STRATEGY (Exponential)                                        │
//! │  ──────────────────────────────                                        │
//! │  Starts at the configured reconnect interval, doubles per attempt,     │
//! │  capped at max_backoff. Reconnects forever.                            │
//! │                                                                         │
//! │  The transport's native callbacks never leave this module: lifecycle   │
//! │  is surfaced as a single `LinkEvent` stream for the monitor.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{
    connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::error::{UplinkError, UplinkResult};
use crate::monitor::LinkEvent;
use crate::protocol::BrokerFrame;

// =============================================================================
// Transport Configuration
// =============================================================================

/// Configuration for the broker transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket URL to connect to.
    pub url: String,

    /// Skip TLS certificate validation (self-signed lab brokers).
    pub skip_cert_validation: bool,

    /// Keepalive ping interval.
    pub keep_alive: Duration,

    /// Initial reconnect interval; backoff grows from here.
    pub reconnect_interval: Duration,

    /// Maximum backoff between reconnect attempts.
    pub max_backoff: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// How long a publisher waits for its outcome.
    pub publish_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            url: String::new(),
            skip_cert_validation: false,
            keep_alive: Duration::from_secs(60),
            reconnect_interval: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            publish_timeout: Duration::from_secs(10),
        }
    }
}

// =============================================================================
// Outgoing Commands
// =============================================================================

/// One frame queued for the broker, with an optional outcome channel.
///
/// Replay traffic omits the reply (fire-and-forget); live publishes carry
/// one so the coordinator can cache the record on failure.
pub(crate) struct Outgoing {
    pub(crate) frame: BrokerFrame,
    pub(crate) reply: Option<oneshot::Sender<UplinkResult<()>>>,
}

// =============================================================================
// Transport Handle
// =============================================================================

/// Handle for interacting with the transport from other components.
#[derive(Clone)]
pub struct TransportHandle {
    /// Sender for outgoing frames.
    outgoing_tx: mpsc::Sender<Outgoing>,

    /// Shutdown signal.
    shutdown_tx: mpsc::Sender<()>,

    /// Outcome wait bound for `publish`.
    publish_timeout: Duration,
}

impl TransportHandle {
    /// Builds a handle around raw channels (also the test seam).
    pub(crate) fn from_parts(
        outgoing_tx: mpsc::Sender<Outgoing>,
        shutdown_tx: mpsc::Sender<()>,
        publish_timeout: Duration,
    ) -> Self {
        TransportHandle {
            outgoing_tx,
            shutdown_tx,
            publish_timeout,
        }
    }

    /// Publishes a frame and waits for the transport's outcome.
    ///
    /// The wait is bounded by the configured publish timeout; no further
    /// timeout layer exists above this one. If the wait expires, the
    /// transport drops the frame unsent, so a record the caller then caches
    /// is never also delivered live.
    pub async fn publish(&self, frame: BrokerFrame) -> UplinkResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.outgoing_tx
            .send(Outgoing {
                frame,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| UplinkError::ChannelClosed("Transport outgoing channel closed".into()))?;

        match timeout(self.publish_timeout, reply_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(UplinkError::Disconnected),
            Err(_) => Err(UplinkError::PublishTimeout(self.publish_timeout.as_secs())),
        }
    }

    /// Queues a frame without waiting for an outcome (replay traffic).
    pub async fn send(&self, frame: BrokerFrame) -> UplinkResult<()> {
        self.outgoing_tx
            .send(Outgoing { frame, reply: None })
            .await
            .map_err(|_| UplinkError::ChannelClosed("Transport outgoing channel closed".into()))
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> UplinkResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| UplinkError::ChannelClosed("Transport shutdown channel closed".into()))
    }
}

// =============================================================================
// WebSocket Transport
// =============================================================================

/// Type alias for the WebSocket write half.
type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// How a connection loop ended.
enum LoopExit {
    /// Shutdown was requested; the outer loop must stop.
    Shutdown,
    /// The broker closed the link; reconnect.
    Closed,
}

/// WebSocket transport with automatic reconnection.
///
/// ## Usage
/// ```rust,ignore
/// let config = TransportConfig {
///     url: "ws://localhost:9001/uplink".into(),
///     ..Default::default()
/// };
///
/// let (handle, mut events) = Transport::spawn(config);
///
/// // Publish with an outcome
/// handle.publish(frame).await?;
///
/// // Observe lifecycle events
/// while let Some(event) = events.recv().await {
///     println!("link event: {}", event.name());
/// }
/// ```
pub struct Transport {
    config: TransportConfig,
    outgoing_rx: mpsc::Receiver<Outgoing>,
    event_tx: mpsc::Sender<LinkEvent>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Transport {
    /// Creates a new transport and spawns its background task.
    ///
    /// Returns a handle for publishing and a receiver for lifecycle events.
    pub fn spawn(config: TransportConfig) -> (TransportHandle, mpsc::Receiver<LinkEvent>) {
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<Outgoing>(100);
        let (event_tx, event_rx) = mpsc::channel::<LinkEvent>(100);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        let handle = TransportHandle::from_parts(
            outgoing_tx,
            shutdown_tx,
            config.publish_timeout,
        );

        let transport = Transport {
            config,
            outgoing_rx,
            event_tx,
            shutdown_rx,
        };

        tokio::spawn(transport.run());

        (handle, event_rx)
    }

    /// Main transport loop.
    async fn run(mut self) {
        info!(url = %self.config.url, "Transport starting");

        let mut backoff = self.create_backoff();

        'outer: loop {
            if self.shutdown_rx.try_recv().is_ok() {
                info!("Transport received shutdown signal");
                break;
            }

            match self.connect_with_timeout().await {
                Ok(ws_stream) => {
                    info!("Broker link established");
                    self.emit(LinkEvent::Connected).await;
                    backoff.reset();

                    match self.connection_loop(ws_stream).await {
                        Ok(LoopExit::Shutdown) => break 'outer,
                        Ok(LoopExit::Closed) => {
                            self.emit(LinkEvent::Disconnected).await;
                        }
                        Err(e) => {
                            warn!(error = %e, "Connection loop ended");
                            self.emit(LinkEvent::Error(e.to_string())).await;
                            self.emit(LinkEvent::Disconnected).await;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to connect to broker");
                    self.emit(LinkEvent::Offline).await;
                }
            }

            // Wait out the backoff before the next attempt. Publishes that
            // arrive during the gap are rejected, not queued, so their
            // records go to the cache instead of a stale send buffer.
            let wait = backoff.next_backoff().unwrap_or(self.config.max_backoff);
            debug!(?wait, "Waiting before reconnect");
            self.emit(LinkEvent::Reconnecting).await;

            let sleep = tokio::time::sleep(wait);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    _ = self.shutdown_rx.recv() => {
                        info!("Shutdown during backoff");
                        break 'outer;
                    }
                    Some(cmd) = self.outgoing_rx.recv() => Self::reject(cmd),
                }
            }
        }

        info!("Transport stopped");
    }

    /// Connects with timeout, honoring the certificate-validation option.
    async fn connect_with_timeout(
        &self,
    ) -> UplinkResult<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        let connector = if self.config.skip_cert_validation {
            let tls = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .build()?;
            Some(Connector::NativeTls(tls))
        } else {
            None
        };

        let connect_future =
            connect_async_tls_with_config(self.config.url.as_str(), None, false, connector);

        match timeout(self.config.connect_timeout, connect_future).await {
            Ok(Ok((ws_stream, response))) => {
                debug!(status = ?response.status(), "WebSocket handshake complete");
                Ok(ws_stream)
            }
            Ok(Err(e)) => Err(UplinkError::from(e)),
            Err(_) => Err(UplinkError::Timeout(self.config.connect_timeout.as_secs())),
        }
    }

    /// Main connection loop - handles outgoing frames and keepalive.
    async fn connection_loop(
        &mut self,
        ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    ) -> UplinkResult<LoopExit> {
        let (mut write, mut read) = ws_stream.split();

        let mut ping_interval = tokio::time::interval(self.config.keep_alive);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Handle outgoing frames
                Some(cmd) = self.outgoing_rx.recv() => {
                    Self::write_frame(&mut write, cmd).await?;
                }

                // Handle incoming messages (the device is publish-only;
                // broker data frames are ignored)
                Some(result) = read.next() => {
                    match result {
                        Ok(WsMessage::Ping(data)) => {
                            write.send(WsMessage::Pong(data)).await?;
                        }
                        Ok(WsMessage::Pong(_)) => {
                            debug!("Received pong");
                        }
                        Ok(WsMessage::Close(frame)) => {
                            info!(?frame, "Received close frame");
                            return Ok(LoopExit::Closed);
                        }
                        Ok(WsMessage::Text(text)) => {
                            debug!(len = text.len(), "Ignoring broker frame");
                        }
                        Ok(WsMessage::Binary(_)) => {
                            warn!("Received unexpected binary message");
                        }
                        Ok(WsMessage::Frame(_)) => {
                            // Raw frame, ignore
                        }
                        Err(e) => {
                            return Err(UplinkError::from(e));
                        }
                    }
                }

                // Send periodic pings
                _ = ping_interval.tick() => {
                    write.send(WsMessage::Ping(vec![].into())).await?;
                    debug!("Sent ping");
                }

                // Check for shutdown
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, closing connection");
                    let _ = write.send(WsMessage::Close(None)).await;
                    return Ok(LoopExit::Shutdown);
                }
            }
        }
    }

    /// Writes one frame, reporting the outcome to the publisher if it is
    /// still waiting.
    async fn write_frame(write: &mut WsSink, cmd: Outgoing) -> UplinkResult<()> {
        // The publisher may have timed out and cached the record already;
        // dropping the frame keeps send-or-cache mutually exclusive.
        if cmd.reply.as_ref().map_or(false, |r| r.is_closed()) {
            debug!("Publisher gave up waiting, dropping frame");
            return Ok(());
        }

        let json = match cmd.frame.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize frame");
                if let Some(reply) = cmd.reply {
                    let _ = reply.send(Err(e));
                }
                return Ok(());
            }
        };

        debug!(frame = cmd.frame.type_name(), "Sending frame");

        match write.send(WsMessage::Text(json.into())).await {
            Ok(()) => {
                if let Some(reply) = cmd.reply {
                    let _ = reply.send(Ok(()));
                }
                Ok(())
            }
            Err(e) => {
                if let Some(reply) = cmd.reply {
                    let _ = reply.send(Err(UplinkError::WebSocketError(e.to_string())));
                }
                Err(UplinkError::from(e))
            }
        }
    }

    /// Fails a command that arrived while the link was down.
    fn reject(cmd: Outgoing) {
        match cmd.reply {
            Some(reply) => {
                let _ = reply.send(Err(UplinkError::NotConnected));
            }
            None => debug!("Dropping fire-and-forget frame while disconnected"),
        }
    }

    /// Emits a lifecycle event; the receiver side going away is harmless
    /// during shutdown.
    async fn emit(&self, event: LinkEvent) {
        let _ = self.event_tx.send(event).await;
    }

    /// Creates the exponential backoff configuration.
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.reconnect_interval,
            max_interval: self.config.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None, // Reconnect forever
            ..Default::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::ReadingGenerator;

    fn frame() -> BrokerFrame {
        let record = ReadingGenerator::new("device-1", "1.0.0").generate();
        BrokerFrame::publish("telemetry/device-1", record)
    }

    #[test]
    fn test_transport_config_default() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.keep_alive, Duration::from_secs(60));
        assert!(!config.skip_cert_validation);
    }

    #[tokio::test]
    async fn test_publish_times_out_without_responder() {
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel(8);
        let (shutdown_tx, _shutdown_rx) = mpsc::channel(1);
        let handle =
            TransportHandle::from_parts(outgoing_tx, shutdown_tx, Duration::from_millis(50));

        // Swallow the command without ever replying.
        tokio::spawn(async move {
            let _cmd = outgoing_rx.recv().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        match handle.publish(frame()).await {
            Err(UplinkError::PublishTimeout(_)) => {}
            other => panic!("Expected publish timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_surfaces_rejection() {
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel(8);
        let (shutdown_tx, _shutdown_rx) = mpsc::channel(1);
        let handle =
            TransportHandle::from_parts(outgoing_tx, shutdown_tx, Duration::from_secs(1));

        tokio::spawn(async move {
            let cmd = outgoing_rx.recv().await.unwrap();
            Transport::reject(cmd);
        });

        match handle.publish(frame()).await {
            Err(UplinkError::NotConnected) => {}
            other => panic!("Expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_fails_when_transport_gone() {
        let (outgoing_tx, outgoing_rx) = mpsc::channel(8);
        let (shutdown_tx, _shutdown_rx) = mpsc::channel(1);
        let handle =
            TransportHandle::from_parts(outgoing_tx, shutdown_tx, Duration::from_secs(1));

        drop(outgoing_rx);

        match handle.publish(frame()).await {
            Err(UplinkError::ChannelClosed(_)) => {}
            other => panic!("Expected channel closed, got {other:?}"),
        }
    }
}
