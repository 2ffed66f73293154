//! Event stream server -- newline-delimited JSON over TCP.
//!
//! Each client connects, sends one [`SubscribeRequest`] line, and then
//! receives one JSON [`Event`](catcher_core::event::Event) per line for as
//! long as the subscription lives. A rejected request gets a single
//! `{"error": "..."}` line before the connection is closed.
//!
//! # Connection lifecycle
//!
//! ```text
//! accept -> permit (max_connections) -> read request -> Broker::subscribe
//!        -> loop { next event | client EOF | idle timeout | shutdown }
//!        -> Subscription dropped (unregisters from the broker)
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use catcher_broker::Broker;
use catcher_core::config::StreamConfig;
use catcher_core::metrics as m;
use catcher_core::stream::{ErrorResponse, SubscribeRequest};

/// Maximum size of the subscription request line.
const MAX_REQUEST_BYTES: u64 = 64 * 1024;

/// Stream server settings.
#[derive(Debug, Clone)]
pub struct StreamServerConfig {
    /// TCP listen address.
    pub listen: String,
    /// Close a subscription after this long without a delivered event.
    pub idle_timeout: Duration,
    /// Maximum concurrent client connections.
    pub max_connections: usize,
}

impl StreamServerConfig {
    /// Build from the `[stream]` config section.
    pub fn from_core(config: &StreamConfig) -> Self {
        Self {
            listen: config.listen.clone(),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            max_connections: config.max_connections,
        }
    }
}

/// Why a streaming connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    ClientDisconnected,
    WriteFailed,
    BrokerClosed,
    IdleTimeout,
    Shutdown,
}

impl CloseReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::ClientDisconnected => "client disconnected",
            Self::WriteFailed => "write failed",
            Self::BrokerClosed => "broker closed",
            Self::IdleTimeout => "idle timeout",
            Self::Shutdown => "server shutdown",
        }
    }
}

/// TCP server exposing broker subscriptions to remote clients.
pub struct StreamServer {
    config: StreamServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    broker: Broker,
    cancel_token: CancellationToken,
}

impl StreamServer {
    /// Bind the listener. Fails if the address is unavailable.
    pub async fn bind(
        config: StreamServerConfig,
        broker: Broker,
        cancel_token: CancellationToken,
    ) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind stream server to {}: {}", config.listen, e))?;
        let local_addr = listener.local_addr()?;

        info!(%local_addr, max_connections = config.max_connections, "stream server bound");

        Ok(Self {
            config,
            listener,
            local_addr,
            broker,
            cancel_token,
        })
    }

    /// Actual bound address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop until the cancellation token fires.
    ///
    /// Open connections observe the same token and are awaited before
    /// this returns.
    pub async fn run(self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "stream server accept failed");
                            continue;
                        }
                    };
                    metrics::counter!(m::STREAM_CONNECTIONS_TOTAL).increment(1);

                    let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                        warn!(
                            %peer,
                            max_connections = self.config.max_connections,
                            "max stream connections reached, rejecting connection"
                        );
                        record_rejection("max_connections");
                        connections.spawn(async move {
                            let mut stream = stream;
                            let _ = send_error(&mut stream, "server busy: connection limit reached").await;
                        });
                        continue;
                    };

                    debug!(%peer, "stream client connected");
                    let broker = self.broker.clone();
                    let cancel = self.cancel_token.clone();
                    let idle_timeout = self.config.idle_timeout;
                    connections.spawn(async move {
                        let _permit = permit;
                        if let Err(e) = handle_connection(stream, peer, broker, idle_timeout, cancel).await {
                            debug!(%peer, error = %e, "stream connection ended with error");
                        }
                    });
                    while connections.try_join_next().is_some() {}
                }
                _ = self.cancel_token.cancelled() => {
                    debug!("stream server received shutdown signal");
                    break;
                }
            }
        }

        let open = connections.len();
        while connections.join_next().await.is_some() {}
        info!(local_addr = %self.local_addr, closed_connections = open, "stream server stopped");
        Ok(())
    }
}

/// Serve a single client connection.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: Broker,
    idle_timeout: Duration,
    cancel: CancellationToken,
) -> io::Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // 1. subscription request
    let mut line = String::new();
    let mut limited = (&mut reader).take(MAX_REQUEST_BYTES);
    let read = tokio::select! {
        result = timeout(idle_timeout, limited.read_line(&mut line)) => result,
        _ = cancel.cancelled() => return Ok(()),
    };
    match read {
        Err(_) => {
            record_rejection("request_timeout");
            return send_error(&mut writer, "timed out waiting for subscription request").await;
        }
        Ok(Err(e)) if e.kind() == io::ErrorKind::InvalidData => {
            record_rejection("invalid_request");
            return send_error(&mut writer, "subscription request is not valid UTF-8").await;
        }
        Ok(Err(e)) => return Err(e),
        Ok(Ok(0)) => {
            debug!(%peer, "stream client closed before sending a request");
            return Ok(());
        }
        Ok(Ok(_)) => {}
    }
    if !line.ends_with('\n') && line.len() as u64 >= MAX_REQUEST_BYTES {
        record_rejection("invalid_request");
        return send_error(&mut writer, "subscription request too large").await;
    }

    let request: SubscribeRequest = match serde_json::from_str(line.trim()) {
        Ok(request) => request,
        Err(e) => {
            record_rejection("invalid_request");
            return send_error(&mut writer, &format!("invalid subscription request: {e}")).await;
        }
    };
    let kinds = match request.kinds() {
        Ok(kinds) => kinds,
        Err(reason) => {
            record_rejection("invalid_request");
            return send_error(&mut writer, &reason).await;
        }
    };
    let mut subscription = match broker.subscribe(&request.client_name, &kinds, &request.nets) {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(%peer, client = %request.client_name, error = %e, "subscription rejected");
            record_rejection("subscribe_rejected");
            return send_error(&mut writer, &e.to_string()).await;
        }
    };
    info!(%peer, subscription = %subscription.id(), "stream client subscribed");

    // 2. event stream
    let idle = sleep(idle_timeout);
    tokio::pin!(idle);
    let mut probe = [0u8; 256];

    let reason = loop {
        tokio::select! {
            next = subscription.next() => match next {
                Some(event) => {
                    let mut payload = serde_json::to_vec(&event)?;
                    payload.push(b'\n');
                    if let Err(e) = writer.write_all(&payload).await {
                        debug!(%peer, error = %e, "stream write failed");
                        break CloseReason::WriteFailed;
                    }
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                }
                None => break CloseReason::BrokerClosed,
            },
            read = reader.read(&mut probe) => match read {
                Ok(0) | Err(_) => break CloseReason::ClientDisconnected,
                // anything after the request line is ignored
                Ok(_) => {}
            },
            _ = &mut idle => break CloseReason::IdleTimeout,
            _ = cancel.cancelled() => break CloseReason::Shutdown,
        }
    };

    info!(
        %peer,
        subscription = %subscription.id(),
        delivered = subscription.delivered(),
        dropped = subscription.dropped(),
        reason = reason.as_str(),
        "stream client disconnected"
    );
    subscription.close();
    let _ = writer.shutdown().await;
    Ok(())
}

/// Write a single `{"error": ...}` line and close the write side.
async fn send_error<W>(writer: &mut W, message: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response = ErrorResponse {
        error: message.to_owned(),
    };
    let mut payload = serde_json::to_vec(&response)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.shutdown().await
}

fn record_rejection(reason: &'static str) {
    metrics::counter!(m::STREAM_REJECTED_TOTAL, m::LABEL_REASON => reason).increment(1);
}
