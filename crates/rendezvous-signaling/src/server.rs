//! WebSocket signaling server.
//!
//! Each accepted connection gets a reader task and a writer task. A single
//! relay task owns the [`SignalingRelay`] and the per-connection outbound
//! queues, so registry updates are applied one event at a time.

use crate::error::SignalingError;
use crate::registry::ConnectionId;
use crate::relay::{Delivery, RelayConfig, SignalingRelay};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

/// Signaling server configuration
#[derive(Debug, Clone)]
pub struct SignalingServerConfig {
    /// Relay behaviour
    pub relay: RelayConfig,
    /// Capacity of the event queue feeding the relay task
    pub channel_capacity: usize,
}

impl Default for SignalingServerConfig {
    fn default() -> Self {
        Self {
            relay: RelayConfig::default(),
            channel_capacity: 1024,
        }
    }
}

/// Events sent from connection tasks to the relay task
#[derive(Debug)]
enum RelayEvent {
    /// Handshake completed
    Opened {
        conn: ConnectionId,
        outbound: mpsc::UnboundedSender<String>,
    },
    /// Text frame received
    Message { conn: ConnectionId, text: String },
    /// Peer closed the connection
    Closed { conn: ConnectionId },
    /// Transport fault
    Failed { conn: ConnectionId, reason: String },
}

/// WebSocket signaling server
pub struct SignalingServer {
    listener: TcpListener,
    config: SignalingServerConfig,
}

impl SignalingServer {
    /// Bind the signaling listener
    ///
    /// # Errors
    ///
    /// Returns `SignalingError::Io` if the TCP listener cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        config: SignalingServerConfig,
    ) -> Result<Self, SignalingError> {
        let listener = TcpListener::bind(addr).await?;
        info!("Signaling relay listening on {}", listener.local_addr()?);
        Ok(Self { listener, config })
    }

    /// Get the bound address
    ///
    /// # Errors
    ///
    /// Returns `SignalingError::Io` if the address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, SignalingError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is cancelled
    ///
    /// # Errors
    ///
    /// Returns `SignalingError::RelayClosed` if the relay task stops.
    pub async fn run(self) -> Result<(), SignalingError> {
        let (events_tx, events_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let relay = SignalingRelay::new(self.config.relay.clone());
        tokio::spawn(relay_loop(relay, events_rx));

        let mut next_id: u64 = 0;

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            if events_tx.is_closed() {
                return Err(SignalingError::RelayClosed);
            }

            next_id += 1;
            let conn = ConnectionId::new(next_id);
            let events = events_tx.clone();

            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, peer, conn, events).await {
                    debug!(%conn, %peer, "connection ended: {}", e);
                }
            });
        }
    }
}

/// Apply events to the relay and route its deliveries
async fn relay_loop(mut relay: SignalingRelay, mut events: mpsc::Receiver<RelayEvent>) {
    let mut outbound: HashMap<ConnectionId, mpsc::UnboundedSender<String>> = HashMap::new();

    while let Some(event) = events.recv().await {
        let deliveries = match event {
            RelayEvent::Opened { conn, outbound: tx } => {
                outbound.insert(conn, tx);
                relay.on_open(conn);
                continue;
            }
            RelayEvent::Message { conn, text } => relay.on_message(conn, &text),
            RelayEvent::Closed { conn } => {
                outbound.remove(&conn);
                relay.on_close(conn)
            }
            RelayEvent::Failed { conn, reason } => {
                outbound.remove(&conn);
                relay.on_error(conn, &reason)
            }
        };

        for Delivery { to, text } in deliveries {
            match outbound.get(&to) {
                Some(tx) => {
                    if tx.send(text).is_err() {
                        trace!(conn = %to, "writer gone, dropping message");
                    }
                }
                None => trace!(conn = %to, "no outbound queue, dropping message"),
            }
        }
    }

    debug!("relay loop stopped");
}

/// Drive one WebSocket connection until it closes
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    conn: ConnectionId,
    events: mpsc::Sender<RelayEvent>,
) -> Result<(), SignalingError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut source) = ws.split();
    let (outbound, mut queue) = mpsc::unbounded_channel::<String>();

    events
        .send(RelayEvent::Opened { conn, outbound })
        .await
        .map_err(|_| SignalingError::RelayClosed)?;
    debug!(%conn, %peer, "WebSocket connected");

    // Ends once the relay drops the outbound sender for this connection
    let writer = tokio::spawn(async move {
        while let Some(text) = queue.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                trace!(%conn, "write failed: {}", e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let last = loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => {
                if events.send(RelayEvent::Message { conn, text }).await.is_err() {
                    break None;
                }
            }
            Some(Ok(Message::Close(_))) | None => break Some(RelayEvent::Closed { conn }),
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                break Some(RelayEvent::Failed {
                    conn,
                    reason: e.to_string(),
                });
            }
        }
    };

    if let Some(event) = last {
        if events.send(event).await.is_err() {
            writer.abort();
            return Err(SignalingError::RelayClosed);
        }
    } else {
        writer.abort();
        return Err(SignalingError::RelayClosed);
    }

    let _ = writer.await;
    debug!(%conn, %peer, "WebSocket disconnected");
    Ok(())
}
