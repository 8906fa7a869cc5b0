//! Signaling relay state machine.
//!
//! [`SignalingRelay`] consumes connection lifecycle events and inbound text
//! messages and returns the text messages to send, as [`Delivery`] values.
//! It performs no I/O and must be driven by one event at a time.

use crate::protocol::{ControlMessage, Presence, RelayMessage, Signal, SignalKind};
use crate::registry::{ConnectionId, RoomRegistry};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, info, trace, warn};

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Send a `peers` list to each joining connection
    pub announce_peers: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            announce_peers: true,
        }
    }
}

/// A text message to send to one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Destination connection
    pub to: ConnectionId,
    /// JSON-encoded relay message
    pub text: String,
}

/// Relay bookkeeping counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayStats {
    /// Open connections
    pub live_connections: usize,
    /// Non-empty rooms
    pub rooms: usize,
    /// (room, user ID) entries
    pub memberships: usize,
}

/// Room-based signaling relay
pub struct SignalingRelay {
    config: RelayConfig,
    /// Open connections (diagnostics only)
    live: HashSet<ConnectionId>,
    registry: RoomRegistry,
}

impl SignalingRelay {
    /// Create a relay with an empty registry
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            live: HashSet::new(),
            registry: RoomRegistry::new(),
        }
    }

    /// A connection was opened
    pub fn on_open(&mut self, conn: ConnectionId) {
        self.live.insert(conn);
        debug!(%conn, live = self.live.len(), "connection opened");
    }

    /// A text message arrived from `from`
    ///
    /// Undecodable messages are dropped without a reply.
    pub fn on_message(&mut self, from: ConnectionId, text: &str) -> Vec<Delivery> {
        let message = match ControlMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                trace!(%from, error = %e, "dropping control message");
                return Vec::new();
            }
        };

        trace!(
            %from,
            kind = message.kind(),
            room = message.room(),
            user_id = message.user_id(),
            "control message"
        );

        match message {
            ControlMessage::Join(presence) => self.join(from, presence),
            ControlMessage::Offer(signal) => self.forward(SignalKind::Offer, signal),
            ControlMessage::Answer(signal) => self.forward(SignalKind::Answer, signal),
            ControlMessage::Candidate(signal) => self.forward(SignalKind::Candidate, signal),
            ControlMessage::Leave(presence) => self.leave(presence),
        }
    }

    /// A connection was closed
    ///
    /// Every membership the connection held is removed and the remaining
    /// members of each affected room are sent `user-left`.
    pub fn on_close(&mut self, conn: ConnectionId) -> Vec<Delivery> {
        self.live.remove(&conn);

        let mut deliveries = Vec::new();
        for membership in self.registry.purge(conn) {
            let notice = RelayMessage::UserLeft {
                user_id: membership.user_id,
            };
            deliveries.extend(self.broadcast(&membership.room, &notice, Some(conn)));
        }

        let stats = self.stats();
        debug!(
            %conn,
            live = stats.live_connections,
            rooms = stats.rooms,
            memberships = stats.memberships,
            "connection closed"
        );

        deliveries
    }

    /// The transport reported a fault on `conn`
    ///
    /// Faults are terminal: the connection is cleaned up exactly as on close.
    pub fn on_error(&mut self, conn: ConnectionId, reason: &dyn fmt::Display) -> Vec<Delivery> {
        warn!(%conn, %reason, "connection error");
        self.on_close(conn)
    }

    /// Encode `message` for every member of `room` except `exclude`
    ///
    /// Returns nothing for an unknown or empty room.
    #[must_use]
    pub fn broadcast(
        &self,
        room: &str,
        message: &RelayMessage,
        exclude: Option<ConnectionId>,
    ) -> Vec<Delivery> {
        let recipients: Vec<ConnectionId> = self
            .registry
            .members(room)
            .into_iter()
            .map(|(_, conn)| conn)
            .filter(|conn| Some(*conn) != exclude)
            .collect();

        if recipients.is_empty() {
            return Vec::new();
        }

        let Some(text) = encode(message) else {
            return Vec::new();
        };

        recipients
            .into_iter()
            .map(|to| Delivery {
                to,
                text: text.clone(),
            })
            .collect()
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            live_connections: self.live.len(),
            rooms: self.registry.room_count(),
            memberships: self.registry.membership_count(),
        }
    }

    /// Whether `conn` is open
    #[must_use]
    pub fn is_live(&self, conn: ConnectionId) -> bool {
        self.live.contains(&conn)
    }

    /// Read access to the room registry
    #[must_use]
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    fn join(&mut self, from: ConnectionId, presence: Presence) -> Vec<Delivery> {
        let Presence { room, user_id } = presence;

        if let Some(previous) = self.registry.join(&room, &user_id, from) {
            if previous != from {
                // Overwrite kept for compatibility; the previous holder gets no notice
                warn!(
                    %room,
                    %user_id,
                    %previous,
                    %from,
                    "user ID re-registered by another connection"
                );
            }
        }

        info!(%room, %user_id, conn = %from, "user joined");

        let mut deliveries = Vec::new();

        if self.config.announce_peers {
            let peers = self
                .registry
                .members(&room)
                .into_iter()
                .filter(|(member, _)| *member != user_id)
                .map(|(member, _)| member.to_string())
                .collect();

            if let Some(text) = encode(&RelayMessage::Peers { peers }) {
                deliveries.push(Delivery { to: from, text });
            }
        }

        let notice = RelayMessage::UserJoined { user_id };
        deliveries.extend(self.broadcast(&room, &notice, Some(from)));
        deliveries
    }

    fn forward(&self, kind: SignalKind, signal: Signal) -> Vec<Delivery> {
        let Signal {
            room,
            user_id,
            target,
            data,
        } = signal;

        let Some(to) = self.registry.lookup(&room, &target) else {
            debug!(%room, sender = %user_id, %target, ?kind, "target not in room, dropping");
            return Vec::new();
        };

        encode(&RelayMessage::signal(kind, user_id, data))
            .map(|text| vec![Delivery { to, text }])
            .unwrap_or_default()
    }

    fn leave(&mut self, presence: Presence) -> Vec<Delivery> {
        let Presence { room, user_id } = presence;

        if self.registry.leave(&room, &user_id).is_some() {
            info!(%room, %user_id, "user left");
        } else {
            debug!(%room, %user_id, "leave for unregistered user");
        }

        let notice = RelayMessage::UserLeft { user_id };
        self.broadcast(&room, &notice, None)
    }
}

fn encode(message: &RelayMessage) -> Option<String> {
    match message.encode() {
        Ok(text) => Some(text),
        Err(e) => {
            error!(kind = message.message_type(), error = %e, "failed to encode relay message");
            None
        }
    }
}
