//! # Rendezvous Signaling
//!
//! Room-based WebRTC signaling relay over WebSocket.
//!
//! Clients join named rooms under a self-chosen user ID and exchange
//! offers, answers and candidates addressed to other members of the same
//! room. Payloads are forwarded without inspection. Members are told when
//! others join, leave or disconnect.
//!
//! This crate provides:
//! - JSON control and relay message types ([`ControlMessage`], [`RelayMessage`])
//! - A [`RoomRegistry`] mapping room → user ID → connection
//! - The transport-independent [`SignalingRelay`] state machine
//! - A tokio WebSocket [`SignalingServer`]
//!
//! User IDs are not authenticated. A repeated join with the same user ID in
//! the same room replaces the earlier registration.
//!
//! ## Example
//!
//! ```
//! use rendezvous_signaling::{ConnectionId, RelayConfig, SignalingRelay};
//!
//! let mut relay = SignalingRelay::new(RelayConfig::default());
//! let (alice, bob) = (ConnectionId::new(1), ConnectionId::new(2));
//! relay.on_open(alice);
//! relay.on_open(bob);
//!
//! relay.on_message(alice, r#"{"type":"join","room":"r1","userId":"alice"}"#);
//! relay.on_message(bob, r#"{"type":"join","room":"r1","userId":"bob"}"#);
//!
//! let out = relay.on_message(
//!     bob,
//!     r#"{"type":"offer","room":"r1","userId":"bob","target":"alice","data":{"sdp":"v=0"}}"#,
//! );
//! assert_eq!(out.len(), 1);
//! assert_eq!(out[0].to, alice);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;

pub use error::{ProtocolError, SignalingError};
pub use protocol::{ControlMessage, DEFAULT_ROOM, Presence, RelayMessage, Signal, SignalKind};
pub use registry::{ConnectionId, Membership, RoomRegistry};
pub use relay::{Delivery, RelayConfig, RelayStats, SignalingRelay};
pub use server::{SignalingServer, SignalingServerConfig};

/// Default signaling port
pub const DEFAULT_SIGNALING_PORT: u16 = 8080;
