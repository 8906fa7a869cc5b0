//! # Rendezvous STUN
//!
//! Minimal STUN (RFC 5389) Binding support for WebRTC peers discovering
//! their public address.
//!
//! This crate provides:
//! - Binding Request classification and Binding Success Response encoding
//! - XOR-MAPPED-ADDRESS for IPv4 and IPv6
//! - A stateless [`BindingResponder`] and its UDP [`StunServer`]
//! - A [`StunClient`] for querying a STUN server
//!
//! Only the Binding method is implemented. There is no MESSAGE-INTEGRITY,
//! FINGERPRINT, authentication or rate limiting: every well-formed Binding
//! Request receives exactly one response, sent to the datagram's source.
//!
//! ## Example
//!
//! ```
//! use rendezvous_stun::{BindingRequest, BindingResponder, parse_binding_response};
//! use std::net::SocketAddr;
//!
//! let responder = BindingResponder::new();
//! let source: SocketAddr = "203.0.113.7:54321".parse().unwrap();
//! let request = BindingRequest::new([0u8; 12]).encode();
//!
//! let (response, to) = responder.handle_datagram(&request, source).unwrap();
//! assert_eq!(to, source);
//!
//! let (_, mapped) = parse_binding_response(&response).unwrap();
//! assert_eq!(mapped, source);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod message;
pub mod responder;
pub mod server;

pub use client::StunClient;
pub use error::StunError;
pub use message::{
    BINDING_REQUEST, BINDING_SUCCESS_RESPONSE, BindingRequest, HEADER_SIZE, MAGIC_COOKIE,
    MessageClass, Method, TransactionId, XorMappedAddress, encode_binding_response,
    parse_binding_response,
};
pub use responder::BindingResponder;
pub use server::StunServer;

/// Default STUN port
pub const DEFAULT_STUN_PORT: u16 = 3478;
