//! Stateless Binding responder.

use crate::message::{BindingRequest, encode_binding_response};
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, trace};

/// Answers Binding Requests with the address they were received from
///
/// Holds no state between datagrams. Anything that is not a Binding Request
/// is ignored without a reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingResponder;

impl BindingResponder {
    /// Create a new responder
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Handle one inbound datagram
    ///
    /// Returns the response bytes and the address to send them to, or `None`
    /// if the datagram does not qualify as a Binding Request.
    #[must_use]
    pub fn handle_datagram(
        &self,
        datagram: &[u8],
        source: SocketAddr,
    ) -> Option<(Vec<u8>, SocketAddr)> {
        let Some(request) = BindingRequest::parse(datagram) else {
            trace!(%source, len = datagram.len(), "ignoring non-binding datagram");
            return None;
        };

        let reflected = reflected_address(source);
        let response = encode_binding_response(request.transaction_id(), reflected);

        debug!(
            %source,
            txid = %hex::encode(request.transaction_id()),
            "binding request"
        );

        Some((response, source))
    }
}

/// Unwrap IPv4-mapped IPv6 sources seen on dual-stack sockets
fn reflected_address(source: SocketAddr) -> SocketAddr {
    match source.ip() {
        IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
            Some(v4) => SocketAddr::new(IpAddr::V4(v4), source.port()),
            None => source,
        },
        IpAddr::V4(_) => source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{HEADER_SIZE, parse_binding_response};

    fn request(txid: [u8; 12]) -> Vec<u8> {
        BindingRequest::new(txid).encode()
    }

    #[test]
    fn test_replies_to_source() {
        let responder = BindingResponder::new();
        let source: SocketAddr = "198.51.100.20:5000".parse().unwrap();

        let (response, to) = responder.handle_datagram(&request([7u8; 12]), source).unwrap();
        assert_eq!(to, source);

        let (txid, mapped) = parse_binding_response(&response).unwrap();
        assert_eq!(txid, [7u8; 12]);
        assert_eq!(mapped, source);
    }

    #[test]
    fn test_ignores_short_datagrams() {
        let responder = BindingResponder::new();
        let source: SocketAddr = "198.51.100.20:5000".parse().unwrap();

        for len in 0..HEADER_SIZE {
            let mut datagram = request([1u8; 12]);
            datagram.truncate(len);
            assert!(responder.handle_datagram(&datagram, source).is_none());
        }
    }

    #[test]
    fn test_ignores_non_binding_requests() {
        let responder = BindingResponder::new();
        let source: SocketAddr = "198.51.100.20:5000".parse().unwrap();

        let mut datagram = request([1u8; 12]);
        datagram[0] = 0x01; // 0x0101, a success response
        assert!(responder.handle_datagram(&datagram, source).is_none());

        let junk = [0xffu8; 64];
        assert!(responder.handle_datagram(&junk, source).is_none());
    }

    #[test]
    fn test_known_vector() {
        let responder = BindingResponder::new();
        let txid = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B];
        let source: SocketAddr = "203.0.113.7:54321".parse().unwrap();

        let (response, _) = responder.handle_datagram(&request(txid), source).unwrap();
        assert_eq!(&response[8..20], &txid);

        let (_, mapped) = parse_binding_response(&response).unwrap();
        assert_eq!(mapped, source);
    }

    #[test]
    fn test_ipv6_source() {
        let responder = BindingResponder::new();
        let source: SocketAddr = "[2001:db8::42]:61000".parse().unwrap();

        let (response, to) = responder.handle_datagram(&request([3u8; 12]), source).unwrap();
        assert_eq!(to, source);
        assert_eq!(response.len(), 44);

        let (_, mapped) = parse_binding_response(&response).unwrap();
        assert_eq!(mapped, source);
    }

    #[test]
    fn test_ipv4_mapped_source_reflected_as_ipv4() {
        let responder = BindingResponder::new();
        let source: SocketAddr = "[::ffff:192.0.2.1]:4000".parse().unwrap();

        let (response, to) = responder.handle_datagram(&request([3u8; 12]), source).unwrap();
        assert_eq!(to, source);
        assert_eq!(response.len(), 32);

        let (_, mapped) = parse_binding_response(&response).unwrap();
        assert_eq!(mapped, "192.0.2.1:4000".parse::<SocketAddr>().unwrap());
    }
}
