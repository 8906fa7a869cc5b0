//! STUN Binding message encoding (RFC 5389)
//!
//! Only the Binding method is supported. Requests are classified from their
//! 20-byte header alone; responses carry a single XOR-MAPPED-ADDRESS
//! attribute.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |0 0|     STUN Message Type     |         Message Length        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Magic Cookie                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                                                               |
//! |                     Transaction ID (96 bits)                  |
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use crate::error::StunError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// STUN magic cookie (0x2112A442)
pub const MAGIC_COOKIE: u32 = 0x2112_A442;

/// STUN message header size (20 bytes)
pub const HEADER_SIZE: usize = 20;

/// Transaction ID size (96 bits)
pub const TRANSACTION_ID_SIZE: usize = 12;

/// XOR-MAPPED-ADDRESS attribute type
pub const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;

/// Binding Request message type (0x0001)
pub const BINDING_REQUEST: u16 = Method::Binding.encode(MessageClass::Request);

/// Binding Success Response message type (0x0101)
pub const BINDING_SUCCESS_RESPONSE: u16 = Method::Binding.encode(MessageClass::SuccessResponse);

const ATTR_HEADER_SIZE: usize = 4;
const FAMILY_IPV4: u8 = 0x01;
const FAMILY_IPV6: u8 = 0x02;

/// Offset of the XOR key (magic cookie followed by transaction ID)
const XOR_KEY_OFFSET: usize = 4;

/// 96-bit STUN transaction identifier
pub type TransactionId = [u8; TRANSACTION_ID_SIZE];

/// STUN message class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    /// Request message
    Request,
    /// Indication (no response expected)
    Indication,
    /// Success response
    SuccessResponse,
    /// Error response
    ErrorResponse,
}

/// STUN method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Binding request/response
    Binding,
}

impl Method {
    /// Encode method and class into the 16-bit message type
    ///
    /// RFC 5389 Section 6 encoding:
    /// ```text
    ///  0                 1
    ///  2  3  4 5 6 7 8 9 0 1 2 3 4 5
    /// +--+--+-+-+-+-+-+-+-+-+-+-+-+-+
    /// |M |M |M|M|M|C|M|M|M|C|M|M|M|M|
    /// |11|10|9|8|7|1|6|5|4|0|3|2|1|0|
    /// +--+--+-+-+-+-+-+-+-+-+-+-+-+-+
    /// ```
    #[must_use]
    pub const fn encode(self, class: MessageClass) -> u16 {
        let method: u16 = match self {
            Self::Binding => 0x0001,
        };

        let class_bits: u16 = match class {
            MessageClass::Request => 0b00,
            MessageClass::Indication => 0b01,
            MessageClass::SuccessResponse => 0b10,
            MessageClass::ErrorResponse => 0b11,
        };

        let m0_m3 = method & 0x0F;
        let c0 = (class_bits & 0x01) << 4;
        let m4_m6 = (method & 0x70) << 1;
        let c1 = (class_bits & 0x02) << 7;
        let m7_m11 = (method & 0xF80) << 2;

        m0_m3 | c0 | m4_m6 | c1 | m7_m11
    }

    /// Decode a 16-bit message type into method and class
    ///
    /// # Errors
    ///
    /// Returns `StunError::InvalidMessageType` for any method other than Binding.
    pub fn decode(msg_type: u16) -> Result<(Self, MessageClass), StunError> {
        let c0 = (msg_type >> 4) & 0x01;
        let c1 = (msg_type >> 8) & 0x01;

        let class = match c0 | (c1 << 1) {
            0b00 => MessageClass::Request,
            0b01 => MessageClass::Indication,
            0b10 => MessageClass::SuccessResponse,
            _ => MessageClass::ErrorResponse,
        };

        let m0_m3 = msg_type & 0x0F;
        let m4_m6 = (msg_type >> 1) & 0x70;
        let m7_m11 = (msg_type >> 2) & 0xF80;

        match m0_m3 | m4_m6 | m7_m11 {
            0x0001 => Ok((Self::Binding, class)),
            _ => Err(StunError::InvalidMessageType(msg_type)),
        }
    }
}

/// A datagram classified as a Binding Request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingRequest {
    transaction_id: TransactionId,
}

impl BindingRequest {
    /// Create a request with the given transaction ID
    #[must_use]
    pub fn new(transaction_id: TransactionId) -> Self {
        Self { transaction_id }
    }

    /// Create a request with a random transaction ID
    #[must_use]
    pub fn new_random() -> Self {
        use rand::RngCore;
        let mut transaction_id = [0u8; TRANSACTION_ID_SIZE];
        rand::thread_rng().fill_bytes(&mut transaction_id);
        Self { transaction_id }
    }

    /// Classify a datagram
    ///
    /// Returns `None` unless the datagram is at least one header long and its
    /// first two bytes are the Binding Request type. The magic cookie and the
    /// length field are not checked.
    #[must_use]
    pub fn parse(datagram: &[u8]) -> Option<Self> {
        if datagram.len() < HEADER_SIZE {
            return None;
        }

        if u16::from_be_bytes([datagram[0], datagram[1]]) != BINDING_REQUEST {
            return None;
        }

        let mut transaction_id = [0u8; TRANSACTION_ID_SIZE];
        transaction_id.copy_from_slice(&datagram[8..HEADER_SIZE]);
        Some(Self { transaction_id })
    }

    /// Transaction ID carried by the request
    #[must_use]
    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// Encode as a bare 20-byte Binding Request
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.extend_from_slice(&BINDING_REQUEST.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
        bytes.extend_from_slice(&self.transaction_id);
        bytes
    }
}

/// XOR-MAPPED-ADDRESS attribute (0x0020)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorMappedAddress(pub SocketAddr);

impl XorMappedAddress {
    /// Append the attribute to a message whose header is already in place
    ///
    /// The address is XORed against the buffer bytes starting at offset 4,
    /// i.e. the magic cookie (IPv4) or magic cookie and transaction ID (IPv6),
    /// so the header must be fully written first.
    pub fn encode_into(&self, message: &mut Vec<u8>) {
        debug_assert!(message.len() >= HEADER_SIZE, "header must precede attributes");

        let addr = self.0;
        let xor_port = addr.port() ^ (MAGIC_COOKIE >> 16) as u16;
        let key = &message[XOR_KEY_OFFSET..HEADER_SIZE];

        let mut value = Vec::with_capacity(20);
        value.push(0); // Reserved
        match addr.ip() {
            IpAddr::V4(ip) => {
                value.push(FAMILY_IPV4);
                value.extend_from_slice(&xor_port.to_be_bytes());
                value.extend(ip.octets().iter().zip(key).map(|(octet, k)| octet ^ k));
            }
            IpAddr::V6(ip) => {
                value.push(FAMILY_IPV6);
                value.extend_from_slice(&xor_port.to_be_bytes());
                value.extend(ip.octets().iter().zip(key).map(|(octet, k)| octet ^ k));
            }
        }

        message.extend_from_slice(&ATTR_XOR_MAPPED_ADDRESS.to_be_bytes());
        message.extend_from_slice(&(value.len() as u16).to_be_bytes());
        message.extend_from_slice(&value);
    }

    /// Decode an attribute value
    ///
    /// `key` is the 16 bytes following the message type and length: magic
    /// cookie then transaction ID.
    ///
    /// # Errors
    ///
    /// Returns `StunError::InvalidAttribute` if the value is truncated and
    /// `StunError::UnsupportedFamily` for unknown address families.
    pub fn decode(value: &[u8], key: &[u8; 16]) -> Result<Self, StunError> {
        if value.len() < 4 {
            return Err(StunError::InvalidAttribute);
        }

        let family = value[1];
        let port = u16::from_be_bytes([value[2], value[3]]) ^ (MAGIC_COOKIE >> 16) as u16;

        let ip = match family {
            FAMILY_IPV4 => {
                let raw = value.get(4..8).ok_or(StunError::InvalidAttribute)?;
                let mut octets = [0u8; 4];
                for (i, octet) in octets.iter_mut().enumerate() {
                    *octet = raw[i] ^ key[i];
                }
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            FAMILY_IPV6 => {
                let raw = value.get(4..20).ok_or(StunError::InvalidAttribute)?;
                let mut octets = [0u8; 16];
                for (i, octet) in octets.iter_mut().enumerate() {
                    *octet = raw[i] ^ key[i];
                }
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            other => return Err(StunError::UnsupportedFamily(other)),
        };

        Ok(Self(SocketAddr::new(ip, port)))
    }
}

/// Build a Binding Success Response reflecting `mapped`
///
/// The length field is written as a placeholder and patched once the
/// attribute has been appended.
#[must_use]
pub fn encode_binding_response(transaction_id: &TransactionId, mapped: SocketAddr) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_SIZE + ATTR_HEADER_SIZE + 20);

    bytes.extend_from_slice(&BINDING_SUCCESS_RESPONSE.to_be_bytes());

    // Message Length - placeholder
    let length_offset = bytes.len();
    bytes.extend_from_slice(&[0u8; 2]);

    bytes.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
    bytes.extend_from_slice(transaction_id);

    XorMappedAddress(mapped).encode_into(&mut bytes);

    // Update message length (excludes 20-byte header)
    let msg_length = bytes.len() - HEADER_SIZE;
    bytes[length_offset..length_offset + 2].copy_from_slice(&(msg_length as u16).to_be_bytes());

    bytes
}

/// Decode a Binding Success Response into its transaction ID and mapped address
///
/// # Errors
///
/// Returns an error if the message is truncated, carries a wrong magic cookie
/// or message type, or has no usable XOR-MAPPED-ADDRESS attribute.
pub fn parse_binding_response(bytes: &[u8]) -> Result<(TransactionId, SocketAddr), StunError> {
    if bytes.len() < HEADER_SIZE {
        return Err(StunError::MessageTooShort);
    }

    let msg_type = u16::from_be_bytes([bytes[0], bytes[1]]);
    let msg_length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    let magic_cookie = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    if magic_cookie != MAGIC_COOKIE {
        return Err(StunError::InvalidMagicCookie);
    }

    match Method::decode(msg_type)? {
        (Method::Binding, MessageClass::SuccessResponse) => {}
        _ => return Err(StunError::InvalidMessageType(msg_type)),
    }

    let end = HEADER_SIZE + msg_length;
    if bytes.len() < end {
        return Err(StunError::MessageTooShort);
    }

    let mut transaction_id = [0u8; TRANSACTION_ID_SIZE];
    transaction_id.copy_from_slice(&bytes[8..HEADER_SIZE]);

    let mut key = [0u8; 16];
    key.copy_from_slice(&bytes[XOR_KEY_OFFSET..HEADER_SIZE]);

    let mut offset = HEADER_SIZE;
    while offset + ATTR_HEADER_SIZE <= end {
        let attr_type = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
        let attr_length = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
        offset += ATTR_HEADER_SIZE;

        if offset + attr_length > end {
            return Err(StunError::InvalidAttribute);
        }

        if attr_type == ATTR_XOR_MAPPED_ADDRESS {
            let XorMappedAddress(addr) =
                XorMappedAddress::decode(&bytes[offset..offset + attr_length], &key)?;
            return Ok((transaction_id, addr));
        }

        // Skip value and padding to 4-byte boundary
        offset += attr_length + (4 - (attr_length % 4)) % 4;
    }

    Err(StunError::MissingAttribute)
}
