//! Signaling protocol message definitions.
//!
//! Messages are JSON objects carried in WebSocket text frames and tagged by
//! their `type` field.
//!
//! Inbound (client → relay):
//! ```json
//! {"type": "join",  "room": "r1", "userId": "alice"}
//! {"type": "offer", "room": "r1", "userId": "bob", "target": "alice", "data": {"sdp": "..."}}
//! {"type": "leave", "room": "r1", "userId": "alice"}
//! ```
//!
//! Outbound (relay → client):
//! ```json
//! {"type": "user-joined", "userId": "bob"}
//! {"type": "offer", "sender": "bob", "data": {"sdp": "..."}}
//! {"type": "peers", "peers": ["alice"]}
//! ```

use crate::error::ProtocolError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Room used when a message carries no `room`
pub const DEFAULT_ROOM: &str = "default";

fn default_room() -> String {
    DEFAULT_ROOM.to_string()
}

/// Treat `"room": null` the same as an absent room
fn room_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_room))
}

/// Join or leave a room
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    /// Room key
    #[serde(default = "default_room", deserialize_with = "room_or_default")]
    pub room: String,
    /// Sender's user ID
    pub user_id: String,
}

/// Offer, answer or candidate addressed to one peer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    /// Room key
    #[serde(default = "default_room", deserialize_with = "room_or_default")]
    pub room: String,
    /// Sender's user ID
    pub user_id: String,
    /// Recipient's user ID
    pub target: String,
    /// Negotiation payload, never inspected by the relay
    #[serde(default)]
    pub data: Value,
}

/// Client → relay control messages
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Register the sender in a room
    Join(Presence),
    /// Session description offer
    Offer(Signal),
    /// Session description answer
    Answer(Signal),
    /// Connectivity candidate
    Candidate(Signal),
    /// Remove the sender from a room
    Leave(Presence),
}

impl ControlMessage {
    /// Decode a control message from its JSON text
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Decode` for invalid JSON, an unknown `type`,
    /// or missing required fields.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    /// Get the message type name
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::Candidate(_) => "candidate",
            Self::Leave(_) => "leave",
        }
    }

    /// Room the message applies to
    #[must_use]
    pub fn room(&self) -> &str {
        match self {
            Self::Join(p) | Self::Leave(p) => &p.room,
            Self::Offer(s) | Self::Answer(s) | Self::Candidate(s) => &s.room,
        }
    }

    /// Sender's user ID
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::Join(p) | Self::Leave(p) => &p.user_id,
            Self::Offer(s) | Self::Answer(s) | Self::Candidate(s) => &s.user_id,
        }
    }
}

/// Negotiation message kinds forwarded between peers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Offer
    Offer,
    /// Answer
    Answer,
    /// Candidate
    Candidate,
}

/// Relay → client messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayMessage {
    /// A user joined the room
    UserJoined {
        /// Joining user's ID
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// A user left the room or disconnected
    UserLeft {
        /// Departing user's ID
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Forwarded offer
    Offer {
        /// Originating user's ID
        sender: String,
        /// Opaque payload
        data: Value,
    },
    /// Forwarded answer
    Answer {
        /// Originating user's ID
        sender: String,
        /// Opaque payload
        data: Value,
    },
    /// Forwarded candidate
    Candidate {
        /// Originating user's ID
        sender: String,
        /// Opaque payload
        data: Value,
    },
    /// Other members already in the room, sent to a joiner
    Peers {
        /// Member user IDs
        peers: Vec<String>,
    },
}

impl RelayMessage {
    /// Build a forwarded negotiation message
    #[must_use]
    pub fn signal(kind: SignalKind, sender: String, data: Value) -> Self {
        match kind {
            SignalKind::Offer => Self::Offer { sender, data },
            SignalKind::Answer => Self::Answer { sender, data },
            SignalKind::Candidate => Self::Candidate { sender, data },
        }
    }

    /// Serialize message to JSON text
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Encode` if serialization fails.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Deserialize message from JSON text
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Decode` if the text is not a relay message.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    /// Get the message type name
    #[must_use]
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::UserJoined { .. } => "user-joined",
            Self::UserLeft { .. } => "user-left",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Candidate { .. } => "candidate",
            Self::Peers { .. } => "peers",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_join() {
        let msg = ControlMessage::decode(r#"{"type":"join","room":"r1","userId":"alice"}"#).unwrap();
        assert_eq!(
            msg,
            ControlMessage::Join(Presence {
                room: "r1".to_string(),
                user_id: "alice".to_string(),
            })
        );
        assert_eq!(msg.kind(), "join");
    }

    #[test]
    fn test_room_defaults() {
        let msg = ControlMessage::decode(r#"{"type":"leave","userId":"alice"}"#).unwrap();
        assert_eq!(msg.room(), DEFAULT_ROOM);

        let msg = ControlMessage::decode(r#"{"type":"join","room":null,"userId":"alice"}"#).unwrap();
        assert_eq!(msg.room(), DEFAULT_ROOM);
    }

    #[test]
    fn test_decode_signal_keeps_data_opaque() {
        let text = r#"{"type":"candidate","room":"r1","userId":"bob","target":"alice",
            "data":{"candidate":"candidate:1 1 UDP 2130706431 10.0.0.2 5000 typ host","sdpMLineIndex":0,"nested":[1,2.5,null,true]}}"#;
        let msg = ControlMessage::decode(text).unwrap();

        let ControlMessage::Candidate(signal) = msg else {
            panic!("expected candidate");
        };
        assert_eq!(signal.user_id, "bob");
        assert_eq!(signal.target, "alice");
        assert_eq!(
            signal.data,
            json!({
                "candidate": "candidate:1 1 UDP 2130706431 10.0.0.2 5000 typ host",
                "sdpMLineIndex": 0,
                "nested": [1, 2.5, null, true]
            })
        );
    }

    #[test]
    fn test_missing_data_is_null() {
        let msg =
            ControlMessage::decode(r#"{"type":"answer","userId":"bob","target":"alice"}"#).unwrap();
        let ControlMessage::Answer(signal) = msg else {
            panic!("expected answer");
        };
        assert_eq!(signal.data, Value::Null);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let cases = [
            "",
            "not json",
            "[]",
            "{}",
            r#"{"type":"shout","userId":"alice"}"#,
            r#"{"type":"user-joined","userId":"alice"}"#,
            r#"{"room":"r1","userId":"alice"}"#,
            r#"{"type":"join","room":"r1"}"#,
            r#"{"type":"offer","room":"r1","userId":"bob","data":{}}"#,
            r#"{"type":"join","room":7,"userId":"alice"}"#,
        ];

        for case in cases {
            assert!(ControlMessage::decode(case).is_err(), "accepted {case:?}");
        }
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let msg = ControlMessage::decode(r#"{"type":"join","userId":"alice","extra":1}"#).unwrap();
        assert_eq!(msg.user_id(), "alice");
    }

    #[test]
    fn test_encode_user_joined() {
        let msg = RelayMessage::UserJoined {
            user_id: "bob".to_string(),
        };
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "user-joined", "userId": "bob"}));
    }

    #[test]
    fn test_encode_signal() {
        let msg = RelayMessage::signal(SignalKind::Offer, "bob".to_string(), json!({"sdp": "v=0"}));
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "offer", "sender": "bob", "data": {"sdp": "v=0"}}));
        assert_eq!(msg.message_type(), "offer");
    }

    #[test]
    fn test_encode_peers() {
        let msg = RelayMessage::Peers {
            peers: vec!["alice".to_string(), "carol".to_string()],
        };
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "peers", "peers": ["alice", "carol"]}));
    }

    #[test]
    fn test_error_display() {
        let err = ControlMessage::decode("nope").unwrap_err();
        assert!(err.to_string().starts_with("malformed control message"));
    }
}
