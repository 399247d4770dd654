//! Messages exchanged between the hub and its clients.
//!
//! Every message travels as an [`Envelope`]: a numeric type tag plus a body
//! string holding the type-specific JSON payload (or plain text for server
//! messages). On the wire each envelope is one line of JSON.

use crate::diamond::DiamondId;
use crate::game_match::Match;
use crate::geometry::Point;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Sentinel used on the wire for "no diamond claimed"
pub const NO_DIAMOND: i64 = -1;

/// Envelope and payload decoding failures
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown message type {0}")]
    UnknownType(u8),
    #[error("expected message type {expected:?}, got {actual:?}")]
    UnexpectedType {
        expected: MessageType,
        actual: MessageType,
    },
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Numeric tag identifying the payload carried by an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MessageType {
    GameInitialization = 0,
    Update = 1,
    ServerMessage = 2,
    JoinAccepted = 3,
    PlayerJoin = 4,
    PlayerLeft = 5,
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::GameInitialization),
            1 => Ok(MessageType::Update),
            2 => Ok(MessageType::ServerMessage),
            3 => Ok(MessageType::JoinAccepted),
            4 => Ok(MessageType::PlayerJoin),
            5 => Ok(MessageType::PlayerLeft),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

/// Wire envelope: `{ "Type": int, "Body": string }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Type")]
    pub kind: MessageType,
    #[serde(rename = "Body")]
    pub body: String,
}

impl Envelope {
    /// Wraps `payload` serialized as JSON
    pub fn new<T: Serialize>(kind: MessageType, payload: &T) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind,
            body: serde_json::to_string(payload)?,
        })
    }

    /// Server message carrying free text as its body
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            kind: MessageType::ServerMessage,
            body: message.into(),
        }
    }

    /// Decodes the body, checking the envelope carries `expected`
    pub fn payload<T: DeserializeOwned>(&self, expected: MessageType) -> Result<T, ProtocolError> {
        if self.kind != expected {
            return Err(ProtocolError::UnexpectedType {
                expected,
                actual: self.kind,
            });
        }
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Newline-terminated JSON form
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Parses one line, surrounding whitespace allowed
    pub fn from_line(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

/// Roster entry for a connected player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoin {
    pub id: u32,
    pub name: String,
    pub position: Point,
    #[serde(default)]
    pub score: u32,
}

/// Full (re)initialization: the match, time left and the current roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInit {
    #[serde(rename = "match")]
    pub game_match: Match,
    pub remaining_ms: u64,
    #[serde(default)]
    pub players: Vec<PlayerJoin>,
}

impl MatchInit {
    pub fn remaining(&self) -> Duration {
        Duration::from_millis(self.remaining_ms)
    }
}

/// Position report from a player, optionally claiming a diamond.
///
/// Clients fill `position` and `diamond_id`; the server overwrites `id`
/// and `score` and resets `diamond_id` to [`NO_DIAMOND`] when the claim did
/// not consume a diamond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub id: u32,
    pub position: Point,
    #[serde(default = "no_diamond")]
    pub diamond_id: i64,
    #[serde(default)]
    pub score: u32,
}

fn no_diamond() -> i64 {
    NO_DIAMOND
}

impl Update {
    pub fn moved(position: Point) -> Self {
        Self {
            id: 0,
            position,
            diamond_id: NO_DIAMOND,
            score: 0,
        }
    }

    pub fn claiming(position: Point, diamond: DiamondId) -> Self {
        Self {
            diamond_id: i64::from(diamond),
            ..Self::moved(position)
        }
    }

    /// The claimed diamond, if the field holds a valid id
    pub fn claimed_diamond(&self) -> Option<DiamondId> {
        DiamondId::try_from(self.diamond_id).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAccepted {
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeft {
    pub id: u32,
}

/// Decoded form of every message the server sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    MatchInit(MatchInit),
    Update(Update),
    ServerMessage(String),
    JoinAccepted(JoinAccepted),
    PlayerJoined(PlayerJoin),
    PlayerLeft(PlayerLeft),
}

impl ServerEvent {
    pub fn kind(&self) -> MessageType {
        match self {
            ServerEvent::MatchInit(_) => MessageType::GameInitialization,
            ServerEvent::Update(_) => MessageType::Update,
            ServerEvent::ServerMessage(_) => MessageType::ServerMessage,
            ServerEvent::JoinAccepted(_) => MessageType::JoinAccepted,
            ServerEvent::PlayerJoined(_) => MessageType::PlayerJoin,
            ServerEvent::PlayerLeft(_) => MessageType::PlayerLeft,
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope, ProtocolError> {
        let kind = self.kind();
        match self {
            ServerEvent::MatchInit(init) => Envelope::new(kind, init),
            ServerEvent::Update(update) => Envelope::new(kind, update),
            ServerEvent::ServerMessage(text) => Ok(Envelope::text(text.clone())),
            ServerEvent::JoinAccepted(accepted) => Envelope::new(kind, accepted),
            ServerEvent::PlayerJoined(join) => Envelope::new(kind, join),
            ServerEvent::PlayerLeft(left) => Envelope::new(kind, left),
        }
    }
}

impl TryFrom<&Envelope> for ServerEvent {
    type Error = ProtocolError;

    fn try_from(envelope: &Envelope) -> Result<Self, Self::Error> {
        let kind = envelope.kind;
        Ok(match kind {
            MessageType::GameInitialization => ServerEvent::MatchInit(envelope.payload(kind)?),
            MessageType::Update => ServerEvent::Update(envelope.payload(kind)?),
            MessageType::ServerMessage => ServerEvent::ServerMessage(envelope.body.clone()),
            MessageType::JoinAccepted => ServerEvent::JoinAccepted(envelope.payload(kind)?),
            MessageType::PlayerJoin => ServerEvent::PlayerJoined(envelope.payload(kind)?),
            MessageType::PlayerLeft => ServerEvent::PlayerLeft(envelope.payload(kind)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y).unwrap()
    }

    #[test]
    fn test_envelope_field_names() {
        let envelope = Envelope::text("hello");
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"Type":2,"Body":"hello"}"#);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = Envelope::from_line(r#"{"Type":9,"Body":""}"#);
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
        assert!(matches!(
            MessageType::try_from(9),
            Err(ProtocolError::UnknownType(9))
        ));
    }

    #[test]
    fn test_line_framing() {
        let envelope = Envelope::new(MessageType::JoinAccepted, &JoinAccepted { id: 4 }).unwrap();
        let line = envelope.to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(Envelope::from_line(&line).unwrap(), envelope);
    }

    #[test]
    fn test_payload_checks_type() {
        let envelope = Envelope::new(MessageType::PlayerLeft, &PlayerLeft { id: 2 }).unwrap();
        let wrong: Result<JoinAccepted, _> = envelope.payload(MessageType::JoinAccepted);
        assert!(matches!(wrong, Err(ProtocolError::UnexpectedType { .. })));

        let left: PlayerLeft = envelope.payload(MessageType::PlayerLeft).unwrap();
        assert_eq!(left.id, 2);
    }

    #[test]
    fn test_update_claim_sentinel() {
        let moved = Update::moved(p(1, 2));
        assert_eq!(moved.diamond_id, NO_DIAMOND);
        assert_eq!(moved.claimed_diamond(), None);

        let claim = Update::claiming(p(1, 2), 5);
        assert_eq!(claim.claimed_diamond(), Some(5));

        let minimal: Update = serde_json::from_str(r#"{"position":{"x":3,"y":4}}"#).unwrap();
        assert_eq!(minimal.diamond_id, NO_DIAMOND);
        assert_eq!(minimal.id, 0);
    }

    #[test]
    fn test_update_rejects_negative_position() {
        let result: Result<Update, _> = serde_json::from_str(r#"{"position":{"x":-3,"y":4}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_event_roundtrip() {
        let events = vec![
            ServerEvent::MatchInit(MatchInit {
                game_match: Match::default(),
                remaining_ms: 45_000,
                players: vec![PlayerJoin {
                    id: 1,
                    name: "ana".to_string(),
                    position: p(10, 10),
                    score: 30,
                }],
            }),
            ServerEvent::Update(Update::claiming(p(5, 5), 2)),
            ServerEvent::ServerMessage("plain text".to_string()),
            ServerEvent::JoinAccepted(JoinAccepted { id: 9 }),
            ServerEvent::PlayerLeft(PlayerLeft { id: 9 }),
        ];

        for event in events {
            let envelope = event.to_envelope().unwrap();
            let decoded = ServerEvent::try_from(&envelope).unwrap();
            assert_eq!(decoded, event);
        }
    }
}
