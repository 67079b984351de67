//! Data model and wire types for the conversation sync engine.
//!
//! This module is intentionally **type-heavy** and **logic-light**: strongly
//! typed identifiers, the conversation/message records the engine reconciles,
//! and the exact shapes the backend speaks on the wire (camelCase JSON).

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Stable external identifier of a conversation's counterparty.
///
/// Assigned by the messaging platform the bot runs on; opaque to the console.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    /// Wrap an existing platform identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for PeerId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Client-generated identifier for a message awaiting server confirmation.
///
/// Unique within the session; never reused after the send settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ProvisionalId(pub Uuid);

impl ProvisionalId {
    /// Generate a fresh provisional identifier.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProvisionalId {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProvisionalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identity of a message in the timeline.
///
/// A message is either `Provisional` (created locally by an optimistic send)
/// or `Confirmed` (the authoritative id returned by the backend). Resolution
/// of a send replaces the variant in place, so duplication is impossible at
/// the type level rather than by string-prefix convention.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Locally generated, awaiting server confirmation.
    Provisional(ProvisionalId),
    /// Authoritative server identifier.
    Confirmed(String),
}

impl MessageId {
    /// Whether this id is still awaiting server confirmation.
    #[must_use]
    pub const fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provisional(id) => fmt::Display::fmt(id, f),
            Self::Confirmed(id) => f.write_str(id),
        }
    }
}

// On the wire a message id is a plain string, and anything fetched from the
// backend is authoritative. Provisional ids therefore only ever exist in
// memory; parsing always yields `Confirmed`.
impl Serialize for MessageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Provisional(id) => serializer.serialize_str(&id.to_string()),
            Self::Confirmed(id) => serializer.serialize_str(id),
        }
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::Confirmed(raw))
    }
}

/// Direction of a message relative to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent by the customer to the bot/operator.
    Incoming,
    /// Sent by the operator (or the bot on their behalf).
    Outgoing,
}

/// Summary of one conversation as shown in the sidebar list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Counterparty identifier; unique key of the conversation table.
    pub peer_id: PeerId,
    /// Optional human-readable name supplied by the platform.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Text of the most recent message.
    pub last_message_preview: String,
    /// Timestamp of the most recent message.
    pub last_message_at: DateTime<Utc>,
    /// Number of messages the operator has not read yet.
    pub unread_count: u32,
}

impl Conversation {
    /// Label to display for this conversation.
    ///
    /// Falls back to a label derived from the peer id when the platform did
    /// not supply a display name.
    #[must_use]
    pub fn display_label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| format!("Customer {}", self.peer_id))
    }
}

/// One message within a conversation timeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Provisional or confirmed identity.
    pub id: MessageId,
    /// Conversation this message belongs to.
    pub conversation_id: PeerId,
    /// Direction relative to the operator.
    pub direction: Direction,
    /// Message body.
    pub text: String,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
    /// Whether the counterparty has read the message.
    pub read_by_peer: bool,
}

impl Message {
    /// Build the provisional record for an optimistic outgoing send.
    #[must_use]
    pub const fn provisional(
        id: ProvisionalId,
        conversation_id: PeerId,
        text: String,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::Provisional(id),
            conversation_id,
            direction: Direction::Outgoing,
            text,
            sent_at,
            read_by_peer: false,
        }
    }
}

/// Aggregate unread counters backing the navigation badges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadTotals {
    /// Unread chat messages across all conversations.
    pub messages: u64,
    /// Pending customer requests awaiting an operator.
    pub requests: u64,
}

/// Acknowledgement returned by the backend for a successful send.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    /// Authoritative id assigned to the stored message.
    pub server_message_id: String,
}

/// Outcome of one long-poll wait call.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollEvent {
    /// Whether a new message arrived while the call was held open.
    pub new_message: bool,
    /// Conversation the new message belongs to, when known.
    #[serde(default)]
    pub peer_id: Option<PeerId>,
}

impl PollEvent {
    /// The quiet outcome: the server timed out with nothing new.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            new_message: false,
            peer_id: None,
        }
    }
}

/// Resource whose unread total can be queried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreadResource {
    /// Chat messages.
    Messages,
    /// Pending customer requests.
    Requests,
}

impl UnreadResource {
    /// Path segment used by the unread-count endpoint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Requests => "requests",
        }
    }
}

impl fmt::Display for UnreadResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
