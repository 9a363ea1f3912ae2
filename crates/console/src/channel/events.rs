//! Chat channel event types and serialization
//!
//! Every frame on the channel is a JSON object `{"event": <name>, "data": <payload>}`.

use deskline_shared::SenderRole;
use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

// =============================================================================
// Console-to-Channel Events
// =============================================================================

/// Events sent from the console to the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Subscribe to a ticket room
    Join(RoomPayload),

    /// Unsubscribe from a ticket room
    Leave(RoomPayload),

    /// Agent reply posted to a ticket room
    Message(OutboundMessage),
}

impl ClientEvent {
    pub fn join(ticket_id: impl Into<String>) -> Self {
        ClientEvent::Join(RoomPayload {
            ticket_id: ticket_id.into(),
        })
    }

    pub fn leave(ticket_id: impl Into<String>) -> Self {
        ClientEvent::Leave(RoomPayload {
            ticket_id: ticket_id.into(),
        })
    }
}

/// Room subscription payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub ticket_id: String,
}

/// Outbound chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub ticket_id: String,
    pub sender: SenderRole,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl OutboundMessage {
    /// Agent reply stamped with `timestamp`
    pub fn support(
        ticket_id: impl Into<String>,
        message: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            sender: SenderRole::Support,
            message: message.into(),
            timestamp,
        }
    }
}

// =============================================================================
// Channel-to-Console Events
// =============================================================================

/// Events delivered from the channel to the console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Customer wrote in a ticket room
    UserMessage(InboundPayload),

    /// A support agent wrote in a ticket room
    AgentMessage(InboundPayload),
}

impl ServerEvent {
    pub fn ticket_id(&self) -> &str {
        self.payload().ticket_id.as_str()
    }

    pub fn payload(&self) -> &InboundPayload {
        match self {
            ServerEvent::UserMessage(p) | ServerEvent::AgentMessage(p) => p,
        }
    }

    /// Transcript role for messages carried by this event
    pub fn role(&self) -> SenderRole {
        match self {
            ServerEvent::UserMessage(_) => SenderRole::User,
            ServerEvent::AgentMessage(_) => SenderRole::Support,
        }
    }
}

/// Inbound chat message payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundPayload {
    pub ticket_id: String,
    pub message: String,
    /// Display-only; a timestamp that cannot be read is dropped, not the message
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        serialize_with = "time::serde::rfc3339::option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<OffsetDateTime>,
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (read as UTC) and epoch milliseconds
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = match &value {
        Some(serde_json::Value::String(s)) => parse_timestamp(s),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ms| {
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
            }),
        _ => None,
    };

    if parsed.is_none() {
        if let Some(value) = value.filter(|v| !v.is_null()) {
            tracing::debug!(timestamp = %value, "Ignoring unreadable message timestamp");
        }
    }
    Ok(parsed)
}

fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    if let Ok(t) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(t);
    }
    let naive = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(s, naive)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// An inbound event that passed room filtering
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub ticket_id: String,
    pub role: SenderRole,
    pub text: String,
    pub time: Option<OffsetDateTime>,
}

impl From<ServerEvent> for InboundMessage {
    fn from(event: ServerEvent) -> Self {
        let role = event.role();
        let (ServerEvent::UserMessage(payload) | ServerEvent::AgentMessage(payload)) = event;
        Self {
            ticket_id: payload.ticket_id,
            role,
            text: payload.message,
            time: payload.timestamp,
        }
    }
}
