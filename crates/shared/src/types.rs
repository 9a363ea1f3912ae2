//! Common types used across Deskline

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// =============================================================================
// Tickets
// =============================================================================

/// Wire value of the only status the console surfaces
pub const WAITING_FOR_RESPONSE: &str = "waiting for response";

/// Ticket status as reported by the ticket directory
///
/// Statuses this console does not act on are kept verbatim so a single
/// unexpected value never fails a whole directory fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketStatus {
    WaitingForResponse,
    Other(String),
}

impl TicketStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TicketStatus::WaitingForResponse => WAITING_FOR_RESPONSE,
            TicketStatus::Other(status) => status,
        }
    }
}

impl From<String> for TicketStatus {
    fn from(s: String) -> Self {
        if s == WAITING_FOR_RESPONSE {
            TicketStatus::WaitingForResponse
        } else {
            TicketStatus::Other(s)
        }
    }
}

impl From<TicketStatus> for String {
    fn from(status: TicketStatus) -> Self {
        match status {
            TicketStatus::WaitingForResponse => WAITING_FOR_RESPONSE.to_string(),
            TicketStatus::Other(s) => s,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer support ticket, owned by the ticket directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub ticket_id: String,
    #[serde(default)]
    pub issue: String,
    pub status: TicketStatus,
    /// Last message the customer left on the ticket
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
}

impl Ticket {
    pub fn is_waiting_for_response(&self) -> bool {
        self.status == TicketStatus::WaitingForResponse
    }

    pub fn user_message_or_default(&self) -> &str {
        non_empty(self.user_message.as_deref()).unwrap_or("No message provided")
    }

    pub fn user_name_or_default(&self) -> &str {
        non_empty(self.user_name.as_deref()).unwrap_or("N/A")
    }

    pub fn mobile_number_or_default(&self) -> &str {
        non_empty(self.mobile_number.as_deref()).unwrap_or("N/A")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// Chat Messages
// =============================================================================

/// First seed message of a fresh transcript
pub const CONNECTED_NOTICE: &str = "You are now connected to the ticket chat.";

/// Second seed message of a fresh transcript
pub const WAITING_NOTICE: &str = "Waiting for customer to connect...";

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    System,
    User,
    Support,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::System => "system",
            SenderRole::User => "user",
            SenderRole::Support => "support",
        }
    }
}

impl std::fmt::Display for SenderRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message
///
/// `time` is for display only; transcripts are ordered by arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: SenderRole,
    pub text: String,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<OffsetDateTime>,
}

impl Message {
    pub fn new(sender: SenderRole, text: impl Into<String>, time: Option<OffsetDateTime>) -> Self {
        Self {
            sender,
            text: text.into(),
            time,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(SenderRole::System, text, None)
    }

    pub fn support(text: impl Into<String>, time: OffsetDateTime) -> Self {
        Self::new(SenderRole::Support, text, Some(time))
    }
}

/// Ordered chat history for one ticket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    /// Transcript for a ticket that has never been opened on this console
    pub fn seeded() -> Self {
        Self(vec![
            Message::system(CONNECTED_NOTICE),
            Message::system(WAITING_NOTICE),
        ])
    }

    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
