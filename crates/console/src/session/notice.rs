//! Transient notices shown to the agent

use std::fmt;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    JoinFailed,
    LeaveFailed,
    SendFailed,
    CacheWriteFailed,
    ConnectionLost,
}

impl NoticeKind {
    fn summary(&self) -> &'static str {
        match self {
            NoticeKind::JoinFailed => "Could not join chat",
            NoticeKind::LeaveFailed => "Could not leave chat",
            NoticeKind::SendFailed => "Message not sent",
            NoticeKind::CacheWriteFailed => "Chat history not saved",
            NoticeKind::ConnectionLost => "Chat connection lost",
        }
    }
}

/// A recoverable problem the agent should know about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub ticket_id: Option<String>,
    pub detail: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, ticket_id: Option<&str>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            ticket_id: ticket_id.map(str::to_string),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ticket_id {
            Some(ticket_id) => write!(
                f,
                "{} for ticket {}: {}",
                self.kind.summary(),
                ticket_id,
                self.detail
            ),
            None => write!(f, "{}: {}", self.kind.summary(), self.detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let notice = Notice::new(NoticeKind::SendFailed, Some("T1"), "connection closed");
        assert_eq!(
            notice.to_string(),
            "Message not sent for ticket T1: connection closed"
        );

        let notice = Notice::new(NoticeKind::ConnectionLost, None, "socket closed");
        assert_eq!(notice.to_string(), "Chat connection lost: socket closed");
    }
}
