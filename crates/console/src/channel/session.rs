//! Ticket room session on the shared channel
//!
//! A session is joined to at most one ticket room at a time. Moving to another
//! ticket always goes through `Idle`, and inbound events are only delivered for
//! the room currently joined, even though the underlying connection is shared.

use std::sync::Arc;

use deskline_shared::SenderRole;

use super::connection::ChannelTransport;
use super::events::{ClientEvent, InboundMessage, OutboundMessage, ServerEvent};
use super::ChannelError;

/// Callback for delivered inbound messages
pub type MessageHandler = Box<dyn Fn(&InboundMessage) + Send + Sync>;

/// Room subscription state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Joined(String),
}

/// Room-scoped view of the shared chat channel
pub struct ChannelSession {
    transport: Arc<dyn ChannelTransport>,
    state: SessionState,
    user_handlers: Vec<MessageHandler>,
    support_handlers: Vec<MessageHandler>,
}

impl ChannelSession {
    /// Create an idle session on top of a shared transport
    pub fn new(transport: Arc<dyn ChannelTransport>) -> Self {
        Self {
            transport,
            state: SessionState::Idle,
            user_handlers: Vec::new(),
            support_handlers: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Ticket whose room is currently joined
    pub fn joined_ticket(&self) -> Option<&str> {
        match &self.state {
            SessionState::Joined(ticket_id) => Some(ticket_id),
            SessionState::Idle => None,
        }
    }

    /// Subscribe to a ticket room
    ///
    /// Joining the room already joined is a no-op. Joining a different room
    /// while joined is rejected.
    pub fn join(&mut self, ticket_id: &str) -> Result<(), ChannelError> {
        match &self.state {
            SessionState::Joined(current) if current == ticket_id => return Ok(()),
            SessionState::Joined(current) => {
                return Err(ChannelError::AlreadyJoined(current.clone()));
            }
            SessionState::Idle => {}
        }

        self.transport.emit(ClientEvent::join(ticket_id))?;
        self.state = SessionState::Joined(ticket_id.to_string());

        tracing::debug!(ticket_id = %ticket_id, "Joined ticket room");
        Ok(())
    }

    /// Unsubscribe from a ticket room
    ///
    /// The session is idle afterwards even if the leave event could not be
    /// emitted, so no further events for the ticket are delivered.
    pub fn leave(&mut self, ticket_id: &str) -> Result<(), ChannelError> {
        if self.joined_ticket() != Some(ticket_id) {
            return Err(ChannelError::NotJoined(ticket_id.to_string()));
        }

        self.state = SessionState::Idle;
        let result = self.transport.emit(ClientEvent::leave(ticket_id));

        tracing::debug!(
            ticket_id = %ticket_id,
            emitted = result.is_ok(),
            "Left ticket room"
        );
        result
    }

    /// Drop the room subscription after the connection was lost
    pub fn reset(&mut self) {
        if let SessionState::Joined(ticket_id) = &self.state {
            tracing::debug!(ticket_id = %ticket_id, "Room subscription reset");
        }
        self.state = SessionState::Idle;
    }

    /// Emit an agent reply on the joined room
    pub fn send(&self, message: OutboundMessage) -> Result<(), ChannelError> {
        if self.joined_ticket() != Some(message.ticket_id.as_str()) {
            return Err(ChannelError::NotJoined(message.ticket_id));
        }
        self.transport.emit(ClientEvent::Message(message))
    }

    /// Register a handler for customer messages on the joined room
    pub fn on_user_message<F>(&mut self, handler: F)
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.user_handlers.push(Box::new(handler));
    }

    /// Register a handler for agent messages on the joined room
    pub fn on_support_message<F>(&mut self, handler: F)
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.support_handlers.push(Box::new(handler));
    }

    /// Filter an inbound event against the joined room
    ///
    /// Returns the routed message and runs the matching handlers, or returns
    /// `None` when no room is joined or the event belongs to another ticket.
    pub fn deliver(&self, event: ServerEvent) -> Option<InboundMessage> {
        let Some(joined) = self.joined_ticket() else {
            tracing::debug!(
                ticket_id = %event.ticket_id(),
                "Dropped channel event: no room joined"
            );
            return None;
        };

        if event.ticket_id() != joined {
            tracing::debug!(
                ticket_id = %event.ticket_id(),
                joined = %joined,
                "Dropped channel event for another ticket"
            );
            return None;
        }

        let inbound = InboundMessage::from(event);
        let handlers = match inbound.role {
            SenderRole::User => &self.user_handlers,
            SenderRole::Support | SenderRole::System => &self.support_handlers,
        };
        for handler in handlers {
            handler(&inbound);
        }

        Some(inbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::events::InboundPayload;
    use crate::channel::testing::RecordingTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::datetime;

    fn user_event(ticket_id: &str, text: &str) -> ServerEvent {
        ServerEvent::UserMessage(InboundPayload {
            ticket_id: ticket_id.to_string(),
            message: text.to_string(),
            timestamp: None,
        })
    }

    fn agent_event(ticket_id: &str, text: &str) -> ServerEvent {
        ServerEvent::AgentMessage(InboundPayload {
            ticket_id: ticket_id.to_string(),
            message: text.to_string(),
            timestamp: None,
        })
    }

    fn session() -> (Arc<RecordingTransport>, ChannelSession) {
        let transport = Arc::new(RecordingTransport::new());
        let session = ChannelSession::new(transport.clone());
        (transport, session)
    }

    #[test]
    fn test_join_and_leave() {
        let (transport, mut session) = session();

        session.join("T1").unwrap();
        assert_eq!(session.state(), &SessionState::Joined("T1".to_string()));

        session.leave("T1").unwrap();
        assert_eq!(session.state(), &SessionState::Idle);

        assert_eq!(
            transport.events(),
            vec![ClientEvent::join("T1"), ClientEvent::leave("T1")]
        );
    }

    #[test]
    fn test_cannot_join_second_room_without_leaving() {
        let (transport, mut session) = session();
        session.join("T1").unwrap();

        assert_eq!(
            session.join("T2"),
            Err(ChannelError::AlreadyJoined("T1".to_string()))
        );
        assert_eq!(session.joined_ticket(), Some("T1"));
        assert_eq!(transport.events().len(), 1);
    }

    #[test]
    fn test_rejoining_same_room_is_noop() {
        let (transport, mut session) = session();
        session.join("T1").unwrap();
        session.join("T1").unwrap();
        assert_eq!(transport.events().len(), 1);
    }

    #[test]
    fn test_failed_join_stays_idle() {
        let (transport, mut session) = session();
        transport.set_failing(true);

        assert_eq!(session.join("T1"), Err(ChannelError::Closed));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_failed_leave_still_goes_idle() {
        let (transport, mut session) = session();
        session.join("T1").unwrap();
        transport.set_failing(true);

        assert_eq!(session.leave("T1"), Err(ChannelError::Closed));
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(session.deliver(user_event("T1", "late")).is_none());
    }

    #[test]
    fn test_leave_other_room_rejected() {
        let (_transport, mut session) = session();
        session.join("T1").unwrap();
        assert_eq!(
            session.leave("T2"),
            Err(ChannelError::NotJoined("T2".to_string()))
        );
        assert_eq!(session.joined_ticket(), Some("T1"));
    }

    #[test]
    fn test_deliver_filters_by_joined_room() {
        let (_transport, mut session) = session();
        assert!(session.deliver(user_event("T1", "before join")).is_none());

        session.join("T1").unwrap();
        assert!(session.deliver(user_event("T2", "wrong room")).is_none());

        let inbound = session.deliver(user_event("T1", "hello")).unwrap();
        assert_eq!(inbound.role, SenderRole::User);
        assert_eq!(inbound.text, "hello");
    }

    #[test]
    fn test_handlers_fire_per_role_and_room() {
        let (_transport, mut session) = session();
        let user_hits = Arc::new(AtomicUsize::new(0));
        let support_hits = Arc::new(AtomicUsize::new(0));

        let hits = user_hits.clone();
        session.on_user_message(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        let hits = support_hits.clone();
        session.on_support_message(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        });

        session.join("T1").unwrap();
        session.deliver(user_event("T1", "a"));
        session.deliver(agent_event("T1", "b"));
        session.deliver(agent_event("T2", "c"));

        assert_eq!(user_hits.load(Ordering::SeqCst), 1);
        assert_eq!(support_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_send_requires_joined_room() {
        let (transport, mut session) = session();
        let message = OutboundMessage::support("T1", "hi", datetime!(2024-05-01 12:00:00 UTC));

        assert_eq!(
            session.send(message.clone()),
            Err(ChannelError::NotJoined("T1".to_string()))
        );

        session.join("T1").unwrap();
        session.send(message.clone()).unwrap();
        assert_eq!(transport.events().last(), Some(&ClientEvent::Message(message)));
    }

    #[test]
    fn test_reset_drops_subscription_without_emitting() {
        let (transport, mut session) = session();
        session.join("T1").unwrap();
        session.reset();

        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(transport.events(), vec![ClientEvent::join("T1")]);
    }
}
