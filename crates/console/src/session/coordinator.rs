//! Session coordinator
//!
//! Owns the single active ticket chat. Selecting a ticket leaves the previous
//! room before the new one is joined, loads or seeds the ticket's transcript,
//! and appends inbound and outbound messages in the order they are processed.

use std::sync::Arc;

use deskline_shared::{Message, SenderRole, Ticket, Transcript};
use time::OffsetDateTime;

use super::notice::{Notice, NoticeKind};
use super::InboundPersistence;
use crate::channel::{ChannelError, ChannelSession, InboundMessage, OutboundMessage, ServerEvent};
use crate::transcript::TranscriptCache;

/// The ticket chat currently open
struct ActiveSession {
    ticket: Ticket,
    transcript: Transcript,
    minimized: bool,
}

/// Coordinates ticket selection, the channel room and the transcript cache
pub struct SessionCoordinator {
    channel: ChannelSession,
    cache: Arc<dyn TranscriptCache>,
    inbound_persistence: InboundPersistence,
    active: Option<ActiveSession>,
    notices: Vec<Notice>,
}

impl SessionCoordinator {
    pub fn new(
        channel: ChannelSession,
        cache: Arc<dyn TranscriptCache>,
        inbound_persistence: InboundPersistence,
    ) -> Self {
        Self {
            channel,
            cache,
            inbound_persistence,
            active: None,
            notices: Vec::new(),
        }
    }

    pub fn active_ticket(&self) -> Option<&Ticket> {
        self.active.as_ref().map(|a| &a.ticket)
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        self.active.as_ref().map(|a| &a.transcript)
    }

    /// True when the active ticket's room is joined
    pub fn is_joined(&self) -> bool {
        match (&self.active, self.channel.joined_ticket()) {
            (Some(active), Some(joined)) => active.ticket.ticket_id == joined,
            _ => false,
        }
    }

    pub fn is_minimized(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.minimized)
    }

    /// Flip the chat panel between minimized and expanded
    pub fn toggle_minimized(&mut self) -> bool {
        match self.active.as_mut() {
            Some(active) => {
                active.minimized = !active.minimized;
                active.minimized
            }
            None => false,
        }
    }

    /// Drain notices raised since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Open the chat for a ticket
    ///
    /// Selecting the ticket already open only expands the panel.
    pub fn select_ticket(&mut self, ticket: &Ticket) {
        if let Some(active) = self.active.as_mut() {
            if active.ticket.ticket_id == ticket.ticket_id {
                active.minimized = false;
                return;
            }
        }

        self.end_session();

        let cached = self.cache.load(&ticket.ticket_id);
        let restored = cached.is_some();
        let transcript = cached.unwrap_or_else(Transcript::seeded);

        tracing::info!(
            ticket_id = %ticket.ticket_id,
            restored,
            messages = transcript.len(),
            "Opened ticket chat"
        );

        self.active = Some(ActiveSession {
            ticket: ticket.clone(),
            transcript,
            minimized: false,
        });
        let _ = self.join_active();
    }

    /// Close the open chat, if any
    pub fn deselect_ticket(&mut self) {
        self.end_session();
    }

    /// Retry joining the open ticket's room after a channel failure
    pub fn rejoin(&mut self) -> Result<(), ChannelError> {
        if self.active.is_none() || self.is_joined() {
            return Ok(());
        }
        self.join_active()
    }

    /// The shared connection went away; the room must be rejoined
    pub fn connection_lost(&mut self) {
        let joined = self.channel.joined_ticket().map(str::to_string);
        self.channel.reset();

        tracing::warn!(ticket_id = ?joined, "Chat channel connection lost");
        self.notices.push(Notice::new(
            NoticeKind::ConnectionLost,
            joined.as_deref(),
            ChannelError::Closed.to_string(),
        ));
    }

    /// Route a channel event into the open transcript
    ///
    /// Events for any ticket other than the joined one are dropped.
    pub fn handle_event(&mut self, event: ServerEvent) -> Option<InboundMessage> {
        let inbound = self.channel.deliver(event)?;
        self.receive_inbound(inbound.role, inbound.text.clone(), inbound.time);
        Some(inbound)
    }

    /// Append a delivered message to the open transcript
    pub fn receive_inbound(&mut self, role: SenderRole, text: String, time: Option<OffsetDateTime>) {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!("Dropped inbound message: no ticket selected");
            return;
        };
        active.transcript.push(Message::new(role, text, time));

        if self.inbound_persistence == InboundPersistence::Persist {
            self.persist_active();
        }
    }

    /// Send an agent reply on the open ticket
    ///
    /// Blank text or no open ticket is a no-op returning `Ok(None)`. The reply is
    /// only recorded once the channel accepted it.
    pub fn send_outbound(&mut self, text: &str) -> Result<Option<Message>, ChannelError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let Some(active) = self.active.as_ref() else {
            return Ok(None);
        };

        let ticket_id = active.ticket.ticket_id.clone();
        let now = OffsetDateTime::now_utc();

        if let Err(e) = self
            .channel
            .send(OutboundMessage::support(ticket_id.as_str(), text, now))
        {
            self.raise(NoticeKind::SendFailed, &ticket_id, &e);
            return Err(e);
        }

        let message = Message::support(text, now);
        if let Some(active) = self.active.as_mut() {
            active.transcript.push(message.clone());
        }
        self.persist_active();

        Ok(Some(message))
    }

    fn join_active(&mut self) -> Result<(), ChannelError> {
        let Some(ticket_id) = self.active.as_ref().map(|a| a.ticket.ticket_id.clone()) else {
            return Ok(());
        };

        self.channel.join(&ticket_id).map_err(|e| {
            self.raise(NoticeKind::JoinFailed, &ticket_id, &e);
            e
        })
    }

    /// Leave the joined room before dropping the open chat
    fn end_session(&mut self) {
        if let Some(joined) = self.channel.joined_ticket().map(str::to_string) {
            if let Err(e) = self.channel.leave(&joined) {
                self.raise(NoticeKind::LeaveFailed, &joined, &e);
            }
        }

        if let Some(previous) = self.active.take() {
            tracing::info!(
                ticket_id = %previous.ticket.ticket_id,
                messages = previous.transcript.len(),
                "Closed ticket chat"
            );
        }
    }

    fn persist_active(&mut self) {
        let Some(active) = &self.active else {
            return;
        };

        if let Err(e) = self.cache.save(&active.ticket.ticket_id, &active.transcript) {
            tracing::warn!(
                ticket_id = %active.ticket.ticket_id,
                error = %e,
                "Failed to cache transcript"
            );
            self.notices.push(Notice::new(
                NoticeKind::CacheWriteFailed,
                Some(&active.ticket.ticket_id),
                e.to_string(),
            ));
        }
    }

    fn raise(&mut self, kind: NoticeKind, ticket_id: &str, error: &ChannelError) {
        tracing::warn!(ticket_id = %ticket_id, error = %error, kind = ?kind, "Chat channel failure");
        self.notices
            .push(Notice::new(kind, Some(ticket_id), error.to_string()));
    }
}
