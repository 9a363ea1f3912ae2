//! Real-time chat channel
//!
//! Provides the console side of the ticket chat channel:
//! - **Connection**: the single WebSocket connection shared by the whole console
//! - **Session**: room-scoped join/leave/send on top of that connection, for one ticket at a time
//! - **Events**: type-safe wire events for both directions

pub mod connection;
pub mod events;
pub mod session;

pub use connection::{ChannelConnection, ChannelTransport};
pub use events::{ClientEvent, InboundMessage, OutboundMessage, ServerEvent};
pub use session::{ChannelSession, SessionState};

/// Error type for chat channel operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to connect to chat channel: {0}")]
    Connect(String),

    #[error("Chat channel connection is closed")]
    Closed,

    #[error("Already joined ticket {0}; leave it before joining another")]
    AlreadyJoined(String),

    #[error("Not joined to ticket {0}")]
    NotJoined(String),
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::{ChannelError, ChannelTransport, ClientEvent};

    /// Transport that records every emitted event and can be told to fail
    #[derive(Default)]
    pub struct RecordingTransport {
        events: Mutex<Vec<ClientEvent>>,
        failing: AtomicBool,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn events(&self) -> Vec<ClientEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ChannelTransport for RecordingTransport {
        fn emit(&self, event: ClientEvent) -> Result<(), ChannelError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ChannelError::Closed);
            }
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }
}
