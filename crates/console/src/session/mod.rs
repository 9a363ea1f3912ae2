//! Chat session coordination
//!
//! Binds the agent's ticket selection to one live channel room and one
//! in-memory transcript, and surfaces channel trouble as non-fatal notices.

mod coordinator;
mod notice;

pub use coordinator::SessionCoordinator;
pub use notice::{Notice, NoticeKind};

/// Whether customer messages are written to the transcript cache
///
/// Agent replies are always cached. With `Skip`, inbound messages only live
/// in memory and the directory backend stays the source of truth for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InboundPersistence {
    #[default]
    Skip,
    Persist,
}
