//! Deskline Console Library
//!
//! This crate contains the support-agent console components: the ticket directory client,
//! the local transcript cache, the shared chat channel and the session coordinator that
//! binds one selected ticket to one live chat room.

pub mod channel;
pub mod config;
pub mod directory;
pub mod session;
pub mod telemetry;
pub mod transcript;

pub use channel::{ChannelConnection, ChannelError, ChannelSession, ChannelTransport};
pub use config::{Config, ConfigError};
pub use directory::{DirectoryError, TicketDirectory};
pub use session::{InboundPersistence, Notice, NoticeKind, SessionCoordinator};
pub use transcript::{CacheError, FileTranscriptCache, MemoryTranscriptCache, TranscriptCache};
