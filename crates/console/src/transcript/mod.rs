//! Local transcript cache
//!
//! Maps a ticket identifier to the chat transcript last seen on this console.
//! The cache is never a source of truth: a missing or unreadable entry is
//! reported as absent and the caller starts a fresh transcript.

mod file;
mod memory;

pub use file::FileTranscriptCache;
pub use memory::MemoryTranscriptCache;

use deskline_shared::Transcript;

/// Key prefix for stored transcripts
pub const KEY_PREFIX: &str = "chat_";

/// Error type for transcript cache writes
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Storage for per-ticket transcripts
pub trait TranscriptCache: Send + Sync {
    /// Load the stored transcript for a ticket, if a readable one exists
    fn load(&self, ticket_id: &str) -> Option<Transcript>;

    /// Store a transcript for a ticket, replacing any previous value
    fn save(&self, ticket_id: &str, transcript: &Transcript) -> Result<(), CacheError>;
}

/// Storage key for a ticket
pub fn cache_key(ticket_id: &str) -> String {
    format!("{KEY_PREFIX}{ticket_id}")
}

/// Decode a stored transcript, treating corruption as a miss
fn decode(ticket_id: &str, raw: &str) -> Option<Transcript> {
    match serde_json::from_str(raw) {
        Ok(transcript) => Some(transcript),
        Err(e) => {
            tracing::warn!(
                ticket_id = %ticket_id,
                error = %e,
                "Discarding unreadable cached transcript"
            );
            None
        }
    }
}
