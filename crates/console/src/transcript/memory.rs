//! In-memory transcript cache

use std::collections::HashMap;
use std::sync::RwLock;

use deskline_shared::Transcript;

use super::{cache_key, decode, CacheError, TranscriptCache};

/// Thread-safe in-memory transcript cache
///
/// Entries are kept as serialized JSON so reads go through the same decoding
/// path as the durable cache.
#[derive(Default)]
pub struct MemoryTranscriptCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTranscriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value under a ticket's key
    pub fn insert_raw(&self, ticket_id: &str, raw: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(cache_key(ticket_id), raw.into());
        }
    }

    /// Number of stored transcripts
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TranscriptCache for MemoryTranscriptCache {
    fn load(&self, ticket_id: &str) -> Option<Transcript> {
        let entries = self.entries.read().ok()?;
        let raw = entries.get(&cache_key(ticket_id))?;
        decode(ticket_id, raw)
    }

    fn save(&self, ticket_id: &str, transcript: &Transcript) -> Result<(), CacheError> {
        let raw = serde_json::to_string(transcript)?;
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.insert(cache_key(ticket_id), raw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskline_shared::{Message, SenderRole};
    use time::macros::datetime;

    #[test]
    fn test_save_then_load() {
        let cache = MemoryTranscriptCache::new();
        let mut transcript = Transcript::seeded();
        transcript.push(Message::support("hello", datetime!(2024-05-01 12:00:00 UTC)));
        transcript.push(Message::new(SenderRole::User, "hi there", None));

        cache.save("T1", &transcript).unwrap();
        assert_eq!(cache.load("T1"), Some(transcript));
    }

    #[test]
    fn test_missing_entry_is_absent() {
        let cache = MemoryTranscriptCache::new();
        assert!(cache.load("T1").is_none());
    }

    #[test]
    fn test_corrupt_entry_is_absent() {
        let cache = MemoryTranscriptCache::new();
        cache.insert_raw("T1", "{not json");
        assert!(cache.load("T1").is_none());
    }

    #[test]
    fn test_save_overwrites_and_scopes_by_ticket() {
        let cache = MemoryTranscriptCache::new();
        let seeded = Transcript::seeded();
        let mut longer = seeded.clone();
        longer.push(Message::system("extra"));

        cache.save("T1", &seeded).unwrap();
        cache.save("T2", &seeded).unwrap();
        cache.save("T1", &longer).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.load("T1"), Some(longer));
        assert_eq!(cache.load("T2"), Some(seeded));
    }
}
