//! File-backed transcript cache
//!
//! One JSON file per ticket, named after the ticket's cache key.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use deskline_shared::Transcript;

use super::{cache_key, decode, CacheError, TranscriptCache};

/// Durable transcript cache rooted at a directory
#[derive(Debug, Clone)]
pub struct FileTranscriptCache {
    dir: PathBuf,
}

impl FileTranscriptCache {
    /// Create a cache in `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ticket_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", sanitize_file_stem(&cache_key(ticket_id))))
    }
}

impl TranscriptCache for FileTranscriptCache {
    fn load(&self, ticket_id: &str) -> Option<Transcript> {
        let path = self.path_for(ticket_id);
        match std::fs::read_to_string(&path) {
            Ok(raw) => decode(ticket_id, &raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(
                    ticket_id = %ticket_id,
                    path = %path.display(),
                    error = %e,
                    "Failed to read cached transcript"
                );
                None
            }
        }
    }

    fn save(&self, ticket_id: &str, transcript: &Transcript) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(ticket_id);
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_vec(transcript)?;

        // Rename over the old entry so readers never see a partial file
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(
            ticket_id = %ticket_id,
            messages = transcript.len(),
            "Saved transcript"
        );
        Ok(())
    }
}

/// Escape everything outside `[A-Za-z0-9_-]` as `%XX`
fn sanitize_file_stem(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskline_shared::Message;
    use time::macros::datetime;
    use uuid::Uuid;

    fn temp_cache() -> FileTranscriptCache {
        let dir = std::env::temp_dir().join(format!("deskline-cache-{}", Uuid::new_v4()));
        FileTranscriptCache::new(dir)
    }

    #[test]
    fn test_round_trip() {
        let cache = temp_cache();
        let mut transcript = Transcript::seeded();
        transcript.push(Message::support("hello", datetime!(2024-05-01 12:00:00 UTC)));

        cache.save("TCK-1", &transcript).unwrap();
        assert_eq!(cache.load("TCK-1"), Some(transcript));
        assert!(cache.dir().join("chat_TCK-1.json").exists());

        let _ = std::fs::remove_dir_all(cache.dir());
    }

    #[test]
    fn test_missing_directory_is_absent() {
        let cache = temp_cache();
        assert!(cache.load("TCK-1").is_none());
    }

    #[test]
    fn test_corrupt_file_is_absent() {
        let cache = temp_cache();
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.dir().join("chat_TCK-1.json"), b"[{\"sender\":").unwrap();

        assert!(cache.load("TCK-1").is_none());

        let _ = std::fs::remove_dir_all(cache.dir());
    }

    #[test]
    fn test_ticket_ids_cannot_escape_directory() {
        let cache = temp_cache();
        let transcript = Transcript::seeded();

        cache.save("../../etc/passwd", &transcript).unwrap();
        assert!(cache.dir().join("chat_%2E%2E%2F%2E%2E%2Fetc%2Fpasswd.json").exists());
        assert_eq!(cache.load("../../etc/passwd"), Some(transcript));

        let _ = std::fs::remove_dir_all(cache.dir());
    }

    #[test]
    fn test_sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_file_stem("chat_abc-123"), "chat_abc-123");
        assert_eq!(sanitize_file_stem("chat_a b"), "chat_a%20b");
    }
}
