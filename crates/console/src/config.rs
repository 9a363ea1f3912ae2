//! Console configuration

use std::env;
use std::path::PathBuf;

use crate::session::InboundPersistence;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Console configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Ticket directory
    pub api_url: String,
    pub request_timeout_ms: u64,

    // Chat channel
    pub channel_url: String,

    // Transcript cache
    pub transcript_dir: PathBuf,
    pub inbound_persistence: InboundPersistence,

    // Logging
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Ticket directory
            api_url: {
                let url = env::var("DESKLINE_API_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string());
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidUrl(
                        "DESKLINE_API_URL must start with http:// or https://",
                    ));
                }
                url.trim_end_matches('/').to_string()
            },
            request_timeout_ms: {
                let timeout = env::var("DESKLINE_REQUEST_TIMEOUT_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()
                    .unwrap_or(10000);
                if timeout == 0 {
                    return Err(ConfigError::InvalidValue(
                        "DESKLINE_REQUEST_TIMEOUT_MS must be greater than zero",
                    ));
                }
                timeout
            },

            // Chat channel
            channel_url: {
                let url = env::var("DESKLINE_CHANNEL_URL")
                    .unwrap_or_else(|_| "ws://localhost:3000/ws".to_string());
                if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                    return Err(ConfigError::InvalidUrl(
                        "DESKLINE_CHANNEL_URL must start with ws:// or wss://",
                    ));
                }
                url
            },

            // Transcript cache
            transcript_dir: env::var("DESKLINE_TRANSCRIPT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".deskline/transcripts")),
            inbound_persistence: match env::var("DESKLINE_PERSIST_INBOUND")
                .unwrap_or_default()
                .trim()
                .to_lowercase()
                .as_str()
            {
                "1" | "true" | "yes" | "on" => InboundPersistence::Persist,
                "" | "0" | "false" | "no" | "off" => InboundPersistence::Skip,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "DESKLINE_PERSIST_INBOUND must be true/false, yes/no, on/off or 1/0",
                    ))
                }
            },

            // Logging
            log_format: match env::var("LOG_FORMAT")
                .unwrap_or_default()
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(&'static str),
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),
}
