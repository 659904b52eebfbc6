//! Error types for Glimpse.
//!
//! Library crates use [`GlimpseError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Glimpse operations.
#[derive(Debug, thiserror::Error)]
pub enum GlimpseError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Non-success status or network failure talking to the summarization service.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not a well-formed UTF-8 byte stream.
    #[error("decode error: {0}")]
    Decode(String),

    /// The decoded body did not carry the expected candidate text.
    #[error("envelope error: {0}")]
    Envelope(String),

    /// Reading or persisting a credential failed.
    #[error("credential error: {0}")]
    Credential(String),

    /// HTML parsing or selector error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GlimpseError>;

impl GlimpseError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::Envelope(_) => "envelope",
            Self::Credential(_) => "credential",
            Self::Parse { .. } => "parse",
            Self::Io { .. } => "io",
        }
    }
}
