//! Unified error type for the vidcast application.
//!
//! All crates funnel their failures into [`Error`]. The control channel maps
//! business errors onto typed protocol replies; everything else is surfaced
//! through logs.

use std::fmt;

/// Unified error type covering all failure modes in vidcast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A filename did not match the `<title>-<resolution>.<container>` grammar.
    #[error("malformed video filename: {name}")]
    MalformedName {
        /// The offending file name.
        name: String,
    },

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "video", "session").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The session already has an active stream.
    #[error("session busy: {0}")]
    Busy(String),

    /// An inbound control frame was unknown or undecodable.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffplay) returned an error.
    #[error("tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The operation was cancelled before it completed.
    #[error("cancelled")]
    Cancelled,

    /// Configuration could not be parsed or is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::MalformedName`].
    pub fn malformed_name(name: impl Into<String>) -> Self {
        Error::MalformedName { name: name.into() }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Busy`].
    pub fn busy(message: impl Into<String>) -> Self {
        Error::Busy(message.into())
    }

    /// Convenience constructor for [`Error::Protocol`].
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(message.into())
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_name_display() {
        let err = Error::malformed_name("clip.webm");
        assert_eq!(err.to_string(), "malformed video filename: clip.webm");
    }

    #[test]
    fn not_found_display() {
        let err = Error::not_found("video", "Heat-720p.mkv");
        assert_eq!(err.to_string(), "video not found: Heat-720p.mkv");
    }

    #[test]
    fn busy_display() {
        let err = Error::busy("stream already active");
        assert_eq!(err.to_string(), "session busy: stream already active");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "tool error [ffmpeg]: exit code 1");
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);

        fn err_fn() -> Result<i32> {
            Err(Error::Internal("boom".into()))
        }
        assert!(err_fn().is_err());
    }
}
