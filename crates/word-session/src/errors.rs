use crate::session::SessionStateKind;

/// Errors raised by an event source while opening or draining its stream.
///
/// The session never rewrites these: whatever the source yields is what the
/// caller receives inside [`SessionError::Source`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Transport or stream I/O failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The upstream service reported a failure in-band.
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        status_code: Option<u16>,
    },
    /// Framing or event sequencing was invalid.
    #[error("protocol error: {message}")]
    Protocol { message: String },
    /// The request's cancel signal fired.
    #[error("stream cancelled")]
    Cancelled,
}

impl SourceError {
    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an upstream (in-band) error.
    pub fn upstream(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Upstream {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message }
            | Self::Upstream { message, .. }
            | Self::Protocol { message } => message,
            Self::Cancelled => "stream cancelled",
        }
    }
}

/// Top-level error type for the public session API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Failure raised by the event source, passed through unchanged.
    #[error(transparent)]
    Source(SourceError),
    /// The materialized payload was requested before the session completed.
    #[error("session not completed yet (state: {state})")]
    NotCompleted { state: SessionStateKind },
    /// `stream()` was called on a session that already started.
    #[error("session already started; sessions are single-use")]
    AlreadyStarted,
    /// Invalid request builder input.
    #[error("validation error: {0}")]
    Validation(String),
    /// Invalid streamer configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SessionError {
    /// Returns the source error when this is a transport/upstream failure.
    pub fn as_source(&self) -> Option<&SourceError> {
        match self {
            Self::Source(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SourceError> for SessionError {
    fn from(value: SourceError) -> Self {
        SessionError::Source(value)
    }
}

/// Why a payload could not be read as a structured record.
///
/// This never leaves the crate's public contract as a failure; the parser
/// turns it into the markdown fallback branch.
#[derive(Debug, thiserror::Error)]
pub enum PayloadParseError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is JSON but not an object (found {found})")]
    NotAnObject { found: &'static str },
}
