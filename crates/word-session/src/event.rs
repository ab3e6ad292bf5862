use std::pin::Pin;

use crate::errors::SourceError;
use crate::request::StreamRequest;

/// One transport-level event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of the main payload.
    Chunk(String),
    /// Out-of-band metadata (version history, descriptive fields).
    Metadata(String),
}

impl StreamEvent {
    pub fn chunk(data: impl Into<String>) -> Self {
        Self::Chunk(data.into())
    }

    pub fn metadata(data: impl Into<String>) -> Self {
        Self::Metadata(data.into())
    }

    /// Wire name of the event kind (`chunk` or `metadata`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chunk(_) => "chunk",
            Self::Metadata(_) => "metadata",
        }
    }

    pub fn data(&self) -> &str {
        match self {
            Self::Chunk(data) | Self::Metadata(data) => data,
        }
    }
}

/// Incremental update yielded by `WordSession::stream` for every chunk.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChunkUpdate {
    /// Raw chunk text, exactly as received.
    pub chunk: String,
    /// Language of the request the chunk belongs to.
    pub language: String,
}

/// Boxed event stream returned by an [`EventSource`].
pub type EventStream =
    Pin<Box<dyn futures::Stream<Item = Result<StreamEvent, SourceError>> + Send + 'static>>;

/// Transport boundary: opens the event stream for one request.
///
/// Implementations own HTTP, auth headers and reconnection. They should stop
/// (or yield [`SourceError::Cancelled`]) once the request's cancel signal
/// fires; the session itself never cancels.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    async fn open(&self, request: &StreamRequest) -> Result<EventStream, SourceError>;
}

#[async_trait::async_trait]
impl<F> EventSource for F
where
    F: Fn(&StreamRequest) -> Result<EventStream, SourceError> + Send + Sync,
{
    async fn open(&self, request: &StreamRequest) -> Result<EventStream, SourceError> {
        self(request)
    }
}
