//! Common imports for typical session usage.
pub use crate::{
    AbortHandle, CancelSignal, ChunkUpdate, Entry, EntryNormalizer, EventSource, EventStream,
    SessionError, SessionOptions, SourceError, StorePayload, StreamEvent, StreamRequest,
    WordSession, WordStreamer,
};
