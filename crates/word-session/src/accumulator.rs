use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use crate::event::{ChunkUpdate, StreamEvent};

/// Everything the stream carried, collected once the source is exhausted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccumulationResult {
    /// Every chunk's data, concatenated in arrival order.
    pub raw_payload: String,
    /// The last metadata payload received, if any.
    pub metadata_payload: Option<String>,
}

/// Demultiplexes chunk and metadata events for a single stream.
///
/// Chunks are appended to one buffer and handed straight back as a
/// [`ChunkUpdate`] so callers can render progress before parsing happens.
pub struct Accumulator {
    language: String,
    raw: String,
    metadata: Option<String>,
    chunks: u64,
}

impl Accumulator {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            raw: String::new(),
            metadata: None,
            chunks: 0,
        }
    }

    /// Consumes one event.
    ///
    /// Returns the update to re-emit for chunk events and `None` for metadata.
    /// `on_chunk` is an observer only: a panic inside it is caught and logged.
    pub fn accept<F>(&mut self, event: StreamEvent, on_chunk: F) -> Option<ChunkUpdate>
    where
        F: FnOnce(&str, u64),
    {
        match event {
            StreamEvent::Metadata(data) => {
                if self.metadata.is_some() {
                    warn!(
                        event = "accumulator.metadata_replaced",
                        domain = "word_session",
                        "metadata received more than once; keeping the latest"
                    );
                }
                self.metadata = Some(data);
                None
            }
            StreamEvent::Chunk(data) => {
                let seq = self.chunks;
                self.chunks = self.chunks.saturating_add(1);
                self.raw.push_str(&data);
                if catch_unwind(AssertUnwindSafe(|| on_chunk(&data, seq))).is_err() {
                    warn!(
                        event = "accumulator.observer_panicked",
                        domain = "word_session",
                        seq,
                        "chunk observer panicked; continuing"
                    );
                }
                Some(ChunkUpdate {
                    chunk: data,
                    language: self.language.clone(),
                })
            }
        }
    }

    /// Number of chunk events seen so far.
    pub fn chunk_count(&self) -> u64 {
        self.chunks
    }

    pub fn finish(self) -> AccumulationResult {
        AccumulationResult {
            raw_payload: self.raw,
            metadata_payload: self.metadata,
        }
    }
}
