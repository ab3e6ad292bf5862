//! Incremental word-entry streaming with version reconciliation.
//!
//! A [`WordSession`] re-emits text chunks from an [`EventSource`] as they
//! arrive, then resolves the accumulated payload into a canonical,
//! multi-version [`StorePayload`] ready for a cache.
//!
//! # Builder-first usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt as _;
//! use word_session::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SessionError> {
//! let source = |_req: &StreamRequest| -> Result<EventStream, SourceError> {
//!     let events: Vec<Result<StreamEvent, SourceError>> =
//!         vec![Ok(StreamEvent::chunk("{\"id\":\"1\",\"term\":\"test\"}"))];
//!     Ok(Box::pin(futures::stream::iter(events)))
//! };
//! let streamer = WordStreamer::builder()
//!     .source(Arc::new(source))
//!     .options(SessionOptions::from_env())
//!     .build()?;
//!
//! let request = StreamRequest::builder("user-1", "test", "words:test:ENGLISH")
//!     .language("ENGLISH")
//!     .flavor("BILINGUAL")
//!     .build()?;
//! let mut session = streamer.session(request);
//! {
//!     let mut updates = session.stream();
//!     while let Some(update) = updates.next().await {
//!         print!("{}", update?.chunk);
//!     }
//! }
//! let payload = session.store_payload()?;
//! println!("{} version(s)", payload.versions.len());
//! # Ok(())
//! # }
//! ```

/// Event accumulation into raw and metadata buffers.
pub mod accumulator;
/// Cancellation handle and signal shared with transports.
pub mod cancel;
/// Environment-driven session options.
pub mod config;
/// Loosely-typed word entries and the normalizer seam.
pub mod entry;
/// Public error types.
pub mod errors;
/// Stream events, chunk updates and the event source contract.
pub mod event;
/// Structured session logging.
pub mod logging;
/// Version reconciliation into one canonical list.
pub mod merger;
/// Tracing subscriber setup.
pub mod observability;
/// Structured-vs-markdown payload resolution.
pub mod parser;
/// Common imports for typical usage.
pub mod prelude;
/// Immutable lookup requests.
pub mod request;
/// Session state machine and store payload.
pub mod session;
/// Server-sent-events decoding for transports.
pub mod sse;
/// Session factory and builder.
pub mod streamer;

pub use accumulator::{AccumulationResult, Accumulator};
pub use cancel::{AbortHandle, CancelSignal};
pub use config::SessionOptions;
pub use entry::{CanonicalNormalizer, Entry, EntryNormalizer};
pub use errors::{PayloadParseError, SessionError, SourceError};
pub use event::{ChunkUpdate, EventSource, EventStream, StreamEvent};
pub use logging::{LogContext, NoopLogger, SessionLogger, TracingLogger};
pub use merger::{MergedSummary, VersionSource, merge_versions};
pub use observability::{ObservabilitySettings, init_observability};
pub use parser::{ParsedPayload, PayloadFormat, parse_payload};
pub use request::{StreamRequest, StreamRequestBuilder};
pub use session::{SessionState, SessionStateKind, StoreOptions, StorePayload, WordSession};
pub use sse::{SseDecoder, SseFrame, sse_event_stream};
pub use streamer::{WordStreamer, WordStreamerBuilder};
