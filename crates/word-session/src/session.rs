use std::fmt;
use std::sync::Arc;

use futures::StreamExt as _;
use futures::stream::BoxStream;
use serde_json::{Map, Value};

use crate::accumulator::{AccumulationResult, Accumulator};
use crate::config::SessionOptions;
use crate::entry::{Entry, EntryNormalizer};
use crate::errors::{SessionError, SourceError};
use crate::event::{ChunkUpdate, EventSource};
use crate::logging::{LogContext, SessionLogger, TAG_CHUNK, TAG_END, TAG_ERROR, TAG_START};
use crate::merger::{MergedSummary, merge_versions};
use crate::parser::{ParsedPayload, parse_payload};
use crate::request::StreamRequest;

/// Options handed to the cache together with the versions.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOptions {
    pub active_version_id: Option<String>,
    pub metadata: Map<String, Value>,
}

/// The materialized result of a completed session.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct StorePayload {
    pub key: String,
    pub versions: Vec<Entry>,
    pub options: StoreOptions,
}

impl StorePayload {
    fn new(key: &str, summary: MergedSummary) -> Self {
        Self {
            key: key.to_string(),
            versions: summary.versions,
            options: StoreOptions {
                active_version_id: summary.active_version_id,
                metadata: summary.metadata,
            },
        }
    }
}

/// Session lifecycle.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Idle,
    Accumulating,
    Parsing,
    Merging,
    Completed(StorePayload),
    Failed(SourceError),
}

impl SessionState {
    pub fn kind(&self) -> SessionStateKind {
        match self {
            Self::Idle => SessionStateKind::Idle,
            Self::Accumulating => SessionStateKind::Accumulating,
            Self::Parsing => SessionStateKind::Parsing,
            Self::Merging => SessionStateKind::Merging,
            Self::Completed(_) => SessionStateKind::Completed,
            Self::Failed(_) => SessionStateKind::Failed,
        }
    }
}

/// Payload-free view of [`SessionState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionStateKind {
    Idle,
    Accumulating,
    Parsing,
    Merging,
    Completed,
    Failed,
}

impl fmt::Display for SessionStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Accumulating => "accumulating",
            Self::Parsing => "parsing",
            Self::Merging => "merging",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// One streaming lookup, from first chunk to materialized payload.
///
/// Sessions are single-use: [`WordSession::stream`] produces one pass, and
/// [`WordSession::store_payload`] only answers once that pass ran to the end
/// without error.
pub struct WordSession {
    session_id: uuid::Uuid,
    request: StreamRequest,
    source: Arc<dyn EventSource>,
    normalizer: Arc<dyn EntryNormalizer>,
    logger: Arc<dyn SessionLogger>,
    options: SessionOptions,
    state: SessionState,
}

impl WordSession {
    pub(crate) fn new(
        request: StreamRequest,
        source: Arc<dyn EventSource>,
        normalizer: Arc<dyn EntryNormalizer>,
        logger: Arc<dyn SessionLogger>,
        options: SessionOptions,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4(),
            request,
            source,
            normalizer,
            logger,
            options,
            state: SessionState::Idle,
        }
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    pub fn request(&self) -> &StreamRequest {
        &self.request
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Streams chunk updates as they arrive, then parses and merges.
    ///
    /// The event source is polled only when the returned stream is polled.
    /// The first error ends the stream and leaves the session `Failed`. A
    /// second call yields [`SessionError::AlreadyStarted`] without touching
    /// the source.
    pub fn stream(&mut self) -> BoxStream<'_, Result<ChunkUpdate, SessionError>> {
        if self.state != SessionState::Idle {
            return futures::stream::once(async { Err(SessionError::AlreadyStarted) }).boxed();
        }
        self.state = SessionState::Accumulating;
        self.log_start();

        Box::pin(async_stream::try_stream! {
            let source = self.source.clone();
            let mut events = source
                .open(&self.request)
                .await
                .map_err(|err| self.fail(err))?;

            let mut accumulator = Accumulator::new(self.request.language());
            while let Some(event) = events.next().await {
                let event = event.map_err(|err| self.fail(err))?;
                let update = accumulator.accept(event, |chunk, seq| self.log_chunk(chunk, seq));
                if let Some(update) = update {
                    yield update;
                }
            }

            self.complete(accumulator.finish());
        })
    }

    /// Returns the materialized payload of a completed session.
    pub fn store_payload(&self) -> Result<&StorePayload, SessionError> {
        match &self.state {
            SessionState::Completed(payload) => Ok(payload),
            other => Err(SessionError::NotCompleted {
                state: other.kind(),
            }),
        }
    }

    /// Owning variant of [`WordSession::store_payload`].
    pub fn into_store_payload(self) -> Result<StorePayload, SessionError> {
        match self.state {
            SessionState::Completed(payload) => Ok(payload),
            other => Err(SessionError::NotCompleted {
                state: other.kind(),
            }),
        }
    }

    /// Accumulating -> Parsing -> Merging -> Completed.
    fn complete(&mut self, accumulated: AccumulationResult) {
        self.state = SessionState::Parsing;
        let parsed = parse_payload(&accumulated, &self.request, self.normalizer.as_ref());

        self.state = SessionState::Merging;
        let summary = merge_versions(&parsed, self.normalizer.as_ref());

        self.log_end(&accumulated, &parsed, &summary);
        self.state = SessionState::Completed(StorePayload::new(self.request.key(), summary));
    }

    /// Any state -> Failed. Logs once and hands the error back for yielding.
    fn fail(&mut self, err: SourceError) -> SessionError {
        let context = self
            .context()
            .with("state", self.state.kind().to_string())
            .with("error", err.to_string());
        self.logger.error(TAG_ERROR, &context);
        self.state = SessionState::Failed(err.clone());
        SessionError::Source(err)
    }

    fn context(&self) -> LogContext {
        LogContext::new(self.session_id, self.request.user_id(), self.request.term())
    }

    fn log_start(&self) {
        let mut context = self
            .context()
            .with("language", self.request.language())
            .with("flavor", self.request.flavor())
            .with("model", self.request.model())
            .with("forceNew", self.request.force_new())
            .with("captureHistory", self.request.capture_history())
            .with("key", self.request.key());
        if let Some(version_id) = self.request.version_id() {
            context = context.with("versionId", version_id);
        }
        self.logger.info(TAG_START, &context);
    }

    fn log_chunk(&self, chunk: &str, seq: u64) {
        if !self.options.log_chunks {
            return;
        }
        let mut context = self
            .context()
            .with("seq", seq)
            .with("chunkLen", chunk.len() as u64);
        if let Some(preview) = self.options.preview(chunk) {
            context = context.with("preview", preview);
        }
        self.logger.info(TAG_CHUNK, &context);
    }

    fn log_end(&self, accumulated: &AccumulationResult, parsed: &ParsedPayload, summary: &MergedSummary) {
        let context = self
            .context()
            .with("rawLen", accumulated.raw_payload.len() as u64)
            .with("hasMetadata", parsed.metadata.is_some())
            .with("format", parsed.format.as_str())
            .with("flavor", parsed.flavor.as_str())
            .with("versions", summary.versions.len() as u64)
            .with(
                "activeVersionId",
                summary
                    .active_version_id
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
        self.logger.info(TAG_END, &context);
    }
}
