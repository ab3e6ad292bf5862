use std::sync::Arc;

use crate::config::SessionOptions;
use crate::entry::{CanonicalNormalizer, EntryNormalizer};
use crate::errors::SessionError;
use crate::event::EventSource;
use crate::logging::{SessionLogger, TracingLogger};
use crate::request::StreamRequest;
use crate::session::WordSession;

struct StreamerInner {
    source: Arc<dyn EventSource>,
    normalizer: Arc<dyn EntryNormalizer>,
    logger: Arc<dyn SessionLogger>,
    options: SessionOptions,
}

/// Entry point for creating word sessions over shared collaborators.
#[derive(Clone)]
pub struct WordStreamer {
    inner: Arc<StreamerInner>,
}

impl WordStreamer {
    /// Starts a builder for wiring the event source and optional collaborators.
    pub fn builder() -> WordStreamerBuilder {
        WordStreamerBuilder::default()
    }

    /// Creates an idle session for one request.
    pub fn session(&self, request: StreamRequest) -> WordSession {
        WordSession::new(
            request,
            self.inner.source.clone(),
            self.inner.normalizer.clone(),
            self.inner.logger.clone(),
            self.inner.options.clone(),
        )
    }

    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }
}

/// Builder for [`WordStreamer`].
///
/// Only the event source is required. The normalizer defaults to
/// [`CanonicalNormalizer`], the logger to [`TracingLogger`].
#[derive(Default)]
pub struct WordStreamerBuilder {
    source: Option<Arc<dyn EventSource>>,
    normalizer: Option<Arc<dyn EntryNormalizer>>,
    logger: Option<Arc<dyn SessionLogger>>,
    options: Option<SessionOptions>,
}

impl WordStreamerBuilder {
    pub fn source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn normalizer(mut self, normalizer: Arc<dyn EntryNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn SessionLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Overrides the options; [`SessionOptions::from_env`] is a common choice.
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Builds the streamer. Fails when no event source was registered.
    pub fn build(self) -> Result<WordStreamer, SessionError> {
        let source = self
            .source
            .ok_or_else(|| SessionError::Config("an event source is required".to_string()))?;
        Ok(WordStreamer {
            inner: Arc::new(StreamerInner {
                source,
                normalizer: self
                    .normalizer
                    .unwrap_or_else(|| Arc::new(CanonicalNormalizer)),
                logger: self.logger.unwrap_or_else(|| Arc::new(TracingLogger)),
                options: self.options.unwrap_or_default(),
            }),
        })
    }
}
