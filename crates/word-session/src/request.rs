use crate::cancel::CancelSignal;
use crate::errors::SessionError;

/// Immutable description of one word lookup.
///
/// Built once through [`StreamRequest::builder`] and never mutated; each
/// request backs exactly one session.
#[derive(Clone, Debug)]
pub struct StreamRequest {
    user_id: String,
    term: String,
    language: String,
    flavor: String,
    model: String,
    token: Option<String>,
    signal: CancelSignal,
    force_new: bool,
    version_id: Option<String>,
    capture_history: bool,
    key: String,
}

impl StreamRequest {
    /// Starts a builder for the given user, term and cache key.
    pub fn builder(
        user_id: impl Into<String>,
        term: impl Into<String>,
        key: impl Into<String>,
    ) -> StreamRequestBuilder {
        StreamRequestBuilder {
            user_id: user_id.into(),
            term: term.into(),
            key: key.into(),
            language: String::new(),
            flavor: String::new(),
            model: String::new(),
            token: None,
            signal: CancelSignal::never(),
            force_new: false,
            version_id: None,
            capture_history: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Source language of the lookup (for example `ENGLISH`).
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Requested flavor; the last fallback when neither payload names one.
    pub fn flavor(&self) -> &str {
        &self.flavor
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Auth token for the transport. Never logged.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn signal(&self) -> &CancelSignal {
        &self.signal
    }

    pub fn force_new(&self) -> bool {
        self.force_new
    }

    pub fn version_id(&self) -> Option<&str> {
        self.version_id.as_deref()
    }

    pub fn capture_history(&self) -> bool {
        self.capture_history
    }

    /// Cache key the materialized payload is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Identity fields a transport forwards upstream, in camelCase.
    ///
    /// The auth token is not included; transports read it through
    /// [`StreamRequest::token`].
    pub fn transport_fields(&self) -> serde_json::Value {
        let mut fields = serde_json::json!({
            "userId": self.user_id,
            "term": self.term,
            "language": self.language,
            "flavor": self.flavor,
            "model": self.model,
            "forceNew": self.force_new,
            "captureHistory": self.capture_history,
        });
        if let (Some(version_id), Some(map)) = (&self.version_id, fields.as_object_mut()) {
            map.insert("versionId".into(), version_id.clone().into());
        }
        fields
    }
}

/// Builder for [`StreamRequest`].
pub struct StreamRequestBuilder {
    user_id: String,
    term: String,
    key: String,
    language: String,
    flavor: String,
    model: String,
    token: Option<String>,
    signal: CancelSignal,
    force_new: bool,
    version_id: Option<String>,
    capture_history: bool,
}

impl StreamRequestBuilder {
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = flavor.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attaches the cancellation signal the event source should observe.
    pub fn signal(mut self, signal: CancelSignal) -> Self {
        self.signal = signal;
        self
    }

    /// Asks upstream to regenerate instead of serving a cached entry.
    pub fn force_new(mut self, force_new: bool) -> Self {
        self.force_new = force_new;
        self
    }

    /// Targets a specific stored version.
    pub fn version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Asks upstream to send the version history on the metadata channel.
    pub fn capture_history(mut self, capture_history: bool) -> Self {
        self.capture_history = capture_history;
        self
    }

    /// Validates the builder state and freezes the request.
    pub fn build(self) -> Result<StreamRequest, SessionError> {
        if self.user_id.trim().is_empty() {
            return Err(SessionError::Validation("user id must not be empty".into()));
        }
        if self.term.trim().is_empty() {
            return Err(SessionError::Validation("term must not be empty".into()));
        }
        if self.key.trim().is_empty() {
            return Err(SessionError::Validation(
                "cache key must not be empty".into(),
            ));
        }
        Ok(StreamRequest {
            user_id: self.user_id,
            term: self.term,
            language: self.language,
            flavor: self.flavor,
            model: self.model,
            token: self.token,
            signal: self.signal,
            force_new: self.force_new,
            version_id: self.version_id.filter(|v| !v.trim().is_empty()),
            capture_history: self.capture_history,
            key: self.key,
        })
    }
}
