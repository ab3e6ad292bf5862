use serde_json::{Map, Value};
use tracing::{error, info};

pub const TAG_START: &str = "[StreamWordSession] start";
pub const TAG_CHUNK: &str = "[StreamWordSession] chunk";
pub const TAG_END: &str = "[StreamWordSession] end";
pub const TAG_ERROR: &str = "[StreamWordSession] error";

/// Request context attached to every session log call.
#[derive(Clone, Debug, PartialEq)]
pub struct LogContext {
    pub session_id: uuid::Uuid,
    pub user_id: String,
    pub term: String,
    /// Tag-specific fields (chunk length, version count, error text, ...).
    pub extra: Map<String, Value>,
}

impl LogContext {
    pub fn new(session_id: uuid::Uuid, user_id: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            session_id,
            user_id: user_id.into(),
            term: term.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Structured logger injected into sessions.
///
/// Calls are synchronous and infallible. Implementations must not block.
pub trait SessionLogger: Send + Sync {
    fn info(&self, tag: &str, context: &LogContext);

    fn error(&self, tag: &str, context: &LogContext) {
        self.info(tag, context);
    }
}

/// Default logger: forwards to `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl SessionLogger for TracingLogger {
    fn info(&self, tag: &str, context: &LogContext) {
        info!(
            event = tag,
            domain = "word_session",
            session_id = %context.session_id,
            user_id = context.user_id.as_str(),
            term = context.term.as_str(),
            extra = %serde_json::Value::Object(context.extra.clone())
        );
    }

    fn error(&self, tag: &str, context: &LogContext) {
        error!(
            event = tag,
            domain = "word_session",
            session_id = %context.session_id,
            user_id = context.user_id.as_str(),
            term = context.term.as_str(),
            extra = %serde_json::Value::Object(context.extra.clone())
        );
    }
}

/// Logger that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl SessionLogger for NoopLogger {
    fn info(&self, _tag: &str, _context: &LogContext) {}
}
