use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::parse_bool_env;

static INIT: OnceCell<()> = OnceCell::new();

/// Logging settings resolved from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservabilitySettings {
    pub enabled: bool,
    /// Explicit filter directive; `None` defers to `RUST_LOG`, then `info`.
    pub level: Option<String>,
    /// JSONL output file; `None` logs compact lines to stdout.
    pub json_log_path: Option<PathBuf>,
}

impl ObservabilitySettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("WORD_SESSION_OBSERVABILITY_ENABLED")
            .map(|v| parse_bool_env(&v).unwrap_or(true))
            .unwrap_or(true);
        let level = lookup("WORD_SESSION_LOG_LEVEL").filter(|v| !v.trim().is_empty());
        let json_log_path = lookup("WORD_SESSION_JSON_LOG_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        Self {
            enabled,
            level,
            json_log_path,
        }
    }

    fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        if let Some(level) = &self.level
            && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
        {
            return filter;
        }
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    }
}

/// Installs the global `tracing` subscriber once per process.
///
/// Environment variables:
/// - `WORD_SESSION_OBSERVABILITY_ENABLED`: optional enable/disable flag (default enabled).
/// - `WORD_SESSION_LOG_LEVEL`: optional level/filter override (`info`, `word_session=debug`, ...).
/// - `WORD_SESSION_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs go to stdout in a compact console format.
/// - `RUST_LOG`: used when `WORD_SESSION_LOG_LEVEL` is unset or invalid.
///
/// Safe to call repeatedly; an already-installed subscriber is left alone.
pub fn init_observability() {
    INIT.get_or_init(|| install(&ObservabilitySettings::from_env()));
}

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn install(settings: &ObservabilitySettings) {
    if !settings.enabled {
        return;
    }
    let _ = tracing_subscriber::registry()
        .with(output_layer(settings.json_log_path.as_deref()))
        .with(settings.env_filter())
        .try_init();
}

/// JSONL into `json_log_path` when set, compact stdout lines otherwise.
fn output_layer(json_log_path: Option<&Path>) -> OutputLayer {
    let Some(path) = json_log_path else {
        return tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stdout)
            .boxed();
    };
    let (dir, file_name) = split_log_path(path);
    let _ = std::fs::create_dir_all(dir);
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_target(false)
        .with_writer(tracing_appender::rolling::never(dir, file_name))
        .boxed()
}

fn split_log_path(path: &Path) -> (&Path, &str) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("word-session.logs.jsonl");
    (dir, file_name)
}
