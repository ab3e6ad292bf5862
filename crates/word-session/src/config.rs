pub(crate) fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Per-session behavior options shared by every session a streamer creates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    /// Emit the chunk log tag for every chunk.
    pub log_chunks: bool,
    /// How many leading characters of each chunk to copy into the chunk log.
    /// `0` logs only the length.
    pub chunk_preview_chars: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            log_chunks: true,
            chunk_preview_chars: 0,
        }
    }
}

impl SessionOptions {
    /// Reads options from the environment, keeping defaults for unset or
    /// unparsable values.
    ///
    /// - `WORD_SESSION_LOG_CHUNKS`: bool flag (default `true`).
    /// - `WORD_SESSION_CHUNK_PREVIEW_CHARS`: non-negative integer (default `0`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let log_chunks = lookup("WORD_SESSION_LOG_CHUNKS")
            .and_then(|v| parse_bool_env(&v))
            .unwrap_or(defaults.log_chunks);
        let chunk_preview_chars = lookup("WORD_SESSION_CHUNK_PREVIEW_CHARS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults.chunk_preview_chars);
        Self {
            log_chunks,
            chunk_preview_chars,
        }
    }

    pub fn log_chunks(mut self, enabled: bool) -> Self {
        self.log_chunks = enabled;
        self
    }

    pub fn chunk_preview_chars(mut self, chars: usize) -> Self {
        self.chunk_preview_chars = chars;
        self
    }

    /// Leading `chunk_preview_chars` characters of `chunk`, if previews are on.
    pub(crate) fn preview<'a>(&self, chunk: &'a str) -> Option<&'a str> {
        if self.chunk_preview_chars == 0 {
            return None;
        }
        let end = chunk
            .char_indices()
            .nth(self.chunk_preview_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(chunk.len());
        Some(&chunk[..end])
    }
}
