use serde_json::{Map, Value};

pub(crate) const ID: &str = "id";
pub(crate) const VERSION_ID: &str = "versionId";
pub(crate) const FLAVOR: &str = "flavor";
pub(crate) const MARKDOWN: &str = "markdown";
pub(crate) const VERSIONS: &str = "versions";
pub(crate) const ACTIVE_VERSION_ID: &str = "activeVersionId";
pub(crate) const METADATA: &str = "metadata";

/// A loosely-typed dictionary entry: one JSON object with typed accessors for
/// the fields the session cares about.
///
/// Both the freshly streamed entry and every stored version use this shape.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Entry(Map<String, Value>);

impl Entry {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Builds the entry used when the stream carried free-form text.
    pub fn markdown_fallback(term: &str, language: &str, markdown: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("term".into(), term.into());
        fields.insert("language".into(), language.into());
        fields.insert(MARKDOWN.into(), Value::String(markdown.into()));
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn id(&self) -> Option<String> {
        scalar_id(self.0.get(ID))
    }

    pub fn version_id(&self) -> Option<String> {
        scalar_id(self.0.get(VERSION_ID))
    }

    /// Stable version identifier: `id`, falling back to `versionId`.
    pub fn identifier(&self) -> Option<String> {
        self.id().or_else(|| self.version_id())
    }

    /// Non-empty flavor tag, if any.
    pub fn flavor(&self) -> Option<&str> {
        non_empty_str(self.0.get(FLAVOR))
    }

    pub fn set_flavor(&mut self, flavor: impl Into<String>) {
        self.0.insert(FLAVOR.into(), Value::String(flavor.into()));
    }

    /// Writes `flavor` only when the entry has no usable flavor of its own.
    pub fn ensure_flavor(&mut self, flavor: &str) {
        if self.flavor().is_none() {
            self.set_flavor(flavor);
        }
    }

    pub fn markdown(&self) -> Option<&str> {
        self.0.get(MARKDOWN).and_then(Value::as_str)
    }

    /// Embedded version list, when the entry carries one.
    pub fn versions(&self) -> Option<&Vec<Value>> {
        self.0.get(VERSIONS).and_then(Value::as_array)
    }

    pub fn active_version_id(&self) -> Option<String> {
        defined_id(self.0.get(ACTIVE_VERSION_ID))
    }

    /// Embedded `metadata` object, when the entry carries one.
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.0.get(METADATA).and_then(Value::as_object)
    }

    /// Shallow merge: every field of `newer` overwrites the same field here.
    pub fn merge_from(&mut self, newer: &Entry) {
        for (key, value) in &newer.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl From<Map<String, Value>> for Entry {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Reads an identifier-like field. Numbers compare by their decimal form.
pub(crate) fn scalar_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Like [`scalar_id`], but an empty string still counts as set.
pub(crate) fn defined_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        other => scalar_id(Some(other)),
    }
}

/// String value that is not blank. Returned as stored, untrimmed.
pub(crate) fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Maps a loosely-typed entry into the host application's canonical shape.
///
/// Implementations must be pure and idempotent: the merger may normalize an
/// entry that was already normalized by the parser.
pub trait EntryNormalizer: Send + Sync {
    fn normalize(&self, entry: Entry) -> Entry;
}

impl<F> EntryNormalizer for F
where
    F: Fn(Entry) -> Entry + Send + Sync,
{
    fn normalize(&self, entry: Entry) -> Entry {
        self(entry)
    }
}

/// Default normalizer.
///
/// - numeric `id` / `versionId` become strings
/// - `flavor` is trimmed; a blank flavor is removed so fallbacks apply
#[derive(Clone, Copy, Debug, Default)]
pub struct CanonicalNormalizer;

impl EntryNormalizer for CanonicalNormalizer {
    fn normalize(&self, mut entry: Entry) -> Entry {
        for key in [ID, VERSION_ID] {
            if let Some(Value::Number(n)) = entry.get(key) {
                let text = n.to_string();
                entry.insert(key, text);
            }
        }
        match entry.get(FLAVOR).map(|v| v.as_str().map(str::trim)) {
            Some(Some("")) | Some(None) => {
                entry.remove(FLAVOR);
            }
            Some(Some(trimmed)) => {
                let trimmed = trimmed.to_string();
                entry.set_flavor(trimmed);
            }
            None => {}
        }
        entry
    }
}
