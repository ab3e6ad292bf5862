use serde_json::{Map, Value};
use tracing::debug;

use crate::accumulator::AccumulationResult;
use crate::entry::{Entry, EntryNormalizer, FLAVOR, non_empty_str};
use crate::errors::PayloadParseError;
use crate::request::StreamRequest;

/// Which shape the main payload turned out to have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadFormat {
    /// The buffer parsed as a JSON object.
    Structured,
    /// Anything else; the buffer became the entry's markdown.
    Markdown,
}

impl PayloadFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Markdown => "markdown",
        }
    }
}

/// Output of the parsing step, consumed by the merger.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedPayload {
    /// Normalized entry with its flavor resolved.
    pub entry: Entry,
    /// The record as streamed, before normalization. `None` for markdown.
    pub structured: Option<Map<String, Value>>,
    /// Parsed metadata object, if one arrived and was readable.
    pub metadata: Option<Map<String, Value>>,
    /// Final flavor: entry, then metadata, then request.
    pub flavor: String,
    pub format: PayloadFormat,
}

/// Strictly parses `raw` as a JSON object.
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, PayloadParseError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(PayloadParseError::NotAnObject {
            found: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolves the structured-vs-text ambiguity once accumulation is complete.
///
/// Parse failures are an expected branch, not an error: the protocol allows
/// either shape on the same stream.
pub fn parse_payload(
    accumulated: &AccumulationResult,
    request: &StreamRequest,
    normalizer: &dyn EntryNormalizer,
) -> ParsedPayload {
    let (structured, format) = match parse_object(&accumulated.raw_payload) {
        Ok(map) => (Some(map), PayloadFormat::Structured),
        Err(err) => {
            debug!(
                event = "parser.markdown_fallback",
                domain = "word_session",
                reason = %err,
                raw_len = accumulated.raw_payload.len() as u64
            );
            (None, PayloadFormat::Markdown)
        }
    };

    let metadata = accumulated
        .metadata_payload
        .as_deref()
        .and_then(|raw| match parse_object(raw) {
            Ok(map) => Some(map),
            Err(err) => {
                debug!(
                    event = "parser.metadata_ignored",
                    domain = "word_session",
                    reason = %err
                );
                None
            }
        });

    let raw_entry = match &structured {
        Some(map) => Entry::from_fields(map.clone()),
        None => Entry::markdown_fallback(
            request.term(),
            request.language(),
            accumulated.raw_payload.clone(),
        ),
    };
    let mut entry = normalizer.normalize(raw_entry);

    let flavor = resolve_flavor(&entry, metadata.as_ref(), request);
    entry.ensure_flavor(&flavor);

    ParsedPayload {
        entry,
        structured,
        metadata,
        flavor,
        format,
    }
}

/// First non-empty of: entry flavor, metadata flavor, request flavor.
pub fn resolve_flavor(
    entry: &Entry,
    metadata: Option<&Map<String, Value>>,
    request: &StreamRequest,
) -> String {
    entry
        .flavor()
        .or_else(|| metadata.and_then(|m| non_empty_str(m.get(FLAVOR))))
        .unwrap_or_else(|| request.flavor())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CanonicalNormalizer;
    use serde_json::json;

    fn request() -> StreamRequest {
        StreamRequest::builder("u1", "test", "cache-key")
            .language("ENGLISH")
            .flavor("BILINGUAL")
            .build()
            .expect("request")
    }

    fn accumulated(raw: &str, metadata: Option<&str>) -> AccumulationResult {
        AccumulationResult {
            raw_payload: raw.to_string(),
            metadata_payload: metadata.map(str::to_string),
        }
    }

    #[test]
    fn parse_object_rejects_non_objects() {
        assert!(parse_object("{\"a\":1}").is_ok());
        assert!(matches!(
            parse_object("[1,2]"),
            Err(PayloadParseError::NotAnObject { found: "array" })
        ));
        assert!(matches!(
            parse_object("null"),
            Err(PayloadParseError::NotAnObject { found: "null" })
        ));
        assert!(matches!(parse_object("# word"), Err(PayloadParseError::Json(_))));
    }

    #[test]
    fn structured_payload_keeps_fields_and_falls_back_to_request_flavor() {
        let parsed = parse_payload(
            &accumulated(r#"{"id":"1","term":"test","definitions":[]}"#, None),
            &request(),
            &CanonicalNormalizer,
        );
        assert_eq!(parsed.format, PayloadFormat::Structured);
        assert_eq!(parsed.flavor, "BILINGUAL");
        assert_eq!(
            parsed.entry.fields(),
            json!({"id":"1","term":"test","definitions":[],"flavor":"BILINGUAL"})
                .as_object()
                .expect("object")
        );
        assert!(parsed.metadata.is_none());
    }

    #[test]
    fn text_payload_becomes_markdown_entry() {
        let parsed = parse_payload(
            &accumulated("# test\n\nA procedure", None),
            &request(),
            &CanonicalNormalizer,
        );
        assert_eq!(parsed.format, PayloadFormat::Markdown);
        assert!(parsed.structured.is_none());
        assert_eq!(parsed.entry.markdown(), Some("# test\n\nA procedure"));
        assert_eq!(parsed.entry.get("term"), Some(&json!("test")));
        assert_eq!(parsed.entry.get("language"), Some(&json!("ENGLISH")));
        assert_eq!(parsed.entry.identifier(), None);
    }

    #[test]
    fn json_primitive_payload_is_treated_as_text() {
        let parsed = parse_payload(&accumulated("42", None), &request(), &CanonicalNormalizer);
        assert_eq!(parsed.format, PayloadFormat::Markdown);
        assert_eq!(parsed.entry.markdown(), Some("42"));
    }

    #[test]
    fn malformed_metadata_is_ignored() {
        let parsed = parse_payload(
            &accumulated(r#"{"id":"1"}"#, Some("{not json")),
            &request(),
            &CanonicalNormalizer,
        );
        assert!(parsed.metadata.is_none());
        assert_eq!(parsed.entry.identifier(), Some("1".into()));
    }

    #[test]
    fn flavor_precedence_entry_then_metadata_then_request() {
        let req = request();
        let with_entry = parse_payload(
            &accumulated(r#"{"flavor":"ENTRY"}"#, Some(r#"{"flavor":"META"}"#)),
            &req,
            &CanonicalNormalizer,
        );
        assert_eq!(with_entry.flavor, "ENTRY");

        let with_meta = parse_payload(
            &accumulated(r#"{"flavor":""}"#, Some(r#"{"flavor":"META"}"#)),
            &req,
            &CanonicalNormalizer,
        );
        assert_eq!(with_meta.flavor, "META");
        assert_eq!(with_meta.entry.flavor(), Some("META"));

        let with_request = parse_payload(&accumulated("plain", None), &req, &CanonicalNormalizer);
        assert_eq!(with_request.flavor, "BILINGUAL");
    }

    #[test]
    fn normalizer_runs_before_flavor_resolution() {
        let force_mono = |mut e: Entry| {
            e.set_flavor("MONO");
            e
        };
        let parsed = parse_payload(&accumulated("text", None), &request(), &force_mono);
        assert_eq!(parsed.flavor, "MONO");
    }

    #[test]
    fn metadata_flavor_is_kept_as_stored() {
        let identity = |e: Entry| e;
        let parsed = parse_payload(
            &accumulated(r#"{"id":"1"}"#, Some(r#"{"flavor":" MONO "}"#)),
            &request(),
            &identity,
        );
        assert_eq!(parsed.flavor, " MONO ");
        assert_eq!(parsed.entry.flavor(), Some(" MONO "));
    }
}
