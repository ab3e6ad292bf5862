//! Version reconciliation.
//!
//! Versions can reach a session three ways: the metadata channel, a
//! `versions` array inside the structured record, or nothing at all (the
//! freshly streamed entry is then the only version). The merger folds all of
//! them into one list without duplicate identifiers, where the fresh entry is
//! always either the updated element or the appended tail.

use serde_json::{Map, Value};

use crate::entry::{
    ACTIVE_VERSION_ID, Entry, EntryNormalizer, FLAVOR, METADATA, VERSIONS, defined_id,
};
use crate::parser::ParsedPayload;

/// Canonical multi-version view of one word.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedSummary {
    pub versions: Vec<Entry>,
    pub metadata: Map<String, Value>,
    pub active_version_id: Option<String>,
}

/// Where the candidate version list came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionSource {
    /// Metadata event's `versions` array.
    Metadata,
    /// The structured record's own `versions` array.
    Embedded,
    /// Neither carried versions; the fresh entry stands alone.
    Fresh,
}

/// Picks the candidate list: metadata, then embedded, then the fresh entry.
fn select_candidates(parsed: &ParsedPayload) -> (VersionSource, Vec<Entry>) {
    let from_metadata = parsed
        .metadata
        .as_ref()
        .and_then(|m| m.get(VERSIONS))
        .map(version_entries)
        .filter(|v| !v.is_empty());
    if let Some(candidates) = from_metadata {
        return (VersionSource::Metadata, candidates);
    }

    let embedded = parsed
        .structured
        .as_ref()
        .and_then(|s| s.get(VERSIONS))
        .map(version_entries)
        .filter(|v| !v.is_empty());
    if let Some(candidates) = embedded {
        return (VersionSource::Embedded, candidates);
    }

    (VersionSource::Fresh, vec![parsed.entry.clone()])
}

/// Object elements of a `versions` array; anything else is skipped.
fn version_entries(value: &Value) -> Vec<Entry> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    let mut out: Vec<Entry> = Vec::with_capacity(items.len());
    for item in items {
        let Some(map) = item.as_object() else {
            continue;
        };
        let entry = Entry::from_fields(map.clone());
        let existing = entry
            .identifier()
            .and_then(|id| out.iter().position(|e| e.identifier().as_ref() == Some(&id)));
        match existing {
            Some(idx) => out[idx].merge_from(&entry),
            None => out.push(entry),
        }
    }
    out
}

fn finish_version(entry: Entry, normalizer: &dyn EntryNormalizer, flavor: &str) -> Entry {
    let mut entry = normalizer.normalize(entry);
    entry.ensure_flavor(flavor);
    entry
}

/// Folds the parsed entry and every known version into one summary.
pub fn merge_versions(parsed: &ParsedPayload, normalizer: &dyn EntryNormalizer) -> MergedSummary {
    let (source, candidates) = select_candidates(parsed);

    let fresh = parsed.entry.clone();
    let fresh_id = fresh.identifier();

    let matched = match source {
        // The singleton candidate is the fresh entry itself.
        VersionSource::Fresh => Some(0),
        VersionSource::Metadata | VersionSource::Embedded => fresh_id.as_ref().and_then(|id| {
            candidates
                .iter()
                .position(|c| c.identifier().as_ref() == Some(id))
        }),
    };

    let versions: Vec<Entry> = match matched {
        Some(idx) => candidates
            .into_iter()
            .enumerate()
            .map(|(i, mut candidate)| {
                if i == idx {
                    candidate.merge_from(&fresh);
                }
                finish_version(candidate, normalizer, &parsed.flavor)
            })
            .collect(),
        None => {
            let mut versions: Vec<Entry> = candidates
                .into_iter()
                .map(|c| finish_version(c, normalizer, &parsed.flavor))
                .collect();
            versions.push(finish_version(fresh, normalizer, &parsed.flavor));
            versions
        }
    };

    MergedSummary {
        versions,
        metadata: merge_metadata(parsed),
        active_version_id: elect_active_version(parsed, fresh_id),
    }
}

/// Metadata fields minus version bookkeeping, overlaid by the record's own
/// `metadata` object, with the resolved flavor written last.
fn merge_metadata(parsed: &ParsedPayload) -> Map<String, Value> {
    let mut merged = Map::new();
    if let Some(metadata) = &parsed.metadata {
        for (key, value) in metadata {
            if key == VERSIONS || key == ACTIVE_VERSION_ID {
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }
    }
    let embedded = parsed
        .structured
        .as_ref()
        .and_then(|s| s.get(METADATA))
        .and_then(Value::as_object);
    if let Some(embedded) = embedded {
        for (key, value) in embedded {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged.insert(FLAVOR.into(), Value::String(parsed.flavor.clone()));
    merged
}

fn elect_active_version(parsed: &ParsedPayload, fresh_id: Option<String>) -> Option<String> {
    parsed
        .metadata
        .as_ref()
        .and_then(|m| defined_id(m.get(ACTIVE_VERSION_ID)))
        .or_else(|| {
            parsed
                .structured
                .as_ref()
                .and_then(|s| defined_id(s.get(ACTIVE_VERSION_ID)))
        })
        .or(fresh_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::AccumulationResult;
    use crate::entry::CanonicalNormalizer;
    use crate::parser::parse_payload;
    use crate::request::StreamRequest;
    use serde_json::json;
    use std::collections::HashSet;

    fn parsed(raw: &str, metadata: Option<Value>) -> ParsedPayload {
        parsed_with(raw, metadata, &CanonicalNormalizer)
    }

    fn parsed_with(
        raw: &str,
        metadata: Option<Value>,
        normalizer: &dyn EntryNormalizer,
    ) -> ParsedPayload {
        let request = StreamRequest::builder("u1", "test", "cache-key")
            .language("ENGLISH")
            .flavor("BILINGUAL")
            .build()
            .expect("request");
        let accumulated = AccumulationResult {
            raw_payload: raw.to_string(),
            metadata_payload: metadata.map(|m| m.to_string()),
        };
        parse_payload(&accumulated, &request, normalizer)
    }

    fn identity(entry: Entry) -> Entry {
        entry
    }

    fn entry(value: Value) -> Entry {
        serde_json::from_value(value).expect("object")
    }

    fn assert_unique_ids(summary: &MergedSummary) {
        let mut seen = HashSet::new();
        for version in &summary.versions {
            if let Some(id) = version.identifier() {
                assert!(seen.insert(id.clone()), "duplicate version id {id}");
            }
        }
    }

    #[test]
    fn lone_entry_becomes_the_only_version() {
        let p = parsed(r#"{"id":"1","term":"test","definitions":[]}"#, None);
        let summary = merge_versions(&p, &CanonicalNormalizer);
        assert_eq!(summary.versions, vec![p.entry.clone()]);
        assert_eq!(summary.active_version_id.as_deref(), Some("1"));
        assert_eq!(summary.metadata, *json!({"flavor":"BILINGUAL"}).as_object().expect("object"));
    }

    #[test]
    fn markdown_entry_without_id_has_no_active_version() {
        let p = parsed("plain *markdown*", None);
        let summary = merge_versions(&p, &CanonicalNormalizer);
        assert_eq!(summary.versions.len(), 1);
        assert_eq!(summary.versions[0].markdown(), Some("plain *markdown*"));
        assert_eq!(summary.active_version_id, None);
    }

    #[test]
    fn matching_metadata_version_is_updated_in_place() {
        let p = parsed(
            r#"{"id":"v1","markdown":"new","metadata":{"source":"llm"}}"#,
            Some(json!({
                "versions": [{"id":"v1","markdown":"old","createdAt":"2024-01-01"}],
                "activeVersionId": "v1",
                "flavor": "MONO",
                "reviewer": "r1"
            })),
        );
        let summary = merge_versions(&p, &CanonicalNormalizer);

        assert_eq!(summary.versions.len(), 1);
        let v1 = &summary.versions[0];
        assert_eq!(v1.markdown(), Some("new"));
        assert_eq!(v1.get("createdAt"), Some(&json!("2024-01-01")));
        assert_eq!(v1.flavor(), Some("MONO"));
        assert_eq!(
            summary.metadata,
            *json!({"flavor":"MONO","reviewer":"r1","source":"llm"})
                .as_object()
                .expect("object")
        );
        assert_eq!(summary.active_version_id.as_deref(), Some("v1"));
    }

    #[test]
    fn unmatched_entry_is_appended_after_history() {
        let p = parsed(
            r#"{"id":"v3","markdown":"third"}"#,
            Some(json!({
                "versions": [
                    {"id":"v1","markdown":"one"},
                    {"id":"v2","markdown":"two","flavor":"MONO"}
                ],
                "activeVersionId": "v2"
            })),
        );
        let summary = merge_versions(&p, &CanonicalNormalizer);

        let ids: Vec<_> = summary.versions.iter().filter_map(Entry::identifier).collect();
        assert_eq!(ids, vec!["v1", "v2", "v3"]);
        assert_eq!(summary.versions[0].flavor(), Some("BILINGUAL"));
        assert_eq!(summary.versions[1].flavor(), Some("MONO"));
        assert_eq!(summary.versions[2].markdown(), Some("third"));
        assert_eq!(summary.active_version_id.as_deref(), Some("v2"));
        assert_unique_ids(&summary);
    }

    #[test]
    fn entry_without_id_is_appended_to_history() {
        let p = parsed(
            "fresh text",
            Some(json!({"versions": [{"id":"v1","markdown":"one"}]})),
        );
        let summary = merge_versions(&p, &CanonicalNormalizer);
        assert_eq!(summary.versions.len(), 2);
        assert_eq!(summary.versions[1].markdown(), Some("fresh text"));
        assert_eq!(summary.active_version_id, None);
    }

    #[test]
    fn embedded_versions_are_used_when_metadata_has_none() {
        let p = parsed(
            r#"{"versionId":"b","markdown":"B2","activeVersionId":"a",
                "versions":[{"versionId":"a","markdown":"A"},{"versionId":"b","markdown":"B"}]}"#,
            Some(json!({"versions": [], "reviewer": "r9"})),
        );
        let summary = merge_versions(&p, &CanonicalNormalizer);

        assert_eq!(summary.versions.len(), 2);
        assert_eq!(summary.versions[1].markdown(), Some("B2"));
        assert_eq!(summary.versions[1].versions().map(Vec::len), Some(2));
        assert_eq!(summary.active_version_id.as_deref(), Some("a"));
        assert_eq!(summary.metadata.get("reviewer"), Some(&json!("r9")));
    }

    #[test]
    fn metadata_versions_win_over_embedded_versions() {
        let p = parsed(
            r#"{"id":"x","versions":[{"id":"embedded"}]}"#,
            Some(json!({"versions": [{"id":"x","markdown":"meta"}]})),
        );
        let summary = merge_versions(&p, &CanonicalNormalizer);
        let ids: Vec<_> = summary.versions.iter().filter_map(Entry::identifier).collect();
        assert_eq!(ids, vec!["x"]);
    }

    #[test]
    fn duplicate_history_ids_are_collapsed() {
        let p = parsed(
            r#"{"id":"v2","markdown":"fresh"}"#,
            Some(json!({"versions": [
                {"id":"v1","markdown":"a"},
                {"id":"v1","markdown":"b","note":"later"},
                "not-an-object"
            ]})),
        );
        let summary = merge_versions(&p, &CanonicalNormalizer);
        assert_eq!(summary.versions.len(), 2);
        assert_eq!(summary.versions[0].markdown(), Some("b"));
        assert_eq!(summary.versions[0].get("note"), Some(&json!("later")));
        assert_unique_ids(&summary);
    }

    #[test]
    fn numeric_ids_match_string_ids() {
        let p = parsed(
            r#"{"id":5,"markdown":"new"}"#,
            Some(json!({"versions": [{"id":"5","markdown":"old"}]})),
        );
        let summary = merge_versions(&p, &CanonicalNormalizer);
        assert_eq!(summary.versions.len(), 1);
        assert_eq!(summary.versions[0].get("id"), Some(&json!("5")));
        assert_eq!(summary.active_version_id.as_deref(), Some("5"));
    }

    #[test]
    fn resolved_flavor_overrides_metadata_flavor() {
        let p = parsed(
            r#"{"id":"1","flavor":"BILINGUAL"}"#,
            Some(json!({"flavor":"MONO"})),
        );
        let summary = merge_versions(&p, &CanonicalNormalizer);
        assert_eq!(summary.metadata.get("flavor"), Some(&json!("BILINGUAL")));
        assert_eq!(summary.versions[0].flavor(), Some("BILINGUAL"));
    }

    #[test]
    fn normalizer_applies_to_every_version() {
        let p = parsed(
            r#"{"id":"v2"}"#,
            Some(json!({"versions": [{"id":"v1"}]})),
        );
        let stamp = |mut e: Entry| {
            e.insert("normalized", true);
            e
        };
        let summary = merge_versions(&p, &stamp);
        assert!(
            summary
                .versions
                .iter()
                .all(|v| v.get("normalized") == Some(&json!(true)))
        );
        assert_eq!(summary.versions[1], {
            let mut expected = entry(json!({"id":"v2","flavor":"BILINGUAL"}));
            expected.insert("normalized", true);
            expected
        });
    }

    #[test]
    fn fresh_entry_keeps_its_embedded_list_when_merged() {
        let raw = r#"{"id":"b","markdown":"B2","versions":[{"id":"a"},{"id":"b","markdown":"B"}]}"#;
        let p = parsed_with(raw, None, &identity);
        let summary = merge_versions(&p, &identity);

        let ids: Vec<_> = summary.versions.iter().filter_map(Entry::identifier).collect();
        assert_eq!(ids, vec!["a", "b"]);
        let b = &summary.versions[1];
        assert_eq!(b.markdown(), Some("B2"));
        assert_eq!(b.get("versions"), p.entry.get("versions"));
        assert!(b.get("versions").is_some());
    }

    #[test]
    fn untrimmed_flavor_matches_between_versions_and_metadata() {
        let p = parsed_with(r#"{"id":"1","flavor":" MONO "}"#, None, &identity);
        let summary = merge_versions(&p, &identity);

        assert_eq!(summary.versions[0].get("flavor"), Some(&json!(" MONO ")));
        assert_eq!(summary.metadata.get("flavor"), summary.versions[0].get("flavor"));
    }

    #[test]
    fn empty_metadata_active_id_is_still_elected() {
        let p = parsed(
            r#"{"id":"v1","activeVersionId":"v1"}"#,
            Some(json!({"activeVersionId": ""})),
        );
        let summary = merge_versions(&p, &CanonicalNormalizer);
        assert_eq!(summary.active_version_id.as_deref(), Some(""));

        let missing = parsed(r#"{"id":"v1"}"#, Some(json!({"activeVersionId": null})));
        let summary = merge_versions(&missing, &CanonicalNormalizer);
        assert_eq!(summary.active_version_id.as_deref(), Some("v1"));
    }
}
