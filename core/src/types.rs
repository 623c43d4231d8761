//! Records returned by the API and payloads sent to it.
//!
//! # Design
//! Records (`Entry`, `Namespace`, `SearchResult`) are read-only projections
//! of server JSON; the client never mutates or validates them. Payloads use
//! `Option` plus `skip_serializing_if` so a field the caller did not supply
//! is left out of the JSON instead of being sent as `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored key/value memory entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: String,
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Only present on search results.
    #[serde(default)]
    pub similarity: Option<f64>,
}

/// A namespace grouping entries, addressed by `slug`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Namespace {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub entry_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Response of a semantic search. `count` is whatever the server reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub results: Vec<Entry>,
    pub query: String,
    pub count: u64,
}

/// Opaque account and usage document.
pub type Account = Map<String, Value>;

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct NamespaceList {
    pub namespaces: Vec<Namespace>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntryList {
    pub entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedEntry {
    pub id: String,
}

/// Text-lookup hit; only the fields needed for exact-key matching.
#[derive(Debug, Deserialize)]
pub(crate) struct KeyMatch {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextSearchResults {
    #[serde(default)]
    pub results: Vec<KeyMatch>,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Body of `POST /v1/namespaces/{ns}/entries`.
#[derive(Debug, Clone, Serialize)]
pub struct NewEntry {
    pub key: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
}

impl NewEntry {
    pub fn new(key: impl Into<String>, value: Value, options: EntryOptions) -> Self {
        Self {
            key: key.into(),
            value,
            tags: options.tags,
            ttl_seconds: options.ttl_seconds,
            importance: options.importance,
        }
    }
}

/// Optional fields for `ContextMemory::set`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryOptions {
    tags: Option<Vec<String>>,
    ttl_seconds: Option<u64>,
    importance: Option<f64>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty tag list is treated as "no tags".
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.tags = (!tags.is_empty()).then_some(tags);
        self
    }

    pub fn ttl_seconds(mut self, ttl: u64) -> Self {
        self.ttl_seconds = Some(ttl);
        self
    }

    /// Importance score in `0.0..=1.0`; range is enforced server-side.
    pub fn importance(mut self, importance: f64) -> Self {
        self.importance = Some(importance);
        self
    }
}

/// Body of `POST /v1/namespaces`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewNamespace {
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewNamespace {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: None,
            description: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = non_empty(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = non_empty(description.into());
        self
    }
}

/// Body of `POST /v1/search/text`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TextSearch<'a> {
    pub query: &'a str,
    pub namespace: &'a str,
    pub limit: u32,
}

/// Body of `POST /v1/search`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SemanticSearch<'a> {
    pub query: &'a str,
    pub limit: u32,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<&'a [String]>,
}

/// Filters for `ContextMemory::search`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    namespace: Option<String>,
    limit: u32,
    threshold: f64,
    tags: Option<Vec<String>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            limit: 10,
            threshold: 0.7,
            tags: None,
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = non_empty(namespace.into());
        self
    }

    /// Maximum number of results (server accepts 1-100).
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Minimum similarity in `0.0..=1.0`.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.tags = (!tags.is_empty()).then_some(tags);
        self
    }

    pub(crate) fn payload<'a>(&'a self, query: &'a str) -> SemanticSearch<'a> {
        SemanticSearch {
            query,
            limit: self.limit,
            threshold: self.threshold,
            namespace: self.namespace.as_deref(),
            tags: self.tags.as_deref(),
        }
    }
}

/// Query parameters for `ContextMemory::list_entries`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub tag: Option<String>,
    pub limit: Option<u32>,
}

impl EntryFilter {
    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(tag) = &self.tag {
            pairs.push(("tag".to_string(), tag.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_from_search_hit() {
        let entry: Entry = serde_json::from_value(json!({
            "id": "123",
            "key": "decision",
            "value": "use postgres",
            "namespace": "project",
            "tags": ["db"],
            "similarity": 0.95,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(entry.key, "decision");
        assert_eq!(entry.value, json!("use postgres"));
        assert_eq!(entry.tags.as_deref(), Some(&["db".to_string()][..]));
        assert_eq!(entry.similarity, Some(0.95));
        assert_eq!(
            entry.created_at.unwrap().to_rfc3339(),
            "2024-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn entry_optional_fields_default() {
        let entry: Entry =
            serde_json::from_value(json!({"id": "1", "key": "k", "value": {"a": 1}})).unwrap();
        assert_eq!(entry.namespace, "");
        assert!(entry.tags.is_none());
        assert!(entry.metadata.is_none());
        assert!(entry.created_at.is_none());
        assert!(entry.similarity.is_none());
    }

    #[test]
    fn entry_accepts_null_timestamps() {
        let entry: Entry = serde_json::from_value(
            json!({"id": "1", "key": "k", "value": 1, "created_at": null}),
        )
        .unwrap();
        assert!(entry.created_at.is_none());
    }

    #[test]
    fn namespace_defaults_entry_count() {
        let ns: Namespace = serde_json::from_value(json!({
            "id": "ns-123",
            "slug": "newproject",
            "created_at": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(ns.entry_count, 0);
        assert!(ns.name.is_none());
        assert!(ns.updated_at.is_none());
    }

    #[test]
    fn new_entry_omits_unset_fields() {
        let body = serde_json::to_value(NewEntry::new("k", json!("v"), EntryOptions::new())).unwrap();
        assert_eq!(body, json!({"key": "k", "value": "v"}));
    }

    #[test]
    fn new_entry_includes_supplied_fields() {
        let options = EntryOptions::new()
            .tags(["db", "infra"])
            .ttl_seconds(3600)
            .importance(0.0);
        let body = serde_json::to_value(NewEntry::new("k", json!(1), options)).unwrap();
        assert_eq!(
            body,
            json!({"key": "k", "value": 1, "tags": ["db", "infra"], "ttl_seconds": 3600, "importance": 0.0})
        );
    }

    #[test]
    fn empty_tags_are_dropped() {
        let options = EntryOptions::new().tags(Vec::<String>::new());
        assert_eq!(options, EntryOptions::new());
    }

    #[test]
    fn new_namespace_skips_empty_strings() {
        let body = serde_json::to_value(NewNamespace::new("proj").name("").description("notes")).unwrap();
        assert_eq!(body, json!({"slug": "proj", "description": "notes"}));
    }

    #[test]
    fn search_payload_defaults() {
        let options = SearchOptions::new();
        let body = serde_json::to_value(options.payload("q")).unwrap();
        assert_eq!(body, json!({"query": "q", "limit": 10, "threshold": 0.7}));
    }

    #[test]
    fn entry_filter_query_pairs() {
        assert!(EntryFilter::default().query_pairs().is_empty());
        let filter = EntryFilter {
            tag: Some("db".to_string()),
            limit: Some(20),
        };
        assert_eq!(
            filter.query_pairs(),
            vec![
                ("tag".to_string(), "db".to_string()),
                ("limit".to_string(), "20".to_string())
            ]
        );
    }
}
