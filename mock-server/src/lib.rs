//! In-memory stand-in for the Context Memory API.
//!
//! Implements the endpoints the client consumes with just enough behavior to
//! exercise it end to end: API-key checks, namespace quotas, substring text
//! lookup and a token-overlap "semantic" search.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_API_KEY: &str = "test-key";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_key: String,
    /// `None` means unlimited.
    pub max_namespaces: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            max_namespaces: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Namespace {
    pub id: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub entry_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub key: String,
    pub value: Value,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct CreateNamespace {
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateEntry {
    pub key: String,
    pub value: Value,
    pub tags: Option<Vec<String>>,
    pub ttl_seconds: Option<u64>,
    pub importance: Option<f64>,
}

#[derive(Deserialize)]
pub struct TextSearch {
    pub query: String,
    pub namespace: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Deserialize)]
pub struct SemanticSearch {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub namespace: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct EntryQuery {
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

fn default_limit() -> usize {
    10
}

fn default_threshold() -> f64 {
    0.7
}

#[derive(Default)]
struct Store {
    namespaces: BTreeMap<String, Namespace>,
    entries: Vec<Entry>,
}

impl Store {
    fn entry_count(&self, slug: &str) -> usize {
        self.entries.iter().filter(|e| e.namespace == slug).count()
    }

    fn namespace_view(&self, ns: &Namespace) -> Namespace {
        Namespace {
            entry_count: self.entry_count(&ns.slug),
            ..ns.clone()
        }
    }
}

struct AppState {
    config: AppConfig,
    store: RwLock<Store>,
}

type Shared = Arc<AppState>;

/// Error response: status plus `{"error": ...}` body, optionally with `limit`.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    body: Value,
}

impl Failure {
    fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }

    fn limit(message: &str, limit: usize) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            body: json!({ "error": message, "limit": limit }),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn app() -> Router {
    app_with(AppConfig::default())
}

pub fn app_with(config: AppConfig) -> Router {
    let state: Shared = Arc::new(AppState {
        config,
        store: RwLock::new(Store::default()),
    });
    Router::new()
        .route("/v1/namespaces", get(list_namespaces).post(create_namespace))
        .route("/v1/namespaces/{slug}", get(get_namespace).delete(delete_namespace))
        .route("/v1/namespaces/{slug}/entries", get(list_entries).post(create_entry))
        .route("/v1/namespaces/{slug}/entries/{id}", delete(delete_entry))
        .route("/v1/search/text", post(text_search))
        .route("/v1/search", post(semantic_search))
        .route("/v1/account", get(account))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, config: AppConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Failure> {
    let key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if key == Some(state.config.api_key.as_str()) {
        Ok(())
    } else {
        Err(Failure::new(StatusCode::UNAUTHORIZED, "Invalid API key"))
    }
}

async fn list_namespaces(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    authorize(&state, &headers)?;
    let store = state.store.read().await;
    let namespaces: Vec<Namespace> = store
        .namespaces
        .values()
        .map(|ns| store.namespace_view(ns))
        .collect();
    Ok(Json(json!({ "namespaces": namespaces })))
}

async fn create_namespace(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(input): Json<CreateNamespace>,
) -> Result<(StatusCode, Json<Namespace>), Failure> {
    authorize(&state, &headers)?;
    if input.slug.trim().is_empty() {
        return Err(Failure::new(StatusCode::UNPROCESSABLE_ENTITY, "slug is required"));
    }

    let mut store = state.store.write().await;
    if let Some(existing) = store.namespaces.get(&input.slug) {
        return Ok((StatusCode::OK, Json(store.namespace_view(existing))));
    }
    if let Some(max) = state.config.max_namespaces {
        if store.namespaces.len() >= max {
            return Err(Failure::limit("Namespace limit reached", max));
        }
    }

    let now = Utc::now();
    let ns = Namespace {
        id: Uuid::new_v4().to_string(),
        slug: input.slug.clone(),
        name: input.name,
        description: input.description,
        entry_count: 0,
        created_at: now,
        updated_at: now,
    };
    store.namespaces.insert(input.slug, ns.clone());
    Ok((StatusCode::CREATED, Json(ns)))
}

async fn get_namespace(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<Namespace>, Failure> {
    authorize(&state, &headers)?;
    let store = state.store.read().await;
    store
        .namespaces
        .get(&slug)
        .map(|ns| Json(store.namespace_view(ns)))
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Namespace not found"))
}

async fn delete_namespace(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<Value>, Failure> {
    authorize(&state, &headers)?;
    let mut store = state.store.write().await;
    if store.namespaces.remove(&slug).is_none() {
        return Err(Failure::new(StatusCode::NOT_FOUND, "Namespace not found"));
    }
    store.entries.retain(|e| e.namespace != slug);
    Ok(Json(json!({ "success": true })))
}

async fn list_entries(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(query): Query<EntryQuery>,
) -> Result<Json<Value>, Failure> {
    authorize(&state, &headers)?;
    let store = state.store.read().await;
    if !store.namespaces.contains_key(&slug) {
        return Err(Failure::new(StatusCode::NOT_FOUND, "Namespace not found"));
    }
    let entries: Vec<&Entry> = store
        .entries
        .iter()
        .filter(|e| e.namespace == slug)
        .filter(|e| match &query.tag {
            Some(tag) => e.tags.as_ref().is_some_and(|tags| tags.contains(tag)),
            None => true,
        })
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();
    Ok(Json(json!({ "entries": entries })))
}

async fn create_entry(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Json(input): Json<CreateEntry>,
) -> Result<(StatusCode, Json<Entry>), Failure> {
    authorize(&state, &headers)?;
    if input.key.is_empty() {
        return Err(Failure::new(StatusCode::UNPROCESSABLE_ENTITY, "key is required"));
    }
    if let Some(importance) = input.importance {
        if !(0.0..=1.0).contains(&importance) {
            return Err(Failure::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "importance must be between 0 and 1",
            ));
        }
    }

    let mut metadata = Map::new();
    if let Some(ttl) = input.ttl_seconds {
        metadata.insert("ttl_seconds".to_string(), json!(ttl));
    }
    if let Some(importance) = input.importance {
        metadata.insert("importance".to_string(), json!(importance));
    }
    let metadata = (!metadata.is_empty()).then_some(metadata);

    let mut store = state.store.write().await;
    if !store.namespaces.contains_key(&slug) {
        return Err(Failure::new(StatusCode::NOT_FOUND, "Namespace not found"));
    }

    let now = Utc::now();
    // Same key in the same namespace overwrites in place.
    if let Some(existing) = store
        .entries
        .iter_mut()
        .find(|e| e.namespace == slug && e.key == input.key)
    {
        existing.value = input.value;
        existing.tags = input.tags;
        existing.metadata = metadata;
        existing.updated_at = now;
        return Ok((StatusCode::CREATED, Json(existing.clone())));
    }

    let entry = Entry {
        id: Uuid::new_v4().to_string(),
        key: input.key,
        value: input.value,
        namespace: slug,
        tags: input.tags,
        metadata,
        created_at: now,
        updated_at: now,
    };
    store.entries.push(entry.clone());
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn delete_entry(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((slug, id)): Path<(String, String)>,
) -> Result<StatusCode, Failure> {
    authorize(&state, &headers)?;
    let mut store = state.store.write().await;
    let before = store.entries.len();
    store.entries.retain(|e| !(e.namespace == slug && e.id == id));
    if store.entries.len() == before {
        return Err(Failure::new(StatusCode::NOT_FOUND, "Entry not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Case-insensitive substring match on keys; exact key matches rank first,
/// then shorter keys.
async fn text_search(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(input): Json<TextSearch>,
) -> Result<Json<Value>, Failure> {
    authorize(&state, &headers)?;
    let needle = input.query.to_lowercase();
    let store = state.store.read().await;
    let mut hits: Vec<&Entry> = store
        .entries
        .iter()
        .filter(|e| input.namespace.as_ref().map_or(true, |ns| &e.namespace == ns))
        .filter(|e| e.key.to_lowercase().contains(&needle))
        .collect();
    hits.sort_by_key(|e| (e.key != input.query, e.key.len()));
    hits.truncate(input.limit);
    let count = hits.len();
    Ok(Json(json!({ "results": hits, "query": input.query, "count": count })))
}

async fn semantic_search(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(input): Json<SemanticSearch>,
) -> Result<Json<Value>, Failure> {
    authorize(&state, &headers)?;
    if !(1..=100).contains(&input.limit) {
        return Err(Failure::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "limit must be between 1 and 100",
        ));
    }

    let query_tokens = tokens(&input.query);
    let store = state.store.read().await;
    let mut scored: Vec<(f64, &Entry)> = store
        .entries
        .iter()
        .filter(|e| input.namespace.as_ref().map_or(true, |ns| &e.namespace == ns))
        .filter(|e| match (&input.tags, &e.tags) {
            (Some(wanted), Some(have)) => wanted.iter().any(|t| have.contains(t)),
            (Some(_), None) => false,
            (None, _) => true,
        })
        .map(|e| (similarity(&query_tokens, e), e))
        .filter(|(score, _)| *score >= input.threshold)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(input.limit);

    let results: Vec<Value> = scored
        .into_iter()
        .map(|(score, entry)| {
            let mut value = json!(entry);
            value["similarity"] = json!(score);
            value
        })
        .collect();
    let count = results.len();
    Ok(Json(json!({ "results": results, "query": input.query, "count": count })))
}

async fn account(State(state): State<Shared>, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    authorize(&state, &headers)?;
    let store = state.store.read().await;
    let namespace_limit = state.config.max_namespaces.map_or(-1, |max| max as i64);
    Ok(Json(json!({
        "account": { "email": "dev@example.com", "tier": "free" },
        "usage": {
            "namespaces": { "current": store.namespaces.len(), "limit": namespace_limit },
            "entries": { "current": store.entries.len(), "limit": -1 },
        },
    })))
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of query tokens found in the entry's key or value.
fn similarity(query: &HashSet<String>, entry: &Entry) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let value_text = match &entry.value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let haystack = tokens(&format!("{} {}", entry.key, value_text));
    let matched = query.iter().filter(|t| haystack.contains(*t)).count();
    matched as f64 / query.len() as f64
}
