//! The `ContextMemory` client: request building, execution, and the public
//! operations built on top.
//!
//! # Design
//! Every operation is split the same way: a pure `build_*` method produces
//! an `HttpRequest`, then the executor sends it through the `Transport`,
//! maps the status with `check_status`, and decodes the JSON body. The
//! `build_*` methods are public so request shapes can be verified without a
//! network.
//!
//! Convenience operations (`set`, `get`, `search`, `delete`) sit on top of
//! the resource operations. `get` and `delete` look entries up through the
//! text-search endpoint with `limit: 1` and only inspect the top hit, so an
//! entry that search does not rank first is reported as missing.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::status::check_status;
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    Account, CreatedEntry, Entry, EntryFilter, EntryList, EntryOptions, KeyMatch, Namespace,
    NamespaceList, NewEntry, NewNamespace, SearchOptions, SearchResult, TextSearch,
    TextSearchResults,
};

const API_KEY_HEADER: &str = "x-api-key";

/// Synchronous client for the Context Memory API.
///
/// Owns one transport for its whole life and uses it sequentially. The
/// transport is closed by `close` or, failing that, when the client is
/// dropped.
pub struct ContextMemory<T: Transport = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl ContextMemory<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout);
        Self { config, transport }
    }

    /// Build from `CTXMEM_API_KEY`, `CTXMEM_BASE_URL` and `CTXMEM_TIMEOUT`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ClientConfig::builder().build()?))
    }

    /// Explicit key; base URL and timeout still fall back to the environment.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(ClientConfig::builder().api_key(api_key).build()?))
    }
}

impl<T: Transport> ContextMemory<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Release the underlying connection.
    pub fn close(self) {
        drop(self);
    }

    // -----------------------------------------------------------------------
    // Convenience API
    // -----------------------------------------------------------------------

    /// Store `value` under `key`, creating the namespace first if needed.
    /// Returns the server-assigned entry id.
    ///
    /// Not atomic: up to three sequential requests (probe namespace, create
    /// namespace, create entry).
    pub fn set(
        &self,
        namespace: &str,
        key: &str,
        value: impl Serialize,
        options: EntryOptions,
    ) -> Result<String> {
        let value =
            serde_json::to_value(value).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.ensure_namespace(namespace)?;

        let request = self.build_create_entry(namespace, &NewEntry::new(key, value, options))?;
        let created: CreatedEntry = self.execute(&request)?;
        Ok(created.id)
    }

    /// Value stored under `key`, or `None` if the top text-search hit is not
    /// an exact key match.
    pub fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        Ok(self.lookup(namespace, key)?.map(|hit| hit.value))
    }

    /// Semantic search across entries.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResult> {
        let request = self.build_search(query, options)?;
        self.execute(&request)
    }

    /// Delete the entry stored under `key`. Returns `false`, without
    /// mutating anything, when the lookup finds no exact match.
    pub fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        match self.lookup(namespace, key)? {
            Some(hit) => {
                let request = self.build_delete_entry(namespace, &hit.id);
                self.execute_discarding(&request)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // -----------------------------------------------------------------------
    // Resource API
    // -----------------------------------------------------------------------

    pub fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let list: NamespaceList = self.execute(&self.build_list_namespaces())?;
        Ok(list.namespaces)
    }

    pub fn create_namespace(&self, namespace: &NewNamespace) -> Result<Namespace> {
        let request = self.build_create_namespace(namespace)?;
        self.execute(&request)
    }

    /// Fails with `ApiError::NotFound` if no namespace has this slug.
    pub fn get_namespace(&self, slug: &str) -> Result<Namespace> {
        self.execute(&self.build_get_namespace(slug))
    }

    /// Delete a namespace and, server-side, all of its entries.
    pub fn delete_namespace(&self, slug: &str) -> Result<bool> {
        self.execute_discarding(&self.build_delete_namespace(slug))?;
        Ok(true)
    }

    pub fn list_entries(&self, namespace: &str, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let list: EntryList = self.execute(&self.build_list_entries(namespace, filter))?;
        Ok(list.entries)
    }

    /// Account details and usage, passed through as-is.
    pub fn account(&self) -> Result<Account> {
        self.execute(&self.build_account())
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_text_lookup(&self, namespace: &str, key: &str) -> Result<HttpRequest> {
        let body = TextSearch {
            query: key,
            namespace,
            limit: 1,
        };
        self.json_request(HttpMethod::Post, "/v1/search/text", &body)
    }

    pub fn build_search(&self, query: &str, options: &SearchOptions) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Post, "/v1/search", &options.payload(query))
    }

    pub fn build_create_entry(&self, namespace: &str, entry: &NewEntry) -> Result<HttpRequest> {
        self.json_request(
            HttpMethod::Post,
            &format!("/v1/namespaces/{namespace}/entries"),
            entry,
        )
    }

    pub fn build_list_entries(&self, namespace: &str, filter: &EntryFilter) -> HttpRequest {
        let mut request = self.request(HttpMethod::Get, &format!("/v1/namespaces/{namespace}/entries"));
        request.query = filter.query_pairs();
        request
    }

    pub fn build_delete_entry(&self, namespace: &str, id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Delete,
            &format!("/v1/namespaces/{namespace}/entries/{id}"),
        )
    }

    pub fn build_list_namespaces(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/v1/namespaces")
    }

    pub fn build_create_namespace(&self, namespace: &NewNamespace) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Post, "/v1/namespaces", namespace)
    }

    pub fn build_get_namespace(&self, slug: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/v1/namespaces/{slug}"))
    }

    pub fn build_delete_namespace(&self, slug: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/v1/namespaces/{slug}"))
    }

    pub fn build_account(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/v1/account")
    }

    // -----------------------------------------------------------------------
    // Executor
    // -----------------------------------------------------------------------

    fn execute<R: DeserializeOwned>(&self, request: &HttpRequest) -> Result<R> {
        let response = self.round_trip(request)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// For endpoints whose success body carries nothing we use (may be empty).
    fn execute_discarding(&self, request: &HttpRequest) -> Result<()> {
        self.round_trip(request).map(|_| ())
    }

    fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let response = self
            .transport
            .send(request)
            .map_err(ApiError::request_failed)?;
        debug!(status = response.status, url = %request.url, "received response");
        check_status(&response)?;
        Ok(response)
    }

    fn ensure_namespace(&self, slug: &str) -> Result<()> {
        match self.get_namespace(slug) {
            Ok(_) => Ok(()),
            Err(ApiError::NotFound(_)) => {
                debug!(slug, "namespace missing, creating it");
                self.create_namespace(&NewNamespace::new(slug))?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn lookup(&self, namespace: &str, key: &str) -> Result<Option<KeyMatch>> {
        let request = self.build_text_lookup(namespace, key)?;
        let found: TextSearchResults = self.execute(&request)?;
        Ok(found.results.into_iter().next().filter(|hit| hit.key == key))
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{path}", self.config.base_url),
            query: Vec::new(),
            headers: vec![(API_KEY_HEADER.to_string(), self.config.api_key.clone())],
            body: None,
        }
    }

    fn json_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: &impl Serialize,
    ) -> Result<HttpRequest> {
        let body =
            serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut request = self.request(method, path);
        request
            .headers
            .push(("content-type".to_string(), "application/json".to_string()));
        request.body = Some(body);
        Ok(request)
    }
}

impl<T: Transport> Drop for ContextMemory<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

impl<T: Transport> std::fmt::Debug for ContextMemory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextMemory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
