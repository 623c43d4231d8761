//! The one place that performs network I/O.
//!
//! # Design
//! `Transport` executes a single `HttpRequest` and hands back whatever the
//! server answered, error statuses included; interpreting the status is the
//! caller's job. No retries happen at this layer. `UreqTransport` is the
//! blocking default; tests substitute scripted implementations.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// The request never produced an HTTP response (DNS, connect, TLS, timeout).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

pub trait Transport {
    /// Perform exactly one HTTP round-trip.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Release connections. Later `send` calls may fail.
    fn close(&mut self) {}
}

/// Blocking transport backed by a `ureq::Agent` and its connection pool.
#[derive(Debug)]
pub struct UreqTransport {
    agent: Option<ureq::Agent>,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        // Status codes are data here; `status::check_status` interprets them.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent: Some(agent) }
    }

    pub fn is_closed(&self) -> bool {
        self.agent.is_none()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self
            .agent
            .as_ref()
            .ok_or_else(|| TransportError("client is closed".to_string()))?;

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_parts(agent.get(&request.url), request).call(),
            (HttpMethod::Delete, _) => with_parts(agent.delete(&request.url), request).call(),
            (HttpMethod::Post, Some(body)) => {
                with_parts(agent.post(&request.url), request).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_parts(agent.post(&request.url), request).send_empty(),
        };
        let mut response = result.map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn close(&mut self) {
        if self.agent.take().is_some() {
            debug!("closed HTTP agent");
        }
    }
}

fn with_parts<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (key, value) in &request.query {
        builder = builder.query(key, value);
    }
    builder
}
