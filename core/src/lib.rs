//! Synchronous client for the Context Memory API.
//!
//! # Overview
//! Maps method calls onto the API's REST endpoints, decodes JSON responses
//! into typed records, and normalizes HTTP failures into `ApiError`. All
//! storage and search logic lives server-side.
//!
//! # Design
//! - `build_*` methods produce plain-data `HttpRequest`s; only a `Transport`
//!   touches the network, so request shapes and status mapping are testable
//!   without I/O.
//! - One blocking round-trip per request, no retries, no caching.
//! - The client owns its transport and closes it on `close` or drop.
//!
//! ```no_run
//! use ctxmem::{ContextMemory, EntryOptions, SearchOptions};
//!
//! # fn main() -> ctxmem::Result<()> {
//! let ctx = ContextMemory::from_env()?;
//! ctx.set("myproject", "decision", "use postgres", EntryOptions::new())?;
//! let value = ctx.get("myproject", "decision")?;
//! let hits = ctx.search("what database should i use", &SearchOptions::new())?;
//! # let _ = (value, hits);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod status;
pub mod transport;
pub mod types;

pub use client::ContextMemory;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ApiError, ErrorDetail, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{
    Account, Entry, EntryFilter, EntryOptions, Namespace, NewEntry, NewNamespace, SearchOptions,
    SearchResult,
};
