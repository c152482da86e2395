//! Search Engine Access
//!
//! Everything that talks to the Elasticsearch-compatible engine:
//!
//! - **Transport**: the async seam every call goes through, plus per-index routing
//! - **Client**: `reqwest` implementation with auth, timeouts and retries
//! - **Fields**: cached field → index-pattern catalog, types and distinct values

mod client;
mod error;
mod fields;
mod transport;

#[cfg(test)]
pub(crate) mod memory;

pub use client::{ClientConfig, HttpTransport};
pub use error::{EngineError, EngineResult};
pub use fields::{flatten_properties, operators_for_type, FieldCatalog, FieldOperators, ValueCase};
pub use transport::{bulk_body, BulkAction, SearchTransport, TransportRouter};
