//! Language Server Protocol front end
//!
//! Transport framing lives in `infra`; this module owns connection handling,
//! per-connection state and the request handlers.

mod connection;
pub mod handlers;
mod server;
pub mod service;

#[cfg(test)]
mod testing;

pub use connection::serve_connection;
pub use server::LangServer;
pub use service::{RequestContext, Service, ServiceFactory, schema_service_factory};
