//! HTTP/1.1 client engine and URL loader built directly on socket
//! primitives.
//!
//! The core is a per-request state machine ([`HttpClient`]) over a plain or
//! TLS [`Transport`]: it serializes and pumps the request out across
//! partial writes, incrementally parses the status line and headers from
//! the byte stream, detects 301/302 redirects, and delivers the response
//! body either fully buffered or as a live stream under backpressure.
//! [`UrlLoader`] sits on top and owns what the engine deliberately does
//! not: URL parsing, scheme dispatch, and redirect following.
//!
//! Every request closes its connection (`Connection: close`); there is no
//! keep-alive, chunked decoding, or HTTP/2.
//!
//! # Example
//!
//! ```no_run
//! use http_loader::{init_crypto_provider, UrlLoader, UrlRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), http_loader::LoadError> {
//! init_crypto_provider();
//!
//! let loader = UrlLoader::new();
//! let response = loader.load(UrlRequest::get("https://example.com/")).await?;
//! println!("{}", response.status_line);
//! let body = response.body.bytes().await?;
//! println!("{} body bytes", body.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod body;
mod client;
pub mod config;
mod dns;
mod error;
mod loader;
mod logging;
mod request;
mod response;
mod tls;
mod transport;
mod upload;

// Re-export public API
pub use body::Body;
pub use client::{BodyMode, HttpClient};
pub use dns::{init_resolver, resolve_host};
pub use error::LoadError;
pub use loader::{UrlLoader, UrlRequest};
pub use logging::init_logger;
pub use request::{
    build, drain_sources, is_method_allowed, serialize, SerializedRequest, ALLOWED_METHODS,
};
pub use response::{FetchOutcome, Response};
pub use tls::{client_config, init_crypto_provider, VerifyHook};
pub use transport::{Connector, Transport};
pub use upload::UploadSource;
