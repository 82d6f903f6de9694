//! URL loading.
//!
//! Owns the policy the client engine deliberately does not: scheme
//! dispatch, buffering-mode selection, and redirect following. Every
//! attempt — the initial request and each redirect hop — gets a fresh
//! connection and a fresh [`HttpClient`]; the engine only ever reports a
//! redirect, it never loops itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use hickory_resolver::TokioAsyncResolver;
use url::Url;

use crate::client::{BodyMode, HttpClient};
use crate::config::MAX_REDIRECT_HOPS;
use crate::dns::init_resolver;
use crate::error::LoadError;
use crate::request;
use crate::response::{FetchOutcome, Response};
use crate::tls::VerifyHook;
use crate::transport::Connector;
use crate::upload::UploadSource;

/// One URL load: target, method, caller headers, upload sources, and the
/// body-delivery mode.
#[derive(Debug)]
pub struct UrlRequest {
    /// Target URL; the scheme must be `http` or `https`.
    pub url: String,
    /// HTTP method, validated against the allowed set before any I/O.
    pub method: String,
    /// Caller headers. Duplicate names collapse, the last value winning.
    pub headers: Vec<(String, String)>,
    /// Upload sources, drained once, in order, into the request body.
    pub body: Vec<UploadSource>,
    /// Body delivery mode for the final response.
    pub mode: BodyMode,
}

impl UrlRequest {
    /// A buffered GET of `url` with no extra headers and no body.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            mode: BodyMode::Buffer,
        }
    }
}

/// Loads URLs, following redirects up to a hop cap.
pub struct UrlLoader {
    connector: Connector,
    max_redirects: usize,
}

impl UrlLoader {
    /// Creates a loader with its own resolver and default verification.
    pub fn new() -> Self {
        Self::with_resolver(init_resolver())
    }

    /// Creates a loader sharing an existing resolver.
    pub fn with_resolver(resolver: Arc<TokioAsyncResolver>) -> Self {
        Self {
            connector: Connector::new(resolver),
            max_redirects: MAX_REDIRECT_HOPS,
        }
    }

    /// Installs a per-certificate verify hook for TLS connections.
    pub fn with_verify_hook(mut self, hook: VerifyHook) -> Self {
        self.connector = self.connector.with_verify_hook(hook);
        self
    }

    /// Overrides the redirect hop cap.
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Loads `request`, following 301/302 redirects, and delivers the final
    /// response or a single error.
    ///
    /// # Errors
    ///
    /// [`LoadError::InvalidArgument`] for a bad URL, unsupported scheme, or
    /// disallowed method (all checked before any network activity);
    /// [`LoadError::InvalidResponse`] for a redirect without a usable
    /// target; [`LoadError::Failed`] when the hop cap is exceeded; plus
    /// whatever the transport and engine report.
    pub async fn load(&self, mut request: UrlRequest) -> Result<Response, LoadError> {
        let mut current = Url::parse(&request.url).map_err(|e| {
            log::debug!("invalid url {}: {e}", request.url);
            LoadError::InvalidArgument
        })?;

        if !request::is_method_allowed(&request.method) {
            log::debug!("method {} is not allowed", request.method);
            return Err(LoadError::InvalidArgument);
        }

        // Unique caller headers; later duplicates overwrite earlier ones.
        let extra_headers: BTreeMap<String, String> =
            std::mem::take(&mut request.headers).into_iter().collect();

        // Sources are drained exactly once; redirect attempts resend the
        // same body bytes.
        let body = request::drain_sources(&mut request.body).await?;

        for _ in 0..=self.max_redirects {
            let scheme = current.scheme();
            if scheme != "http" && scheme != "https" {
                log::debug!("unsupported scheme {scheme} in {current}");
                return Err(LoadError::InvalidArgument);
            }
            let host = current.host_str().ok_or(LoadError::InvalidArgument)?.to_string();
            let port = current
                .port_or_known_default()
                .ok_or(LoadError::InvalidArgument)?;
            let path = match current.query() {
                Some(query) => format!("{}?{}", current.path(), query),
                None => current.path().to_string(),
            };

            let serialized =
                request::serialize(&request.method, &path, &host, &extra_headers, body.clone())?;

            let transport = if scheme == "https" {
                self.connector.connect_tls(&host, port).await?
            } else {
                self.connector.connect_plain(&host, port).await?
            };

            let client = HttpClient::new(transport, current.as_str(), serialized);
            match client.fetch(request.mode).await? {
                FetchOutcome::Response(response) => return Ok(response),
                FetchOutcome::Redirect {
                    status_code,
                    location,
                } => {
                    log::info!("{current} redirected ({status_code}) to {location:?}");
                    if location.is_empty() {
                        // Redirect status without a usable target.
                        return Err(LoadError::InvalidResponse);
                    }
                    // Absolute targets parse directly; relative ones
                    // resolve against the current URL.
                    current = Url::parse(&location)
                        .or_else(|_| current.join(&location))
                        .map_err(|e| {
                            log::debug!("redirect target {location:?}: {e}");
                            LoadError::InvalidResponse
                        })?;
                }
            }
        }

        log::warn!("stopping after {} redirects", self.max_redirects);
        Err(LoadError::Failed)
    }
}

impl Default for UrlLoader {
    fn default() -> Self {
        Self::new()
    }
}
