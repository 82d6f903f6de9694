//! Host resolution.
//!
//! Thin layer over `hickory-resolver` turning a host/port pair into an
//! ordered list of connectable socket addresses. IP literals bypass DNS.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use crate::config::DNS_TIMEOUT_SECS;
use crate::error::LoadError;

/// Initializes the DNS resolver for hostname lookups.
///
/// Uses the default resolver configuration with aggressive timeouts so slow
/// or unresponsive DNS servers fail fast instead of hanging a request.
pub fn init_resolver() -> Arc<TokioAsyncResolver> {
    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(DNS_TIMEOUT_SECS);
    opts.attempts = 2;
    // ndots = 0 prevents search-domain appending for bare hostnames
    opts.ndots = 0;

    Arc::new(TokioAsyncResolver::tokio(ResolverConfig::default(), opts))
}

/// Resolves `host` to socket addresses on `port`, in answer order.
///
/// # Errors
///
/// Returns [`LoadError::NameNotResolved`] if the lookup fails or yields no
/// addresses.
pub async fn resolve_host(
    host: &str,
    port: u16,
    resolver: &TokioAsyncResolver,
) -> Result<Vec<SocketAddr>, LoadError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }

    let response = resolver.lookup_ip(host).await.map_err(|e| {
        log::debug!("resolve {host}: {e}");
        LoadError::NameNotResolved
    })?;

    let addrs: Vec<SocketAddr> = response
        .iter()
        .map(|ip| SocketAddr::new(ip, port))
        .collect();
    if addrs.is_empty() {
        return Err(LoadError::NameNotResolved);
    }
    Ok(addrs)
}
