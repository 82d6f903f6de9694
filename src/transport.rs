//! Transport binding: one capability surface over plain and TLS sockets.
//!
//! A [`Transport`] is fixed as plain or TLS at construction and exposes the
//! same async read/write surface either way; the TLS variant performs its
//! handshake during connect and routes certificate decisions through the
//! verify hook (see [`crate::tls`]). Resolve, connect, and handshake
//! failures are each terminal for the instance — no retry happens here.

use std::io::{self, IoSlice};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use hickory_resolver::TokioAsyncResolver;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::dns::resolve_host;
use crate::error::LoadError;
use crate::tls::{client_config, VerifyHook};

/// A connected socket, plain or TLS-wrapped.
pub enum Transport {
    /// Plain TCP.
    Plain(TcpStream),
    /// TLS over TCP; the handshake has already completed.
    Tls(Box<TlsStream<TcpStream>>),
}

impl Transport {
    /// Whether this transport is TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Plain(_) => f.write_str("Transport::Plain"),
            Transport::Tls(_) => f.write_str("Transport::Tls"),
        }
    }
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_write_vectored(cx, bufs),
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_write_vectored(cx, bufs),
        }
    }

    fn is_write_vectored(&self) -> bool {
        match self {
            Transport::Plain(s) => s.is_write_vectored(),
            Transport::Tls(s) => s.is_write_vectored(),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_flush(cx),
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Resolves and connects transports.
#[derive(Clone)]
pub struct Connector {
    resolver: Arc<TokioAsyncResolver>,
    verify_hook: Option<VerifyHook>,
}

impl Connector {
    /// Creates a connector using the given resolver and default certificate
    /// verification.
    pub fn new(resolver: Arc<TokioAsyncResolver>) -> Self {
        Self {
            resolver,
            verify_hook: None,
        }
    }

    /// Installs a per-certificate verify hook for TLS connects.
    pub fn with_verify_hook(mut self, hook: VerifyHook) -> Self {
        self.verify_hook = Some(hook);
        self
    }

    /// Resolves `host` and connects a plain TCP transport.
    pub async fn connect_plain(&self, host: &str, port: u16) -> Result<Transport, LoadError> {
        let stream = self.connect_tcp(host, port).await?;
        Ok(Transport::Plain(stream))
    }

    /// Resolves `host`, connects, and completes the TLS handshake.
    pub async fn connect_tls(&self, host: &str, port: u16) -> Result<Transport, LoadError> {
        let stream = self.connect_tcp(host, port).await?;

        let config = client_config(self.verify_hook.clone())?;
        let server_name = ServerName::try_from(host.to_string()).map_err(|e| {
            log::debug!("server name {host}: {e}");
            LoadError::InvalidArgument
        })?;

        let connector = TlsConnector::from(Arc::new(config));
        let tls = connector.connect(server_name, stream).await.map_err(|e| {
            log::debug!("handshake with {host}: {e}");
            LoadError::HandshakeNotCompleted
        })?;
        Ok(Transport::Tls(Box::new(tls)))
    }

    /// Tries each resolved endpoint in order; the first to accept wins.
    async fn connect_tcp(&self, host: &str, port: u16) -> Result<TcpStream, LoadError> {
        let addrs = resolve_host(host, port, &self.resolver).await?;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => log::debug!("connect {addr}: {e}"),
            }
        }
        Err(LoadError::ConnectionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::init_resolver;

    #[tokio::test]
    async fn connect_refused_maps_to_connection_failed() {
        let connector = Connector::new(init_resolver());
        // Port 1 on loopback is essentially never listening.
        let err = connector
            .connect_plain("127.0.0.1", 1)
            .await
            .expect_err("connect should fail");
        assert_eq!(err, LoadError::ConnectionFailed);
    }

    #[tokio::test]
    async fn plain_transport_round_trips() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let echo = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });

        let connector = Connector::new(init_resolver());
        let mut transport = connector
            .connect_plain("127.0.0.1", addr.port())
            .await
            .unwrap();
        assert!(!transport.is_tls());

        transport.write_all(b"hello").await.unwrap();
        let mut back = [0u8; 5];
        transport.read_exact(&mut back).await.unwrap();
        assert_eq!(&back, b"hello");
        echo.await.unwrap();
    }
}
