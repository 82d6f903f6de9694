//! Error types.
//!
//! Failures are categorical: every terminal condition a request attempt can
//! hit maps onto exactly one [`LoadError`] variant, and a failing instance
//! reports it exactly once. Retry policy, if any, belongs to the caller.

use thiserror::Error;

/// Terminal failure of a request attempt.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// The target host did not resolve to any address.
    #[error("name not resolved")]
    NameNotResolved,

    /// No resolved endpoint accepted the TCP connection.
    #[error("connection failed")]
    ConnectionFailed,

    /// The TLS handshake did not complete.
    #[error("handshake not completed")]
    HandshakeNotCompleted,

    /// Generic transmission or protocol failure: a write error, a transport
    /// read error, or the peer closing before a parse phase finished.
    #[error("request failed")]
    Failed,

    /// The response status line was malformed.
    #[error("invalid response")]
    InvalidResponse,

    /// The request was rejected before any I/O: disallowed method, bad URL,
    /// or unsupported scheme.
    #[error("invalid argument")]
    InvalidArgument,
}

impl LoadError {
    /// Returns a short identifier for the error category.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadError::NameNotResolved => "name_not_resolved",
            LoadError::ConnectionFailed => "connection_failed",
            LoadError::HandshakeNotCompleted => "handshake_not_completed",
            LoadError::Failed => "failed",
            LoadError::InvalidResponse => "invalid_response",
            LoadError::InvalidArgument => "invalid_argument",
        }
    }
}
