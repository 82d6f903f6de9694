//! Response delivery objects.

use crate::body::Body;

/// A delivered HTTP response.
///
/// Any status code other than 301/302 is deliverable, 4xx and 5xx included;
/// what counts as application-level success is the caller's policy.
#[derive(Debug)]
pub struct Response {
    /// Numeric status code.
    pub status_code: u16,
    /// Reconstructed status line, e.g. `HTTP/1.1 200 OK`.
    pub status_line: String,
    /// The URL this response was fetched from.
    pub url: String,
    /// Header list in wire order; duplicates preserved.
    pub headers: Vec<(String, String)>,
    /// Body handle: sized buffer or live stream.
    pub body: Body,
}

impl Response {
    /// First value of the header with the given name (exact match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Terminal outcome of one client instance.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Headers parsed and a response object constructed; its body is
    /// buffered or already streaming. Handed off exactly once.
    Response(Response),
    /// A 301/302 was detected: no response object exists for this attempt,
    /// and the caller decides whether to start a new one against `location`.
    Redirect {
        /// The redirect status code (301 or 302).
        status_code: u16,
        /// The `Location` header value; empty when the header was absent,
        /// which callers must treat as "no redirect target given".
        location: String,
    },
}
