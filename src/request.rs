//! Request construction.
//!
//! Validates the method, drains upload sources into one contiguous body
//! buffer, and serializes the header block. The header block always carries
//! `Host` and `Connection: close`; `Accept: */*` is added unless the caller
//! supplied an `Accept` header under any capitalization, and
//! `Content-Length` appears exactly when the body is non-empty, computed
//! from the final body size after every source has been drained.

use std::collections::BTreeMap;

use crate::error::LoadError;
use crate::upload::UploadSource;

/// Methods the engine will transmit.
pub const ALLOWED_METHODS: [&str; 8] = [
    "GET", "HEAD", "POST", "PUT", "DELETE", "TRACE", "CONNECT", "PATCH",
];

/// Whether `method` is in the allowed set. Case-sensitive.
pub fn is_method_allowed(method: &str) -> bool {
    ALLOWED_METHODS.contains(&method)
}

/// A serialized request: header block and body, independently consumable by
/// the write pump.
#[derive(Debug, Clone, Default)]
pub struct SerializedRequest {
    /// Header block bytes, including the terminating blank line.
    pub header: Vec<u8>,
    /// Body bytes, transmitted verbatim after the header block.
    pub body: Vec<u8>,
}

/// Drains every source fully, in order, into one contiguous body buffer.
///
/// # Errors
///
/// The first source failure aborts the drain and propagates unchanged.
pub async fn drain_sources(sources: &mut [UploadSource]) -> Result<Vec<u8>, LoadError> {
    let mut body = Vec::new();
    for source in sources.iter_mut() {
        source.read_all(&mut body).await?;
    }
    Ok(body)
}

/// Serializes the header block for `body` and pairs the two.
///
/// # Errors
///
/// Returns [`LoadError::InvalidArgument`] for a disallowed method.
pub fn serialize(
    method: &str,
    path: &str,
    host: &str,
    extra_headers: &BTreeMap<String, String>,
    body: Vec<u8>,
) -> Result<SerializedRequest, LoadError> {
    if !is_method_allowed(method) {
        log::debug!("method {method} is not allowed");
        return Err(LoadError::InvalidArgument);
    }

    let mut header = String::with_capacity(256);
    header.push_str(method);
    header.push(' ');
    header.push_str(path);
    header.push_str(" HTTP/1.1\r\n");
    header.push_str("Host: ");
    header.push_str(host);
    header.push_str("\r\n");
    header.push_str("Connection: close\r\n");

    let mut has_accept = false;
    for (name, value) in extra_headers {
        header.push_str(name);
        header.push_str(": ");
        header.push_str(value);
        header.push_str("\r\n");
        has_accept = has_accept || name.eq_ignore_ascii_case("accept");
    }
    if !has_accept {
        header.push_str("Accept: */*\r\n");
    }

    if !body.is_empty() {
        header.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    header.push_str("\r\n");

    Ok(SerializedRequest {
        header: header.into_bytes(),
        body,
    })
}

/// Builds a complete request: validates the method before any source is
/// touched, drains `sources`, and serializes the header block. No partial
/// request is produced on failure.
///
/// # Errors
///
/// [`LoadError::InvalidArgument`] for a disallowed method; a source failure
/// propagates unchanged.
pub async fn build(
    method: &str,
    path: &str,
    host: &str,
    extra_headers: &BTreeMap<String, String>,
    sources: &mut [UploadSource],
) -> Result<SerializedRequest, LoadError> {
    if !is_method_allowed(method) {
        log::debug!("method {method} is not allowed");
        return Err(LoadError::InvalidArgument);
    }
    let body = drain_sources(sources).await?;
    serialize(method, path, host, extra_headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_text(request: &SerializedRequest) -> String {
        String::from_utf8(request.header.clone()).unwrap()
    }

    fn count_lines_starting(text: &str, prefix: &str) -> usize {
        text.split("\r\n").filter(|l| l.starts_with(prefix)).count()
    }

    #[test]
    fn allowed_method_set() {
        for method in ALLOWED_METHODS {
            assert!(is_method_allowed(method), "{method} should be allowed");
        }
        assert!(!is_method_allowed("FOO"));
        assert!(!is_method_allowed(""));
        assert!(!is_method_allowed("get"));
    }

    #[test]
    fn disallowed_method_is_invalid_argument() {
        let err = serialize("FOO", "/", "example.com", &BTreeMap::new(), Vec::new());
        assert_eq!(err.unwrap_err(), LoadError::InvalidArgument);
    }

    #[test]
    fn empty_request_has_default_accept_and_no_content_length() {
        let request = serialize("GET", "/", "example.com", &BTreeMap::new(), Vec::new()).unwrap();
        let text = header_text(&request);
        assert!(text.starts_with("GET / HTTP/1.1\r\n"));
        assert!(text.contains("Host: example.com\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert_eq!(count_lines_starting(&text, "Accept: */*"), 1);
        assert_eq!(count_lines_starting(&text, "Content-Length"), 0);
        assert!(text.ends_with("\r\n\r\n"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn caller_accept_suppresses_default_case_insensitively() {
        for name in ["Accept", "accept", "ACCEPT", "aCCePt"] {
            let headers: BTreeMap<String, String> =
                [(name.to_string(), "text/html".to_string())].into();
            let request = serialize("GET", "/", "example.com", &headers, Vec::new()).unwrap();
            let text = header_text(&request);
            assert_eq!(
                count_lines_starting(&text, "Accept: */*"),
                0,
                "caller header {name} should suppress the default"
            );
        }
    }

    #[tokio::test]
    async fn content_length_matches_concatenated_sources() {
        let mut sources = vec![
            UploadSource::from_bytes(&b"hello "[..]),
            UploadSource::from_bytes(&b"world"[..]),
        ];
        let request = build(
            "POST",
            "/submit",
            "example.com",
            &BTreeMap::new(),
            &mut sources,
        )
        .await
        .unwrap();

        assert_eq!(request.body, b"hello world");
        assert!(header_text(&request).contains("Content-Length: 11\r\n"));
    }

    #[tokio::test]
    async fn source_failure_aborts_the_build() {
        struct Broken;
        impl tokio::io::AsyncRead for Broken {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::other("broken")))
            }
        }

        let mut sources = vec![
            UploadSource::from_bytes(&b"ok"[..]),
            UploadSource::from_reader(Broken),
        ];
        let err = build("POST", "/", "example.com", &BTreeMap::new(), &mut sources).await;
        assert_eq!(err.unwrap_err(), LoadError::Failed);
    }

    #[test]
    fn body_bytes_follow_header_verbatim() {
        let request = serialize(
            "PUT",
            "/upload",
            "example.com",
            &BTreeMap::new(),
            b"\x00\x01binary\xff".to_vec(),
        )
        .unwrap();
        assert!(header_text(&request).contains("Content-Length: 9\r\n"));
        assert_eq!(request.body, b"\x00\x01binary\xff");
    }
}
